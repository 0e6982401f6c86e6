use serde::{Deserialize, Serialize};

/// Warning severity, ordered so `CRITICAL` sorts first (§4.10 warnings
/// generator: "sorted CRITICAL → LOW").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl Warning {
    pub fn new(code: &'static str, severity: Severity, message: impl Into<String>) -> Self {
        Self { code, severity, message: message.into() }
    }

    /// Sorts a warning list CRITICAL → LOW, stable on insertion order within
    /// a severity tier.
    pub fn sort_by_severity(warnings: &mut [Warning]) {
        warnings.sort_by(|a, b| b.severity.cmp(&a.severity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_critical_first() {
        let mut warnings = vec![
            Warning::new("A", Severity::Low, "a"),
            Warning::new("B", Severity::Critical, "b"),
            Warning::new("C", Severity::Medium, "c"),
        ];
        Warning::sort_by_severity(&mut warnings);
        assert_eq!(warnings[0].code, "B");
        assert_eq!(warnings.last().unwrap().code, "A");
    }
}

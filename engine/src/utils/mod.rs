pub mod error;
pub mod math;
pub mod types;

pub use error::{EngineError, Result};
pub use types::*;

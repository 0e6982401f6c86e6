pub mod oracle;

pub use oracle::PriceOracle;

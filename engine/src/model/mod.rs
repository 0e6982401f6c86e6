//! Shared domain types (§3 Data Model): token/pool/liquidity/price records
//! and the Analyzer's output shape. Grounded on the teacher's typed
//! `graph::{TokenNode, PoolEdge}` value objects, generalized from a fixed
//! Uniswap-v4-style pool record to the tagged V2/V3 `PoolState` this engine
//! reconstructs live per analysis instead of holding in a standing graph.

pub mod analysis;
pub mod pool;
pub mod token;
pub mod warning;

pub use analysis::{AnalysisBreakdown, AnalysisResult, BestPools, Meta, Performance, PerformanceGrade, Summary};
pub use pool::{LiquidityInfo, LiquidityStatus, Pool, PoolState, PriceInfo, ProtocolKind};
pub use token::TokenInfo;
pub use warning::{Severity, Warning};

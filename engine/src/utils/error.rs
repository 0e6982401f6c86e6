use alloy_primitives::Address;
use thiserror::Error;

/// The engine's error taxonomy: input, transport, decode, state, domain and
/// safety failures. Per-sub-call decode errors never surface here — they're
/// swallowed at the Batch Caller and Token Registry boundaries and reported
/// as missing data instead, so the rest of a batch can proceed.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("invalid token address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid value for {field}: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("all RPC providers failed: {0}")]
    AllProvidersFailed(String),

    #[error("no route found from {from} to {to}")]
    NoRouteFound { from: Address, to: Address },

    #[error("no tradeable pool for {token} at trade size ${trade_usd}")]
    NoTradeablePool { token: Address, trade_usd: f64 },

    #[error("token {0} is not in the analysis cache")]
    TokenNotCached(Address),

    #[error("swap blocked: {reason}")]
    SwapBlocked { reason: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

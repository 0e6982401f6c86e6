pub mod abi;
pub mod batch;
pub mod gateway;

pub use batch::{BatchCaller, CallResult, PendingCall};
pub use gateway::RpcGateway;

//! Batch Caller (§4.2): one aggregated chain call carrying many sub-calls,
//! decoded back into per-sub-call success/bytes. `allowFailure` defaults to
//! true so one bad sub-call never aborts the batch — only the Batch
//! Caller's own RPC round-trip (via the Gateway) can fail the whole thing.

use crate::rpc::abi::{Call3, Call3Result, IMulticall3};
use crate::rpc::gateway::RpcGateway;
use crate::utils::error::{EngineError, Result};
use alloy_primitives::{Address, Bytes};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_sol_types::SolCall;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PendingCall {
    pub target: Address,
    pub allow_failure: bool,
    pub call_data: Bytes,
}

impl PendingCall {
    pub fn new(target: Address, call_data: impl Into<Bytes>) -> Self {
        Self { target, allow_failure: true, call_data: call_data.into() }
    }
}

#[derive(Debug, Clone)]
pub struct CallResult {
    pub success: bool,
    pub return_data: Bytes,
}

pub struct BatchCaller {
    gateway: Arc<RpcGateway>,
    multicall3: Address,
}

impl BatchCaller {
    pub fn new(gateway: Arc<RpcGateway>, multicall3: Address) -> Self {
        Self { gateway, multicall3 }
    }

    /// `Batch(calls) → [(success, returnData)]`, positional, same length and
    /// order as the input (§8 round-trip property).
    pub async fn batch(&self, calls: Vec<PendingCall>) -> Result<Vec<CallResult>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let sol_calls: Vec<Call3> = calls
            .iter()
            .map(|c| Call3 {
                target: c.target,
                allowFailure: c.allow_failure,
                callData: c.call_data.clone(),
            })
            .collect();

        let call_data = IMulticall3::aggregate3Call { calls: sol_calls }.abi_encode();
        let multicall3 = self.multicall3;

        let return_bytes = self
            .gateway
            .execute(move |provider| {
                let tx = TransactionRequest::default().to(multicall3).input(call_data.clone().into());
                async move {
                    provider
                        .call(&tx)
                        .await
                        .map(|bytes| bytes.to_vec())
                        .map_err(|err| err.to_string())
                }
            })
            .await?;

        let results: Vec<Call3Result> = IMulticall3::aggregate3Call::abi_decode_returns(&return_bytes, true)
            .map_err(|err| EngineError::Internal(format!("aggregate3 decode failed: {err}")))?
            .returnData;

        if results.len() != calls.len() {
            return Err(EngineError::Internal(format!(
                "aggregate3 returned {} results for {} calls",
                results.len(),
                calls.len()
            )));
        }

        Ok(results
            .into_iter()
            .map(|r| CallResult { success: r.success, return_data: r.returnData })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_call_defaults_to_allow_failure() {
        let call = PendingCall::new(Address::ZERO, Bytes::new());
        assert!(call.allow_failure);
    }
}

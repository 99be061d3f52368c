//! In-memory stand-in for a node, implementing the SDK's client traits.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256, keccak256};
use async_trait::async_trait;
use eth_contract_sdk::client::{Error, ReadClient, WriteClient};
use eth_contract_sdk::{LogEntry, LogFilter, Receipt, Selector, TxRequest};

#[derive(Default)]
struct State {
    responses: HashMap<(Address, Selector), String>,
    calls: Vec<(Address, Bytes)>,
    transactions: Vec<TxRequest>,
    logs: Vec<LogEntry>,
    receipt_logs: Vec<LogEntry>,
    reverts: bool,
    confirmation_delay: Duration,
}

/// Records every call and transaction and serves canned results.
///
/// Calls are answered by `(target, selector)`; unknown calls fail like a revert.
/// Transactions are mined after the configured confirmation delay.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<State>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers calls of `selector` on `target` with the hex string `result`.
    pub fn respond(&self, target: Address, selector: Selector, result: impl Into<String>) {
        self.state()
            .responses
            .insert((target, selector), result.into());
    }

    /// Adds a log returned by `get_logs` when it passes the filter.
    pub fn push_log(&self, log: LogEntry) {
        self.state().logs.push(log);
    }

    /// Logs attached to every receipt.
    pub fn set_receipt_logs(&self, logs: Vec<LogEntry>) {
        self.state().receipt_logs = logs;
    }

    /// Makes every following transaction revert.
    pub fn set_reverts(&self, reverts: bool) {
        self.state().reverts = reverts;
    }

    /// Time a transaction takes to be mined.
    pub fn set_confirmation_delay(&self, delay: Duration) {
        self.state().confirmation_delay = delay;
    }

    /// Every `(target, calldata)` passed to `call`, in order.
    pub fn calls(&self) -> Vec<(Address, Bytes)> {
        self.state().calls.clone()
    }

    /// Every submitted transaction, in order.
    pub fn transactions(&self) -> Vec<TxRequest> {
        self.state().transactions.clone()
    }
}

#[async_trait]
impl ReadClient for MockChain {
    async fn call(&self, to: Address, data: Bytes) -> Result<String, Error> {
        let mut state = self.state();
        state.calls.push((to, data.clone()));
        let selector = data
            .get(..4)
            .map(Selector::from_slice)
            .ok_or_else(|| Error::RequestError("calldata shorter than a selector".into()))?;
        state
            .responses
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| Error::RequestError(format!("execution reverted: {selector} on {to}")))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, Error> {
        Ok(self
            .state()
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WriteClient for MockChain {
    async fn send_transaction_and_wait(
        &self,
        request: TxRequest,
        timeout: Duration,
        _poll_interval: Duration,
    ) -> Result<Receipt, Error> {
        let (hash, delay, status, logs, block) = {
            let mut state = self.state();
            state.transactions.push(request);
            let index = state.transactions.len() as u64;
            (
                keccak256(U256::from(index).to_be_bytes::<32>()),
                state.confirmation_delay,
                !state.reverts,
                state.receipt_logs.clone(),
                index,
            )
        };

        if delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(Error::ReceiptTimeout { hash, timeout });
        }
        tokio::time::sleep(delay).await;
        log::debug!("Mock mined transaction {hash} in block {block}");

        Ok(Receipt {
            status,
            transaction_hash: hash,
            contract_address: None,
            block_number: Some(block),
            gas_used: 21_000,
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_calls_fail() {
        let chain = MockChain::new();
        let result = chain.call(Address::ZERO, Bytes::from(vec![1, 2, 3, 4])).await;
        assert!(result.is_err());
        assert_eq!(chain.calls().len(), 1);
    }

    #[tokio::test]
    async fn slow_confirmation_times_out() {
        let chain = MockChain::new();
        chain.set_confirmation_delay(Duration::from_millis(50));
        let request = TxRequest {
            to: Address::ZERO,
            data: Bytes::new(),
            value: U256::ZERO,
        };
        let result = chain
            .send_transaction_and_wait(request, Duration::from_millis(10), Duration::from_millis(1))
            .await;
        assert!(matches!(result, Err(Error::ReceiptTimeout { .. })));
    }
}

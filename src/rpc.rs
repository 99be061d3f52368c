use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::rpc::types::{Filter, Log, TransactionReceipt, TransactionRequest};
use alloy::network::TransactionBuilder;
use serde::{Deserialize, Serialize};

use crate::error::DecodingError;

/// An event log as returned by `eth_getLogs` or inside a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Emitting contract.
    pub address: Address,
    /// Non-indexed fields, ABI-encoded.
    pub data: Bytes,
    /// `topic0` followed by the indexed fields.
    pub topics: Vec<B256>,
    pub block_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub transaction_hash: B256,
    pub log_index: u64,
    #[serde(default)]
    pub removed: bool,
}

impl TryFrom<Log> for LogEntry {
    type Error = DecodingError;

    /// Pending logs lack a transaction hash and log index; they are rejected.
    fn try_from(log: Log) -> Result<Self, Self::Error> {
        Ok(Self {
            address: log.address(),
            data: log.data().data.clone(),
            topics: log.topics().to_vec(),
            block_hash: log.block_hash,
            block_number: log.block_number,
            transaction_hash: log
                .transaction_hash
                .ok_or(DecodingError::MissingField("transactionHash"))?,
            log_index: log.log_index.ok_or(DecodingError::MissingField("logIndex"))?,
            removed: log.removed,
        })
    }
}

/// Selection criteria for `eth_getLogs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Option<Address>,
    pub topic0: Option<B256>,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn topic0(mut self, topic: B256) -> Self {
        self.topic0 = Some(topic);
        self
    }

    pub fn from_block(mut self, block: Option<u64>) -> Self {
        self.from_block = block;
        self
    }

    pub fn to_block(mut self, block: Option<u64>) -> Self {
        self.to_block = block;
        self
    }

    /// Whether `log` passes the address and `topic0` criteria. Block bounds are
    /// checked only when the log carries a block number.
    pub fn matches(&self, log: &LogEntry) -> bool {
        let in_range = |number: Option<u64>| match number {
            Some(n) => {
                self.from_block.is_none_or(|from| n >= from)
                    && self.to_block.is_none_or(|to| n <= to)
            }
            None => true,
        };
        self.address.is_none_or(|a| a == log.address)
            && self.topic0.is_none_or(|t| log.topics.first() == Some(&t))
            && in_range(log.block_number)
    }
}

impl From<&LogFilter> for Filter {
    fn from(filter: &LogFilter) -> Self {
        let mut out = Filter::new()
            .from_block(
                filter
                    .from_block
                    .map_or(BlockNumberOrTag::Earliest, BlockNumberOrTag::Number),
            )
            .to_block(
                filter
                    .to_block
                    .map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number),
            );
        if let Some(address) = filter.address {
            out = out.address(address);
        }
        if let Some(topic) = filter.topic0 {
            out = out.event_signature(topic);
        }
        out
    }
}

/// A state-changing call to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    /// `selector ++ encodedArgs`.
    pub data: Bytes,
    /// Wei attached to the call; zero unless the target is payable.
    pub value: U256,
}

impl From<TxRequest> for TransactionRequest {
    fn from(request: TxRequest) -> Self {
        TransactionRequest::default()
            .with_to(request.to)
            .with_input(request.data)
            .with_value(request.value)
    }
}

/// The mined outcome of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// `true` when execution succeeded.
    pub status: bool,
    pub transaction_hash: B256,
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub logs: Vec<LogEntry>,
}

impl TryFrom<TransactionReceipt> for Receipt {
    type Error = DecodingError;

    fn try_from(receipt: TransactionReceipt) -> Result<Self, Self::Error> {
        let logs = receipt
            .logs()
            .iter()
            .cloned()
            .map(LogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            status: receipt.status(),
            transaction_hash: receipt.transaction_hash,
            contract_address: receipt.contract_address,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            logs,
        })
    }
}

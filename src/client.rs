use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, B256, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use bon::bon;
use displaydoc::Display;
use thiserror::Error;

use crate::error::DecodingError;
use crate::rpc::{LogEntry, LogFilter, Receipt, TxRequest};
use crate::utils::encode_hex;

/// Errors raised by an RPC collaborator.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// Failed to send the RPC request: {0}
    RequestError(String),
    /// Failed to submit transaction: {0}
    TransactionSendError(String),
    /// Transaction {hash} was not mined within {timeout:?}
    ReceiptTimeout { hash: B256, timeout: Duration },
    /// Unexpected RPC response: {0}
    ResponseError(#[from] DecodingError),
}

/// Read side of a chain connection: calls and log queries.
#[async_trait]
pub trait ReadClient: Send + Sync {
    /// Executes a read-only call against `to` and returns the raw result as hex.
    async fn call(&self, to: Address, data: Bytes) -> Result<String, Error>;

    /// Fetches the logs selected by `filter`.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, Error>;
}

/// Write side of a chain connection.
#[async_trait]
pub trait WriteClient: ReadClient {
    /// Submits a transaction and waits until it is mined.
    ///
    /// Fails with [`Error::ReceiptTimeout`] when no receipt shows up within `timeout`.
    /// The receipt is returned even if execution reverted; check [`Receipt::status`].
    async fn send_transaction_and_wait(
        &self,
        request: TxRequest,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Receipt, Error>;
}

/// Fee pricing applied to outgoing transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FeeMode {
    /// Let the provider estimate fees.
    #[default]
    Auto,
    /// Pre-EIP-1559 pricing with a fixed gas price (in wei).
    Legacy { gas_price: u128 },
    /// EIP-1559 pricing (in wei).
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

/// Configuration for transaction parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Gas limit for transactions; estimated by the provider when unset.
    pub gas_limit: Option<u64>,
    /// Fee settings.
    pub fees: FeeMode,
}

impl TransactionConfig {
    fn apply(&self, mut tx: TransactionRequest) -> TransactionRequest {
        if let Some(gas_limit) = self.gas_limit {
            tx = tx.with_gas_limit(gas_limit);
        }
        match self.fees {
            FeeMode::Auto => tx,
            FeeMode::Legacy { gas_price } => tx.with_gas_price(gas_price),
            FeeMode::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => tx
                .with_max_fee_per_gas(max_fee_per_gas)
                .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
        }
    }
}

/// A JSON-RPC connection to an Ethereum node.
///
/// Without a wallet the client can only read; transactions are then sent unsigned
/// and must be signed by the node itself.
#[derive(Clone)]
pub struct RpcClient {
    /// The underlying provider for making RPC calls.
    pub(crate) provider: DynProvider,
    /// The URL of the node endpoint.
    pub(crate) rpc_url: Url,
    /// Address transactions are sent from, when a wallet is configured.
    pub(crate) sender: Option<Address>,
    /// Transaction configuration.
    pub(crate) tx_config: Arc<TransactionConfig>,
}

#[bon]
impl RpcClient {
    /// Creates a client for the node at `rpc_url`, optionally signing with `wallet`.
    #[builder]
    pub fn new(
        rpc_url: Url,
        wallet: Option<PrivateKeySigner>,
        tx_config: Option<TransactionConfig>,
    ) -> Self {
        let sender = wallet.as_ref().map(|signer| signer.address());
        let provider = match wallet {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(rpc_url.clone())
                .erased(),
            None => ProviderBuilder::new()
                .connect_http(rpc_url.clone())
                .erased(),
        };

        Self {
            provider,
            rpc_url,
            sender,
            tx_config: Arc::new(tx_config.unwrap_or_default()),
        }
    }

    /// Gets the underlying provider used for blockchain interactions.
    pub fn get_rpc_client(&self) -> DynProvider {
        self.provider.clone()
    }

    pub fn get_rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// Address transactions are signed with, if a wallet is configured.
    pub fn sender(&self) -> Option<Address> {
        self.sender
    }

    pub async fn get_chain_id(&self) -> Result<u64, Error> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| Error::RequestError(format!("Failed to get chain ID: {e}")))
    }

    /// Polls for the receipt of `hash` every `poll_interval` until `timeout` elapses.
    async fn wait_for_receipt(
        &self,
        hash: B256,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Receipt, Error> {
        let start_time = Instant::now();
        loop {
            match self.provider.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    log::info!(
                        "Transaction {hash} was included in block {:?}",
                        receipt.block_number
                    );
                    return Ok(Receipt::try_from(receipt)?);
                }
                Ok(None) => log::trace!("Receipt of transaction {hash} not available yet"),
                Err(e) if e.to_string().contains("transaction indexing is in progress") => {
                    log::debug!("Node is still indexing, retrying receipt of {hash}")
                }
                Err(e) => {
                    return Err(Error::RequestError(format!(
                        "Failed to get receipt of {hash}: {e}"
                    )));
                }
            }

            let elapsed = start_time.elapsed();
            if elapsed >= timeout {
                return Err(Error::ReceiptTimeout { hash, timeout });
            }
            tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
        }
    }
}

#[async_trait]
impl ReadClient for RpcClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<String, Error> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        let result = self
            .provider
            .call(request)
            .await
            .map_err(|e| Error::RequestError(format!("eth_call to {to} failed: {e}")))?;
        Ok(encode_hex(&result))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, Error> {
        let logs = self
            .provider
            .get_logs(&Filter::from(filter))
            .await
            .map_err(|e| Error::RequestError(format!("eth_getLogs failed: {e}")))?;
        log::debug!("Fetched {} logs", logs.len());
        Ok(logs
            .into_iter()
            .map(LogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl WriteClient for RpcClient {
    async fn send_transaction_and_wait(
        &self,
        request: TxRequest,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Receipt, Error> {
        let mut tx = self.tx_config.apply(request.into());
        if let Some(sender) = self.sender {
            tx = tx.with_from(sender);
        }

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| Error::TransactionSendError(e.to_string()))?;
        let hash = *pending.tx_hash();
        log::debug!("Submitted transaction {hash}");

        self.wait_for_receipt(hash, timeout, poll_interval).await
    }
}

// # Ethereum Contract SDK
//!
//! This SDK lets you talk to Ethereum smart contracts from Rust without generated bindings.
//! It has two layers:
//!
//! - An ABI codec: typed values ([`AbiType`]), the head/tail encoder and a strict decoder,
//!   function selectors and event topics, event log decoding and Multicall3 batching.
//! - A binding layer: describe the methods you need as a [`ContractInterface`], bind it to
//!   a JSON ABI at an address, and invoke methods by name. `view` and `pure` functions are
//!   routed to `eth_call`; everything else is submitted as a transaction and waited on.
//!
//! Bindings are checked once against the ABI and cached for the lifetime of the process,
//! so repeated binds of the same interface and ABI are cheap.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use eth_contract_sdk::binding::{ContractInterface, HostType, MethodDecl, Returns};
//! use eth_contract_sdk::{Address, Arg, RpcClient, U256, Url, bind_read_only};
//!
//! struct Erc20;
//!
//! impl ContractInterface for Erc20 {
//!     fn methods() -> Vec<MethodDecl> {
//!         vec![MethodDecl::new("balanceOf")
//!             .param(HostType::Address)
//!             .returns(Returns::Value(HostType::Integer))]
//!     }
//! }
//!
//! # async fn run(abi_json: &str, token: Address, owner: Address) -> Result<(), Box<dyn std::error::Error>> {
//! let client = RpcClient::builder()
//!     .rpc_url(Url::parse("http://localhost:8545")?)
//!     .build();
//! let token = bind_read_only::<Erc20, _>(token, abi_json, Arc::new(client))?;
//! let balance: U256 = token.call("balanceOf", &[Arg::from(owner)]).await?;
//! # Ok(())
//! # }
//! ```

/// Re-export commonly used types from `alloy`.
pub use alloy::primitives::{Address, B256, Bytes, FixedBytes, I256, U256, keccak256};
pub use alloy::signers::local::PrivateKeySigner;
pub use alloy::transports::http::reqwest::Url;

pub use abi::{Abi, FunctionCall, FunctionMetadata, Selector, StateMutability};
pub use binding::{ContractInterface, HostType, MethodDecl, Returns};
pub use client::{ReadClient, RpcClient, TransactionConfig, WriteClient};
pub use contract::{Contract, DispatchConfig, Outcome, ReadOnlyContract, bind, bind_read_only};
pub use error::{BindingError, DecodingError, DispatchError, EncodingError, Error};
pub use events::EventRecord;
pub use multicall::{Call3, MULTICALL3_ADDRESS, MulticallResult};
pub use rpc::{LogEntry, LogFilter, Receipt, TxRequest};
pub use schema::TypeSchema;
pub use value::{AbiType, Arg, FromAbi};

/// Module for typed ABI values.
/// Defines [`AbiType`], the [`Arg`] conversions used for call arguments and the [`FromAbi`]
/// re-shaping of decoded results.
pub mod value;

/// Module for ABI type descriptors and their parsing from type strings and JSON parameters.
pub mod schema;

/// Module with the head/tail encoder.
pub mod encoder;

/// Module with the bounds-checked decoder.
pub mod decoder;

/// Module for parsed ABIs, function metadata and calldata.
pub mod abi;

/// Module for event metadata and log decoding.
pub mod events;

/// Module for Multicall3 batching.
pub mod multicall;

/// Module for binding contract interfaces to ABIs.
pub mod binding;

/// Module for bound contracts and method dispatch.
pub mod contract;

/// Module for the RPC collaborators and the JSON-RPC client.
pub mod client;

/// Module for JSON-RPC data types: logs, filters, transaction requests and receipts.
pub mod rpc;

/// Module for error types.
pub mod error;

/// Module with utility functions.
/// Includes hex helpers and ETH/wei conversions.
pub mod utils;

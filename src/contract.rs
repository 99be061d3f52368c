use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};

use crate::abi::{Abi, FunctionCall};
use crate::binding::{AbiBinding, ContractInterface, ResolvedMethod, Returns, Route};
use crate::client::{ReadClient, WriteClient};
use crate::error::{DecodingError, DispatchError, Error};
use crate::events::EventRecord;
use crate::rpc::{LogFilter, Receipt, TxRequest};
use crate::value::{AbiType, Arg, FromAbi};

/// Timing of transaction confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// How long to wait for a receipt before failing.
    pub confirmation_timeout: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Result of invoking a bound method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Decoded outputs of a read.
    Values(Vec<AbiType>),
    /// Receipt of a mined transaction, for methods that return it.
    Receipt(Receipt),
    /// Nothing to return.
    Unit,
}

impl Outcome {
    /// Re-shapes the outputs into `T`: a single output directly, several as a tuple.
    pub fn decode<T: FromAbi>(self) -> Result<T, DecodingError> {
        match self {
            Outcome::Values(mut values) if values.len() == 1 => match values.pop() {
                Some(value) => T::from_abi(value),
                None => Err(DecodingError::shape("one value", "none")),
            },
            Outcome::Values(values) => T::from_abi(AbiType::tuple(values)),
            Outcome::Receipt(_) => Err(DecodingError::shape("return values", "receipt")),
            Outcome::Unit => Err(DecodingError::shape("return values", "nothing")),
        }
    }

    pub fn into_receipt(self) -> Option<Receipt> {
        match self {
            Outcome::Receipt(receipt) => Some(receipt),
            _ => None,
        }
    }
}

/// Method lookup and read routing shared by both contract flavours.
struct Dispatcher<C: ?Sized> {
    address: Address,
    binding: Arc<AbiBinding>,
    client: Arc<C>,
}

/// A method call ready to execute.
struct Prepared<'a> {
    method: &'a ResolvedMethod,
    call: FunctionCall,
    value: U256,
}

impl<C: ReadClient + ?Sized> Dispatcher<C> {
    fn new(address: Address, binding: Arc<AbiBinding>, client: Arc<C>) -> Self {
        Self {
            address,
            binding,
            client,
        }
    }

    fn resolve(&self, name: &str) -> Result<&ResolvedMethod, DispatchError> {
        self.binding
            .method(name)
            .ok_or_else(|| DispatchError::UnknownMethod(name.to_string()))
    }

    fn prepare<'a>(&'a self, method: &'a ResolvedMethod, args: &[Arg]) -> Result<Prepared<'a>, Error> {
        let decl = method.decl();
        if args.len() != decl.params().len() {
            return Err(DispatchError::ArgumentCount {
                method: decl.name().to_string(),
                expected: decl.params().len(),
                actual: args.len(),
            }
            .into());
        }

        let (value, args) = match (decl.is_value_bearing(), args.split_first()) {
            (true, Some((amount, rest))) => (wei_amount(decl.name(), amount)?, rest),
            _ => (U256::ZERO, args),
        };
        let call = self
            .binding
            .abi()
            .encode_function(method.function().name(), args)?;
        Ok(Prepared {
            method,
            call,
            value,
        })
    }

    async fn read(&self, prepared: &Prepared<'_>) -> Result<Outcome, Error> {
        let result = self
            .client
            .call(self.address, prepared.call.data().clone())
            .await?;
        log::trace!(
            "{}.{} returned {result}",
            self.binding.interface(),
            prepared.method.decl().name()
        );
        let values = prepared.call.decode_values(&result)?;
        Ok(match prepared.method.decl().return_shape() {
            Returns::Unit => Outcome::Unit,
            _ => Outcome::Values(values),
        })
    }

    async fn events<T: FromAbi>(
        &self,
        event: &str,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<Vec<T>, Error> {
        let records = self.event_records(event, from_block, to_block).await?;
        Ok(records
            .iter()
            .map(EventRecord::decode)
            .collect::<Result<Vec<T>, _>>()?)
    }

    async fn event_records(
        &self,
        event: &str,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<Vec<EventRecord>, Error> {
        let abi = self.binding.abi();
        let metadata = abi
            .event(event)
            .ok_or_else(|| DecodingError::UnknownEvent(event.to_string()))?;
        let filter: LogFilter = metadata
            .filter(self.address)
            .from_block(from_block)
            .to_block(to_block);
        let logs = self.client.get_logs(&filter).await?;
        Ok(abi.decode_event_records(event, &logs)?)
    }
}

fn wei_amount(method: &str, amount: &Arg) -> Result<U256, DispatchError> {
    match amount {
        Arg::Uint(value) => Ok(*value),
        Arg::Int(value) if !value.is_negative() => Ok(value.into_raw()),
        Arg::Value(AbiType::UInt(value)) => Ok(value.value()),
        _ => Err(DispatchError::InvalidValue(method.to_string())),
    }
}

/// A contract bound to interface `I` over a client that can submit transactions.
///
/// `view`/`pure` methods are evaluated with a read-only call; every other method is
/// submitted as a transaction and waited on until mined.
pub struct Contract<I, C: ?Sized> {
    dispatcher: Dispatcher<C>,
    config: DispatchConfig,
    _interface: PhantomData<fn() -> I>,
}

impl<I: ContractInterface, C: WriteClient + ?Sized> Contract<I, C> {
    /// Binds `I` to an already parsed ABI.
    pub fn from_abi(address: Address, abi: Arc<Abi>, client: Arc<C>) -> Result<Self, Error> {
        let binding = AbiBinding::resolve_cached::<I>(abi)?;
        log::info!("Bound {} at {address}", I::interface_name());
        Ok(Self {
            dispatcher: Dispatcher::new(address, binding, client),
            config: DispatchConfig::default(),
            _interface: PhantomData,
        })
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn address(&self) -> Address {
        self.dispatcher.address
    }

    pub fn binding(&self) -> &Arc<AbiBinding> {
        &self.dispatcher.binding
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Invokes `method` with `args`, routing by the function's state mutability.
    pub async fn invoke(&self, method: &str, args: &[Arg]) -> Result<Outcome, Error> {
        let resolved = self.dispatcher.resolve(method)?;
        let prepared = self.dispatcher.prepare(resolved, args)?;
        match resolved.route() {
            Route::View => self.dispatcher.read(&prepared).await,
            Route::Write => self.write(prepared).await,
        }
    }

    async fn write(&self, prepared: Prepared<'_>) -> Result<Outcome, Error> {
        let name = prepared.method.decl().name();
        let request = TxRequest {
            to: self.dispatcher.address,
            data: prepared.call.into_data(),
            value: prepared.value,
        };
        log::debug!("Submitting {name} to {} with value {}", request.to, request.value);

        let receipt = self
            .dispatcher
            .client
            .send_transaction_and_wait(
                request,
                self.config.confirmation_timeout,
                self.config.poll_interval,
            )
            .await?;
        if !receipt.status {
            log::warn!(
                "Transaction {} for {name} was mined with failed status",
                receipt.transaction_hash
            );
            return Err(DispatchError::TransactionReverted {
                method: name.to_string(),
                hash: receipt.transaction_hash.to_string(),
            }
            .into());
        }

        Ok(match prepared.method.decl().return_shape() {
            Returns::Receipt => Outcome::Receipt(receipt),
            _ => Outcome::Unit,
        })
    }

    /// Calls a `view`/`pure` method and re-shapes its outputs into `T`.
    pub async fn call<T: FromAbi>(&self, method: &str, args: &[Arg]) -> Result<T, Error> {
        if self.dispatcher.resolve(method)?.route() == Route::Write {
            return Err(DispatchError::NoReturnValue(method.to_string()).into());
        }
        Ok(self.invoke(method, args).await?.decode()?)
    }

    /// Submits a state-changing method. Returns the receipt when the method declares it.
    pub async fn send(&self, method: &str, args: &[Arg]) -> Result<Option<Receipt>, Error> {
        Ok(self.invoke(method, args).await?.into_receipt())
    }

    /// Fetches and decodes the logs of `event` emitted by this contract.
    pub async fn events<T: FromAbi>(
        &self,
        event: &str,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<Vec<T>, Error> {
        self.dispatcher.events(event, from_block, to_block).await
    }

    pub async fn event_records(
        &self,
        event: &str,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<Vec<EventRecord>, Error> {
        self.dispatcher
            .event_records(event, from_block, to_block)
            .await
    }
}

/// A contract bound to interface `I` over a client that can only read.
/// State-changing methods fail with [`DispatchError::UnsupportedOperation`].
pub struct ReadOnlyContract<I, C: ?Sized> {
    dispatcher: Dispatcher<C>,
    _interface: PhantomData<fn() -> I>,
}

impl<I: ContractInterface, C: ReadClient + ?Sized> ReadOnlyContract<I, C> {
    pub fn from_abi(address: Address, abi: Arc<Abi>, client: Arc<C>) -> Result<Self, Error> {
        let binding = AbiBinding::resolve_cached::<I>(abi)?;
        log::info!("Bound {} at {address} (read-only)", I::interface_name());
        Ok(Self {
            dispatcher: Dispatcher::new(address, binding, client),
            _interface: PhantomData,
        })
    }

    pub fn address(&self) -> Address {
        self.dispatcher.address
    }

    pub fn binding(&self) -> &Arc<AbiBinding> {
        &self.dispatcher.binding
    }

    pub async fn invoke(&self, method: &str, args: &[Arg]) -> Result<Outcome, Error> {
        let resolved = self.dispatcher.resolve(method)?;
        if resolved.route() == Route::Write {
            return Err(DispatchError::UnsupportedOperation(method.to_string()).into());
        }
        let prepared = self.dispatcher.prepare(resolved, args)?;
        self.dispatcher.read(&prepared).await
    }

    pub async fn call<T: FromAbi>(&self, method: &str, args: &[Arg]) -> Result<T, Error> {
        Ok(self.invoke(method, args).await?.decode()?)
    }

    pub async fn events<T: FromAbi>(
        &self,
        event: &str,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<Vec<T>, Error> {
        self.dispatcher.events(event, from_block, to_block).await
    }

    pub async fn event_records(
        &self,
        event: &str,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<Vec<EventRecord>, Error> {
        self.dispatcher
            .event_records(event, from_block, to_block)
            .await
    }
}

/// Parses `abi_json` and binds interface `I` at `address` for reads and writes.
pub fn bind<I: ContractInterface, C: WriteClient + ?Sized>(
    address: Address,
    abi_json: &str,
    client: Arc<C>,
) -> Result<Contract<I, C>, Error> {
    Contract::from_abi(address, Arc::new(Abi::from_json(abi_json)?), client)
}

/// Parses `abi_json` and binds interface `I` at `address` for reads only.
pub fn bind_read_only<I: ContractInterface, C: ReadClient + ?Sized>(
    address: Address,
    abi_json: &str,
    client: Arc<C>,
) -> Result<ReadOnlyContract<I, C>, Error> {
    ReadOnlyContract::from_abi(address, Arc::new(Abi::from_json(abi_json)?), client)
}

use displaydoc::Display;
use thiserror::Error;

use crate::client;

/// Errors raised while parsing an ABI or turning caller arguments into calldata.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum EncodingError {
    /// Invalid ABI document: {0}
    InvalidAbi(String),
    /// Function `{0}` is declared more than once; overloaded functions are not supported
    DuplicateFunction(String),
    /// Event `{0}` is declared more than once; overloaded events are not supported
    DuplicateEvent(String),
    /// Invalid or unsupported ABI type `{0}`
    InvalidType(String),
    /// Function `{0}` not found in ABI
    UnknownFunction(String),
    /// Function `{function}` expects {expected} arguments, got {actual}
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },
    /// Argument {index} of `{function}`: {source}
    Argument {
        function: String,
        index: usize,
        source: Box<EncodingError>,
    },
    /// Cannot encode {found} as `{expected}`
    TypeMismatch { expected: String, found: String },
    /// Value {value} does not fit in `{type_name}`
    OutOfRange { type_name: String, value: String },
    /// Array element of type `{found}` does not match element type `{expected}`
    ElementMismatch { expected: String, found: String },
    /// Expected {expected} elements for `{type_name}`, got {actual}
    LengthMismatch {
        type_name: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised while turning raw bytes or RPC responses back into values.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum DecodingError {
    /// Multicall result is empty or null
    EmptyOrNull,
    /// Cannot decode {0}: empty data
    EmptyData(String),
    /// Invalid hex input: {0}
    InvalidHex(String),
    /// Buffer truncated at byte {position}: need {needed} bytes, {available} available
    Truncated {
        position: usize,
        needed: usize,
        available: usize,
    },
    /// Offset {offset} read at byte {position} points outside the buffer
    InvalidOffset { position: usize, offset: String },
    /// Length {length} read at byte {position} exceeds the buffer
    InvalidLength { position: usize, length: String },
    /// Invalid `{type_name}` value at byte {position}
    InvalidValue { position: usize, type_name: String },
    /// Invalid UTF-8 string at byte {position}
    InvalidUtf8 { position: usize },
    /// Decoding at byte {position} expands beyond what a {input}-byte input can hold
    ExcessiveOutput { position: usize, input: usize },
    /// Missing required response field `{0}`
    MissingField(&'static str),
    /// Cannot convert {found} into {expected}
    UnexpectedShape { expected: String, found: String },
    /// Event `{0}` not found in ABI
    UnknownEvent(String),
    /// Event `{0}` is anonymous and cannot be matched by topic
    AnonymousEvent(String),
    /// Log {log_index:?} has {actual} topics, event `{event}` needs {expected}
    TopicCount {
        event: String,
        log_index: Option<u64>,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised once, at bind time, when an interface does not fit an ABI.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum BindingError {
    /// Type `{0}` is not a contract interface: it declares no methods
    NotAnInterface(String),
    /// Interface `{interface}` declares method `{method}` more than once
    DuplicateMethod { interface: String, method: String },
    /// Interface method `{0}` has no matching ABI function
    NoAbiCounterpart(String),
    /// Method `{method}` declares {declared} parameters, ABI function has {expected}
    ParameterCount {
        method: String,
        declared: usize,
        expected: usize,
    },
    /// Parameter {index} of `{method}`: {declared} is not compatible with `{abi_type}`
    ParameterType {
        method: String,
        index: usize,
        declared: String,
        abi_type: String,
    },
    /// Return type of `{method}` is incompatible: {reason}
    ReturnType { method: String, reason: String },
    /// Method `{0}` attaches value but the ABI function is not payable
    NotPayable(String),
    /// Value-bearing method `{0}` must declare an integer amount as its first parameter
    MissingValueParameter(String),
}

/// Errors raised when invoking a method on a bound contract.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum DispatchError {
    /// Method `{0}` is state-changing and cannot be invoked through a read-only binding
    UnsupportedOperation(String),
    /// Method `{0}` is not declared by the bound interface
    UnknownMethod(String),
    /// Method `{0}` is state-changing and returns no value; submit it with `send`
    NoReturnValue(String),
    /// Method `{method}` expects {expected} arguments, got {actual}
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },
    /// Value-bearing method `{0}` needs a non-negative integer amount as first argument
    InvalidValue(String),
    /// Transaction {hash} for `{method}` was mined but reverted
    TransactionReverted { method: String, hash: String },
}

/// Any error surfaced by contract dispatch.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// {0}
    Encoding(#[from] EncodingError),
    /// {0}
    Decoding(#[from] DecodingError),
    /// {0}
    Binding(#[from] BindingError),
    /// {0}
    Dispatch(#[from] DispatchError),
    /// {0}
    Client(#[from] client::Error),
}

impl EncodingError {
    pub(crate) fn mismatch(expected: impl ToString, found: impl ToString) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

impl DecodingError {
    pub(crate) fn shape(expected: impl ToString, found: impl ToString) -> Self {
        Self::UnexpectedShape {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

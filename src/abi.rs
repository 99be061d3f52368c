use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy::primitives::{B256, Bytes, FixedBytes, keccak256};
use serde::Deserialize;

use crate::decoder;
use crate::encoder;
use crate::error::{DecodingError, EncodingError};
use crate::events::EventMetadata;
use crate::schema::{JsonParam, TypeSchema};
use crate::utils::{decode_hex, encode_hex};
use crate::value::{AbiType, Arg, FromAbi};

/// A 4-byte function selector.
pub type Selector = FixedBytes<4>;

/// Computes the selector of a canonical function signature such as `transfer(address,uint256)`.
pub fn function_selector(signature: &str) -> Selector {
    Selector::from_slice(&keccak256(signature.as_bytes())[..4])
}

/// Computes the topic hash of a canonical event signature such as `Transfer(address,address,uint256)`.
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// Declared state mutability of a contract function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pure => "pure",
            Self::View => "view",
            Self::NonPayable => "nonpayable",
            Self::Payable => "payable",
        })
    }
}

/// A named, typed function or event parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub schema: TypeSchema,
}

impl Param {
    fn from_json(param: &JsonParam) -> Result<Self, EncodingError> {
        Ok(Self {
            name: param.name.clone(),
            schema: TypeSchema::from_param(param)?,
        })
    }
}

/// Metadata of one contract function, built once when an [`Abi`] is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionMetadata {
    name: String,
    inputs: Vec<Param>,
    outputs: Vec<Param>,
    state_mutability: StateMutability,
    selector: Selector,
}

impl FunctionMetadata {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<Param>,
        outputs: Vec<Param>,
        state_mutability: StateMutability,
    ) -> Self {
        let name = name.into();
        let selector = function_selector(&signature_of(&name, &inputs));
        Self {
            name,
            inputs,
            outputs,
            state_mutability,
            selector,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Param] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Param] {
        &self.outputs
    }

    /// Canonical type strings of the inputs, in declaration order.
    pub fn input_types(&self) -> Vec<String> {
        self.inputs.iter().map(|p| p.schema.canonical()).collect()
    }

    /// Canonical type strings of the outputs, in declaration order.
    pub fn output_types(&self) -> Vec<String> {
        self.outputs.iter().map(|p| p.schema.canonical()).collect()
    }

    pub fn output_schemas(&self) -> Vec<TypeSchema> {
        self.outputs.iter().map(|p| p.schema.clone()).collect()
    }

    pub fn state_mutability(&self) -> StateMutability {
        self.state_mutability
    }

    /// `view` and `pure` functions can be evaluated with a read-only call.
    pub fn is_view(&self) -> bool {
        matches!(
            self.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    pub fn is_payable(&self) -> bool {
        self.state_mutability == StateMutability::Payable
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.inputs)
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Encodes `args` against the declared inputs, without the selector.
    pub fn encode_arguments(&self, args: &[Arg]) -> Result<Vec<u8>, EncodingError> {
        if args.len() != self.inputs.len() {
            return Err(EncodingError::ArgumentCount {
                function: self.name.clone(),
                expected: self.inputs.len(),
                actual: args.len(),
            });
        }
        let values = self
            .inputs
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (param, arg))| {
                arg.coerce(&param.schema)
                    .map_err(|source| EncodingError::Argument {
                        function: self.name.clone(),
                        index,
                        source: Box::new(source),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(encoder::encode(&values))
    }

    /// Decodes raw return data into one value per declared output.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<AbiType>, DecodingError> {
        if data.is_empty() && !self.outputs.is_empty() {
            return Err(DecodingError::EmptyData(format!("result of `{}`", self.name)));
        }
        decoder::decode(data, &self.output_schemas())
    }

    /// Decodes return data and re-shapes it into `T`.
    ///
    /// A single output is handed to `T` as is; several outputs are handed over as one
    /// tuple, so they can be read as a record, a Rust tuple or a `Vec<AbiType>`.
    pub fn decode_output_as<T: FromAbi>(&self, data: &[u8]) -> Result<T, DecodingError> {
        let mut values = self.decode_output(data)?;
        if values.len() == 1 {
            if let Some(value) = values.pop() {
                return T::from_abi(value);
            }
        }
        T::from_abi(AbiType::tuple(values))
    }
}

fn signature_of(name: &str, params: &[Param]) -> String {
    let types: Vec<String> = params.iter().map(|p| p.schema.canonical()).collect();
    format!("{name}({})", types.join(","))
}

/// Encoded calldata of one function call, bound to the function's declared outputs.
#[derive(Debug, Clone)]
pub struct FunctionCall {
    function: Arc<FunctionMetadata>,
    data: Bytes,
}

impl FunctionCall {
    pub fn function(&self) -> &FunctionMetadata {
        &self.function
    }

    pub fn selector(&self) -> Selector {
        self.function.selector()
    }

    /// `selector ++ encodedArgs`.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    pub fn to_hex(&self) -> String {
        encode_hex(&self.data)
    }

    /// Decodes a hex call result into one value per declared output.
    pub fn decode_values(&self, result: &str) -> Result<Vec<AbiType>, DecodingError> {
        self.function.decode_output(&decode_hex(result)?)
    }

    /// Decodes a hex call result into a scalar, tuple, `Vec` or record type.
    pub fn decode<T: FromAbi>(&self, result: &str) -> Result<T, DecodingError> {
        self.function.decode_output_as(&decode_hex(result)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<JsonParam>,
    #[serde(default)]
    outputs: Vec<JsonParam>,
    state_mutability: Option<StateMutability>,
    constant: Option<bool>,
    payable: Option<bool>,
    #[serde(default)]
    anonymous: bool,
}

fn default_entry_type() -> String {
    "function".to_string()
}

impl JsonEntry {
    fn state_mutability(&self) -> StateMutability {
        match (self.state_mutability, self.constant, self.payable) {
            (Some(mutability), _, _) => mutability,
            (None, Some(true), _) => StateMutability::View,
            (None, _, Some(true)) => StateMutability::Payable,
            _ => StateMutability::NonPayable,
        }
    }
}

/// A parsed contract ABI. Immutable once parsed and cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Abi {
    functions: Vec<Arc<FunctionMetadata>>,
    function_index: HashMap<String, usize>,
    events: Vec<Arc<EventMetadata>>,
    event_index: HashMap<String, usize>,
    fingerprint: B256,
}

impl Abi {
    /// Parses a JSON ABI: either the bare entry array or a compiler artifact with an `abi` field.
    ///
    /// Functions must have unique names; overloading by signature is rejected.
    pub fn from_json(json: &str) -> Result<Self, EncodingError> {
        let document: serde_json::Value =
            serde_json::from_str(json).map_err(|e| EncodingError::InvalidAbi(e.to_string()))?;
        let entries = match document {
            serde_json::Value::Object(mut artifact) => artifact
                .remove("abi")
                .ok_or_else(|| EncodingError::InvalidAbi("expected an array of entries".into()))?,
            entries => entries,
        };
        let entries: Vec<JsonEntry> =
            serde_json::from_value(entries).map_err(|e| EncodingError::InvalidAbi(e.to_string()))?;

        let mut abi = Self {
            functions: Vec::new(),
            function_index: HashMap::new(),
            events: Vec::new(),
            event_index: HashMap::new(),
            fingerprint: keccak256(json.as_bytes()),
        };

        for entry in &entries {
            match entry.kind.as_str() {
                "function" => abi.push_function(entry)?,
                "event" => abi.push_event(entry)?,
                "constructor" | "fallback" | "receive" | "error" => {
                    log::trace!("Skipping ABI entry of type `{}`", entry.kind)
                }
                other => {
                    return Err(EncodingError::InvalidAbi(format!(
                        "unknown entry type `{other}`"
                    )));
                }
            }
        }

        log::debug!(
            "Parsed ABI with {} functions and {} events",
            abi.functions.len(),
            abi.events.len()
        );
        Ok(abi)
    }

    fn push_function(&mut self, entry: &JsonEntry) -> Result<(), EncodingError> {
        if entry.name.is_empty() {
            return Err(EncodingError::InvalidAbi("function without a name".into()));
        }
        if self.function_index.contains_key(&entry.name) {
            return Err(EncodingError::DuplicateFunction(entry.name.clone()));
        }
        let params = |list: &[JsonParam]| {
            list.iter()
                .map(Param::from_json)
                .collect::<Result<Vec<_>, _>>()
        };
        let function = FunctionMetadata::new(
            entry.name.clone(),
            params(&entry.inputs)?,
            params(&entry.outputs)?,
            entry.state_mutability(),
        );
        self.function_index
            .insert(entry.name.clone(), self.functions.len());
        self.functions.push(Arc::new(function));
        Ok(())
    }

    fn push_event(&mut self, entry: &JsonEntry) -> Result<(), EncodingError> {
        if self.event_index.contains_key(&entry.name) {
            return Err(EncodingError::DuplicateEvent(entry.name.clone()));
        }
        let event = EventMetadata::from_json(&entry.name, &entry.inputs, entry.anonymous)?;
        self.event_index.insert(entry.name.clone(), self.events.len());
        self.events.push(Arc::new(event));
        Ok(())
    }

    /// Functions in declaration order.
    pub fn functions(&self) -> &[Arc<FunctionMetadata>] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&Arc<FunctionMetadata>> {
        self.function_index.get(name).map(|i| &self.functions[*i])
    }

    /// Events in declaration order.
    pub fn events(&self) -> &[Arc<EventMetadata>] {
        &self.events
    }

    pub fn event(&self, name: &str) -> Option<&Arc<EventMetadata>> {
        self.event_index.get(name).map(|i| &self.events[*i])
    }

    /// Hash of the JSON document this ABI was parsed from.
    pub fn fingerprint(&self) -> B256 {
        self.fingerprint
    }

    /// Encodes a call to `name`: returns `selector ++ encodedArgs` and a handle that
    /// decodes the function's declared outputs.
    pub fn encode_function(&self, name: &str, args: &[Arg]) -> Result<FunctionCall, EncodingError> {
        let function = self
            .function(name)
            .ok_or_else(|| EncodingError::UnknownFunction(name.to_string()))?;
        let encoded = function.encode_arguments(args)?;

        let mut data = Vec::with_capacity(4 + encoded.len());
        data.extend_from_slice(function.selector().as_slice());
        data.extend_from_slice(&encoded);
        log::debug!("Encoded call {}: {}", function.signature(), encode_hex(&data));

        Ok(FunctionCall {
            function: function.clone(),
            data: data.into(),
        })
    }

    /// Selector of a canonical function signature.
    pub fn function_selector(signature: &str) -> Selector {
        function_selector(signature)
    }

    /// Topic hash of a canonical event signature.
    pub fn event_topic(signature: &str) -> B256 {
        event_topic(signature)
    }
}

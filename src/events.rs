use alloy::primitives::{Address, B256};

use crate::abi::{Abi, event_topic};
use crate::decoder;
use crate::error::{DecodingError, EncodingError};
use crate::rpc::{LogEntry, LogFilter};
use crate::schema::{JsonParam, TypeSchema};
use crate::value::{AbiType, FromAbi};

/// A parameter of an event, with its `indexed` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub name: String,
    pub schema: TypeSchema,
    pub indexed: bool,
}

impl EventParam {
    /// Only value types are stored verbatim in a topic; everything else is stored as its hash.
    fn is_hashed_in_topic(&self) -> bool {
        matches!(
            self.schema,
            TypeSchema::String
                | TypeSchema::Bytes
                | TypeSchema::Array(_)
                | TypeSchema::FixedArray(..)
                | TypeSchema::Tuple(_)
        )
    }
}

/// Metadata of one contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    name: String,
    inputs: Vec<EventParam>,
    anonymous: bool,
    topic: B256,
}

impl EventMetadata {
    pub(crate) fn from_json(
        name: &str,
        inputs: &[JsonParam],
        anonymous: bool,
    ) -> Result<Self, EncodingError> {
        if name.is_empty() {
            return Err(EncodingError::InvalidAbi("event without a name".into()));
        }
        let inputs = inputs
            .iter()
            .map(|param| {
                Ok(EventParam {
                    name: param.name.clone(),
                    schema: TypeSchema::from_param(param)?,
                    indexed: param.indexed,
                })
            })
            .collect::<Result<Vec<_>, EncodingError>>()?;
        Ok(Self::new(name, inputs, anonymous))
    }

    pub fn new(name: impl Into<String>, inputs: Vec<EventParam>, anonymous: bool) -> Self {
        let name = name.into();
        let types: Vec<String> = inputs.iter().map(|p| p.schema.canonical()).collect();
        let topic = event_topic(&format!("{name}({})", types.join(",")));
        Self {
            name,
            inputs,
            anonymous,
            topic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[EventParam] {
        &self.inputs
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.schema.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// `topic0` of every non-anonymous log emitted for this event.
    pub fn topic(&self) -> B256 {
        self.topic
    }

    fn indexed_count(&self) -> usize {
        self.inputs.iter().filter(|p| p.indexed).count()
    }

    /// Whether `log` was emitted by this event: `topic0` matches and the indexed
    /// field count fits. Events sharing a signature with a different indexed layout
    /// (ERC-20 and ERC-721 `Transfer`) are told apart by the topic count.
    pub fn matches(&self, log: &LogEntry) -> bool {
        !self.anonymous
            && log.topics.first() == Some(&self.topic)
            && log.topics.len() == 1 + self.indexed_count()
    }

    /// Decodes one log into the event's fields, in declaration order.
    pub fn decode_log(&self, log: &LogEntry) -> Result<Vec<AbiType>, DecodingError> {
        if self.anonymous {
            return Err(DecodingError::AnonymousEvent(self.name.clone()));
        }
        if log.topics.first() != Some(&self.topic) {
            return Err(DecodingError::shape(
                format!("log of `{}`", self.signature()),
                log.topics
                    .first()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "log without topics".to_string()),
            ));
        }
        let expected = 1 + self.indexed_count();
        if log.topics.len() != expected {
            return Err(DecodingError::TopicCount {
                event: self.name.clone(),
                log_index: Some(log.log_index),
                expected,
                actual: log.topics.len(),
            });
        }

        let data_schemas: Vec<TypeSchema> = self
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.schema.clone())
            .collect();
        let mut data_values = decoder::decode(&log.data, &data_schemas)?.into_iter();
        let mut topics = log.topics[1..].iter();

        self.inputs
            .iter()
            .map(|param| {
                if param.indexed {
                    let topic = topics
                        .next()
                        .ok_or(DecodingError::MissingField("topics"))?;
                    if param.is_hashed_in_topic() {
                        AbiType::fixed_bytes(topic.to_vec())
                            .map_err(|_| DecodingError::shape("bytes32", topic))
                    } else {
                        decoder::decode_single(topic.as_slice(), &param.schema)
                    }
                } else {
                    data_values
                        .next()
                        .ok_or(DecodingError::MissingField("data"))
                }
            })
            .collect()
    }

    /// A log filter selecting this event on `address`.
    pub fn filter(&self, address: Address) -> LogFilter {
        LogFilter::new().address(address).topic0(self.topic)
    }
}

/// One decoded event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Event name.
    pub name: String,
    /// Field names and values, in declaration order.
    pub fields: Vec<(String, AbiType)>,
    /// Emitting contract.
    pub address: Address,
    /// Transaction that emitted the log.
    pub transaction_hash: B256,
    /// Position of the log in its block.
    pub log_index: u64,
    /// Block containing the log, if mined.
    pub block_number: Option<u64>,
    /// Whether the log was removed by a reorganisation.
    pub removed: bool,
}

impl EventRecord {
    /// Value of the field called `name`.
    pub fn field(&self, name: &str) -> Option<&AbiType> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Re-shapes all fields, as one tuple, into `T`.
    pub fn decode<T: FromAbi>(&self) -> Result<T, DecodingError> {
        T::from_abi(AbiType::tuple(self.fields.iter().map(|(_, v)| v.clone())))
    }
}

impl Abi {
    fn event_or_err(&self, name: &str) -> Result<&EventMetadata, DecodingError> {
        let event = self
            .event(name)
            .ok_or_else(|| DecodingError::UnknownEvent(name.to_string()))?;
        if event.is_anonymous() {
            return Err(DecodingError::AnonymousEvent(name.to_string()));
        }
        Ok(event)
    }

    /// Decodes every log of `logs` emitted by event `name` into an [`EventRecord`].
    /// Logs of other events are skipped.
    pub fn decode_event_records(
        &self,
        name: &str,
        logs: &[LogEntry],
    ) -> Result<Vec<EventRecord>, DecodingError> {
        let event = self.event_or_err(name)?;
        logs.iter()
            .filter(|log| {
                let matched = event.matches(log);
                if !matched && log.topics.first() == Some(&event.topic()) {
                    if let Err(err) = event.decode_log(log) {
                        log::debug!("Skipping log of tx {}: {err}", log.transaction_hash);
                    }
                }
                matched
            })
            .map(|log| {
                let values = event.decode_log(log)?;
                Ok(EventRecord {
                    name: event.name().to_string(),
                    fields: event
                        .inputs()
                        .iter()
                        .map(|p| p.name.clone())
                        .zip(values)
                        .collect(),
                    address: log.address,
                    transaction_hash: log.transaction_hash,
                    log_index: log.log_index,
                    block_number: log.block_number,
                    removed: log.removed,
                })
            })
            .collect()
    }

    /// Decodes every log of `logs` emitted by event `name` and re-shapes its fields into `T`.
    /// Returns an empty list when no log matches.
    pub fn decode_events<T: FromAbi>(
        &self,
        name: &str,
        logs: &[LogEntry],
    ) -> Result<Vec<T>, DecodingError> {
        let records = self.decode_event_records(name, logs)?;
        log::debug!(
            "Decoded {} `{name}` events out of {} logs",
            records.len(),
            logs.len()
        );
        records.iter().map(EventRecord::decode).collect()
    }
}

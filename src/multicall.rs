//! Batched reads through the Multicall3 contract.

use std::sync::LazyLock;

use alloy::primitives::{Address, Bytes, address};

use crate::abi::{Abi, FunctionCall, Selector, function_selector};
use crate::client::ReadClient;
use crate::decoder;
use crate::encoder;
use crate::error::{DecodingError, EncodingError, Error};
use crate::schema::TypeSchema;
use crate::utils::decode_hex;
use crate::value::{AbiArray, AbiType, FromAbi};

/// Multicall3 is deployed at the same address on most EVM chains.
pub const MULTICALL3_ADDRESS: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

const AGGREGATE3_SIGNATURE: &str = "aggregate3((address,bool,bytes)[])";

static AGGREGATE3_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| function_selector(AGGREGATE3_SIGNATURE));

/// One call of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call3 {
    pub target: Address,
    /// When `false`, a failing call reverts the whole batch.
    pub allow_failure: bool,
    pub call_data: Bytes,
}

impl Call3 {
    pub fn new(target: Address, call: &FunctionCall) -> Self {
        Self {
            target,
            allow_failure: true,
            call_data: call.data().clone(),
        }
    }

    pub fn allow_failure(mut self, allow: bool) -> Self {
        self.allow_failure = allow;
        self
    }
}

/// Outcome of one call of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticallResult {
    pub success: bool,
    pub return_data: Bytes,
}

impl MulticallResult {
    /// Decodes the return data with the outputs of the function `call` encoded.
    pub fn decode<T: FromAbi>(&self, call: &FunctionCall) -> Result<T, DecodingError> {
        if !self.success {
            return Err(DecodingError::shape(
                format!("successful `{}` result", call.function().name()),
                "failed call",
            ));
        }
        call.function().decode_output_as(&self.return_data)
    }
}

fn results_schema() -> TypeSchema {
    TypeSchema::Array(Box::new(TypeSchema::Tuple(vec![
        TypeSchema::Bool,
        TypeSchema::Bytes,
    ])))
}

/// Encodes calldata for `aggregate3((address,bool,bytes)[])`.
pub fn encode_aggregate3(calls: &[Call3]) -> Result<Bytes, EncodingError> {
    let element = TypeSchema::Tuple(vec![
        TypeSchema::Address,
        TypeSchema::Bool,
        TypeSchema::Bytes,
    ]);
    let values = calls.iter().map(|call| {
        AbiType::tuple([
            AbiType::Address(call.target),
            AbiType::Bool(call.allow_failure),
            AbiType::bytes(call.call_data.clone()),
        ])
    });
    let array = AbiArray::dynamic(element, values)?;
    let mut data = AGGREGATE3_SELECTOR.to_vec();
    data.extend(encoder::encode_single(&AbiType::Array(array)));
    Ok(data.into())
}

/// Decodes the hex result of an `aggregate3` call.
///
/// `None` and `""` are rejected as empty or null; `"0x"` is rejected as empty data.
pub fn decode_multicall_results<'a>(
    hex: impl Into<Option<&'a str>>,
) -> Result<Vec<MulticallResult>, DecodingError> {
    let hex = match hex.into() {
        Some(hex) if !hex.trim().is_empty() => hex.trim(),
        _ => return Err(DecodingError::EmptyOrNull),
    };
    let data = decode_hex(hex)?;
    if data.is_empty() {
        return Err(DecodingError::EmptyData("multicall result".into()));
    }

    let AbiType::Array(results) = decoder::decode_single(&data, &results_schema())? else {
        return Err(DecodingError::shape("(bool,bytes)[]", "non-array value"));
    };
    results
        .values()
        .iter()
        .cloned()
        .map(|entry| {
            let (success, return_data) = <(bool, Bytes)>::from_abi(entry)?;
            Ok(MulticallResult {
                success,
                return_data,
            })
        })
        .collect()
}

impl Abi {
    /// Decodes the hex result of a Multicall3 `aggregate3` call into `(success, returnData)` pairs.
    pub fn decode_multicall_results<'a>(
        hex: impl Into<Option<&'a str>>,
    ) -> Result<Vec<MulticallResult>, DecodingError> {
        decode_multicall_results(hex)
    }
}

/// Executes `calls` in one `eth_call` through Multicall3.
pub async fn aggregate3<C: ReadClient + ?Sized>(
    client: &C,
    calls: &[Call3],
) -> Result<Vec<MulticallResult>, Error> {
    let result = client
        .call(MULTICALL3_ADDRESS, encode_aggregate3(calls)?)
        .await?;
    let results = decode_multicall_results(result.as_str())?;
    log::debug!("Multicall of {} calls returned {} results", calls.len(), results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encode_hex;

    #[test]
    fn aggregate3_selector() {
        assert_eq!(AGGREGATE3_SELECTOR.to_string(), "0x82ad56cb");
    }

    #[test]
    fn empty_batch_encodes_selector_and_empty_array() {
        let data = encode_aggregate3(&[]).unwrap();
        assert_eq!(&data[..4], AGGREGATE3_SELECTOR.as_slice());
        // Offset word then a zero length word.
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(data[4 + 31], 0x20);
        assert!(data[4 + 32..].iter().all(|b| *b == 0));
    }

    #[test]
    fn empty_and_null_results() {
        assert_eq!(
            decode_multicall_results(None::<&str>).unwrap_err().to_string(),
            "Multicall result is empty or null"
        );
        assert_eq!(
            decode_multicall_results("").unwrap_err(),
            DecodingError::EmptyOrNull
        );
        assert!(
            decode_multicall_results("0x")
                .unwrap_err()
                .to_string()
                .contains("empty data")
        );
    }

    #[test]
    fn decodes_success_flags_and_payloads() {
        let encoded = encoder::encode_single(&AbiType::Array(
            AbiArray::dynamic(
                TypeSchema::Tuple(vec![TypeSchema::Bool, TypeSchema::Bytes]),
                [
                    AbiType::tuple([AbiType::Bool(true), AbiType::bytes(vec![1, 2, 3])]),
                    AbiType::tuple([AbiType::Bool(false), AbiType::bytes(Vec::new())]),
                ],
            )
            .unwrap(),
        ));
        let results = Abi::decode_multicall_results(encode_hex(&encoded).as_str()).unwrap();
        assert_eq!(
            results,
            vec![
                MulticallResult {
                    success: true,
                    return_data: Bytes::from(vec![1, 2, 3]),
                },
                MulticallResult {
                    success: false,
                    return_data: Bytes::new(),
                },
            ]
        );
    }
}

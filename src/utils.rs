use alloy::primitives::U256;
use bigdecimal::{BigDecimal, ToPrimitive};
use std::str::FromStr;

use crate::error::{DecodingError, EncodingError};

const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Decodes a hex string with or without the `0x` prefix.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, DecodingError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    hex::decode(digits).map_err(|e| DecodingError::InvalidHex(e.to_string()))
}

/// Encodes bytes as a `0x`-prefixed lowercase hex string.
pub fn encode_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Converts an ETH amount to wei, e.g. for the value of a payable call.
/// Fails when the amount is negative, fractional below one wei, or too large.
pub fn eth_to_wei(eth: BigDecimal) -> Result<U256, EncodingError> {
    let wei = &eth * BigDecimal::from(WEI_PER_ETH);
    if !wei.is_integer() {
        return Err(EncodingError::OutOfRange {
            type_name: "wei".into(),
            value: eth.to_string(),
        });
    }
    wei.to_u128()
        .map(U256::from)
        .ok_or_else(|| EncodingError::OutOfRange {
            type_name: "wei".into(),
            value: eth.to_string(),
        })
}

/// Converts a wei amount to ETH, for display.
pub fn wei_to_eth(wei: U256) -> BigDecimal {
    // U256's decimal rendering is always a valid BigDecimal literal.
    BigDecimal::from_str(&wei.to_string()).unwrap_or_default() / BigDecimal::from(WEI_PER_ETH)
}

//! Head/tail ABI encoder.
//!
//! A sequence of values is laid out as a head region, holding static values inline and
//! a 32-byte offset for every dynamic value, followed by a tail region holding the
//! dynamic contents. Offsets are relative to the start of the enclosing sequence, so
//! nested tuples and arrays repeat the same layout inside their own region.

use alloy::primitives::U256;

use crate::schema::WORD_SIZE;
use crate::value::AbiType;

/// Encodes an ordered list of top-level values (function arguments, return values).
pub fn encode(values: &[AbiType]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_sequence(values, &mut out);
    out
}

/// Encodes a single value as if it were the only element of a sequence.
pub fn encode_single(value: &AbiType) -> Vec<u8> {
    encode(std::slice::from_ref(value))
}

fn encode_sequence(values: &[AbiType], out: &mut Vec<u8>) {
    let head_size: usize = values.iter().map(AbiType::byte_size).sum();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for value in values {
        if value.is_dynamic() {
            head.extend_from_slice(&usize_word(head_size + tail.len()));
            encode_content(value, &mut tail);
        } else {
            encode_content(value, &mut head);
        }
    }

    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
}

/// Writes the content of `value`: inline words for static values, the full
/// length-prefixed or nested layout for dynamic ones.
fn encode_content(value: &AbiType, out: &mut Vec<u8>) {
    match value {
        AbiType::UInt(v) => out.extend_from_slice(&v.value().to_be_bytes::<WORD_SIZE>()),
        AbiType::Int(v) => out.extend_from_slice(&v.value().into_raw().to_be_bytes::<WORD_SIZE>()),
        AbiType::Address(address) => {
            let mut word = [0u8; WORD_SIZE];
            word[WORD_SIZE - 20..].copy_from_slice(address.as_slice());
            out.extend_from_slice(&word);
        }
        AbiType::Bool(b) => out.extend_from_slice(&usize_word(*b as usize)),
        AbiType::String(s) => encode_packed_dynamic(s.as_bytes(), out),
        AbiType::Bytes(bytes) if bytes.is_dynamic() => encode_packed_dynamic(bytes.data(), out),
        AbiType::Bytes(bytes) => out.extend_from_slice(&right_pad(bytes.data())),
        AbiType::Array(array) => {
            if array.is_dynamic_length() {
                out.extend_from_slice(&usize_word(array.len()));
            }
            encode_sequence(array.values(), out);
        }
        AbiType::Tuple(tuple) => encode_sequence(tuple.components(), out),
    }
}

/// Length word followed by the content, right-padded to a word boundary.
fn encode_packed_dynamic(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&usize_word(data.len()));
    out.extend_from_slice(&right_pad(data));
}

fn right_pad(data: &[u8]) -> Vec<u8> {
    let mut padded = data.to_vec();
    padded.resize(padded_len(data.len()), 0);
    padded
}

/// Smallest multiple of the word size that holds `len` bytes.
pub(crate) fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD_SIZE) * WORD_SIZE
}

pub(crate) fn usize_word(value: usize) -> [u8; WORD_SIZE] {
    U256::from(value).to_be_bytes::<WORD_SIZE>()
}

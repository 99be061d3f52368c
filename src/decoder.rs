//! Bounds-checked ABI decoder, the mirror image of [`crate::encoder`].

use std::cell::Cell;

use alloy::primitives::{Address, I256, U256};

use crate::error::DecodingError;
use crate::schema::{TypeSchema, WORD_SIZE};
use crate::value::{AbiArray, AbiType};

/// Upper bound on decoded values per 32-byte word of input. Offsets may alias, so
/// without a bound a small buffer can expand into an arbitrarily large value tree.
const MAX_VALUES_PER_WORD: usize = 64;

/// Decodes `data` as a sequence of values with the given schemas.
pub fn decode(data: &[u8], schemas: &[TypeSchema]) -> Result<Vec<AbiType>, DecodingError> {
    Decoder::new(data).sequence(0, schemas.iter())
}

/// Decodes a single value laid out as the only element of a sequence.
pub fn decode_single(data: &[u8], schema: &TypeSchema) -> Result<AbiType, DecodingError> {
    let mut values = decode(data, std::slice::from_ref(schema))?;
    values
        .pop()
        .ok_or_else(|| DecodingError::EmptyData(schema.canonical()))
}

struct Decoder<'a> {
    data: &'a [u8],
    budget: Cell<usize>,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        let words = data.len() / WORD_SIZE + 1;
        Self {
            data,
            budget: Cell::new(words.saturating_mul(MAX_VALUES_PER_WORD)),
        }
    }

    /// Accounts for `count` values about to be decoded at `position`.
    fn charge(&self, position: usize, count: usize) -> Result<(), DecodingError> {
        let left = self
            .budget
            .get()
            .checked_sub(count)
            .ok_or(DecodingError::ExcessiveOutput {
                position,
                input: self.data.len(),
            })?;
        self.budget.set(left);
        Ok(())
    }

    fn slice(&self, position: usize, len: usize) -> Result<&[u8], DecodingError> {
        let available = self.data.len().saturating_sub(position);
        position
            .checked_add(len)
            .and_then(|end| self.data.get(position..end))
            .ok_or(DecodingError::Truncated {
                position,
                needed: len,
                available,
            })
    }

    fn word(&self, position: usize) -> Result<[u8; WORD_SIZE], DecodingError> {
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(self.slice(position, WORD_SIZE)?);
        Ok(word)
    }

    fn u256(&self, position: usize) -> Result<U256, DecodingError> {
        Ok(U256::from_be_bytes(self.word(position)?))
    }

    /// Reads an offset word and resolves it against `base`. The target must lie inside the buffer.
    fn offset(&self, position: usize, base: usize) -> Result<usize, DecodingError> {
        let raw = self.u256(position)?;
        usize::try_from(raw)
            .ok()
            .and_then(|offset| base.checked_add(offset))
            .filter(|target| *target <= self.data.len())
            .ok_or_else(|| DecodingError::InvalidOffset {
                position,
                offset: raw.to_string(),
            })
    }

    /// Reads a length word. `unit` is the minimum number of bytes each counted item
    /// needs after the length word, so absurd lengths are rejected before allocating.
    fn length(&self, position: usize, unit: usize) -> Result<usize, DecodingError> {
        let raw = self.u256(position)?;
        let remaining = self.data.len().saturating_sub(position + WORD_SIZE);
        usize::try_from(raw)
            .ok()
            .filter(|len| len.checked_mul(unit).is_some_and(|size| size <= remaining))
            .ok_or_else(|| DecodingError::InvalidLength {
                position,
                length: raw.to_string(),
            })
    }

    fn sequence<'s>(
        &self,
        base: usize,
        schemas: impl ExactSizeIterator<Item = &'s TypeSchema>,
    ) -> Result<Vec<AbiType>, DecodingError> {
        self.charge(base, schemas.len())?;
        let mut cursor = base;
        let mut values = Vec::with_capacity(schemas.len());
        for schema in schemas {
            let value = if schema.is_dynamic() {
                let start = self.offset(cursor, base)?;
                self.dynamic(start, schema)?
            } else {
                self.fixed(cursor, schema)?
            };
            cursor = cursor.saturating_add(schema.head_size());
            values.push(value);
        }
        Ok(values)
    }

    /// Decodes a static value stored inline at `position`.
    fn fixed(&self, position: usize, schema: &TypeSchema) -> Result<AbiType, DecodingError> {
        let invalid = || DecodingError::InvalidValue {
            position,
            type_name: schema.canonical(),
        };
        match schema {
            TypeSchema::Uint(bits) => {
                AbiType::uint(*bits, self.u256(position)?).map_err(|_| invalid())
            }
            TypeSchema::Int(bits) => {
                AbiType::int(*bits, I256::from_raw(self.u256(position)?)).map_err(|_| invalid())
            }
            TypeSchema::Address => {
                let word = self.word(position)?;
                if word[..WORD_SIZE - 20].iter().any(|b| *b != 0) {
                    return Err(invalid());
                }
                Ok(AbiType::Address(Address::from_slice(&word[WORD_SIZE - 20..])))
            }
            TypeSchema::Bool => match self.u256(position)? {
                v if v == U256::ZERO => Ok(AbiType::Bool(false)),
                v if v == U256::from(1u8) => Ok(AbiType::Bool(true)),
                _ => Err(invalid()),
            },
            TypeSchema::FixedBytes(len) => {
                let word = self.word(position)?;
                AbiType::fixed_bytes(word[..*len as usize].to_vec()).map_err(|_| invalid())
            }
            TypeSchema::FixedArray(element, len) => {
                let head = element.head_size().saturating_mul(*len);
                self.slice(position, head)?;
                let values = self.sequence(position, std::iter::repeat_n(&**element, *len))?;
                AbiArray::fixed((**element).clone(), values)
                    .map(AbiType::Array)
                    .map_err(|_| invalid())
            }
            TypeSchema::Tuple(components) => {
                self.sequence(position, components.iter()).map(AbiType::tuple)
            }
            TypeSchema::String | TypeSchema::Bytes | TypeSchema::Array(_) => Err(invalid()),
        }
    }

    /// Decodes a dynamic value whose content starts at `start`.
    fn dynamic(&self, start: usize, schema: &TypeSchema) -> Result<AbiType, DecodingError> {
        match schema {
            TypeSchema::String => {
                let content = self.packed(start)?;
                String::from_utf8(content.to_vec())
                    .map(AbiType::String)
                    .map_err(|_| DecodingError::InvalidUtf8 {
                        position: start + WORD_SIZE,
                    })
            }
            TypeSchema::Bytes => Ok(AbiType::bytes(self.packed(start)?.to_vec())),
            TypeSchema::Array(element) => {
                let len = self.length(start, element.head_size().max(1))?;
                let values =
                    self.sequence(start + WORD_SIZE, std::iter::repeat_n(&**element, len))?;
                AbiArray::dynamic((**element).clone(), values)
                    .map(AbiType::Array)
                    .map_err(|_| DecodingError::InvalidValue {
                        position: start,
                        type_name: schema.canonical(),
                    })
            }
            // Static-length containers with dynamic members: inline layout, rebased at `start`.
            _ => self.fixed(start, schema),
        }
    }

    /// Length-prefixed content of a string or `bytes` value.
    /// Trailing padding of the last value is not required to be present.
    fn packed(&self, start: usize) -> Result<&[u8], DecodingError> {
        let len = self.length(start, 1)?;
        self.slice(start + WORD_SIZE, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;

    #[test]
    fn rejects_truncated_buffer_with_position() {
        let err = decode(&[0u8; 31], &[TypeSchema::Uint(256)]).unwrap_err();
        assert_eq!(
            err,
            DecodingError::Truncated {
                position: 0,
                needed: 32,
                available: 31
            }
        );
    }

    #[test]
    fn rejects_offset_outside_buffer() {
        let mut data = vec![0u8; 32];
        data[31] = 0x80;
        let err = decode(&data, &[TypeSchema::String]).unwrap_err();
        assert!(matches!(err, DecodingError::InvalidOffset { position: 0, .. }));
    }

    #[test]
    fn rejects_length_larger_than_buffer() {
        let mut data = encode(&[AbiType::string("abc")]);
        data[63] = 0xff;
        let err = decode(&data, &[TypeSchema::String]).unwrap_err();
        assert!(matches!(err, DecodingError::InvalidLength { position: 32, .. }));
    }

    #[test]
    fn rejects_non_canonical_bool_and_address() {
        let mut data = vec![0u8; 32];
        data[31] = 2;
        assert!(matches!(
            decode(&data, &[TypeSchema::Bool]),
            Err(DecodingError::InvalidValue { position: 0, .. })
        ));

        let mut data = vec![0u8; 32];
        data[0] = 1;
        assert!(decode(&data, &[TypeSchema::Address]).is_err());
    }

    #[test]
    fn rejects_integer_wider_than_declared() {
        let mut data = vec![0u8; 32];
        data[30] = 1;
        assert!(decode(&data, &[TypeSchema::Uint(8)]).is_err());
        assert!(decode(&data, &[TypeSchema::Uint(16)]).is_ok());
    }

    #[test]
    fn huge_fixed_array_is_truncated_not_allocated() {
        let schema = TypeSchema::parse("uint256[100000000000000]").unwrap();
        assert!(matches!(
            decode(&[0u8; 32], &[schema]),
            Err(DecodingError::Truncated { position: 0, .. })
        ));

        let nested = TypeSchema::parse("uint256[4294967296][4294967296]").unwrap();
        assert!(matches!(
            decode(&[0u8; 32], &[nested]),
            Err(DecodingError::Truncated { .. })
        ));
    }

    #[test]
    fn huge_array_of_empty_elements_exceeds_budget() {
        let schema = TypeSchema::parse("uint256[0][100000000000000]").unwrap();
        assert!(matches!(
            decode(&[], &[schema]),
            Err(DecodingError::ExcessiveOutput { .. })
        ));
        let small = TypeSchema::parse("uint256[0][3]").unwrap();
        assert_eq!(decode(&[], &[small]).unwrap().len(), 1);
    }

    /// Builds `uint256[][][]` of width `n` where every level's elements share one child.
    fn aliased_nested_arrays(n: usize) -> Vec<u8> {
        let word = |v: usize| U256::from(v).to_be_bytes::<32>();
        let mut data = Vec::new();
        // Top-level offset to the outer array.
        data.extend(word(32));
        // Outer array: length, then n offsets (relative to its elements) all pointing
        // right past them, where the middle array starts.
        data.extend(word(n));
        for _ in 0..n {
            data.extend(word(n * 32));
        }
        // Middle array, same shape, pointing at the inner array.
        data.extend(word(n));
        for _ in 0..n {
            data.extend(word(n * 32));
        }
        // Inner array of n words.
        data.extend(word(n));
        for i in 0..n {
            data.extend(word(i));
        }
        data
    }

    #[test]
    fn aliased_offsets_cannot_amplify_output() {
        let schema = TypeSchema::parse("uint256[][][]").unwrap();

        let small = aliased_nested_arrays(3);
        let values = decode(&small, std::slice::from_ref(&schema)).unwrap();
        let AbiType::Array(outer) = &values[0] else {
            panic!("expected array");
        };
        assert_eq!(outer.values().len(), 3);

        let large = aliased_nested_arrays(100);
        assert!(matches!(
            decode(&large, &[schema]),
            Err(DecodingError::ExcessiveOutput { .. })
        ));
    }

    #[test]
    fn huge_array_length_fails_before_allocating() {
        let mut data = vec![0u8; 64];
        data[31] = 0x20;
        data[32..64].copy_from_slice(&[0xff; 32]);
        let schema = TypeSchema::Array(Box::new(TypeSchema::Uint(256)));
        assert!(matches!(
            decode(&data, &[schema]),
            Err(DecodingError::InvalidLength { .. })
        ));
    }
}

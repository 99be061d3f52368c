use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::EncodingError;

/// Size of one ABI word in bytes.
pub const WORD_SIZE: usize = 32;

/// Shape of an ABI value, as described by a Solidity type string.
/// Carries no values; it tells the decoder what to expect and the encoder what to coerce into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSchema {
    /// `uintN`, N in 8..=256 step 8.
    Uint(u16),
    /// `intN`, N in 8..=256 step 8.
    Int(u16),
    /// `address`
    Address,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytesN`, N in 1..=32.
    FixedBytes(u8),
    /// `bytes`
    Bytes,
    /// `T[]`
    Array(Box<TypeSchema>),
    /// `T[N]`
    FixedArray(Box<TypeSchema>, usize),
    /// `(T1,T2,...)`
    Tuple(Vec<TypeSchema>),
}

/// A parameter entry of a JSON ABI document (`inputs`, `outputs`, event fields).
#[derive(Debug, Clone, Deserialize)]
pub struct JsonParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub components: Vec<JsonParam>,
    #[serde(default)]
    pub indexed: bool,
}

impl TypeSchema {
    /// Parses a canonical or aliased Solidity type string such as `uint256`,
    /// `(address,bytes)[]` or `tuple(uint8,string)[2]`.
    pub fn parse(input: &str) -> Result<Self, EncodingError> {
        let invalid = || EncodingError::InvalidType(input.to_string());
        let ty = input.trim();
        if ty.is_empty() {
            return Err(invalid());
        }

        if let Some(stripped) = ty.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(invalid)?;
            let element = Self::parse(&stripped[..open])?;
            let size = &stripped[open + 1..];
            return if size.is_empty() {
                Ok(Self::Array(Box::new(element)))
            } else {
                let len = size.parse::<usize>().map_err(|_| invalid())?;
                Ok(Self::FixedArray(Box::new(element), len))
            };
        }

        let tuple_body = ty
            .strip_prefix("tuple")
            .unwrap_or(ty)
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'));
        if let Some(body) = tuple_body {
            return split_components(body)
                .ok_or_else(invalid)?
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Tuple);
        }

        Self::parse_elementary(ty).ok_or_else(invalid)
    }

    fn parse_elementary(ty: &str) -> Option<Self> {
        let width = |digits: &str, default: u16| -> Option<u16> {
            if digits.is_empty() {
                return Some(default);
            }
            let bits = digits.parse::<u16>().ok()?;
            (bits >= 8 && bits <= 256 && bits % 8 == 0).then_some(bits)
        };

        match ty {
            "address" => Some(Self::Address),
            "bool" => Some(Self::Bool),
            "string" => Some(Self::String),
            "bytes" => Some(Self::Bytes),
            "byte" => Some(Self::FixedBytes(1)),
            _ => {
                if let Some(digits) = ty.strip_prefix("uint") {
                    width(digits, 256).map(Self::Uint)
                } else if let Some(digits) = ty.strip_prefix("int") {
                    width(digits, 256).map(Self::Int)
                } else if let Some(digits) = ty.strip_prefix("bytes") {
                    let len = digits.parse::<u8>().ok()?;
                    (1..=32).contains(&len).then_some(Self::FixedBytes(len))
                } else {
                    None
                }
            }
        }
    }

    /// Builds a schema from a JSON ABI parameter, expanding `tuple` entries from `components`.
    pub fn from_param(param: &JsonParam) -> Result<Self, EncodingError> {
        let Some(suffix) = param.ty.strip_prefix("tuple") else {
            return Self::parse(&param.ty);
        };

        let components = param
            .components
            .iter()
            .map(Self::from_param)
            .collect::<Result<Vec<_>, _>>()?;
        let mut schema = Self::Tuple(components);

        // Array suffixes apply left to right: `tuple[2][]` is a dynamic array of `tuple[2]`.
        let mut rest = suffix;
        while !rest.is_empty() {
            let invalid = || EncodingError::InvalidType(param.ty.clone());
            let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
            let close = inner.find(']').ok_or_else(invalid)?;
            let size = &inner[..close];
            schema = if size.is_empty() {
                Self::Array(Box::new(schema))
            } else {
                let len = size.parse::<usize>().map_err(|_| invalid())?;
                Self::FixedArray(Box::new(schema), len)
            };
            rest = &inner[close + 1..];
        }
        Ok(schema)
    }

    /// Whether values of this type live in the tail region.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::String | Self::Bytes | Self::Array(_) => true,
            Self::FixedArray(element, len) => *len > 0 && element.is_dynamic(),
            Self::Tuple(components) => components.iter().any(Self::is_dynamic),
            _ => false,
        }
    }

    /// Number of bytes a value of this type occupies in the head region.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD_SIZE;
        }
        match self {
            // Saturates: a declared size beyond the address space can never fit a buffer.
            Self::FixedArray(element, len) => element.head_size().saturating_mul(*len),
            Self::Tuple(components) => components
                .iter()
                .map(Self::head_size)
                .fold(0, usize::saturating_add),
            _ => WORD_SIZE,
        }
    }

    /// Canonical Solidity type string, as used for selector and topic hashing.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::String => f.write_str("string"),
            Self::FixedBytes(len) => write!(f, "bytes{len}"),
            Self::Bytes => f.write_str("bytes"),
            Self::Array(element) => write!(f, "{element}[]"),
            Self::FixedArray(element, len) => write!(f, "{element}[{len}]"),
            Self::Tuple(components) => {
                f.write_str("(")?;
                for (i, component) in components.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{component}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for TypeSchema {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Splits a comma separated component list at nesting depth zero.
/// Returns `None` on unbalanced parentheses or brackets.
fn split_components(body: &str) -> Option<Vec<&str>> {
    if body.trim().is_empty() {
        return Some(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&body[start..]);
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_elementary_types_and_aliases() {
        assert_eq!(TypeSchema::parse("uint").unwrap(), TypeSchema::Uint(256));
        assert_eq!(TypeSchema::parse("int8").unwrap(), TypeSchema::Int(8));
        assert_eq!(TypeSchema::parse("bytes32").unwrap(), TypeSchema::FixedBytes(32));
        assert_eq!(TypeSchema::parse("byte").unwrap(), TypeSchema::FixedBytes(1));
        assert!(TypeSchema::parse("uint7").is_err());
        assert!(TypeSchema::parse("uint264").is_err());
        assert!(TypeSchema::parse("bytes33").is_err());
        assert!(TypeSchema::parse("fixed128x18").is_err());
    }

    #[test]
    fn parses_nested_arrays_and_tuples() {
        let schema = TypeSchema::parse("(uint256,(address,string)[])[2]").unwrap();
        assert_eq!(schema.canonical(), "(uint256,(address,string)[])[2]");
        assert!(schema.is_dynamic());
        assert_eq!(schema.head_size(), WORD_SIZE);

        let schema = TypeSchema::parse("tuple(bool,bytes4)[3]").unwrap();
        assert!(!schema.is_dynamic());
        assert_eq!(schema.head_size(), 6 * WORD_SIZE);
        assert!(TypeSchema::parse("(uint256,address").is_err());
    }

    #[test]
    fn expands_json_tuple_components() {
        let param: JsonParam = serde_json::from_str(
            r#"{"name":"orders","type":"tuple[][2]","components":[
                {"name":"maker","type":"address"},
                {"name":"amounts","type":"uint128[]"}
            ]}"#,
        )
        .unwrap();
        let schema = TypeSchema::from_param(&param).unwrap();
        assert_eq!(schema.canonical(), "(address,uint128[])[][2]");
    }

    #[test]
    fn empty_static_array_is_not_dynamic() {
        let schema = TypeSchema::parse("string[0]").unwrap();
        assert!(!schema.is_dynamic());
        assert_eq!(schema.head_size(), 0);
    }
}

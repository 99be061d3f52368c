//! Typed in-memory representation of ABI values.
//!
//! [`AbiType`] is the closed set of value variants the encoder and decoder work on.
//! Numeric and container payloads are validated when they are constructed, so every
//! `AbiType` that exists is encodable. Callers usually do not build `AbiType` directly:
//! they pass [`Arg`] values, which are coerced against the declared ABI type, and read
//! results back through [`FromAbi`].

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, FixedBytes, I256, U256};

use crate::error::{DecodingError, EncodingError};
use crate::schema::{TypeSchema, WORD_SIZE};

/// An unsigned integer of a declared bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uint {
    bits: u16,
    value: U256,
}

impl Uint {
    /// Creates a `uint<bits>` value, failing if `value >= 2^bits`.
    pub fn new(bits: u16, value: U256) -> Result<Self, EncodingError> {
        check_width(bits, "uint")?;
        if bits < 256 && value >= (U256::from(1u8) << bits as usize) {
            return Err(EncodingError::OutOfRange {
                type_name: format!("uint{bits}"),
                value: value.to_string(),
            });
        }
        Ok(Self { bits, value })
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn value(&self) -> U256 {
        self.value
    }
}

/// A signed integer of a declared bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Int {
    bits: u16,
    value: I256,
}

impl Int {
    /// Creates an `int<bits>` value, failing unless `-2^(bits-1) <= value < 2^(bits-1)`.
    pub fn new(bits: u16, value: I256) -> Result<Self, EncodingError> {
        check_width(bits, "int")?;
        if bits < 256 {
            let bound = I256::from_raw(U256::from(1u8) << (bits - 1) as usize);
            if value >= bound || value < -bound {
                return Err(EncodingError::OutOfRange {
                    type_name: format!("int{bits}"),
                    value: value.to_string(),
                });
            }
        }
        Ok(Self { bits, value })
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn value(&self) -> I256 {
        self.value
    }
}

fn check_width(bits: u16, prefix: &str) -> Result<(), EncodingError> {
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(EncodingError::InvalidType(format!("{prefix}{bits}")));
    }
    Ok(())
}

/// Fixed-size (`bytesN`) or dynamic (`bytes`) byte content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbiBytes {
    data: Bytes,
    dynamic: bool,
}

impl AbiBytes {
    /// `bytesN` with N = `data.len()`, which must be in 1..=32.
    pub fn fixed(data: impl Into<Bytes>) -> Result<Self, EncodingError> {
        let data = data.into();
        if data.is_empty() || data.len() > WORD_SIZE {
            return Err(EncodingError::InvalidType(format!("bytes{}", data.len())));
        }
        Ok(Self {
            data,
            dynamic: false,
        })
    }

    /// `bytes` of any length.
    pub fn dynamic(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            dynamic: true,
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// A homogeneous array, static (`T[N]`) or dynamic (`T[]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbiArray {
    values: Arc<[AbiType]>,
    element: TypeSchema,
    dynamic: bool,
}

impl AbiArray {
    /// A dynamic `T[]` array. Every element must have the schema `element`.
    pub fn dynamic(
        element: TypeSchema,
        values: impl IntoIterator<Item = AbiType>,
    ) -> Result<Self, EncodingError> {
        Self::new(element, values, true)
    }

    /// A static `T[N]` array where N is the number of values.
    pub fn fixed(
        element: TypeSchema,
        values: impl IntoIterator<Item = AbiType>,
    ) -> Result<Self, EncodingError> {
        Self::new(element, values, false)
    }

    fn new(
        element: TypeSchema,
        values: impl IntoIterator<Item = AbiType>,
        dynamic: bool,
    ) -> Result<Self, EncodingError> {
        let values: Arc<[AbiType]> = values.into_iter().collect();
        if let Some(bad) = values.iter().find(|v| v.schema() != element) {
            return Err(EncodingError::ElementMismatch {
                expected: element.canonical(),
                found: bad.type_name(),
            });
        }
        Ok(Self {
            values,
            element,
            dynamic,
        })
    }

    pub fn values(&self) -> &[AbiType] {
        &self.values
    }

    pub fn element_type(&self) -> &TypeSchema {
        &self.element
    }

    /// Canonical name of the element type.
    pub fn element_type_name(&self) -> String {
        self.element.canonical()
    }

    /// Whether this is a `T[]` array (as opposed to `T[N]`).
    pub fn is_dynamic_length(&self) -> bool {
        self.dynamic
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered heterogeneous list of components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbiTuple {
    components: Arc<[AbiType]>,
}

impl AbiTuple {
    pub fn new(components: impl IntoIterator<Item = AbiType>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    pub fn components(&self) -> &[AbiType] {
        &self.components
    }
}

/// A typed ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    UInt(Uint),
    Int(Int),
    Address(Address),
    Bool(bool),
    String(String),
    Bytes(AbiBytes),
    Array(AbiArray),
    Tuple(AbiTuple),
}

impl AbiType {
    pub fn uint(bits: u16, value: impl Into<U256>) -> Result<Self, EncodingError> {
        Uint::new(bits, value.into()).map(Self::UInt)
    }

    pub fn int(bits: u16, value: impl Into<I256>) -> Result<Self, EncodingError> {
        Int::new(bits, value.into()).map(Self::Int)
    }

    /// Shorthand for a `uint256`, which cannot be out of range.
    pub fn uint256(value: impl Into<U256>) -> Self {
        Self::UInt(Uint {
            bits: 256,
            value: value.into(),
        })
    }

    /// Shorthand for an `int256`, which cannot be out of range.
    pub fn int256(value: impl Into<I256>) -> Self {
        Self::Int(Int {
            bits: 256,
            value: value.into(),
        })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::Bytes(AbiBytes::dynamic(data))
    }

    pub fn fixed_bytes(data: impl Into<Bytes>) -> Result<Self, EncodingError> {
        AbiBytes::fixed(data).map(Self::Bytes)
    }

    pub fn tuple(components: impl IntoIterator<Item = AbiType>) -> Self {
        Self::Tuple(AbiTuple::new(components))
    }

    /// Number of bytes this value occupies in the head region of its enclosing sequence.
    pub fn byte_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD_SIZE;
        }
        match self {
            Self::Array(array) => array.values().iter().map(Self::byte_size).sum(),
            Self::Tuple(tuple) => tuple.components().iter().map(Self::byte_size).sum(),
            _ => WORD_SIZE,
        }
    }

    /// Whether the content lives in the tail region.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::String(_) => true,
            Self::Bytes(bytes) => bytes.is_dynamic(),
            Self::Array(array) => {
                array.is_dynamic_length() || (!array.is_empty() && array.element.is_dynamic())
            }
            Self::Tuple(tuple) => tuple.components().iter().any(Self::is_dynamic),
            _ => false,
        }
    }

    /// Canonical Solidity type string.
    pub fn type_name(&self) -> String {
        self.schema().canonical()
    }

    /// The schema a decoder needs to read this value back.
    pub fn schema(&self) -> TypeSchema {
        match self {
            Self::UInt(v) => TypeSchema::Uint(v.bits),
            Self::Int(v) => TypeSchema::Int(v.bits),
            Self::Address(_) => TypeSchema::Address,
            Self::Bool(_) => TypeSchema::Bool,
            Self::String(_) => TypeSchema::String,
            Self::Bytes(b) if b.dynamic => TypeSchema::Bytes,
            Self::Bytes(b) => TypeSchema::FixedBytes(b.data.len() as u8),
            Self::Array(a) if a.dynamic => TypeSchema::Array(Box::new(a.element.clone())),
            Self::Array(a) => TypeSchema::FixedArray(Box::new(a.element.clone()), a.len()),
            Self::Tuple(t) => TypeSchema::Tuple(t.components().iter().map(Self::schema).collect()),
        }
    }

    /// Length in bytes of string or `bytes` content, `None` for other variants.
    pub fn content_size(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.len()),
            Self::Bytes(b) => Some(b.data.len()),
            _ => None,
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{}", v.value),
            Self::Int(v) => write!(f, "{}", v.value),
            Self::Address(a) => write!(f, "{a}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "{}", b.data),
            Self::Array(a) => write_list(f, "[", a.values(), "]"),
            Self::Tuple(t) => write_list(f, "(", t.components(), ")"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, open: &str, items: &[AbiType], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

/// A caller-supplied argument, not yet bound to a concrete ABI type.
///
/// Arguments are coerced against the declared input type of a function when it is
/// encoded, so `Arg::from(5u64)` can fill a `uint8`, an `int64` or a `uint256` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Uint(U256),
    Int(I256),
    Address(Address),
    Bool(bool),
    String(String),
    Bytes(Bytes),
    List(Vec<Arg>),
    Tuple(Vec<Arg>),
    /// An already typed value, which must match the declared type exactly.
    Value(AbiType),
}

impl Arg {
    pub fn list(items: impl IntoIterator<Item = impl Into<Arg>>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = impl Into<Arg>>) -> Self {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    fn kind(&self) -> String {
        match self {
            Self::Uint(v) => format!("unsigned integer {v}"),
            Self::Int(v) => format!("signed integer {v}"),
            Self::Address(_) => "address".to_string(),
            Self::Bool(_) => "bool".to_string(),
            Self::String(_) => "string".to_string(),
            Self::Bytes(b) => format!("{} bytes", b.len()),
            Self::List(items) => format!("list of {} items", items.len()),
            Self::Tuple(items) => format!("tuple of {} items", items.len()),
            Self::Value(v) => v.type_name(),
        }
    }

    /// Converts this argument into a value of the given ABI type.
    pub fn coerce(&self, schema: &TypeSchema) -> Result<AbiType, EncodingError> {
        let mismatch = || EncodingError::mismatch(schema, self.kind());
        match (schema, self) {
            (TypeSchema::Uint(bits), Self::Uint(v)) => AbiType::uint(*bits, *v),
            (TypeSchema::Uint(bits), Self::Int(v)) => {
                if v.is_negative() {
                    return Err(EncodingError::OutOfRange {
                        type_name: schema.canonical(),
                        value: v.to_string(),
                    });
                }
                AbiType::uint(*bits, v.into_raw())
            }
            (TypeSchema::Int(bits), Self::Int(v)) => AbiType::int(*bits, *v),
            (TypeSchema::Int(bits), Self::Uint(v)) => {
                let value = I256::try_from(*v).map_err(|_| EncodingError::OutOfRange {
                    type_name: schema.canonical(),
                    value: v.to_string(),
                })?;
                AbiType::int(*bits, value)
            }
            (TypeSchema::Address, Self::Address(a)) => Ok(AbiType::Address(*a)),
            (TypeSchema::Bool, Self::Bool(b)) => Ok(AbiType::Bool(*b)),
            (TypeSchema::String, Self::String(s)) => Ok(AbiType::String(s.clone())),
            (TypeSchema::Bytes, Self::Bytes(b)) => Ok(AbiType::bytes(b.clone())),
            (TypeSchema::FixedBytes(len), Self::Bytes(b)) => {
                if b.len() != *len as usize {
                    return Err(EncodingError::LengthMismatch {
                        type_name: schema.canonical(),
                        expected: *len as usize,
                        actual: b.len(),
                    });
                }
                AbiType::fixed_bytes(b.clone())
            }
            (TypeSchema::Array(element), Self::List(items)) => {
                let values = coerce_all(element, items)?;
                AbiArray::dynamic((**element).clone(), values).map(AbiType::Array)
            }
            (TypeSchema::FixedArray(element, len), Self::List(items)) => {
                if items.len() != *len {
                    return Err(EncodingError::LengthMismatch {
                        type_name: schema.canonical(),
                        expected: *len,
                        actual: items.len(),
                    });
                }
                let values = coerce_all(element, items)?;
                AbiArray::fixed((**element).clone(), values).map(AbiType::Array)
            }
            (TypeSchema::Tuple(components), Self::Tuple(items)) => {
                if items.len() != components.len() {
                    return Err(EncodingError::LengthMismatch {
                        type_name: schema.canonical(),
                        expected: components.len(),
                        actual: items.len(),
                    });
                }
                components
                    .iter()
                    .zip(items)
                    .map(|(component, item)| item.coerce(component))
                    .collect::<Result<Vec<_>, _>>()
                    .map(AbiType::tuple)
            }
            (_, Self::Value(value)) if value.schema() == *schema => Ok(value.clone()),
            _ => Err(mismatch()),
        }
    }
}

fn coerce_all(element: &TypeSchema, items: &[Arg]) -> Result<Vec<AbiType>, EncodingError> {
    items.iter().map(|item| item.coerce(element)).collect()
}

macro_rules! arg_from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Arg {
            fn from(value: $t) -> Self {
                Self::Uint(U256::from(value))
            }
        }
    )*};
}

macro_rules! arg_from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Arg {
            fn from(value: $t) -> Self {
                Self::Int(I256::try_from(value as i128).unwrap_or_default())
            }
        }
    )*};
}

arg_from_unsigned!(u8, u16, u32, u64, u128, usize, U256);
arg_from_signed!(i8, i16, i32, i64, i128, isize);

impl From<I256> for Arg {
    fn from(value: I256) -> Self {
        Self::Int(value)
    }
}

impl From<Address> for Arg {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Bytes> for Arg {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value.into())
    }
}

impl From<&[u8]> for Arg {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value))
    }
}

impl<const N: usize> From<FixedBytes<N>> for Arg {
    fn from(value: FixedBytes<N>) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value.as_slice()))
    }
}

impl From<AbiType> for Arg {
    fn from(value: AbiType) -> Self {
        Self::Value(value)
    }
}

/// Re-shapes a decoded [`AbiType`] into a caller type.
pub trait FromAbi: Sized {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError>;
}

impl FromAbi for AbiType {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        Ok(value)
    }
}

impl FromAbi for U256 {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        match value {
            AbiType::UInt(v) => Ok(v.value),
            AbiType::Int(v) if !v.value.is_negative() => Ok(v.value.into_raw()),
            other => Err(DecodingError::shape("U256", other.type_name())),
        }
    }
}

impl FromAbi for I256 {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        match value {
            AbiType::Int(v) => Ok(v.value),
            AbiType::UInt(v) => {
                I256::try_from(v.value).map_err(|_| DecodingError::shape("I256", v.value))
            }
            other => Err(DecodingError::shape("I256", other.type_name())),
        }
    }
}

macro_rules! from_abi_primitive_int {
    ($($t:ty),*) => {$(
        impl FromAbi for $t {
            fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
                let found = value.to_string();
                let wide = I256::from_abi(value)?;
                i128::try_from(wide)
                    .ok()
                    .and_then(|v| <$t>::try_from(v).ok())
                    .ok_or_else(|| DecodingError::shape(stringify!($t), found))
            }
        }
    )*};
}

from_abi_primitive_int!(u8, u16, u32, u64, i8, i16, i32, i64, i128);

impl FromAbi for u128 {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        let wide = U256::from_abi(value)?;
        u128::try_from(wide).map_err(|_| DecodingError::shape("u128", wide))
    }
}

impl FromAbi for Address {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        match value {
            AbiType::Address(a) => Ok(a),
            other => Err(DecodingError::shape("Address", other.type_name())),
        }
    }
}

impl FromAbi for bool {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        match value {
            AbiType::Bool(b) => Ok(b),
            other => Err(DecodingError::shape("bool", other.type_name())),
        }
    }
}

impl FromAbi for String {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        match value {
            AbiType::String(s) => Ok(s),
            other => Err(DecodingError::shape("String", other.type_name())),
        }
    }
}

impl FromAbi for Bytes {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        match value {
            AbiType::Bytes(b) => Ok(b.data),
            other => Err(DecodingError::shape("Bytes", other.type_name())),
        }
    }
}

impl<const N: usize> FromAbi for FixedBytes<N> {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        match value {
            AbiType::Bytes(b) if !b.dynamic && b.data.len() == N => {
                Ok(FixedBytes::from_slice(&b.data))
            }
            other => Err(DecodingError::shape(format!("bytes{N}"), other.type_name())),
        }
    }
}

/// Arrays and tuples both re-shape into a `Vec`, which is how an aggregate list of
/// return values is read.
impl<T: FromAbi> FromAbi for Vec<T> {
    fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
        let items = match value {
            AbiType::Array(a) => a.values,
            AbiType::Tuple(t) => t.components,
            other => return Err(DecodingError::shape("Vec", other.type_name())),
        };
        items.iter().cloned().map(T::from_abi).collect()
    }
}

macro_rules! from_abi_tuple {
    ($len:literal => $($name:ident),+) => {
        impl<$($name: FromAbi),+> FromAbi for ($($name,)+) {
            fn from_abi(value: AbiType) -> Result<Self, DecodingError> {
                let mut fields = RecordFields::new(value, "tuple", $len)?;
                Ok(($(fields.next::<$name>()?,)+))
            }
        }
    };
}

from_abi_tuple!(1 => A);
from_abi_tuple!(2 => A, B);
from_abi_tuple!(3 => A, B, C);
from_abi_tuple!(4 => A, B, C, D);
from_abi_tuple!(5 => A, B, C, D, E);
from_abi_tuple!(6 => A, B, C, D, E, F);

/// Sequential reader over the components of a decoded tuple, used to build records.
pub struct RecordFields {
    components: std::vec::IntoIter<AbiType>,
}

impl RecordFields {
    /// Checks that `value` is a tuple with exactly `expected` components.
    pub fn new(value: AbiType, record: &str, expected: usize) -> Result<Self, DecodingError> {
        match value {
            AbiType::Tuple(t) if t.components.len() == expected => Ok(Self {
                components: t.components.to_vec().into_iter(),
            }),
            other => Err(DecodingError::shape(
                format!("{record} with {expected} fields"),
                other.type_name(),
            )),
        }
    }

    /// Reads the next component. Callers never ask for more than `expected` fields.
    pub fn next<T: FromAbi>(&mut self) -> Result<T, DecodingError> {
        let value = self
            .components
            .next()
            .ok_or_else(|| DecodingError::shape("another record field", "end of tuple"))?;
        T::from_abi(value)
    }
}

/// Declares a struct whose fields are read, in order, from a decoded tuple.
///
/// ```
/// use eth_contract_sdk::{abi_record, Address, U256};
///
/// abi_record! {
///     #[derive(Debug)]
///     pub struct Transfer {
///         pub from: Address,
///         pub to: Address,
///         pub value: U256,
///     }
/// }
/// ```
#[macro_export]
macro_rules! abi_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($fvis:vis $field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($fvis $field: $ty),*
        }

        impl $crate::value::FromAbi for $name {
            fn from_abi(
                value: $crate::value::AbiType,
            ) -> ::std::result::Result<Self, $crate::error::DecodingError> {
                const FIELDS: &[&str] = &[$(stringify!($field)),*];
                let mut fields =
                    $crate::value::RecordFields::new(value, stringify!($name), FIELDS.len())?;
                Ok(Self {
                    $($field: fields.next::<$ty>()?),*
                })
            }
        }
    };
}

//! Dynamic value representation for WDDX data.
//!
//! This module provides the [`Value`] enum, the closed set of shapes a WDDX packet can
//! carry. Serialization projects host values into a `Value` tree before writing markup,
//! and deserialization builds a `Value` tree before handing it to serde.
//!
//! ## Core Types
//!
//! - [`Value`]: null, boolean, the five numeric kinds, string, dateTime, binary, array,
//!   struct and recordset
//! - [`ValueKind`]: the kind of a value without its payload, used for recordset column typing
//!
//! ## Usage Patterns
//!
//! ### Creating Values
//!
//! ```rust
//! use serde_wddx::{wddx, Value};
//!
//! let null = Value::Null;
//! let number = Value::from(42);
//! let text = Value::from("hello");
//!
//! let member = wddx!({
//!     "name": "Alice",
//!     "age": 30
//! });
//! assert!(member.is_struct());
//! ```
//!
//! ### Extracting Values
//!
//! ```rust
//! use serde_wddx::Value;
//! use std::convert::TryFrom;
//!
//! let value = Value::from(42);
//! let num: i64 = i64::try_from(value).unwrap();
//! assert_eq!(num, 42);
//! ```
//!
//! ### Numeric Kinds
//!
//! The `number` element carries no type, so decoding picks the narrowest kind that keeps
//! every digit: `Int32`, then `Int64` for integers; `Float32` when the text survives
//! narrowing, otherwise `Decimal`, with `Float64` for values beyond `f32` range.
//!
//! ```rust
//! use serde_wddx::{from_str, Value};
//!
//! let packet = |n: &str| format!(
//!     r#"<wddxPacket version="1.0"><header /><data><number>{n}</number></data></wddxPacket>"#
//! );
//!
//! assert!(matches!(from_str::<Value>(&packet("-12.456")).unwrap(), Value::Float32(_)));
//! assert!(matches!(from_str::<Value>(&packet("154523.85")).unwrap(), Value::Decimal(_)));
//! ```

use crate::format::Tag;
use crate::table::Table;
use crate::WddxMap;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// Reserved newtype-struct names that carry WDDX-only kinds through the serde data model.
pub(crate) const TIMESTAMP_TOKEN: &str = "$serde_wddx::private::DateTime";
pub(crate) const DECIMAL_TOKEN: &str = "$serde_wddx::private::Decimal";
pub(crate) const RECORDSET_TOKEN: &str = "$serde_wddx::private::Recordset";
pub(crate) const TABLESET_TOKEN: &str = "$serde_wddx::private::TableSet";
pub(crate) const RECTANGULAR_TOKEN: &str = "$serde_wddx::private::Rectangular";

/// A dynamically-typed representation of any WDDX value.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::Value;
///
/// let null = Value::Null;
/// let num = Value::Int32(42);
/// let text = Value::Text("hello".to_string());
///
/// assert!(null.is_null());
/// assert!(num.is_number());
/// assert!(text.is_text());
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Struct(WddxMap),
    Table(Table),
}

/// The kind of a [`Value`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Text,
    Timestamp,
    Bytes,
    Array,
    Struct,
    Table,
}

impl ValueKind {
    /// Returns a short human-readable name, used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Float32 => "float32",
            ValueKind::Float64 => "float64",
            ValueKind::Decimal => "decimal",
            ValueKind::Text => "string",
            ValueKind::Timestamp => "dateTime",
            ValueKind::Bytes => "binary",
            ValueKind::Array => "array",
            ValueKind::Struct => "struct",
            ValueKind::Table => "recordset",
        }
    }

    /// Returns `true` for the five numeric kinds.
    #[inline]
    #[must_use]
    pub const fn is_number(self) -> bool {
        matches!(
            self,
            ValueKind::Int32
                | ValueKind::Int64
                | ValueKind::Float32
                | ValueKind::Float64
                | ValueKind::Decimal
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float32(_) => ValueKind::Float32,
            Value::Float64(_) => ValueKind::Float64,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Text(_) => ValueKind::Text,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Array(_) => ValueKind::Array,
            Value::Struct(_) => ValueKind::Struct,
            Value::Table(_) => ValueKind::Table,
        }
    }

    /// Returns the element this value is written as.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        match self {
            Value::Null => Tag::Null,
            Value::Bool(_) => Tag::Boolean,
            Value::Int32(_)
            | Value::Int64(_)
            | Value::Float32(_)
            | Value::Float64(_)
            | Value::Decimal(_) => Tag::Number,
            Value::Text(_) => Tag::String,
            Value::Timestamp(_) => Tag::DateTime,
            Value::Bytes(_) => Tag::Binary,
            Value::Array(_) => Tag::Array,
            Value::Struct(_) => Tag::Struct,
            Value::Table(_) => Tag::Recordset,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        self.kind().is_number()
    }

    #[inline]
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_timestamp(&self) -> bool {
        matches!(self, Value::Timestamp(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_bytes(&self) -> bool {
        matches!(self, Value::Bytes(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_struct(&self) -> bool {
        matches!(self, Value::Struct(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_table(&self) -> bool {
        matches!(self, Value::Table(_))
    }

    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an `i64` if it is one of the integer kinds.
    #[inline]
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(*i as i64),
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an `f64` if it is any numeric kind.
    ///
    /// `Float32` values are widened through their shortest decimal text, so a decoded
    /// `0.1` reads back as `0.1_f64` rather than `0.100000001490116…`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(i) => Some(f64::from(*i)),
            Value::Int64(i) => Some(*i as f64),
            Value::Float32(f) => Some(widen_f32(*f)),
            Value::Float64(f) => Some(*f),
            Value::Decimal(d) => d.to_string().parse().ok(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Timestamp(dt) => Some(dt),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_struct(&self) -> Option<&WddxMap> {
        match self {
            Value::Struct(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }
}

/// Widens an `f32` to the `f64` closest to its shortest decimal text.
pub(crate) fn widen_f32(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float32(x) => write!(f, "{}", x),
            Value::Float64(x) => write!(f, "{}", x),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Struct(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Table(table) => write!(
                f,
                "recordset({} rows: {})",
                table.row_count(),
                table.field_names().join(",")
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int32(i) => serializer.serialize_i32(*i),
            Value::Int64(i) => serializer.serialize_i64(*i),
            Value::Float32(f) => serializer.serialize_f32(*f),
            Value::Float64(f) => serializer.serialize_f64(*f),
            Value::Decimal(d) => serializer.serialize_newtype_struct(DECIMAL_TOKEN, &d.to_string()),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Timestamp(dt) => {
                serializer.serialize_newtype_struct(TIMESTAMP_TOKEN, &dt.to_rfc3339())
            }
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Array(arr) => arr.serialize(serializer),
            Value::Struct(map) => {
                use serde::ser::SerializeMap;
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    state.serialize_entry(key, value)?;
                }
                state.end()
            }
            Value::Table(table) => table.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any valid WDDX value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i8<E>(self, value: i8) -> Result<Value, E> {
                Ok(Value::Int32(value.into()))
            }

            fn visit_i16<E>(self, value: i16) -> Result<Value, E> {
                Ok(Value::Int32(value.into()))
            }

            fn visit_i32<E>(self, value: i32) -> Result<Value, E> {
                Ok(Value::Int32(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Value, E> {
                Ok(Value::Int64(value))
            }

            fn visit_u8<E>(self, value: u8) -> Result<Value, E> {
                Ok(Value::Int32(value.into()))
            }

            fn visit_u16<E>(self, value: u16) -> Result<Value, E> {
                Ok(Value::Int32(value.into()))
            }

            fn visit_u32<E>(self, value: u32) -> Result<Value, E> {
                Ok(Value::Int64(value.into()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Value, E> {
                Ok(match i64::try_from(value) {
                    Ok(i) => Value::Int64(i),
                    Err(_) => Value::Decimal(Decimal::from(value)),
                })
            }

            fn visit_f32<E>(self, value: f32) -> Result<Value, E> {
                Ok(Value::Float32(value))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Value, E> {
                Ok(Value::Float64(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Value, E> {
                Ok(Value::Text(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Value, E> {
                Ok(Value::Text(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Value, E> {
                Ok(Value::Bytes(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Value, E> {
                Ok(Value::Bytes(value))
            }

            fn visit_unit<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::Array(vec))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let Some(first) = map.next_key::<String>()? else {
                    return Ok(Value::Struct(WddxMap::new()));
                };

                match first.as_str() {
                    TIMESTAMP_TOKEN => {
                        let text: String = map.next_value()?;
                        DateTime::parse_from_rfc3339(&text)
                            .map(Value::Timestamp)
                            .map_err(de::Error::custom)
                    }
                    DECIMAL_TOKEN => {
                        let text: String = map.next_value()?;
                        Decimal::from_str(&text)
                            .map(Value::Decimal)
                            .map_err(de::Error::custom)
                    }
                    RECORDSET_TOKEN => {
                        let repr: Value = map.next_value()?;
                        Table::from_repr(repr)
                            .map(Value::Table)
                            .map_err(de::Error::custom)
                    }
                    _ => {
                        let mut members = WddxMap::new();
                        members.insert(first, map.next_value()?);
                        while let Some((key, value)) = map.next_entry()? {
                            members.insert(key, value);
                        }
                        Ok(Value::Struct(members))
                    }
                }
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl TryFrom<Value> for i64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Int32(i) => Ok(i64::from(i)),
            Value::Int64(i) => Ok(i),
            other => Err(crate::Error::type_mismatch("integer", other.kind().as_str())),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| crate::Error::type_mismatch("number", value.kind().as_str()))
    }
}

impl TryFrom<Value> for bool {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(crate::Error::type_mismatch("boolean", other.kind().as_str())),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(crate::Error::type_mismatch("string", other.kind().as_str())),
        }
    }
}

impl TryFrom<Value> for Decimal {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Decimal(d) => Ok(d),
            Value::Int32(i) => Ok(Decimal::from(i)),
            Value::Int64(i) => Ok(Decimal::from(i)),
            Value::Float32(f) => Decimal::from_str(&f.to_string())
                .map_err(|e| crate::Error::type_mismatch("decimal", &e.to_string())),
            other => Err(crate::Error::type_mismatch("decimal", other.kind().as_str())),
        }
    }
}

impl TryFrom<Value> for DateTime<FixedOffset> {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Timestamp(dt) => Ok(dt),
            other => Err(crate::Error::type_mismatch("dateTime", other.kind().as_str())),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(crate::Error::type_mismatch("binary", other.kind().as_str())),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Self {
        Value::Int32(value.into())
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Int32(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Int32(value.into())
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int32(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int64(value.into())
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<WddxMap> for Value {
    fn from(value: WddxMap) -> Self {
        Value::Struct(value)
    }
}

impl From<Table> for Value {
    fn from(value: Table) -> Self {
        Value::Table(value)
    }
}

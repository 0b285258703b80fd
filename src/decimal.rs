//! Exact decimals in struct fields.
//!
//! `Decimal` fields serialize as strings through serde's default impls. Use this module
//! with `#[serde(with = "serde_wddx::decimal")]` to write them as `number` elements with
//! every digit kept:
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use serde::{Deserialize, Serialize};
//! use std::str::FromStr;
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Invoice {
//!     #[serde(with = "serde_wddx::decimal")]
//!     total: Decimal,
//! }
//!
//! let invoice = Invoice { total: Decimal::from_str("12345678901234567890.25").unwrap() };
//! let wddx = serde_wddx::to_string(&invoice).unwrap();
//! assert!(wddx.contains("<number>12345678901234567890.25</number>"));
//!
//! let back: Invoice = serde_wddx::from_str(&wddx).unwrap();
//! assert_eq!(back, invoice);
//! ```

use crate::value::DECIMAL_TOKEN;
use rust_decimal::Decimal;
use serde::{de, Deserializer, Serializer};
use std::fmt;
use std::str::FromStr;

/// Serializes a decimal as a `number` element.
///
/// # Errors
///
/// Propagates errors from the underlying serializer.
pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_newtype_struct(DECIMAL_TOKEN, &value.to_string())
}

/// Deserializes a decimal from a `number` element or a numeric string.
///
/// # Errors
///
/// Returns an error if the value is neither a number nor a decimal string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_newtype_struct(DECIMAL_TOKEN, DecimalVisitor)
}

struct DecimalVisitor;

impl<'de> de::Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a WDDX number or a decimal string")
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Decimal::from(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Decimal::from(value))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Decimal::from_str(&value.to_string())
            .or_else(|_| Decimal::from_scientific(&format!("{:e}", value)))
            .map_err(|_| E::custom(format!("{} cannot be held as a decimal", value)))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let value = value.trim();
        Decimal::from_str(value)
            .or_else(|_| Decimal::from_scientific(value))
            .map_err(|_| E::custom(format!("{:?} is not a decimal", value)))
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

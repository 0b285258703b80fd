//! # serde_wddx
//!
//! A Serde-compatible codec for WDDX (Web Distributed Data eXchange), the XML packet
//! format used to move typed values between ColdFusion, PHP, Perl, ASP and other
//! platforms.
//!
//! ## What is WDDX?
//!
//! A WDDX packet is an XML document holding exactly one value:
//!
//! ```xml
//! <wddxPacket version="1.0"><header /><data>
//!   <struct>
//!     <var name="id"><number>123</number></var>
//!     <var name="name"><string>Alice</string></var>
//!   </struct>
//! </data></wddxPacket>
//! ```
//!
//! Values are `null`, `boolean`, `number`, `string`, `dateTime`, `binary`, `array`,
//! `struct` and `recordset` (a column-major table).
//!
//! ## Key Features
//!
//! - **Serde Compatible**: Works with existing Rust types via `#[derive(Serialize, Deserialize)]`
//! - **Exact Numbers**: Decimal text that does not survive a round trip through `f64` is
//!   kept as a [`rust_decimal::Decimal`]
//! - **Legacy Compatible**: Writes the `dateTime` offset suffix legacy consumers expect and
//!   reads the free-form dates legacy producers write
//! - **Recordsets**: [`Table`] values and `Vec` of structs decoded from `recordset` elements
//! - **Validation**: Optional strict checking against the WDDX 1.0 grammar
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! serde_wddx = "0.1"
//! serde = { version = "1.0", features = ["derive"] }
//! ```
//!
//! ### Basic Serialization and Deserialization
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_wddx::{from_str, to_string};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     active: bool,
//! }
//!
//! let user = User {
//!     id: 123,
//!     name: "Alice".to_string(),
//!     active: true,
//! };
//!
//! let wddx = to_string(&user).unwrap();
//! assert!(wddx.contains("<var name=\"name\"><string>Alice</string></var>"));
//!
//! let user_back: User = from_str(&wddx).unwrap();
//! assert_eq!(user, user_back);
//! ```
//!
//! ### Recordsets
//!
//! ```rust
//! use serde_wddx::{from_str, to_string, Table, Value};
//!
//! let mut table = Table::with_fields(["id", "name"]).unwrap();
//! table.push_row(vec![Value::Int32(1), Value::from("Widget")]).unwrap();
//! table.push_row(vec![Value::Int32(2), Value::from("Gadget")]).unwrap();
//!
//! let wddx = to_string(&table).unwrap();
//! assert!(wddx.contains("<recordset rowCount=\"2\" fieldNames=\"id,name\">"));
//!
//! let back: Value = from_str(&wddx).unwrap();
//! assert_eq!(back, Value::Table(table));
//! ```
//!
//! ### Dynamic Values with the wddx! Macro
//!
//! ```rust
//! use serde_wddx::{wddx, Value};
//!
//! let data = wddx!({
//!     "name": "Alice",
//!     "tags": ["ops", "admin"]
//! });
//!
//! if let Value::Struct(members) = data {
//!     assert_eq!(members.get("name").and_then(|v| v.as_str()), Some("Alice"));
//! }
//! ```
//!
//! ### Validation
//!
//! ```rust
//! use serde_wddx::{from_str_with_options, Error, Value, WddxOptions};
//!
//! let packet = r#"<wddxPacket version="1.0"><header /><data><dateTime>6/17/75</dateTime></data></wddxPacket>"#;
//!
//! // Permissive decoding accepts the free-form date
//! assert!(serde_wddx::from_str::<Value>(packet).is_ok());
//!
//! // Validating decoding rejects it
//! let strict = WddxOptions::new().with_validation(true);
//! let err = from_str_with_options::<Value>(packet, strict).unwrap_err();
//! assert!(matches!(err, Error::Validation { .. }));
//! ```
//!
//! ## Type Mapping
//!
//! | Rust | WDDX |
//! |------|------|
//! | `()`, `None`, unit structs | `null` (unit structs write their name as a `string`) |
//! | `bool` | `boolean` |
//! | integers, floats, [`decimal`] fields | `number` |
//! | `String`, `char`, unit variants | `string` |
//! | [`datetime`] fields, [`Value::Timestamp`] | `dateTime` |
//! | `serde_bytes`-style byte buffers, [`Value::Bytes`] | `binary` |
//! | sequences, tuples, [`Rectangular`] grids | `array` |
//! | structs, maps, data-carrying variants | `struct` |
//! | [`Table`], [`TableSet`] | `recordset` |
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]: `debug!` for tolerated irregularities in decoded
//! documents and `trace!` for element dispatch. No subscriber is installed.
//!
//! ## Examples
//!
//! See the `demos/` directory:
//!
//! - **`simple.rs`** - Basic serialization
//! - **`macro.rs`** - Building values with the wddx! macro
//! - **`recordsets.rs`** - Tables, table sets and row structs
//! - **`dynamic_values.rs`** - Working with `Value` dynamically
//! - **`custom_options.rs`** - Declarations, time zones, depth limits and validation
//!
//! Run any example with: `cargo run --example <name>`

mod binary;
pub mod datetime;
pub mod de;
pub mod decimal;
pub mod error;
pub mod format;
pub mod macros;
pub mod map;
mod number;
pub mod options;
pub mod schema;
pub mod ser;
pub mod table;
mod text;
pub mod value;

pub use de::Deserializer;
pub use error::{Error, Result};
pub use format::Tag;
pub use map::WddxMap;
pub use options::{WddxOptions, Zone};
pub use schema::{BaselineSchema, SchemaValidator, ValidationIssue};
pub use ser::{Rectangular, Serializer};
pub use table::{Field, Table, TableSet};
pub use value::{Value, ValueKind};

use de::ValueDeserializer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// Serialize any `T: Serialize` to a WDDX packet.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::to_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let point = Point { x: 1, y: 2 };
/// let wddx = to_string(&point).unwrap();
/// assert_eq!(
///     wddx,
///     "<wddxPacket version=\"1.0\"><header /><data><struct>\
///      <var name=\"x\"><number>1</number></var>\
///      <var name=\"y\"><number>2</number></var>\
///      </struct></data></wddxPacket>"
/// );
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented (non-finite numbers, map keys that
/// are not strings or numbers, cyclic references, nesting beyond the depth limit).
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, WddxOptions::default())
}

/// Serialize any `T: Serialize` to a WDDX packet with custom options.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::{to_string_with_options, WddxOptions};
///
/// let options = WddxOptions::new().with_xml_declaration(true);
/// let wddx = to_string_with_options(&"hi", options).unwrap();
/// assert!(wddx.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><wddxPacket"));
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options<T>(value: &T, options: WddxOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let mut serializer = Serializer::new(options);
    serializer.serialize(value)?;
    Ok(serializer.into_inner())
}

/// Serialize any `T: Serialize` to a writer as a WDDX packet.
///
/// Nothing is written if serialization fails.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::to_writer;
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &vec![1, 2]).unwrap();
/// assert!(buffer.starts_with(b"<wddxPacket"));
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    to_writer_with_options(writer, value, WddxOptions::default())
}

/// Serialize any `T: Serialize` to a writer as a WDDX packet with custom options.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, T>(mut writer: W, value: &T, options: WddxOptions) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let wddx = to_string_with_options(value, options)?;
    writer
        .write_all(wddx.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(())
}

/// Convert any `T: Serialize` to a [`Value`].
///
/// # Examples
///
/// ```rust
/// use serde_wddx::{to_value, Value};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let value = to_value(&Point { x: 1, y: 2 }).unwrap();
/// assert!(value.is_struct());
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    to_value_with_options(value, &WddxOptions::default())
}

/// Convert any `T: Serialize` to a [`Value`], honoring the depth limit in `options`.
///
/// # Errors
///
/// Returns an error if the value cannot be represented.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value_with_options<T>(value: &T, options: &WddxOptions) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    ser::project(value, options.max_depth)
}

/// Deserialize an instance of type `T` from a WDDX packet.
///
/// Decoding is permissive: free-form dates, malformed offset suffixes, missing optional
/// attributes and empty elements are accepted.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::from_str;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let wddx = r#"<wddxPacket version="1.0"><header/><data><struct>
///     <var name="x"><number>1</number></var>
///     <var name="y"><number>2</number></var>
/// </struct></data></wddxPacket>"#;
/// let point: Point = from_str(wddx).unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns an error if the document is malformed or cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<T>(s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_str_with_options(s, WddxOptions::default())
}

/// Deserialize an instance of type `T` from a WDDX packet with custom options.
///
/// With `options.validate` set the document is checked against [`BaselineSchema`] first.
///
/// # Errors
///
/// Returns [`Error::Validation`] when validation is enabled and the document is not
/// valid, or any decoding error otherwise.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_with_options<T>(s: &str, options: WddxOptions) -> Result<T>
where
    T: DeserializeOwned,
{
    if options.validate {
        return from_str_with_validator(s, &BaselineSchema, options);
    }
    let mut deserializer = Deserializer::from_str(s, options);
    T::deserialize(&mut deserializer)
}

/// Validates a WDDX packet with `validator`, then deserializes it.
///
/// Errors raised while decoding a document the validator accepted are reported as
/// [`Error::Validation`] as well.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::{from_str_with_validator, BaselineSchema, WddxOptions};
///
/// let wddx = r#"<wddxPacket version="1.0"><header/><data><boolean value="true"/></data></wddxPacket>"#;
/// let flag: bool = from_str_with_validator(wddx, &BaselineSchema, WddxOptions::new()).unwrap();
/// assert!(flag);
/// ```
///
/// # Errors
///
/// Returns [`Error::Validation`] if the document is rejected or cannot be decoded, or an
/// error if the decoded value cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_with_validator<T>(
    s: &str,
    validator: &dyn SchemaValidator,
    options: WddxOptions,
) -> Result<T>
where
    T: DeserializeOwned,
{
    validator.validate(s).map_err(Error::validation)?;
    let value = Deserializer::from_str(s, options)
        .decode_packet()
        .map_err(|e| match e {
            Error::Validation { .. } => e,
            other => Error::validation(vec![ValidationIssue::new(0, other.to_string())]),
        })?;
    from_value(value)
}

/// Deserialize an instance of type `T` from bytes of a WDDX packet.
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8, the document is malformed, or it
/// cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(v: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let s = std::str::from_utf8(v).map_err(|e| Error::custom(e.to_string()))?;
    from_str(s)
}

/// Deserialize an instance of type `T` from an I/O stream holding a WDDX packet.
///
/// The stream is decoded as it is read.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::from_reader;
/// use std::io::Cursor;
///
/// let bytes = br#"<wddxPacket version="1.0"><header/><data><array length="2"><number>1</number><number>2</number></array></data></wddxPacket>"#;
/// let numbers: Vec<i32> = from_reader(Cursor::new(&bytes[..])).unwrap();
/// assert_eq!(numbers, [1, 2]);
/// ```
///
/// # Errors
///
/// Returns an error if reading fails, the document is malformed, or it cannot be
/// deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(reader: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let mut deserializer = Deserializer::from_reader(io::BufReader::new(reader), WddxOptions::default());
    T::deserialize(&mut deserializer)
}

/// Deserialize an instance of type `T` from a [`Value`].
///
/// # Examples
///
/// ```rust
/// use serde_wddx::{from_value, wddx};
/// use std::collections::HashMap;
///
/// let scores: HashMap<String, i32> = from_value(wddx!({ "a": 1, "b": 2 })).unwrap();
/// assert_eq!(scores["b"], 2);
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

/// Returns whether `s` is valid against [`BaselineSchema`].
///
/// # Examples
///
/// ```rust
/// assert!(serde_wddx::is_valid(r#"<wddxPacket version="1.0"><header/><data><null/></data></wddxPacket>"#));
/// assert!(!serde_wddx::is_valid("<wddxPacket>"));
/// ```
#[must_use]
pub fn is_valid(s: &str) -> bool {
    is_valid_with(s, &BaselineSchema)
}

/// Returns whether `validator` accepts `s`.
#[must_use]
pub fn is_valid_with(s: &str, validator: &dyn SchemaValidator) -> bool {
    validator.validate(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u32,
        name: String,
        active: bool,
        tags: Vec<String>,
    }

    fn user() -> User {
        User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["admin".to_string(), "user".to_string()],
        }
    }

    #[test]
    fn test_serialize_deserialize_point() {
        let point = Point { x: 1, y: 2 };
        let wddx = to_string(&point).unwrap();
        let point_back: Point = from_str(&wddx).unwrap();
        assert_eq!(point, point_back);
    }

    #[test]
    fn test_serialize_deserialize_user() {
        let wddx = to_string(&user()).unwrap();
        let user_back: User = from_str(&wddx).unwrap();
        assert_eq!(user(), user_back);
    }

    #[test]
    fn test_to_value() {
        let value = to_value(&Point { x: 1, y: 2 }).unwrap();
        match value {
            Value::Struct(members) => {
                assert_eq!(members.get("x"), Some(&Value::Int32(1)));
                assert_eq!(members.get("y"), Some(&Value::Int32(2)));
            }
            _ => panic!("Expected struct"),
        }
    }

    #[test]
    fn test_arrays() {
        let numbers = vec![1, 2, 3, 4, 5];
        let wddx = to_string(&numbers).unwrap();
        let numbers_back: Vec<i32> = from_str(&wddx).unwrap();
        assert_eq!(numbers, numbers_back);
    }

    #[test]
    fn test_writer_and_readers() {
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &user()).unwrap();
        let from_bytes: User = from_slice(&buffer).unwrap();
        let from_stream: User = from_reader(buffer.as_slice()).unwrap();
        assert_eq!(from_bytes, user());
        assert_eq!(from_stream, user());
    }

    #[test]
    fn test_from_slice_rejects_invalid_utf8() {
        assert!(matches!(from_slice::<Value>(&[0xff, 0xfe]), Err(Error::Custom(_))));
    }

    #[test]
    fn test_custom_options() {
        let options = WddxOptions::new()
            .with_xml_declaration(true)
            .with_validation(true);
        let wddx = to_string_with_options(&user(), options.clone()).unwrap();
        assert!(is_valid(&wddx));
        let user_back: User = from_str_with_options(&wddx, options).unwrap();
        assert_eq!(user(), user_back);
    }

    #[test]
    fn test_validating_decode_escalates_decode_errors() {
        struct AcceptAll;
        impl SchemaValidator for AcceptAll {
            fn validate(&self, _: &str) -> std::result::Result<(), Vec<ValidationIssue>> {
                Ok(())
            }
        }

        let packet = "<wddxPacket version=\"1.0\"><header/><data><widget/></data></wddxPacket>";
        assert!(matches!(from_str::<Value>(packet), Err(Error::UnsupportedTag(_))));
        let err = from_str_with_validator::<Value>(packet, &AcceptAll, WddxOptions::new()).unwrap_err();
        assert!(err.is_validation());
        assert!(is_valid_with(packet, &AcceptAll));
        assert!(!is_valid(packet));
    }

    #[test]
    fn test_from_value() {
        let point: Point = from_value(to_value(&Point { x: 3, y: 4 }).unwrap()).unwrap();
        assert_eq!(point, Point { x: 3, y: 4 });
    }
}

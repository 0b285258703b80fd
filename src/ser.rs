//! WDDX serialization.
//!
//! Encoding happens in two passes:
//!
//! 1. A host value implementing `Serialize` is projected into a [`Value`] tree. The
//!    projection walks the serde data model, maps every shape onto one of the WDDX kinds
//!    and rejects host graphs that refer back to one of their ancestors.
//! 2. The [`Serializer`] writes the `Value` tree as a packet, choosing the element for
//!    each value from its kind.
//!
//! ## Usage
//!
//! Most users should use the high-level functions in the crate root:
//!
//! ```rust
//! use serde::Serialize;
//! use serde_wddx::to_string;
//!
//! #[derive(Serialize)]
//! struct Point { x: i32, y: i32 }
//!
//! let wddx = to_string(&Point { x: 1, y: 2 }).unwrap();
//! assert_eq!(
//!     wddx,
//!     "<wddxPacket version=\"1.0\"><header /><data><struct>\
//!      <var name=\"x\"><number>1</number></var>\
//!      <var name=\"y\"><number>2</number></var>\
//!      </struct></data></wddxPacket>"
//! );
//! ```
//!
//! ## Direct Serializer Usage
//!
//! Callers holding a [`Value`] can write it without the projection pass:
//!
//! ```rust
//! use serde_wddx::{Serializer, Value, WddxOptions};
//!
//! let mut serializer = Serializer::new(WddxOptions::new());
//! serializer.serialize_value(&Value::Array(vec![Value::from(1), Value::Null])).unwrap();
//!
//! assert_eq!(
//!     serializer.into_inner(),
//!     "<array length=\"2\"><number>1</number><null /></array>"
//! );
//! ```

use crate::format::{self, Tag, DATA, FIELD, HEADER, PACKET, VAR, VERSION, XML_DECLARATION};
use crate::value::{
    DECIMAL_TOKEN, RECORDSET_TOKEN, RECTANGULAR_TOKEN, TABLESET_TOKEN, TIMESTAMP_TOKEN,
};
use crate::{binary, datetime, number, text};
use crate::{Error, Result, Table, Value, WddxMap, WddxOptions};
use chrono::DateTime;
use rust_decimal::Decimal;
use serde::{ser, Serialize};
use std::str::FromStr;

/// The WDDX packet writer.
///
/// Writes [`Value`] trees as WDDX markup. Created via [`Serializer::new`].
pub struct Serializer {
    output: String,
    options: WddxOptions,
    depth: usize,
}

impl Serializer {
    pub fn new(options: WddxOptions) -> Self {
        Serializer {
            output: String::with_capacity(256),
            options,
            depth: 0,
        }
    }

    pub fn into_inner(self) -> String {
        self.output
    }

    /// Projects `value` into a [`Value`] and writes it as a complete packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be projected or written.
    pub fn serialize<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let value = project(value, self.options.max_depth)?;
        self.serialize_packet(&value)
    }

    /// Writes `value` wrapped in the packet envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if a number is not finite or the nesting is too deep.
    pub fn serialize_packet(&mut self, value: &Value) -> Result<()> {
        if self.options.xml_declaration {
            self.output.push_str(XML_DECLARATION);
        }
        format::write_start(&mut self.output, PACKET, &[("version", VERSION)]);
        format::write_empty(&mut self.output, HEADER, &[]);
        format::write_start(&mut self.output, DATA, &[]);
        self.serialize_value(value)?;
        format::write_end(&mut self.output, DATA);
        format::write_end(&mut self.output, PACKET);
        Ok(())
    }

    /// Writes the element for a single value, without the envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if a number is not finite or the nesting is too deep.
    pub fn serialize_value(&mut self, value: &Value) -> Result<()> {
        if self.depth >= self.options.max_depth {
            return Err(Error::DepthLimitExceeded(self.options.max_depth));
        }
        self.depth += 1;
        let result = self.write_value(value);
        self.depth -= 1;
        result
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        let tag = value.tag().as_str();
        match value {
            Value::Null => format::write_empty(&mut self.output, tag, &[]),
            Value::Bool(b) => format::write_empty(
                &mut self.output,
                tag,
                &[("value", if *b { "true" } else { "false" })],
            ),
            Value::Int32(_)
            | Value::Int64(_)
            | Value::Float32(_)
            | Value::Float64(_)
            | Value::Decimal(_) => {
                let text = number::format(value)?;
                format::write_start(&mut self.output, tag, &[]);
                self.output.push_str(&text);
                format::write_end(&mut self.output, tag);
            }
            Value::Text(s) => text::encode(&mut self.output, s),
            Value::Timestamp(dt) => {
                format::write_start(&mut self.output, tag, &[]);
                self.output
                    .push_str(&datetime::format(dt, &self.options.zone));
                format::write_end(&mut self.output, tag);
            }
            Value::Bytes(bytes) => binary::encode(&mut self.output, bytes),
            Value::Array(items) => self.write_array(items)?,
            Value::Struct(members) => self.write_struct(members)?,
            Value::Table(table) => self.write_recordset(table)?,
        }
        Ok(())
    }

    fn write_array(&mut self, items: &[Value]) -> Result<()> {
        let tag = Tag::Array.as_str();
        let length = items.len().to_string();
        if items.is_empty() {
            format::write_empty(&mut self.output, tag, &[("length", length.as_str())]);
            return Ok(());
        }
        format::write_start(&mut self.output, tag, &[("length", length.as_str())]);
        for item in items {
            self.serialize_value(item)?;
        }
        format::write_end(&mut self.output, tag);
        Ok(())
    }

    fn write_struct(&mut self, members: &WddxMap) -> Result<()> {
        let tag = Tag::Struct.as_str();
        if members.is_empty() {
            format::write_empty(&mut self.output, tag, &[]);
            return Ok(());
        }
        format::write_start(&mut self.output, tag, &[]);
        for (name, member) in members {
            format::write_start(&mut self.output, VAR, &[("name", name.as_str())]);
            self.serialize_value(member)?;
            format::write_end(&mut self.output, VAR);
        }
        format::write_end(&mut self.output, tag);
        Ok(())
    }

    // Column-major: one field element per column, cells in row order.
    fn write_recordset(&mut self, table: &Table) -> Result<()> {
        let tag = Tag::Recordset.as_str();
        let row_count = table.row_count().to_string();
        let field_names = table.field_names().join(",");
        let attributes = [
            ("rowCount", row_count.as_str()),
            ("fieldNames", field_names.as_str()),
        ];
        if table.fields().is_empty() {
            format::write_empty(&mut self.output, tag, &attributes);
            return Ok(());
        }

        format::write_start(&mut self.output, tag, &attributes);
        for (index, field) in table.fields().iter().enumerate() {
            let name = [("name", field.name())];
            if table.row_count() == 0 {
                format::write_empty(&mut self.output, FIELD, &name);
                continue;
            }
            format::write_start(&mut self.output, FIELD, &name);
            for row in table.rows() {
                self.serialize_value(&row[index])?;
            }
            format::write_end(&mut self.output, FIELD);
        }
        format::write_end(&mut self.output, tag);
        Ok(())
    }
}

/// Marks a nested sequence as a rectangular multi-dimensional array.
///
/// A rectangular array is written as one flat `array` in row-major order. Plain nested
/// sequences are written as arrays of arrays.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::{to_value, Rectangular, Value};
///
/// let grid = vec![vec![1, 1], vec![2, 2], vec![3, 5], vec![4, 5]];
/// let flat = to_value(&Rectangular(&grid)).unwrap();
/// assert_eq!(flat.as_array().unwrap().len(), 8);
///
/// let ragged = vec![vec![1, 2], vec![3]];
/// assert!(to_value(&Rectangular(&ragged)).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Rectangular<T>(pub T);

impl<T: Serialize> Serialize for Rectangular<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_newtype_struct(RECTANGULAR_TOKEN, &self.0)
    }
}

/// Projects a host value into a [`Value`] tree.
pub(crate) fn project<T>(value: &T, max_depth: usize) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    Guard::new(max_depth).project(value)
}

/// Tracks the host values on the path from the root to the value being projected.
///
/// A value is identified by its address and type; meeting the same pair again below
/// itself means the host graph is cyclic.
struct Guard {
    ancestors: Vec<(usize, &'static str)>,
    depth: usize,
    max_depth: usize,
}

impl Guard {
    fn new(max_depth: usize) -> Self {
        Guard {
            ancestors: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    fn project<T>(&mut self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        let type_name = std::any::type_name::<T>();
        let address = (value as *const T).cast::<()>() as usize;
        // Zero-sized values share addresses with their neighbours.
        let tracked = std::mem::size_of_val(value) != 0;

        if tracked && self.ancestors.contains(&(address, type_name)) {
            return Err(Error::cyclic_reference(type_name));
        }
        if self.depth >= self.max_depth {
            return Err(Error::DepthLimitExceeded(self.max_depth));
        }

        self.depth += 1;
        if tracked {
            self.ancestors.push((address, type_name));
        }
        let result = value.serialize(ValueSerializer { guard: self });
        if tracked {
            self.ancestors.pop();
        }
        self.depth -= 1;
        result
    }
}

/// Serializes a host value into a [`Value`].
pub(crate) struct ValueSerializer<'a> {
    guard: &'a mut Guard,
}

impl<'a> ser::Serializer for ValueSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec<'a>;
    type SerializeTuple = SerializeVec<'a>;
    type SerializeTupleStruct = SerializeVec<'a>;
    type SerializeTupleVariant = SerializeVec<'a>;
    type SerializeMap = SerializeMap<'a>;
    type SerializeStruct = SerializeMap<'a>;
    type SerializeStructVariant = SerializeMap<'a>;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::Int32(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Int32(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Int32(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Int64(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        match i64::try_from(v) {
            Ok(i) => Ok(Value::Int64(i)),
            Err(_) => wide_integer(&v.to_string()),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Int32(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::Int32(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::Int64(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        match i64::try_from(v) {
            Ok(i) => Ok(Value::Int64(i)),
            Err(_) => Ok(Value::Decimal(Decimal::from(v))),
        }
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        match i64::try_from(v) {
            Ok(i) => Ok(Value::Int64(i)),
            Err(_) => wide_integer(&v.to_string()),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::Float32(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Float64(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value> {
        Ok(Value::Text(name.to_string()))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::Text(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        match name {
            TIMESTAMP_TOKEN => {
                let text = expect_text(self.guard.project(value)?, "a dateTime")?;
                DateTime::parse_from_rfc3339(&text)
                    .map(Value::Timestamp)
                    .map_err(|e| Error::type_mismatch("an RFC 3339 timestamp", &e.to_string()))
            }
            DECIMAL_TOKEN => {
                let text = expect_text(self.guard.project(value)?, "a decimal")?;
                Decimal::from_str(&text)
                    .map(Value::Decimal)
                    .map_err(|e| Error::type_mismatch("a decimal", &e.to_string()))
            }
            RECORDSET_TOKEN => Table::from_repr(self.guard.project(value)?).map(Value::Table),
            TABLESET_TOKEN => table_container(self.guard.project(value)?),
            RECTANGULAR_TOKEN => {
                let nested = self.guard.project(value)?;
                flatten_rectangular(nested).map(Value::Array)
            }
            _ => value.serialize(self),
        }
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        let mut members = WddxMap::with_capacity(1);
        members.insert(variant.to_string(), self.guard.project(value)?);
        Ok(Value::Struct(members))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec<'a>> {
        Ok(SerializeVec::new(self.guard, len.unwrap_or(0), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec<'a>> {
        Ok(SerializeVec::new(self.guard, len, None))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec<'a>> {
        Ok(SerializeVec::new(self.guard, len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeVec<'a>> {
        Ok(SerializeVec::new(self.guard, len, Some(variant)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap<'a>> {
        Ok(SerializeMap::new(self.guard, len.unwrap_or(0), Shape::Map))
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<SerializeMap<'a>> {
        Ok(SerializeMap::new(self.guard, len, Shape::Struct(name)))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeMap<'a>> {
        Ok(SerializeMap::new(self.guard, len, Shape::Variant(variant)))
    }
}

fn wide_integer(digits: &str) -> Result<Value> {
    Decimal::from_str(digits)
        .map(Value::Decimal)
        .map_err(|_| Error::type_mismatch("an integer within decimal range", digits))
}

fn expect_text(value: Value, expected: &str) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(Error::type_mismatch(expected, other.kind().as_str())),
    }
}

fn table_container(tables: Value) -> Result<Value> {
    let mut tables = match tables {
        Value::Struct(tables) => tables,
        other => return Err(Error::type_mismatch("a table set", other.kind().as_str())),
    };
    match tables.len() {
        0 => Err(Error::type_mismatch(
            "at least one table",
            "an empty table set",
        )),
        1 => {
            let name = tables.keys().next().cloned().unwrap_or_default();
            Ok(tables.remove(&name).unwrap_or_default())
        }
        _ => Ok(Value::Struct(tables)),
    }
}

/// Flattens nested arrays in row-major order, requiring equal lengths at every level.
fn flatten_rectangular(nested: Value) -> Result<Vec<Value>> {
    let mut shape = Vec::new();
    let mut probe = &nested;
    while let Value::Array(items) = probe {
        shape.push(items.len());
        match items.first() {
            Some(first) => probe = first,
            None => break,
        }
    }

    let mut flat = Vec::with_capacity(shape.iter().product());
    flatten_level(nested, &shape, &mut flat)?;
    Ok(flat)
}

fn flatten_level(value: Value, shape: &[usize], flat: &mut Vec<Value>) -> Result<()> {
    let Some((&length, inner)) = shape.split_first() else {
        if value.is_array() {
            return Err(Error::type_mismatch("a rectangular array", "a ragged array"));
        }
        flat.push(value);
        return Ok(());
    };
    match value {
        Value::Array(items) if items.len() == length => {
            for item in items {
                flatten_level(item, inner, flat)?;
            }
            Ok(())
        }
        Value::Array(items) => Err(Error::type_mismatch(
            &format!("a rectangular array with {} elements per row", length),
            &format!("a row of {} elements", items.len()),
        )),
        other => Err(Error::type_mismatch(
            "a rectangular array",
            &format!("a {} inside the array", other.kind()),
        )),
    }
}

pub(crate) struct SerializeVec<'a> {
    guard: &'a mut Guard,
    vec: Vec<Value>,
    variant: Option<&'static str>,
}

impl<'a> SerializeVec<'a> {
    fn new(guard: &'a mut Guard, len: usize, variant: Option<&'static str>) -> Self {
        SerializeVec {
            guard,
            vec: Vec::with_capacity(len.min(4096)),
            variant,
        }
    }

    fn push<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let value = self.guard.project(value)?;
        self.vec.push(value);
        Ok(())
    }

    fn finish(self) -> Value {
        let array = Value::Array(self.vec);
        match self.variant {
            Some(variant) => {
                let mut members = WddxMap::with_capacity(1);
                members.insert(variant.to_string(), array);
                Value::Struct(members)
            }
            None => array,
        }
    }
}

impl ser::SerializeSeq for SerializeVec<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SerializeVec<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SerializeVec<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SerializeVec<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

#[derive(Clone, Copy)]
pub(crate) enum Shape {
    Map,
    Struct(&'static str),
    Variant(&'static str),
}

pub(crate) struct SerializeMap<'a> {
    guard: &'a mut Guard,
    map: WddxMap,
    current_key: Option<String>,
    shape: Shape,
}

impl<'a> SerializeMap<'a> {
    fn new(guard: &'a mut Guard, len: usize, shape: Shape) -> Self {
        SerializeMap {
            guard,
            map: WddxMap::with_capacity(len.min(4096)),
            current_key: None,
            shape,
        }
    }

    fn insert<T>(&mut self, key: String, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let value = self.guard.project(value)?;
        self.map.insert(key, value);
        Ok(())
    }

    fn finish(self) -> Value {
        match self.shape {
            Shape::Map => Value::Struct(self.map),
            // A struct without members is written as its name
            Shape::Struct(name) if self.map.is_empty() => Value::Text(name.to_string()),
            Shape::Struct(_) => Value::Struct(self.map),
            Shape::Variant(variant) => {
                let mut members = WddxMap::with_capacity(1);
                members.insert(variant.to_string(), Value::Struct(self.map));
                Value::Struct(members)
            }
        }
    }
}

impl ser::SerializeMap for SerializeMap<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = match self.guard.project(key)? {
            Value::Text(s) => s,
            Value::Int32(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Decimal(d) if d.scale() == 0 => d.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(Error::type_mismatch(
                    "a string, integer or boolean map key",
                    other.kind().as_str(),
                ))
            }
        };
        self.current_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for SerializeMap<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for SerializeMap<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Zone;
    use chrono::FixedOffset;
    use serde::Serialize;
    use std::collections::BTreeMap;

    fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
        project(value, 128)
    }

    fn write(value: &Value) -> String {
        let mut serializer = Serializer::new(WddxOptions::new());
        serializer.serialize_value(value).unwrap();
        serializer.into_inner()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(write(&Value::Null), "<null />");
        assert_eq!(write(&Value::Bool(false)), "<boolean value=\"false\" />");
        assert_eq!(write(&Value::Float32(-1.23)), "<number>-1.23</number>");
        assert_eq!(write(&Value::from("a<b")), "<string>a&lt;b</string>");
    }

    #[test]
    fn test_envelope() {
        let mut serializer = Serializer::new(WddxOptions::new());
        serializer.serialize_packet(&Value::Null).unwrap();
        assert_eq!(
            serializer.into_inner(),
            "<wddxPacket version=\"1.0\"><header /><data><null /></data></wddxPacket>"
        );

        let mut serializer = Serializer::new(WddxOptions::new().with_xml_declaration(true));
        serializer.serialize_packet(&Value::Null).unwrap();
        assert!(serializer
            .into_inner()
            .starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><wddxPacket"));
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(write(&Value::Array(vec![])), "<array length=\"0\" />");
        assert_eq!(write(&Value::Struct(WddxMap::new())), "<struct />");
        assert_eq!(
            write(&Value::Table(Table::new())),
            "<recordset rowCount=\"0\" fieldNames=\"\" />"
        );
        assert_eq!(
            write(&Value::Table(Table::with_fields(["a"]).unwrap())),
            "<recordset rowCount=\"0\" fieldNames=\"a\"><field name=\"a\" /></recordset>"
        );
    }

    #[test]
    fn test_recordset_is_column_major() {
        let table = Table::from_columns([
            ("id", vec![Value::from(1), Value::from(2)]),
            ("name", vec![Value::from("a"), Value::from("b")]),
        ])
        .unwrap();
        assert_eq!(
            write(&Value::Table(table)),
            "<recordset rowCount=\"2\" fieldNames=\"id,name\">\
             <field name=\"id\"><number>1</number><number>2</number></field>\
             <field name=\"name\"><string>a</string><string>b</string></field>\
             </recordset>"
        );
    }

    #[test]
    fn test_timestamp_uses_zone() {
        let options =
            WddxOptions::new().with_zone(Zone::Fixed(FixedOffset::west_opt(5 * 3600).unwrap()));
        let mut serializer = Serializer::new(options);
        let instant = DateTime::parse_from_rfc3339("2001-06-17T17:00:30Z").unwrap();
        serializer
            .serialize_value(&Value::Timestamp(instant))
            .unwrap();
        assert_eq!(
            serializer.into_inner(),
            "<dateTime>2001-06-17T12:00:30-5:0</dateTime>"
        );
    }

    #[test]
    fn test_non_finite_number_fails() {
        let mut serializer = Serializer::new(WddxOptions::new());
        assert!(matches!(
            serializer.serialize_value(&Value::Float64(f64::INFINITY)),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_depth_limit_on_write() {
        let mut value = Value::Null;
        for _ in 0..10 {
            value = Value::Array(vec![value]);
        }
        let mut serializer = Serializer::new(WddxOptions::new().with_max_depth(5));
        assert!(matches!(
            serializer.serialize_value(&value),
            Err(Error::DepthLimitExceeded(5))
        ));
    }

    #[test]
    fn test_integer_projection() {
        assert_eq!(to_value(&7u8).unwrap(), Value::Int32(7));
        assert_eq!(to_value(&7u32).unwrap(), Value::Int64(7));
        assert_eq!(
            to_value(&u64::MAX).unwrap(),
            Value::Decimal(Decimal::from(u64::MAX))
        );
        assert_eq!(to_value(&-5i128).unwrap(), Value::Int64(-5));
        assert!(matches!(to_value(&u128::MAX), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_enum_projection() {
        #[derive(Serialize)]
        enum Shape {
            Empty,
            Circle(f64),
            Line(i32, i32),
            Rect { w: i32, h: i32 },
        }

        assert_eq!(to_value(&Shape::Empty).unwrap(), Value::from("Empty"));

        let circle = to_value(&Shape::Circle(1.5)).unwrap();
        assert_eq!(circle.as_struct().unwrap().get("Circle"), Some(&Value::Float64(1.5)));

        let line = to_value(&Shape::Line(1, 2)).unwrap();
        assert_eq!(
            line.as_struct().unwrap().get("Line"),
            Some(&Value::Array(vec![Value::Int32(1), Value::Int32(2)]))
        );

        let rect = to_value(&Shape::Rect { w: 3, h: 4 }).unwrap();
        let inner = rect.as_struct().unwrap().get("Rect").unwrap();
        assert_eq!(inner.as_struct().unwrap().get("h"), Some(&Value::Int32(4)));
    }

    #[test]
    fn test_memberless_struct_is_its_name() {
        #[derive(Serialize)]
        struct Marker {}
        #[derive(Serialize)]
        struct Unit;

        assert_eq!(to_value(&Marker {}).unwrap(), Value::from("Marker"));
        assert_eq!(to_value(&Unit).unwrap(), Value::from("Unit"));
    }

    #[test]
    fn test_map_keys() {
        let mut numbered = BTreeMap::new();
        numbered.insert(2, "b");
        numbered.insert(1, "a");
        let value = to_value(&numbered).unwrap();
        let keys: Vec<_> = value.as_struct().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["1", "2"]);

        let mut bad = BTreeMap::new();
        bad.insert(vec![1], 1);
        assert!(matches!(to_value(&bad), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_rectangular_flattening() {
        let grid = [[1, 1], [2, 2], [3, 5], [4, 5]];
        let flat = to_value(&Rectangular(grid)).unwrap();
        let expected: Vec<Value> = [1, 1, 2, 2, 3, 5, 4, 5].into_iter().map(Value::from).collect();
        assert_eq!(flat, Value::Array(expected));

        // Without the marker nested arrays stay nested
        let jagged = to_value(&grid).unwrap();
        assert_eq!(jagged.as_array().unwrap().len(), 4);

        let cube = vec![vec![vec![0u8; 2]; 3]; 2];
        let flat = to_value(&Rectangular(&cube)).unwrap();
        assert_eq!(flat.as_array().unwrap().len(), 12);

        let empty: Vec<Vec<i32>> = Vec::new();
        assert_eq!(to_value(&Rectangular(empty)).unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn test_ragged_rectangular_fails() {
        let ragged = vec![vec![1, 2], vec![3]];
        assert!(matches!(
            to_value(&Rectangular(ragged)),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_projection_depth_limit() {
        let mut nested = serde_json::json!(1);
        for _ in 0..20 {
            nested = serde_json::json!([nested]);
        }
        assert!(matches!(
            project(&nested, 8),
            Err(Error::DepthLimitExceeded(8))
        ));
        assert!(project(&nested, 64).is_ok());
    }

    #[test]
    fn test_shared_values_are_not_cycles() {
        let shared = vec![1, 2, 3];
        let pair = (&shared, &shared);
        let value = to_value(&pair).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}

//! WDDX deserialization.
//!
//! This module provides the [`Deserializer`], which reads a packet into a [`Value`] tree,
//! and the serde plumbing that hands that tree to `Deserialize` implementations.
//!
//! ## Overview
//!
//! - **Streaming markup**: elements are pulled from a `quick-xml` reader one at a time and
//!   each is handed to the codec registered for its name
//! - **Strict dispatch**: an element name with no codec is an [`Error::UnsupportedTag`]
//! - **Bounded nesting**: containers deeper than `max_depth` are rejected
//! - **Lenient envelope**: the XML declaration, comments, the `header` element and
//!   whitespace between elements are ignored
//!
//! ## Usage
//!
//! Most users should use the high-level functions in the crate root:
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_wddx::from_str;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Point { x: i32, y: i32 }
//!
//! let wddx = r#"<wddxPacket version="1.0"><header /><data><struct>
//!     <var name="x"><number>1</number></var>
//!     <var name="y"><number>2</number></var>
//! </struct></data></wddxPacket>"#;
//!
//! let point: Point = from_str(wddx).unwrap();
//! assert_eq!(point, Point { x: 1, y: 2 });
//! ```
//!
//! ## Working with Values
//!
//! ```rust
//! use serde_wddx::{Deserializer, Value, WddxOptions};
//!
//! let wddx = r#"<wddxPacket version="1.0"><header /><data><array length="2">
//!     <string>a<char code="0a" />b</string><null />
//! </array></data></wddxPacket>"#;
//!
//! let mut deserializer = Deserializer::from_str(wddx, WddxOptions::new());
//! let value = deserializer.decode_packet().unwrap();
//! assert_eq!(value, Value::Array(vec![Value::from("a\nb"), Value::Null]));
//! ```

use crate::binary::Base64Decoder;
use crate::format::{Tag, CHAR, DATA, FIELD, HEADER, PACKET, VAR};
use crate::value::{widen_f32, DECIMAL_TOKEN, RECORDSET_TOKEN, TIMESTAMP_TOKEN};
use crate::{datetime, number, text};
use crate::{Error, Result, Table, Value, WddxMap, WddxOptions};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_decimal::prelude::ToPrimitive;
use serde::de::{self, Deserializer as _, IntoDeserializer};
use serde::forward_to_deserialize_any;
use std::io::BufRead;

/// The WDDX packet reader.
///
/// Reads a packet from any buffered source into a [`Value`], or directly into a type
/// implementing `Deserialize` through `&mut Deserializer`.
pub struct Deserializer<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    options: WddxOptions,
    depth: usize,
}

impl<'a> Deserializer<&'a [u8]> {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &'a str, options: WddxOptions) -> Self {
        Deserializer::from_reader(input.as_bytes(), options)
    }
}

impl<R: BufRead> Deserializer<R> {
    pub fn from_reader(reader: R, options: WddxOptions) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(false);
        Deserializer {
            reader,
            buf: Vec::new(),
            options,
            depth: 0,
        }
    }

    /// Reads the packet envelope and decodes the single value inside `data`.
    ///
    /// Reading stops once that value is complete; anything after it is never read.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup is malformed, the envelope has no value, or any
    /// element content fails to decode.
    pub fn decode_packet(&mut self) -> Result<Value> {
        let root = loop {
            match self.next_token()? {
                Token::Start(element) => break element,
                Token::Text(text) if is_blank(&text) => continue,
                Token::Text(_) => {
                    return Err(Error::format(PACKET, "text before the root element"))
                }
                Token::End(name) => {
                    return Err(Error::format(PACKET, format!("unexpected </{}>", name)))
                }
                Token::Eof => return Err(Error::unexpected_eof("<wddxPacket>")),
            }
        };
        if root.name != PACKET {
            return Err(Error::format(
                PACKET,
                format!("expected <{}> as the root element, found <{}>", PACKET, root.name),
            ));
        }
        if root.empty {
            return Err(Error::format(DATA, "packet has no data element"));
        }

        while let Some(child) = self.next_child(PACKET)? {
            match child.name.as_str() {
                DATA => return self.decode_data(child),
                HEADER => self.skip_element(&child)?,
                _ => {
                    tracing::debug!(element = %child.name, "skipping unexpected packet element");
                    self.skip_element(&child)?;
                }
            }
        }
        Err(Error::format(DATA, "packet has no data element"))
    }

    fn decode_data(&mut self, data: Element) -> Result<Value> {
        if data.empty {
            return Err(Error::format(DATA, "data element is empty"));
        }
        let element = self
            .next_child(DATA)?
            .ok_or_else(|| Error::format(DATA, "data element is empty"))?;
        self.decode_value(element)
    }

    /// Decodes the value whose start tag has just been read.
    fn decode_value(&mut self, element: Element) -> Result<Value> {
        let tag = Tag::from_name(&element.name)?;
        if self.depth >= self.options.max_depth {
            return Err(Error::DepthLimitExceeded(self.options.max_depth));
        }
        tracing::trace!(%tag, "decoding element");

        self.depth += 1;
        let result = self.decode_content(tag, &element);
        self.depth -= 1;
        result
    }

    fn decode_content(&mut self, tag: Tag, element: &Element) -> Result<Value> {
        match tag {
            Tag::String => self.decode_string(element),
            Tag::Number => number::parse(&self.read_text(element)?),
            Tag::DateTime => {
                let text = self.read_text(element)?;
                datetime::parse(&text, &self.options.zone).map(Value::Timestamp)
            }
            Tag::Boolean => self.decode_boolean(element),
            Tag::Null => self.skip_element(element).map(|()| Value::Null),
            Tag::Binary => self.decode_binary(element),
            Tag::Array => self.decode_array(element),
            Tag::Struct => self.decode_struct(element),
            Tag::Recordset => self.decode_recordset(element),
        }
    }

    fn decode_string(&mut self, element: &Element) -> Result<Value> {
        let mut content = String::new();
        if element.empty {
            return Ok(Value::Text(content));
        }
        loop {
            match self.next_token()? {
                Token::Text(text) => content.push_str(&text),
                Token::Start(marker) if marker.name == CHAR => {
                    let code = marker
                        .attribute("code")
                        .ok_or_else(|| Error::format(CHAR, "missing code attribute"))?;
                    content.push(text::decode_char_code(code)?);
                    self.skip_element(&marker)?;
                }
                Token::Start(other) => {
                    return Err(Error::format(
                        &element.name,
                        format!("unexpected <{}>", other.name),
                    ))
                }
                Token::End(_) => return Ok(Value::Text(content)),
                Token::Eof => return Err(Error::unexpected_eof("</string>")),
            }
        }
    }

    // Any value other than "true" (in any case) reads as false.
    fn decode_boolean(&mut self, element: &Element) -> Result<Value> {
        let flag = element
            .attribute("value")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .ok_or_else(|| Error::format(&element.name, "missing value attribute"))?;
        self.skip_element(element)?;
        Ok(Value::Bool(flag))
    }

    fn decode_binary(&mut self, element: &Element) -> Result<Value> {
        let mut decoder = match element.attribute("length") {
            Some(length) => Base64Decoder::with_length(parse_count(&element.name, "length", length)?),
            None => Base64Decoder::growable(),
        };
        if !element.empty {
            loop {
                match self.next_token()? {
                    Token::Text(text) => decoder.feed(&text)?,
                    Token::End(_) => break,
                    Token::Start(other) => {
                        return Err(Error::format(
                            &element.name,
                            format!("unexpected <{}>", other.name),
                        ))
                    }
                    Token::Eof => return Err(Error::unexpected_eof("</binary>")),
                }
            }
        }
        decoder.finish().map(Value::Bytes)
    }

    fn decode_array(&mut self, element: &Element) -> Result<Value> {
        let mut items = Vec::new();
        if !element.empty {
            while let Some(child) = self.next_child(&element.name)? {
                items.push(self.decode_value(child)?);
            }
        }
        if let Some(length) = element.attribute("length") {
            if length.trim().parse::<usize>().ok() != Some(items.len()) {
                tracing::debug!(
                    declared = length,
                    actual = items.len(),
                    "array length attribute disagrees with its elements"
                );
            }
        }
        Ok(Value::Array(items))
    }

    fn decode_struct(&mut self, element: &Element) -> Result<Value> {
        let mut members = WddxMap::new();
        if element.empty {
            return Ok(Value::Struct(members));
        }
        while let Some(var) = self.next_child(&element.name)? {
            if var.name != VAR {
                return Err(Error::format(
                    &element.name,
                    format!("expected <{}>, found <{}>", VAR, var.name),
                ));
            }
            let name = var
                .attribute("name")
                .ok_or_else(|| Error::format(VAR, "missing name attribute"))?
                .to_string();
            let member = self.decode_single(&var)?;
            if members.insert(name, member).is_some() {
                tracing::debug!(member = var.attribute("name"), "struct member overwritten");
            }
        }
        Ok(Value::Struct(members))
    }

    /// Decodes the optional single value inside a `var`.
    fn decode_single(&mut self, wrapper: &Element) -> Result<Value> {
        if wrapper.empty {
            return Ok(Value::Null);
        }
        let Some(child) = self.next_child(&wrapper.name)? else {
            return Ok(Value::Null);
        };
        let value = self.decode_value(child)?;
        if self.next_child(&wrapper.name)?.is_some() {
            return Err(Error::format(&wrapper.name, "holds more than one value"));
        }
        Ok(value)
    }

    fn decode_recordset(&mut self, element: &Element) -> Result<Value> {
        let declared_rows = element
            .attribute("rowCount")
            .map(|count| parse_count(&element.name, "rowCount", count))
            .transpose()?;

        let mut columns: Vec<(String, Option<crate::ValueKind>, Vec<Value>)> = Vec::new();
        if !element.empty {
            while let Some(field) = self.next_child(&element.name)? {
                if field.name != FIELD {
                    return Err(Error::format(
                        &element.name,
                        format!("expected <{}>, found <{}>", FIELD, field.name),
                    ));
                }
                let name = field
                    .attribute("name")
                    .ok_or_else(|| Error::format(FIELD, "missing name attribute"))?
                    .to_string();
                if columns.iter().any(|(existing, _, _)| *existing == name) {
                    return Err(Error::format(
                        &element.name,
                        format!("duplicate field {:?}", name),
                    ));
                }

                let mut cells = Vec::new();
                if !field.empty {
                    while let Some(cell) = self.next_child(FIELD)? {
                        cells.push(self.decode_value(cell)?);
                    }
                }
                let kind = cells.first().map(Value::kind);
                columns.push((name, kind, cells));
            }
        }

        let row_count = declared_rows
            .or_else(|| columns.first().map(|(_, _, cells)| cells.len()))
            .unwrap_or(0);
        if let Some((name, _, cells)) = columns.iter().find(|(_, _, c)| c.len() != row_count) {
            return Err(Error::format(
                &element.name,
                format!(
                    "field {:?} has {} cells but the recordset has {} rows",
                    name,
                    cells.len(),
                    row_count
                ),
            ));
        }

        if let Some(listed) = element.attribute("fieldNames") {
            let listed: Vec<&str> = listed.split(',').map(str::trim).filter(|n| !n.is_empty()).collect();
            let decoded: Vec<&str> = columns.iter().map(|(name, _, _)| name.as_str()).collect();
            if listed != decoded {
                tracing::debug!(
                    declared = ?listed,
                    actual = ?decoded,
                    "recordset fieldNames disagrees with its fields"
                );
            }
        }

        Ok(Value::Table(Table::from_decoded(columns, row_count)))
    }

    /// Returns the next child element of `parent`, or `None` at its end tag.
    fn next_child(&mut self, parent: &str) -> Result<Option<Element>> {
        loop {
            match self.next_token()? {
                Token::Start(element) => return Ok(Some(element)),
                Token::End(_) => return Ok(None),
                Token::Text(text) if is_blank(&text) => continue,
                Token::Text(text) => {
                    return Err(Error::format(
                        parent,
                        format!("unexpected text {:?}", text.trim()),
                    ))
                }
                Token::Eof => return Err(Error::unexpected_eof(&format!("</{}>", parent))),
            }
        }
    }

    /// Reads the text content of a leaf element through its end tag.
    fn read_text(&mut self, element: &Element) -> Result<String> {
        let mut content = String::new();
        if element.empty {
            return Ok(content);
        }
        loop {
            match self.next_token()? {
                Token::Text(text) => content.push_str(&text),
                Token::End(_) => return Ok(content),
                Token::Start(other) => {
                    return Err(Error::format(
                        &element.name,
                        format!("unexpected <{}>", other.name),
                    ))
                }
                Token::Eof => return Err(Error::unexpected_eof(&format!("</{}>", element.name))),
            }
        }
    }

    /// Skips everything up to and including the end tag of `element`.
    fn skip_element(&mut self, element: &Element) -> Result<()> {
        if element.empty {
            return Ok(());
        }
        let mut open = 1usize;
        while open > 0 {
            match self.next_token()? {
                Token::Start(child) if !child.empty => open += 1,
                Token::End(_) => open -= 1,
                Token::Eof => return Err(Error::unexpected_eof(&format!("</{}>", element.name))),
                _ => {}
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => return Err(Error::xml(self.reader.buffer_position() as u64, e)),
            };
            let position = self.reader.buffer_position() as u64;
            let token = match event {
                Event::Start(start) => Token::Start(Element::read(&start, false, position)?),
                Event::Empty(start) => Token::Start(Element::read(&start, true, position)?),
                Event::End(end) => Token::End(utf8(end.name().as_ref(), position)?.to_string()),
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| Error::xml(position, e))?;
                    if text.is_empty() {
                        continue;
                    }
                    Token::Text(text.into_owned())
                }
                Event::CData(data) => Token::Text(utf8(&data, position)?.to_string()),
                Event::Eof => Token::Eof,
                _ => continue,
            };
            return Ok(token);
        }
    }
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::xml(position, e))
}

fn is_blank(text: &str) -> bool {
    text.trim_start_matches('\u{feff}').trim().is_empty()
}

fn parse_count(tag: &str, attribute: &str, text: &str) -> Result<usize> {
    text.trim().parse().map_err(|_| {
        Error::format(
            tag,
            format!("{} attribute {:?} is not a non-negative integer", attribute, text),
        )
    })
}

/// A start tag with its attributes decoded.
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    empty: bool,
}

impl Element {
    fn read(start: &BytesStart<'_>, empty: bool, position: u64) -> Result<Self> {
        let name = utf8(start.name().as_ref(), position)?.to_string();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| Error::xml(position, e))?;
            let key = utf8(attribute.key.as_ref(), position)?.to_string();
            let value = attribute
                .unescape_value()
                .map_err(|e| Error::xml(position, e))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            empty,
        })
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

enum Token {
    Start(Element),
    End(String),
    Text(String),
    Eof,
}

macro_rules! forward_to_value {
    ($($method:ident($($arg:ident: $ty:ty),*))*) => {
        $(
            fn $method<V>(self, $($arg: $ty,)* visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                ValueDeserializer::new(self.decode_packet()?).$method($($arg,)* visitor)
            }
        )*
    };
}

impl<'de, R: BufRead> de::Deserializer<'de> for &mut Deserializer<R> {
    type Error = Error;

    forward_to_value! {
        deserialize_any()
        deserialize_bool()
        deserialize_i8()
        deserialize_i16()
        deserialize_i32()
        deserialize_i64()
        deserialize_i128()
        deserialize_u8()
        deserialize_u16()
        deserialize_u32()
        deserialize_u64()
        deserialize_u128()
        deserialize_f32()
        deserialize_f64()
        deserialize_char()
        deserialize_str()
        deserialize_string()
        deserialize_bytes()
        deserialize_byte_buf()
        deserialize_option()
        deserialize_unit()
        deserialize_unit_struct(name: &'static str)
        deserialize_newtype_struct(name: &'static str)
        deserialize_seq()
        deserialize_tuple(len: usize)
        deserialize_tuple_struct(name: &'static str, len: usize)
        deserialize_map()
        deserialize_struct(name: &'static str, fields: &'static [&'static str])
        deserialize_enum(name: &'static str, variants: &'static [&'static str])
        deserialize_identifier()
        deserialize_ignored_any()
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(map: WddxMap) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ValueDeserializer::new(Value::Text(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

/// A single-entry map carrying a WDDX-only kind under its reserved token.
struct MarkerDeserializer {
    token: Option<&'static str>,
    value: Option<Value>,
}

impl MarkerDeserializer {
    fn new(token: &'static str, value: Value) -> Self {
        MarkerDeserializer {
            token: Some(token),
            value: Some(value),
        }
    }
}

impl<'de> de::MapAccess<'de> for MarkerDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.token.take() {
            Some(token) => seed.deserialize(token.into_deserializer()).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(usize::from(self.token.is_some()))
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl EnumDeserializer {
    fn new(variant: String, value: Value) -> Self {
        EnumDeserializer {
            variant,
            value: Some(value),
        }
    }
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ValueDeserializer::new(Value::Text(self.variant)))?;
        let visitor = VariantDeserializer { value: self.value };
        Ok((variant, visitor))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Some(Value::Null) | None => Ok(()),
            _ => Err(Error::custom("Expected unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("Expected newtype variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Array(arr)) => visitor.visit_seq(SeqDeserializer::new(arr)),
            _ => Err(Error::custom("Expected tuple variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Struct(members)) => visitor.visit_map(MapDeserializer::new(members)),
            _ => Err(Error::custom("Expected struct variant")),
        }
    }
}

/// Deserializes a host value out of a [`Value`].
pub(crate) struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    pub(crate) fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }

    fn deserialize_integer<'de, V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Decimal(d) if d.fract().is_zero() => {
                if let Some(i) = d.to_i64() {
                    visitor.visit_i64(i)
                } else if let Some(u) = d.to_u64() {
                    visitor.visit_u64(u)
                } else {
                    match d.to_i128() {
                        Some(i) => visitor.visit_i128(i),
                        None => Err(Error::type_mismatch("an integer", &d.to_string())),
                    }
                }
            }
            Value::Decimal(d) => Err(Error::type_mismatch("an integer", &d.to_string())),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }
}

macro_rules! deserialize_integers {
    ($($method:ident)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                self.deserialize_integer(visitor)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int32(i) => visitor.visit_i32(i),
            Value::Int64(i) => visitor.visit_i64(i),
            Value::Float32(f) => visitor.visit_f32(f),
            Value::Float64(f) => visitor.visit_f64(f),
            Value::Decimal(d) => visitor.visit_map(MarkerDeserializer::new(
                DECIMAL_TOKEN,
                Value::Text(d.to_string()),
            )),
            Value::Text(s) => visitor.visit_string(s),
            Value::Timestamp(dt) => visitor.visit_map(MarkerDeserializer::new(
                TIMESTAMP_TOKEN,
                Value::Text(dt.to_rfc3339()),
            )),
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            Value::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr)),
            Value::Struct(members) => visitor.visit_map(MapDeserializer::new(members)),
            Value::Table(table) => {
                visitor.visit_map(MarkerDeserializer::new(RECORDSET_TOKEN, table.into_repr()))
            }
        }
    }

    deserialize_integers! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Decimal(d) => ValueDeserializer::new(Value::Decimal(d)).deserialize_f64(visitor),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Float32(f) => visitor.visit_f64(widen_f32(f)),
            Value::Decimal(d) => match Value::Decimal(d).as_f64() {
                Some(f) => visitor.visit_f64(f),
                None => Err(Error::type_mismatch("a double", &d.to_string())),
            },
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Decimal(d) => visitor.visit_string(d.to_string()),
            Value::Timestamp(dt) => visitor.visit_string(dt.to_rfc3339()),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(ValueDeserializer::new(other)),
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        // Unit structs are written as their name
        match self.value {
            Value::Null | Value::Text(_) => visitor.visit_unit(),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V>(self, name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match (name, self.value) {
            (TIMESTAMP_TOKEN, Value::Timestamp(dt)) => visitor.visit_string(dt.to_rfc3339()),
            (TIMESTAMP_TOKEN, Value::Text(s)) => visitor.visit_string(s),
            (DECIMAL_TOKEN, Value::Decimal(d)) => visitor.visit_string(d.to_string()),
            (DECIMAL_TOKEN, Value::Float32(f)) => visitor.visit_string(f.to_string()),
            (DECIMAL_TOKEN | TIMESTAMP_TOKEN, other) => {
                ValueDeserializer::new(other).deserialize_any(visitor)
            }
            (_, value) => visitor.visit_newtype_struct(ValueDeserializer::new(value)),
        }
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Table(table) => visitor.visit_seq(SeqDeserializer::new(table.into_row_structs())),
            Value::Bytes(bytes) => visitor.visit_seq(SeqDeserializer::new(
                bytes.into_iter().map(Value::from).collect(),
            )),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            // Memberless structs are written as their name
            Value::Null | Value::Text(_) if fields.is_empty() => {
                visitor.visit_map(MapDeserializer::new(WddxMap::new()))
            }
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Text(s) => visitor.visit_enum(s.into_deserializer()),
            Value::Struct(members) if members.len() == 1 => {
                let mut iter = members.into_iter();
                match iter.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer::new(variant, value)),
                    None => Err(Error::custom("Expected enum variant")),
                }
            }
            Value::Struct(_) => Err(Error::custom("Expected enum variant")),
            other => Err(Error::type_mismatch("an enum", other.kind().as_str())),
        }
    }

    forward_to_deserialize_any! {
        bool char bytes byte_buf unit map identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde::Deserialize;
    use std::str::FromStr;

    fn packet(body: &str) -> String {
        format!(
            "<wddxPacket version=\"1.0\"><header /><data>{}</data></wddxPacket>",
            body
        )
    }

    fn decode(body: &str) -> Result<Value> {
        Deserializer::from_str(&packet(body), WddxOptions::new()).decode_packet()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(decode("<null />").unwrap(), Value::Null);
        assert_eq!(decode("<boolean value='true'/>").unwrap(), Value::Bool(true));
        assert_eq!(decode("<boolean value=\"TRUE\" />").unwrap(), Value::Bool(true));
        assert_eq!(decode("<boolean value=\"no\" />").unwrap(), Value::Bool(false));
        assert!(matches!(decode("<boolean />"), Err(Error::Format { .. })));
        assert_eq!(decode("<number>42</number>").unwrap(), Value::Int32(42));
        assert_eq!(decode("<string>a &amp; b</string>").unwrap(), Value::from("a & b"));
        assert_eq!(decode("<string />").unwrap(), Value::from(""));
        assert_eq!(decode("<string></string>").unwrap(), Value::from(""));
    }

    #[test]
    fn test_string_char_markers() {
        assert_eq!(
            decode("<string>a<char code=\"0a\"/>b<char code=\"09\"></char>c</string>").unwrap(),
            Value::from("a\nb\tc")
        );
        assert!(matches!(
            decode("<string><char /></string>"),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn test_whitespace_inside_string_is_kept() {
        assert_eq!(
            decode("<string>  padded  </string>").unwrap(),
            Value::from("  padded  ")
        );
    }

    #[test]
    fn test_cdata_text() {
        assert_eq!(
            decode("<string><![CDATA[<raw>]]></string>").unwrap(),
            Value::from("<raw>")
        );
    }

    #[test]
    fn test_struct_members() {
        let value = decode(
            "<struct type=\"x\"><var name=\"a\"><number>1</number></var>\
             <var name=\"b\" /><var name=\"a\"><number>2</number></var></struct>",
        )
        .unwrap();
        let members = value.as_struct().unwrap();
        assert_eq!(members.len(), 2);
        // Last write wins but the first position is kept
        assert_eq!(members.keys().next().map(String::as_str), Some("a"));
        assert_eq!(members.get("a"), Some(&Value::Int32(2)));
        assert_eq!(members.get("b"), Some(&Value::Null));
    }

    #[test]
    fn test_struct_requires_var_children() {
        assert!(matches!(
            decode("<struct><number>1</number></struct>"),
            Err(Error::Format { .. })
        ));
        assert!(matches!(
            decode("<struct><var><null /></var></struct>"),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn test_array_ignores_declared_length() {
        let value = decode("<array length=\"5\"><null /><null /></array>").unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(decode("<array length=\"0\"/>").unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn test_recordset() {
        let value = decode(
            "<recordset rowCount=\"2\" fieldNames=\"id,name\">\
             <field name=\"id\"><number>1</number><number>2</number></field>\
             <field name=\"name\"><string>a</string><null /></field></recordset>",
        )
        .unwrap();
        let table = value.as_table().unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.field_names(), ["id", "name"]);
        assert_eq!(table.get(1, "name"), Some(&Value::Null));
        assert_eq!(table.field_kind("name"), Some(crate::ValueKind::Text));
    }

    #[test]
    fn test_recordset_infers_row_count() {
        let value = decode(
            "<recordset fieldNames=\"id\"><field name=\"id\"><number>1</number>\
             <number>2</number><number>3</number></field></recordset>",
        )
        .unwrap();
        assert_eq!(value.as_table().unwrap().row_count(), 3);
    }

    #[test]
    fn test_recordset_shape_errors() {
        assert!(matches!(
            decode(
                "<recordset rowCount=\"2\" fieldNames=\"id\">\
                 <field name=\"id\"><number>1</number></field></recordset>"
            ),
            Err(Error::Format { .. })
        ));
        assert!(matches!(
            decode(
                "<recordset rowCount=\"0\" fieldNames=\"a,a\">\
                 <field name=\"a\" /><field name=\"a\" /></recordset>"
            ),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn test_binary() {
        assert_eq!(
            decode("<binary length=\"11\">Sm9lbCBy\n b2NrcyE=</binary>").unwrap(),
            Value::Bytes(b"Joel rocks!".to_vec())
        );
        assert_eq!(decode("<binary />").unwrap(), Value::Bytes(vec![]));
        assert!(matches!(
            decode("<binary>Sm9lb%Byb2NrcyE=</binary>"),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn test_unsupported_tag() {
        assert!(matches!(
            decode("<widget />"),
            Err(Error::UnsupportedTag(ref name)) if name == "widget"
        ));
    }

    #[test]
    fn test_envelope_errors() {
        let no_data = "<wddxPacket version=\"1.0\"><header /></wddxPacket>";
        assert!(matches!(
            Deserializer::from_str(no_data, WddxOptions::new()).decode_packet(),
            Err(Error::Format { .. })
        ));
        assert!(matches!(decode(""), Err(Error::Format { .. })));
        assert!(matches!(
            Deserializer::from_str("<wddxPacket>", WddxOptions::new()).decode_packet(),
            Err(Error::UnexpectedEof(_)) | Err(Error::Xml { .. })
        ));
    }

    #[test]
    fn test_header_and_declaration_are_ignored() {
        let wddx = "<?xml version=\"1.0\"?>\n<!-- note -->\n<wddxPacket version=\"1.0\">\n  \
                    <header><comment>hello</comment></header>\n  \
                    <data><number>1</number></data>\n</wddxPacket>";
        let value = Deserializer::from_str(wddx, WddxOptions::new())
            .decode_packet()
            .unwrap();
        assert_eq!(value, Value::Int32(1));
    }

    #[test]
    fn test_content_after_the_first_value_is_ignored() {
        assert_eq!(
            decode("<number>1</number><number>2</number>").unwrap(),
            Value::Int32(1)
        );

        let truncated = "<wddxPacket version=\"1.0\"><header /><data><string>kept</string><oops>";
        let value = Deserializer::from_str(truncated, WddxOptions::new())
            .decode_packet()
            .unwrap();
        assert_eq!(value, Value::from("kept"));
    }

    #[test]
    fn test_oversized_binary_length_is_format_error() {
        assert!(matches!(
            decode("<binary length=\"18446744073709551615\">AA==</binary>"),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn test_mismatched_end_tag_is_xml_error() {
        assert!(matches!(
            decode("<array length=\"1\"><null /></struct>"),
            Err(Error::Xml { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let body = format!("{}<null />{}", "<array>".repeat(10), "</array>".repeat(10));
        let result = Deserializer::from_str(&packet(&body), WddxOptions::new().with_max_depth(4))
            .decode_packet();
        assert!(matches!(result, Err(Error::DepthLimitExceeded(4))));
        assert!(decode(&body).is_ok());
    }

    #[test]
    fn test_float32_widens_for_f64_targets() {
        let value: f64 = f64::deserialize(ValueDeserializer::new(Value::Float32(29.99))).unwrap();
        assert_eq!(value, 29.99);
    }

    #[test]
    fn test_decimal_feeds_numeric_and_text_targets() {
        let d = Decimal::from_str("154523.85").unwrap();
        let as_f64 = f64::deserialize(ValueDeserializer::new(Value::Decimal(d))).unwrap();
        assert_eq!(as_f64, 154523.85);
        let as_text = String::deserialize(ValueDeserializer::new(Value::Decimal(d))).unwrap();
        assert_eq!(as_text, "154523.85");

        let whole = Value::Decimal(Decimal::from(u64::MAX));
        assert_eq!(u64::deserialize(ValueDeserializer::new(whole)).unwrap(), u64::MAX);
        assert!(i32::deserialize(ValueDeserializer::new(Value::Decimal(d))).is_err());
    }

    #[test]
    fn test_value_round_trip_is_lossless() {
        let table = Table::from_columns([("id", vec![Value::from(1)])]).unwrap();
        let instant = chrono::DateTime::parse_from_rfc3339("2001-06-17T12:00:30-05:00").unwrap();
        let original = Value::Array(vec![
            Value::Decimal(Decimal::from_str("1.25").unwrap()),
            Value::Timestamp(instant),
            Value::Table(table),
            Value::Float32(0.1),
            Value::Bytes(vec![1, 2]),
        ]);
        let back = Value::deserialize(ValueDeserializer::new(original.clone())).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_table_feeds_sequence_targets() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Row {
            id: i32,
        }

        let table = Table::from_columns([("id", vec![Value::from(1), Value::from(2)])]).unwrap();
        let rows: Vec<Row> = Vec::deserialize(ValueDeserializer::new(Value::Table(table))).unwrap();
        assert_eq!(rows, vec![Row { id: 1 }, Row { id: 2 }]);
    }

    #[test]
    fn test_bytes_feed_u8_sequences() {
        let bytes: Vec<u8> = Vec::deserialize(ValueDeserializer::new(Value::Bytes(vec![7, 8]))).unwrap();
        assert_eq!(bytes, vec![7, 8]);
    }

    #[test]
    fn test_enums() {
        #[derive(Deserialize, Debug, PartialEq)]
        enum Shape {
            Empty,
            Circle(f64),
        }

        let empty = Shape::deserialize(ValueDeserializer::new(Value::from("Empty"))).unwrap();
        assert_eq!(empty, Shape::Empty);

        let mut members = WddxMap::new();
        members.insert("Circle".to_string(), Value::Float64(1.5));
        let circle = Shape::deserialize(ValueDeserializer::new(Value::Struct(members))).unwrap();
        assert_eq!(circle, Shape::Circle(1.5));
    }
}

//! WDDX 1.0 packet vocabulary.
//!
//! A packet looks like this:
//!
//! ```text
//! <wddxPacket version="1.0">
//!   <header />
//!   <data>
//!     <struct>
//!       <var name="id"><number>5</number></var>
//!       <var name="title"><string>line one<char code="0a" />line two</string></var>
//!       <var name="when"><dateTime>2001-06-17T12:00:30-5:0</dateTime></var>
//!       <var name="blob"><binary length="11">Sm9lbCByb2NrcyE=</binary></var>
//!       <var name="ok"><boolean value="true" /></var>
//!       <var name="nothing"><null /></var>
//!       <var name="list"><array length="1"><number>1</number></array></var>
//!       <var name="rows">
//!         <recordset rowCount="2" fieldNames="id,name">
//!           <field name="id"><number>1</number><number>2</number></field>
//!           <field name="name"><string>a</string><string>b</string></field>
//!         </recordset>
//!       </var>
//!     </struct>
//!   </data>
//! </wddxPacket>
//! ```
//!
//! Encoded packets are written without whitespace between elements. Empty elements are
//! written as `<name />`.
//!
//! The value elements are listed by [`Tag`]; every other name used by the format is a
//! constant in this module.
//!
//! Markup is pushed onto a `String` rather than through `quick_xml::Writer`, which writes
//! empty elements as `<name/>` rather than the `<name />` form consumers compare byte for
//! byte.

use crate::{Error, Result};
use quick_xml::escape::partial_escape;
use std::fmt;
use std::str::FromStr;

pub const PACKET: &str = "wddxPacket";
pub const HEADER: &str = "header";
pub const COMMENT: &str = "comment";
pub const DATA: &str = "data";
pub const VAR: &str = "var";
pub const FIELD: &str = "field";
pub const CHAR: &str = "char";

pub const VERSION: &str = "1.0";
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// The value elements of the format, each handled by one codec.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::{Error, Tag};
///
/// assert_eq!(Tag::from_name("dateTime").unwrap(), Tag::DateTime);
/// assert_eq!(Tag::Recordset.as_str(), "recordset");
/// assert!(matches!(Tag::from_name("datetime"), Err(Error::UnsupportedTag(_))));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    String,
    Number,
    DateTime,
    Boolean,
    Null,
    Struct,
    Array,
    Binary,
    Recordset,
}

impl Tag {
    pub const ALL: [Tag; 9] = [
        Tag::String,
        Tag::Number,
        Tag::DateTime,
        Tag::Boolean,
        Tag::Null,
        Tag::Struct,
        Tag::Array,
        Tag::Binary,
        Tag::Recordset,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Tag::String => "string",
            Tag::Number => "number",
            Tag::DateTime => "dateTime",
            Tag::Boolean => "boolean",
            Tag::Null => "null",
            Tag::Struct => "struct",
            Tag::Array => "array",
            Tag::Binary => "binary",
            Tag::Recordset => "recordset",
        }
    }

    /// Looks up the codec for an element name. Names are case-sensitive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedTag`] for any name that is not a value element.
    pub fn from_name(name: &str) -> Result<Tag> {
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == name)
            .ok_or_else(|| Error::unsupported_tag(name))
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Tag::from_name(s)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn write_start(output: &mut String, name: &str, attributes: &[(&str, &str)]) {
    output.push('<');
    output.push_str(name);
    write_attributes(output, attributes);
    output.push('>');
}

pub(crate) fn write_empty(output: &mut String, name: &str, attributes: &[(&str, &str)]) {
    output.push('<');
    output.push_str(name);
    write_attributes(output, attributes);
    output.push_str(" />");
}

pub(crate) fn write_end(output: &mut String, name: &str) {
    output.push_str("</");
    output.push_str(name);
    output.push('>');
}

pub(crate) fn write_text(output: &mut String, text: &str) {
    output.push_str(&partial_escape(text));
}

fn write_attributes(output: &mut String, attributes: &[(&str, &str)]) {
    for (key, value) in attributes {
        output.push(' ');
        output.push_str(key);
        output.push_str("=\"");
        write_attribute_value(output, value);
        output.push('"');
    }
}

// Whitespace other than a plain space would be normalized away by XML readers.
fn write_attribute_value(output: &mut String, value: &str) {
    for ch in partial_escape(value).chars() {
        match ch {
            '"' => output.push_str("&quot;"),
            '\t' => output.push_str("&#x9;"),
            '\n' => output.push_str("&#xA;"),
            '\r' => output.push_str("&#xD;"),
            _ => output.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_round_trip() {
        for tag in Tag::ALL {
            assert_eq!(Tag::from_name(tag.as_str()).unwrap(), tag);
            assert_eq!(tag.as_str().parse::<Tag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_envelope_names_are_not_value_tags() {
        for name in [PACKET, HEADER, DATA, VAR, FIELD, CHAR, "String"] {
            assert!(matches!(Tag::from_name(name), Err(Error::UnsupportedTag(_))));
        }
    }

    #[test]
    fn test_markup_helpers() {
        let mut out = String::new();
        write_start(&mut out, "var", &[("name", "a\"b<c")]);
        write_text(&mut out, "1 < 2 & 3 > 2");
        write_empty(&mut out, "null", &[]);
        write_end(&mut out, "var");
        assert_eq!(
            out,
            "<var name=\"a&quot;b&lt;c\">1 &lt; 2 &amp; 3 &gt; 2<null /></var>"
        );
    }

    #[test]
    fn test_attribute_whitespace_is_escaped() {
        let mut out = String::new();
        write_empty(&mut out, "var", &[("name", "a\nb")]);
        assert_eq!(out, "<var name=\"a&#xA;b\" />");
    }
}

//! Document validation.
//!
//! A [`SchemaValidator`] checks a whole document before it is decoded. The crate ships
//! [`BaselineSchema`], which checks the WDDX 1.0 grammar:
//!
//! - element nesting: `wddxPacket` holds `header` then `data`, `data` and `var` hold
//!   exactly one value, `struct` holds `var` elements, `recordset` holds `field` elements,
//!   `string` holds text and `char` markers
//! - attributes: required attributes are present and every known attribute is lexically
//!   valid (`version` is `1.0`, counts are non-negative integers, `boolean/@value` is
//!   `true` or `false`, `char/@code` is hexadecimal)
//! - text content: `number` and `dateTime` text is well formed, `binary` text is base64
//!
//! The baseline grammar is stricter than the decoder. In particular `dateTime` text must
//! use one of the structured layouts, so dates written by legacy producers in free form
//! (`6/17/75`) are rejected here but still decode without validation.
//!
//! ## Examples
//!
//! ```rust
//! use serde_wddx::{BaselineSchema, SchemaValidator};
//!
//! let good = r#"<wddxPacket version="1.0"><header /><data><number>1</number></data></wddxPacket>"#;
//! assert!(BaselineSchema.validate(good).is_ok());
//!
//! let bad = r#"<wddxPacket version="1.0"><header /><data><number>one</number></data></wddxPacket>"#;
//! let issues = BaselineSchema.validate(bad).unwrap_err();
//! assert!(issues[0].message().contains("number"));
//! ```

use crate::format::{Tag, CHAR, COMMENT, DATA, FIELD, HEADER, PACKET, VAR, VERSION};
use crate::datetime;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;

/// One problem found by a [`SchemaValidator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    position: u64,
    message: String,
}

impl ValidationIssue {
    pub fn new(position: u64, message: impl Into<String>) -> Self {
        ValidationIssue {
            position,
            message: message.into(),
        }
    }

    /// Byte offset in the document near which the issue was found.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.position)
    }
}

/// Checks a document against a grammar before it is decoded.
///
/// Implementations must fail closed: a document that cannot be read is invalid.
pub trait SchemaValidator {
    /// Returns every issue found, or `Ok(())` for a valid document.
    ///
    /// # Errors
    ///
    /// Returns the issues when the document is not valid.
    fn validate(&self, document: &str) -> Result<(), Vec<ValidationIssue>>;
}

/// The WDDX 1.0 grammar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BaselineSchema;

impl SchemaValidator for BaselineSchema {
    fn validate(&self, document: &str) -> Result<(), Vec<ValidationIssue>> {
        let issues = Walk::new(document).run();
        if issues.is_empty() {
            Ok(())
        } else {
            tracing::debug!(issues = issues.len(), "document failed validation");
            Err(issues)
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Lexical {
    Any,
    Version,
    Count,
    Boolean,
    Hex,
    Number,
    DateTime,
    Base64,
    Encoding,
}

impl Lexical {
    fn accepts(self, text: &str) -> bool {
        match self {
            Lexical::Any => true,
            Lexical::Version => text == VERSION,
            Lexical::Count => is_digits(text.trim()),
            Lexical::Boolean => text == "true" || text == "false",
            Lexical::Hex => !text.is_empty() && text.bytes().all(|b| b.is_ascii_hexdigit()),
            Lexical::Number => is_number(text.trim()),
            Lexical::DateTime => datetime::parse_structured(text.trim()).is_some(),
            Lexical::Base64 => is_base64(text),
            Lexical::Encoding => text == "base64",
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Lexical::Any => "text",
            Lexical::Version => "version 1.0",
            Lexical::Count => "a non-negative integer",
            Lexical::Boolean => "true or false",
            Lexical::Hex => "a hexadecimal code",
            Lexical::Number => "a decimal number",
            Lexical::DateTime => "an ISO 8601 date and time",
            Lexical::Base64 => "base64 text",
            Lexical::Encoding => "base64",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Allowed {
    Values,
    Only(&'static str),
}

impl Allowed {
    fn permits(self, name: &str) -> bool {
        match self {
            Allowed::Values => Tag::from_name(name).is_ok(),
            Allowed::Only(only) => name == only,
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Allowed::Values => "a value",
            Allowed::Only(name) => name,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Content {
    Empty,
    Text(Lexical),
    /// Text interleaved with `char` markers.
    Characters,
    Children {
        allowed: Allowed,
        min: usize,
        max: Option<usize>,
    },
    Sequence(&'static [&'static str]),
}

struct Rule {
    name: &'static str,
    required: &'static [(&'static str, Lexical)],
    optional: &'static [(&'static str, Lexical)],
    content: Content,
}

const RULES: &[Rule] = &[
    Rule {
        name: PACKET,
        required: &[("version", Lexical::Version)],
        optional: &[],
        content: Content::Sequence(&[HEADER, DATA]),
    },
    Rule {
        name: HEADER,
        required: &[],
        optional: &[],
        content: Content::Children {
            allowed: Allowed::Only(COMMENT),
            min: 0,
            max: Some(1),
        },
    },
    Rule {
        name: COMMENT,
        required: &[],
        optional: &[],
        content: Content::Text(Lexical::Any),
    },
    Rule {
        name: DATA,
        required: &[],
        optional: &[],
        content: Content::Children {
            allowed: Allowed::Values,
            min: 1,
            max: Some(1),
        },
    },
    Rule {
        name: "null",
        required: &[],
        optional: &[],
        content: Content::Empty,
    },
    Rule {
        name: "boolean",
        required: &[("value", Lexical::Boolean)],
        optional: &[],
        content: Content::Empty,
    },
    Rule {
        name: "number",
        required: &[],
        optional: &[],
        content: Content::Text(Lexical::Number),
    },
    Rule {
        name: "dateTime",
        required: &[],
        optional: &[],
        content: Content::Text(Lexical::DateTime),
    },
    Rule {
        name: "string",
        required: &[],
        optional: &[],
        content: Content::Characters,
    },
    Rule {
        name: CHAR,
        required: &[("code", Lexical::Hex)],
        optional: &[],
        content: Content::Empty,
    },
    Rule {
        name: "binary",
        required: &[],
        optional: &[("length", Lexical::Count), ("encoding", Lexical::Encoding)],
        content: Content::Text(Lexical::Base64),
    },
    Rule {
        name: "array",
        required: &[("length", Lexical::Count)],
        optional: &[],
        content: Content::Children {
            allowed: Allowed::Values,
            min: 0,
            max: None,
        },
    },
    Rule {
        name: "struct",
        required: &[],
        optional: &[("type", Lexical::Any)],
        content: Content::Children {
            allowed: Allowed::Only(VAR),
            min: 0,
            max: None,
        },
    },
    Rule {
        name: VAR,
        required: &[("name", Lexical::Any)],
        optional: &[],
        content: Content::Children {
            allowed: Allowed::Values,
            min: 1,
            max: Some(1),
        },
    },
    Rule {
        name: "recordset",
        required: &[("rowCount", Lexical::Count), ("fieldNames", Lexical::Any)],
        optional: &[("type", Lexical::Any)],
        content: Content::Children {
            allowed: Allowed::Only(FIELD),
            min: 0,
            max: None,
        },
    },
    Rule {
        name: FIELD,
        required: &[("name", Lexical::Any)],
        optional: &[],
        content: Content::Children {
            allowed: Allowed::Values,
            min: 0,
            max: None,
        },
    },
];

fn rule_for(name: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.name == name)
}

struct Frame {
    rule: &'static Rule,
    children: Vec<String>,
    text: String,
}

/// One validation pass over a document.
struct Walk<'a> {
    reader: Reader<&'a [u8]>,
    stack: Vec<Frame>,
    issues: Vec<ValidationIssue>,
    seen_root: bool,
}

impl<'a> Walk<'a> {
    fn new(document: &'a str) -> Self {
        let mut reader = Reader::from_str(document);
        reader.config_mut().trim_text(false);
        Walk {
            reader,
            stack: Vec::new(),
            issues: Vec::new(),
            seen_root: false,
        }
    }

    fn run(mut self) -> Vec<ValidationIssue> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let event = match self.reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => {
                    let position = self.reader.buffer_position() as u64;
                    self.issues.push(ValidationIssue::new(position, e.to_string()));
                    break;
                }
            };
            let position = self.reader.buffer_position() as u64;
            match event {
                Event::Start(start) => {
                    self.open(&start, position);
                }
                Event::Empty(start) => {
                    if self.open(&start, position) {
                        self.close(position);
                    }
                }
                Event::End(_) => self.close(position),
                Event::Text(text) => match text.unescape() {
                    Ok(text) => self.text(&text, position),
                    Err(e) => self.issue(position, e.to_string()),
                },
                Event::CData(data) => match std::str::from_utf8(&data) {
                    Ok(text) => self.text(text, position),
                    Err(e) => self.issue(position, e.to_string()),
                },
                Event::Eof => break,
                _ => {}
            }
        }
        if !self.seen_root && self.issues.is_empty() {
            let position = self.reader.buffer_position() as u64;
            self.issue(position, format!("document has no <{}> element", PACKET));
        }
        self.issues
    }

    fn issue(&mut self, position: u64, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(position, message));
    }

    /// Checks a start tag. Returns whether a frame was pushed.
    fn open(&mut self, start: &BytesStart<'_>, position: u64) -> bool {
        let name = match std::str::from_utf8(start.name().as_ref()) {
            Ok(name) => name.to_string(),
            Err(e) => {
                self.issue(position, e.to_string());
                return false;
            }
        };

        match self.stack.last_mut() {
            Some(parent) => {
                let permitted = match parent.rule.content {
                    Content::Children { allowed, .. } => allowed.permits(&name),
                    Content::Sequence(names) => names.contains(&name.as_str()),
                    Content::Characters => name == CHAR,
                    Content::Empty | Content::Text(_) => false,
                };
                let parent_name = parent.rule.name;
                parent.children.push(name.clone());
                if !permitted {
                    self.issue(
                        position,
                        format!("<{}> is not allowed inside <{}>", name, parent_name),
                    );
                }
            }
            None if self.seen_root => {
                self.issue(position, format!("<{}> follows the root element", name));
            }
            None => {
                self.seen_root = true;
                if name != PACKET {
                    self.issue(
                        position,
                        format!("root element must be <{}>, found <{}>", PACKET, name),
                    );
                }
            }
        }

        let Some(rule) = rule_for(&name) else {
            self.issue(position, format!("unknown element <{}>", name));
            // Keep the walk balanced with a rule that accepts nothing.
            self.stack.push(Frame {
                rule: &UNKNOWN,
                children: Vec::new(),
                text: String::new(),
            });
            return true;
        };

        self.check_attributes(rule, start, position);
        self.stack.push(Frame {
            rule,
            children: Vec::new(),
            text: String::new(),
        });
        true
    }

    fn check_attributes(&mut self, rule: &Rule, start: &BytesStart<'_>, position: u64) {
        let mut present = Vec::new();
        for attribute in start.attributes() {
            let attribute = match attribute {
                Ok(attribute) => attribute,
                Err(e) => {
                    self.issue(position, e.to_string());
                    continue;
                }
            };
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = match attribute.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(e) => {
                    self.issue(position, e.to_string());
                    continue;
                }
            };
            let lexical = rule
                .required
                .iter()
                .chain(rule.optional)
                .find(|(name, _)| *name == key)
                .map(|(_, lexical)| *lexical);
            match lexical {
                Some(lexical) if !lexical.accepts(&value) => self.issue(
                    position,
                    format!(
                        "{}/@{} must be {}, found {:?}",
                        rule.name,
                        key,
                        lexical.describe(),
                        value
                    ),
                ),
                Some(_) => {}
                None => self.issue(
                    position,
                    format!("<{}> has no attribute {:?}", rule.name, key),
                ),
            }
            present.push(key);
        }

        for (name, _) in rule.required {
            if !present.iter().any(|key| key == name) {
                self.issue(
                    position,
                    format!("<{}> requires the {:?} attribute", rule.name, name),
                );
            }
        }
    }

    fn text(&mut self, text: &str, position: u64) {
        let Some(frame) = self.stack.last_mut() else {
            if !text.trim_start_matches('\u{feff}').trim().is_empty() {
                self.issue(position, "text outside the root element");
            }
            return;
        };
        match frame.rule.content {
            Content::Text(_) | Content::Characters => frame.text.push_str(text),
            _ if text.trim().is_empty() => {}
            _ => {
                let name = frame.rule.name;
                self.issue(position, format!("<{}> cannot contain text", name));
            }
        }
    }

    fn close(&mut self, position: u64) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let rule = frame.rule;
        match rule.content {
            Content::Text(lexical) if !lexical.accepts(&frame.text) => self.issue(
                position,
                format!(
                    "<{}> must contain {}, found {:?}",
                    rule.name,
                    lexical.describe(),
                    frame.text.trim()
                ),
            ),
            Content::Children { allowed, min, max } => {
                let count = frame.children.len();
                if count < min || max.map_or(false, |max| count > max) {
                    let expected = match (min, max) {
                        (min, Some(max)) if min == max => format!("exactly {}", min),
                        (0, Some(max)) => format!("at most {}", max),
                        (min, _) => format!("at least {}", min),
                    };
                    self.issue(
                        position,
                        format!(
                            "<{}> must hold {} {} element(s), found {}",
                            rule.name,
                            expected,
                            allowed.describe(),
                            count
                        ),
                    );
                }
            }
            Content::Sequence(names) if frame.children.iter().map(String::as_str).ne(names.iter().copied()) => {
                self.issue(
                    position,
                    format!("<{}> must hold <{}> in that order", rule.name, names.join("> <")),
                );
            }
            _ => {}
        }
    }
}

static UNKNOWN: Rule = Rule {
    name: "unknown",
    required: &[],
    optional: &[],
    content: Content::Children {
        allowed: Allowed::Values,
        min: 0,
        max: None,
    },
};

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

// -?\d+(\.\d+)?([eE][+-]?\d+)?
fn is_number(text: &str) -> bool {
    let text = text.strip_prefix('-').unwrap_or(text);
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(index) => (&text[..index], Some(&text[index + 1..])),
        None => (text, None),
    };
    let mantissa_ok = match mantissa.split_once('.') {
        Some((whole, fraction)) => is_digits(whole) && is_digits(fraction),
        None => is_digits(mantissa),
    };
    let exponent_ok = exponent.map_or(true, |exponent| {
        is_digits(exponent.strip_prefix(['+', '-']).unwrap_or(exponent))
    });
    mantissa_ok && exponent_ok
}

fn is_base64(text: &str) -> bool {
    let compact: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    let body_end = compact
        .iter()
        .position(|&b| b == b'=')
        .unwrap_or(compact.len());
    let (body, padding) = compact.split_at(body_end);
    compact.len() % 4 == 0
        && padding.len() <= 2
        && padding.iter().all(|&b| b == b'=')
        && body
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(body: &str) -> String {
        format!(
            "<wddxPacket version=\"1.0\"><header /><data>{}</data></wddxPacket>",
            body
        )
    }

    fn issues(document: &str) -> Vec<ValidationIssue> {
        BaselineSchema.validate(document).err().unwrap_or_default()
    }

    #[test]
    fn test_valid_packets() {
        for body in [
            "<null />",
            "<boolean value=\"true\" />",
            "<number>-1.5e3</number>",
            "<string>a<char code=\"0a\" />b</string>",
            "<dateTime>2001-06-17T12:00:30-5:0</dateTime>",
            "<binary length=\"11\">Sm9lbCByb2NrcyE=</binary>",
            "<array length=\"2\"><null /><string /></array>",
            "<struct><var name=\"a\"><null /></var></struct>",
            "<recordset rowCount=\"1\" fieldNames=\"a\"><field name=\"a\"><null /></field></recordset>",
        ] {
            assert_eq!(issues(&packet(body)), vec![], "{}", body);
        }
    }

    #[test]
    fn test_header_comment_and_whitespace() {
        let document = "<?xml version=\"1.0\"?>\n<wddxPacket version=\"1.0\">\n  \
                        <header><comment>note</comment></header>\n  \
                        <data><null /></data>\n</wddxPacket>\n";
        assert!(BaselineSchema.validate(document).is_ok());
    }

    #[test]
    fn test_lexical_failures() {
        assert_eq!(issues(&packet("<dateTime>6/17/75</dateTime>")).len(), 1);
        assert_eq!(issues(&packet("<binary>Sm9lb%Byb2NrcyE=</binary>")).len(), 1);
        assert_eq!(issues(&packet("<number>1.</number>")).len(), 1);
        assert_eq!(issues(&packet("<boolean value=\"yes\" />")).len(), 1);
        assert_eq!(issues(&packet("<string><char code=\"zz\" /></string>")).len(), 1);
    }

    #[test]
    fn test_structure_failures() {
        assert!(!issues(&packet("")).is_empty());
        assert!(!issues(&packet("<null /><null />")).is_empty());
        assert!(!issues(&packet("<struct><null /></struct>")).is_empty());
        assert!(!issues(&packet("<array><null /></array>")).is_empty());
        assert!(!issues(&packet("<widget />")).is_empty());
        assert!(!issues("<wddxPacket version=\"2.0\"><header /><data><null /></data></wddxPacket>").is_empty());
        assert!(!issues("<wddxPacket version=\"1.0\"><data><null /></data></wddxPacket>").is_empty());
    }

    #[test]
    fn test_every_issue_is_reported() {
        let found = issues(&packet(
            "<array length=\"2\"><dateTime>6/17/75</dateTime><binary>%%%%</binary></array>",
        ));
        assert_eq!(found.len(), 2);
        assert!(found[0].position() < found[1].position());
    }

    #[test]
    fn test_malformed_xml_fails_closed() {
        assert!(!issues("<wddxPacket version=\"1.0\"><header /><data><null /></struct>").is_empty());
        assert!(!issues("").is_empty());
        assert!(!issues("not xml at all").is_empty());
    }

    #[test]
    fn test_lexical_helpers() {
        assert!(is_number("0"));
        assert!(is_number("-12.456"));
        assert!(is_number("1E+20"));
        assert!(!is_number("1e"));
        assert!(!is_number("--1"));
        assert!(!is_number(".5"));

        assert!(is_base64("Sm9l\nbCBy b2NrcyE="));
        assert!(is_base64(""));
        assert!(!is_base64("Sm9lbCByb2NrcyE"));
        assert!(!is_base64("Sm=9"));
    }

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::new(12, "bad dateTime");
        assert_eq!(issue.to_string(), "bad dateTime (at byte 12)");
    }
}

//! Error types for WDDX serialization and deserialization.
//!
//! Every failure is fatal to the call that raised it: a failed encode never returns
//! partially written output and a failed decode never returns a partially built value.
//!
//! ## Error Categories
//!
//! - **Format Errors**: malformed `number`, `dateTime`, `binary` or structural content
//! - **Unsupported Tags**: an element name the decoder has no codec for
//! - **Type Mismatches**: a value shape that cannot be encoded (or decoded into the target type)
//! - **Validation Errors**: the document was rejected by the schema in validating mode
//! - **Cyclic References**: a host value refers back to one of its ancestors
//!
//! ## Examples
//!
//! ```rust
//! use serde_wddx::{from_str, Error, Value};
//!
//! let packet = r#"<wddxPacket version="1.0"><header /><data><widget /></data></wddxPacket>"#;
//! let result: Result<Value, Error> = from_str(packet);
//!
//! assert!(matches!(result, Err(Error::UnsupportedTag(ref tag)) if tag == "widget"));
//! ```

use crate::schema::ValidationIssue;
use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur during WDDX serialization/deserialization.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Malformed markup reported by the XML reader
    #[error("XML error at byte {position}: {msg}")]
    Xml { position: u64, msg: String },

    /// Malformed content inside a known element
    #[error("Format error in <{tag}>: {msg}")]
    Format { tag: String, msg: String },

    /// Element name with no registered codec
    #[error("Unsupported tag: {0}")]
    UnsupportedTag(String),

    /// A value shape that cannot be encoded or decoded as requested
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// The document was rejected by the schema validator
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        issues: Vec<ValidationIssue>,
    },

    /// A host value refers back to one of its ancestors
    #[error("Cyclic reference detected while serializing a value of type {0}")]
    CyclicReference(String),

    /// Nesting deeper than the configured limit
    #[error("Nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),

    /// Unexpected end of input
    #[error("Unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a format error for malformed content inside the element `tag`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wddx::Error;
    ///
    /// let err = Error::format("number", "'1.2.3' is not a number");
    /// assert_eq!(err.to_string(), "Format error in <number>: '1.2.3' is not a number");
    /// ```
    pub fn format<M: fmt::Display>(tag: &str, msg: M) -> Self {
        Error::Format {
            tag: tag.to_string(),
            msg: msg.to_string(),
        }
    }

    /// Creates an unsupported tag error.
    pub fn unsupported_tag(name: &str) -> Self {
        Error::UnsupportedTag(name.to_string())
    }

    /// Creates a type mismatch error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wddx::Error;
    ///
    /// let err = Error::type_mismatch("a finite number", "NaN");
    /// assert!(err.to_string().contains("expected a finite number"));
    /// ```
    pub fn type_mismatch(expected: &str, found: &str) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates a validation error carrying every issue the validator reported.
    ///
    /// The message is taken from the first issue.
    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        let message = issues
            .first()
            .map_or_else(|| "document is not valid".to_string(), ToString::to_string);
        Error::Validation { message, issues }
    }

    /// Creates a cyclic reference error for a value of the named type.
    pub fn cyclic_reference(type_name: &str) -> Self {
        Error::CyclicReference(type_name.to_string())
    }

    /// Creates an XML error at the given byte offset.
    pub fn xml<M: fmt::Display>(position: u64, msg: M) -> Self {
        Error::Xml {
            position,
            msg: msg.to_string(),
        }
    }

    /// Creates an unexpected end-of-input error.
    pub fn unexpected_eof(expected: &str) -> Self {
        Error::UnexpectedEof(expected.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wddx::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for stream reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns `true` for errors raised by the schema validator.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns `true` for malformed element content.
    #[must_use]
    pub const fn is_format(&self) -> bool {
        matches!(self, Error::Format { .. })
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

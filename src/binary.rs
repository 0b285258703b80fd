//! The `binary` element.
//!
//! Bytes are written as standard base64 with a `length` attribute holding the decoded
//! size. Decoding is incremental: text is fed in as the reader produces it and decoded
//! in chunks of [`CHUNK_SIZE`] base64 characters.
//!
//! - With a `length` attribute the buffer grows toward that size as chunks arrive, so a
//!   declared length never allocates more than the content produces. Content that
//!   decodes to more or fewer bytes is a format error.
//! - Without one the buffer grows chunk by chunk. A truncated final quantum (input that
//!   ends in the middle of a four-character group) ends decoding with the bytes decoded
//!   so far.
//!
//! Whitespace inside the base64 text is ignored. Characters outside the base64 alphabet
//! are a format error on both paths.

use crate::format::{self, Tag};
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Base64 characters decoded per step. A multiple of four.
pub(crate) const CHUNK_SIZE: usize = 1024;

const TAG: &str = Tag::Binary.as_str();

/// Writes a complete `binary` element.
pub(crate) fn encode(output: &mut String, bytes: &[u8]) {
    let length = bytes.len().to_string();
    let attributes = [("length", length.as_str())];
    if bytes.is_empty() {
        format::write_empty(output, TAG, &attributes);
        return;
    }
    format::write_start(output, TAG, &attributes);
    STANDARD.encode_string(bytes, output);
    format::write_end(output, TAG);
}

fn is_base64(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'/' | b'=')
}

enum Target {
    Sized { buffer: Vec<u8>, length: usize },
    Growable(Vec<u8>),
}

/// Incremental base64 decoder for `binary` content.
pub(crate) struct Base64Decoder {
    pending: Vec<u8>,
    target: Target,
}

impl Base64Decoder {
    /// Decodes into a buffer that must end up holding exactly `length` bytes.
    pub(crate) fn with_length(length: usize) -> Self {
        Base64Decoder {
            pending: Vec::with_capacity(CHUNK_SIZE),
            target: Target::Sized {
                buffer: Vec::with_capacity(length.min(CHUNK_SIZE / 4 * 3)),
                length,
            },
        }
    }

    /// Decodes into a buffer that grows as chunks arrive.
    pub(crate) fn growable() -> Self {
        Base64Decoder {
            pending: Vec::with_capacity(CHUNK_SIZE),
            target: Target::Growable(Vec::new()),
        }
    }

    /// Feeds a run of element text.
    pub(crate) fn feed(&mut self, text: &str) -> Result<()> {
        for byte in text.bytes().filter(|b| !b.is_ascii_whitespace()) {
            if !is_base64(byte) {
                return Err(Error::format(
                    TAG,
                    format!("{:?} is not a base64 character", char::from(byte)),
                ));
            }
            self.pending.push(byte);
            if self.pending.len() == CHUNK_SIZE {
                self.decode_pending()?;
            }
        }
        Ok(())
    }

    /// Decodes the remaining input and returns the bytes.
    pub(crate) fn finish(mut self) -> Result<Vec<u8>> {
        match self.target {
            Target::Sized { .. } => {
                self.decode_pending()?;
                match self.target {
                    Target::Sized { buffer, length } if buffer.len() == length => Ok(buffer),
                    Target::Sized { buffer, length } => Err(Error::format(
                        TAG,
                        format!(
                            "content decodes to {} bytes but length is {}",
                            buffer.len(),
                            length
                        ),
                    )),
                    Target::Growable(bytes) => Ok(bytes),
                }
            }
            Target::Growable(ref mut bytes) => {
                let complete = self.pending.len() - self.pending.len() % 4;
                if complete < self.pending.len() {
                    tracing::debug!(
                        dropped = self.pending.len() - complete,
                        "binary content ends inside a base64 quantum"
                    );
                }
                STANDARD
                    .decode_vec(&self.pending[..complete], bytes)
                    .map_err(|e| Error::format(TAG, e))?;
                Ok(std::mem::take(bytes))
            }
        }
    }

    fn decode_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        match &mut self.target {
            Target::Sized { buffer, length } => {
                STANDARD
                    .decode_vec(&self.pending, buffer)
                    .map_err(|e| Error::format(TAG, e))?;
                if buffer.len() > *length {
                    return Err(Error::format(
                        TAG,
                        format!("content decodes to more than {} bytes", length),
                    ));
                }
            }
            Target::Growable(bytes) => {
                STANDARD
                    .decode_vec(&self.pending, bytes)
                    .map_err(|e| Error::format(TAG, e))?;
            }
        }
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &[u8] = b"Joel rocks!";
    const ENCODED: &str = "Sm9lbCByb2NrcyE=";

    #[test]
    fn test_encode_with_length() {
        let mut out = String::new();
        encode(&mut out, TEXT);
        assert_eq!(out, "<binary length=\"11\">Sm9lbCByb2NrcyE=</binary>");
    }

    #[test]
    fn test_encode_empty() {
        let mut out = String::new();
        encode(&mut out, &[]);
        assert_eq!(out, "<binary length=\"0\" />");
    }

    #[test]
    fn test_decode_with_length() {
        let mut decoder = Base64Decoder::with_length(TEXT.len());
        decoder.feed(ENCODED).unwrap();
        assert_eq!(decoder.finish().unwrap(), TEXT);
    }

    #[test]
    fn test_decode_without_length() {
        let mut decoder = Base64Decoder::growable();
        decoder.feed("Sm9lbCBy\n  b2NrcyE=").unwrap();
        assert_eq!(decoder.finish().unwrap(), TEXT);
    }

    #[test]
    fn test_decode_spans_many_chunks() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let encoded = STANDARD.encode(&data);

        let mut sized = Base64Decoder::with_length(data.len());
        let mut growable = Base64Decoder::growable();
        for piece in encoded.as_bytes().chunks(700) {
            let piece = std::str::from_utf8(piece).unwrap();
            sized.feed(piece).unwrap();
            growable.feed(piece).unwrap();
        }
        assert_eq!(sized.finish().unwrap(), data);
        assert_eq!(growable.finish().unwrap(), data);
    }

    #[test]
    fn test_invalid_character_is_format_error() {
        let mut decoder = Base64Decoder::with_length(11);
        assert!(matches!(
            decoder.feed("Sm9lb%Byb2NrcyE="),
            Err(Error::Format { .. })
        ));

        let mut decoder = Base64Decoder::growable();
        assert!(decoder.feed("Sm9lb%Byb2NrcyE=").is_err());
    }

    #[test]
    fn test_length_mismatch_is_format_error() {
        let mut short = Base64Decoder::with_length(20);
        short.feed(ENCODED).unwrap();
        assert!(matches!(short.finish(), Err(Error::Format { .. })));

        let mut long = Base64Decoder::with_length(4);
        long.feed(ENCODED).unwrap();
        assert!(long.finish().is_err());
    }

    #[test]
    fn test_declared_length_is_not_preallocated() {
        let mut decoder = Base64Decoder::with_length(usize::MAX);
        decoder.feed(ENCODED).unwrap();
        assert!(matches!(decoder.finish(), Err(Error::Format { .. })));
    }

    #[test]
    fn test_truncated_quantum_without_length_keeps_decoded_bytes() {
        let mut decoder = Base64Decoder::growable();
        decoder.feed("Sm9lbCByb2Nr").unwrap();
        decoder.feed("cy").unwrap();
        assert_eq!(decoder.finish().unwrap(), b"Joel rock");
    }
}

//! The `string` element.
//!
//! XML cannot carry most control characters in text, so every character below U+0020
//! (tab, newline and carriage return included) is written as an inline
//! `<char code="xx" />` marker holding its two-digit lowercase hex code. Decoding puts
//! each marker's character back at its position.

use crate::format::{self, Tag, CHAR};
use crate::{Error, Result};

const TAG: &str = Tag::String.as_str();

/// Writes a complete `string` element.
pub(crate) fn encode(output: &mut String, text: &str) {
    if text.is_empty() {
        format::write_empty(output, TAG, &[]);
        return;
    }

    format::write_start(output, TAG, &[]);
    let mut run_start = 0;
    for (index, ch) in text.char_indices() {
        if is_control(ch) {
            format::write_text(output, &text[run_start..index]);
            write_char_marker(output, ch);
            run_start = index + ch.len_utf8();
        }
    }
    format::write_text(output, &text[run_start..]);
    format::write_end(output, TAG);
}

fn is_control(ch: char) -> bool {
    ch < ' '
}

fn write_char_marker(output: &mut String, ch: char) {
    let code = format!("{:02x}", u32::from(ch));
    format::write_empty(output, CHAR, &[("code", code.as_str())]);
}

/// Decodes the `code` attribute of a `char` marker.
pub(crate) fn decode_char_code(code: &str) -> Result<char> {
    let trimmed = code.trim();
    u32::from_str_radix(trimmed, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| Error::format(CHAR, format!("{:?} is not a character code", code)))
}

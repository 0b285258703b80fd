//! The `dateTime` element.
//!
//! Timestamps are written as local wall-clock time followed by the UTC offset in hours,
//! with the decimal point of the hour count replaced by a colon:
//!
//! | offset   | suffix  |
//! |----------|---------|
//! | +00:00   | `0:0`   |
//! | -05:00   | `-5:0`  |
//! | +05:30   | `5:5`   |
//! | -03:45   | `-3:75` |
//!
//! This suffix is what legacy producers emit and consumers expect, so it is kept as is.
//!
//! Decoding accepts, in order:
//!
//! 1. `yyyy-MM-ddTHH:mm:ss±hh:mm`
//! 2. unpadded date and time fields with the legacy `±H:F` suffix (`F` = hour fraction digits)
//! 3. unpadded fields with a whole-hour `±H` suffix
//! 4. unpadded fields with no suffix or a `Z`, read as UTC
//!
//! and then falls back to a generic parser (RFC 3339, RFC 2822 and common date layouts,
//! offset-less layouts read as UTC). The result is normalized into the configured
//! [`Zone`](crate::Zone).
//!
//! ## Struct fields
//!
//! `DateTime<FixedOffset>` fields serialize as plain strings through serde. Use this
//! module with `#[serde(with = "serde_wddx::datetime")]` to write them as `dateTime`
//! elements instead:
//!
//! ```rust
//! use chrono::{DateTime, FixedOffset};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Event {
//!     #[serde(with = "serde_wddx::datetime")]
//!     at: DateTime<FixedOffset>,
//! }
//!
//! let event = Event { at: DateTime::parse_from_rfc3339("2001-06-17T12:00:30-05:00").unwrap() };
//! let wddx = serde_wddx::to_string(&event).unwrap();
//! assert!(wddx.contains("<dateTime>"));
//!
//! let back: Event = serde_wddx::from_str(&wddx).unwrap();
//! assert_eq!(back, event);
//! ```

use crate::format::Tag;
use crate::options::Zone;
use crate::value::TIMESTAMP_TOKEN;
use crate::{Error, Result};
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::{de, Deserializer, Serializer};
use std::fmt;

const TAG: &str = Tag::DateTime.as_str();

/// Formats a timestamp in `zone` with the legacy offset suffix.
pub(crate) fn format(instant: &DateTime<FixedOffset>, zone: &Zone) -> String {
    let local = zone.localize(instant);
    let mut text = local.format("%Y-%m-%dT%H:%M:%S").to_string();
    text.push_str(&offset_suffix(local.offset().local_minus_utc()));
    text
}

fn offset_suffix(seconds: i32) -> String {
    let hours = (f64::from(seconds) / 3600.0).to_string();
    if hours.contains('.') {
        hours.replace('.', ":")
    } else {
        format!("{}:0", hours)
    }
}

/// Parses `dateTime` text and normalizes the result into `zone`.
pub(crate) fn parse(text: &str, zone: &Zone) -> Result<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::format(TAG, "a dateTime element cannot be empty"));
    }
    let parsed = parse_structured(text)
        .or_else(|| {
            tracing::debug!(text, "dateTime is not in a WDDX layout, trying generic formats");
            parse_generic(text)
        })
        .ok_or_else(|| Error::format(TAG, format!("{:?} is not a recognized date/time", text)))?;
    Ok(zone.localize(&parsed))
}

/// Parses the four WDDX layouts, without the generic fallback.
pub(crate) fn parse_structured(text: &str) -> Option<DateTime<FixedOffset>> {
    [
        Layout::Iso8601,
        Layout::LegacyOffset,
        Layout::WholeHours,
        Layout::Zulu,
    ]
    .into_iter()
    .find_map(|layout| layout.parse(text))
}

#[derive(Clone, Copy, Debug)]
enum Layout {
    /// `yyyy-MM-ddTHH:mm:ss±hh:mm`
    Iso8601,
    /// `yyyy-M-dTH:m:s±H:F`
    LegacyOffset,
    /// `yyyy-M-dTH:m:s±H`
    WholeHours,
    /// `yyyy-M-dTH:m:s` or `yyyy-M-dTH:m:sZ`
    Zulu,
}

impl Layout {
    fn parse(self, text: &str) -> Option<DateTime<FixedOffset>> {
        let mut cursor = Cursor::new(text);
        let padded = matches!(self, Layout::Iso8601);
        let local = cursor.date_time(padded)?;

        let seconds = match self {
            Layout::Iso8601 => {
                let sign = cursor.sign()?;
                let hours = cursor.digits(2, 2)?;
                cursor.expect(b':')?;
                let minutes = cursor.digits(2, 2)?;
                sign * (hours * 3600 + minutes * 60)
            }
            Layout::LegacyOffset => {
                let sign = cursor.sign().unwrap_or(1);
                let hours = cursor.digits(1, 2)?;
                cursor.expect(b':')?;
                let fraction = cursor.fraction_of_hour()?;
                sign * (hours * 3600 + fraction)
            }
            Layout::WholeHours => {
                let sign = cursor.sign().unwrap_or(1);
                sign * cursor.digits(1, 2)? * 3600
            }
            Layout::Zulu => {
                cursor.eat(b'Z');
                0
            }
        };

        if !cursor.at_end() {
            return None;
        }
        let offset = FixedOffset::east_opt(seconds)?;
        offset.from_local_datetime(&local).single()
    }
}

/// A byte cursor over ASCII date text.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.bytes.get(self.pos) == Some(&byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        self.eat(byte).then_some(())
    }

    fn sign(&mut self) -> Option<i32> {
        if self.eat(b'+') {
            Some(1)
        } else if self.eat(b'-') {
            Some(-1)
        } else {
            None
        }
    }

    /// Reads between `min` and `max` ASCII digits.
    fn digits(&mut self, min: usize, max: usize) -> Option<i32> {
        let start = self.pos;
        let mut value = 0i32;
        while self.pos - start < max {
            match self.bytes.get(self.pos) {
                Some(b) if b.is_ascii_digit() => {
                    value = value * 10 + i32::from(b - b'0');
                    self.pos += 1;
                }
                _ => break,
            }
        }
        (self.pos - start >= min).then_some(value)
    }

    /// Reads the digits after the colon of a legacy suffix as a fraction of an hour,
    /// returned in whole seconds.
    fn fraction_of_hour(&mut self) -> Option<i32> {
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        let digits = std::str::from_utf8(&self.bytes[start..self.pos]).ok()?;
        if digits.is_empty() {
            return None;
        }
        let fraction: f64 = format!("0.{}", digits).parse().ok()?;
        Some((fraction * 3600.0).round() as i32)
    }

    fn date_time(&mut self, padded: bool) -> Option<NaiveDateTime> {
        let narrow = if padded { 2 } else { 1 };
        let year = self.digits(4, 4)?;
        self.expect(b'-')?;
        let month = self.digits(narrow, 2)?;
        self.expect(b'-')?;
        let day = self.digits(narrow, 2)?;
        self.expect(b'T')?;
        let hour = self.digits(narrow, 2)?;
        self.expect(b':')?;
        let minute = self.digits(narrow, 2)?;
        self.expect(b':')?;
        let second = self.digits(narrow, 2)?;

        let date = NaiveDate::from_ymd_opt(year, month as u32, day as u32)?;
        let time = NaiveTime::from_hms_opt(hour as u32, minute as u32, second as u32)?;
        Some(date.and_time(time))
    }
}

const NAIVE_DATE_TIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%d %B %Y %H:%M:%S",
];

const NAIVE_DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%b %d, %Y",
];

/// Generic fallback for producers that ignore the format's layouts.
fn parse_generic(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt);
    }
    let naive = NAIVE_DATE_TIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .or_else(|| {
            NAIVE_DATE_LAYOUTS.iter().find_map(|layout| {
                NaiveDate::parse_from_str(text, layout)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
        })?;
    Some(Utc.from_utc_datetime(&naive).fixed_offset())
}

/// Serializes a timestamp as a `dateTime` element.
///
/// # Errors
///
/// Propagates errors from the underlying serializer.
pub fn serialize<S, Tz>(value: &DateTime<Tz>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    serializer.serialize_newtype_struct(TIMESTAMP_TOKEN, &value.to_rfc3339())
}

/// Deserializes a timestamp from a `dateTime` element, an RFC 3339 string or a string
/// in one of the WDDX layouts.
///
/// # Errors
///
/// Returns an error if the value is not a timestamp or a recognizable date string.
pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_newtype_struct(TIMESTAMP_TOKEN, TimestampVisitor)
}

struct TimestampVisitor;

impl<'de> de::Visitor<'de> for TimestampVisitor {
    type Value = DateTime<FixedOffset>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a WDDX dateTime or an RFC 3339 timestamp")
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .or_else(|| parse_structured(value.trim()))
            .ok_or_else(|| E::custom(format!("{:?} is not a recognized date/time", value)))
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(self)
    }
}

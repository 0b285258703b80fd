//! The `number` element.
//!
//! Numbers are written as plain decimal text and read back into the narrowest kind that
//! keeps every digit of the text:
//!
//! - integer text becomes `Int32`, or `Int64` when it does not fit; larger integers are
//!   a format error
//! - fractional text becomes `Float32` when the `f32` reproduces the same decimal value,
//!   otherwise `Decimal`
//! - text beyond `f32` range (or beyond the fixed-point range) becomes `Float64`; below
//!   15 fractional digits it is still compared against the decimal reading
//!
//! Decimals with more than 15 fractional digits are written as their nearest `f64`.

use crate::format::Tag;
use crate::{Error, Result, Value};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Fractional digits above which a decimal is written, and read, as a double.
pub(crate) const MAX_FRACTION_DIGITS: usize = 15;

/// The largest scale a `Decimal` holds.
const MAX_DECIMAL_SCALE: usize = 28;

const TAG: &str = Tag::Number.as_str();

/// Formats a numeric value as `number` text.
pub(crate) fn format(value: &Value) -> Result<String> {
    match value {
        Value::Int32(i) => Ok(i.to_string()),
        Value::Int64(i) => Ok(i.to_string()),
        Value::Float32(f) => {
            ensure_finite(f64::from(*f), f)?;
            Ok(float_text(f.to_string(), || format!("{:e}", f)))
        }
        Value::Float64(f) => {
            ensure_finite(*f, f)?;
            Ok(float_text(f.to_string(), || format!("{:e}", f)))
        }
        Value::Decimal(d) if d.scale() as usize > MAX_FRACTION_DIGITS => {
            let double: f64 = d
                .to_string()
                .parse()
                .map_err(|e| Error::type_mismatch("a decimal convertible to double", &format!("{}", e)))?;
            Ok(float_text(double.to_string(), || format!("{:e}", double)))
        }
        Value::Decimal(d) => Ok(d.to_string()),
        other => Err(Error::type_mismatch("a number", other.kind().as_str())),
    }
}

fn ensure_finite(value: f64, shown: &dyn std::fmt::Display) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::type_mismatch("a finite number", &shown.to_string()))
    }
}

// Integral floats print without a fraction; past the i64 range that text would be
// misread as an oversized integer, so those use exponent form.
fn float_text(plain: String, exponent: impl FnOnce() -> String) -> String {
    if plain.contains('.') || plain.parse::<i64>().is_ok() {
        plain
    } else {
        exponent()
    }
}

/// Parses `number` text, choosing the value kind as described in the module docs.
pub(crate) fn parse(text: &str) -> Result<Value> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::format(TAG, "a number element cannot be empty"));
    }

    if !is_fractional(text) {
        if let Ok(i) = text.parse::<i32>() {
            return Ok(Value::Int32(i));
        }
        return text
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| Error::format(TAG, format!("{:?} is not a supported integer: {}", text, e)));
    }

    let single = text
        .parse::<f32>()
        .map_err(|e| Error::format(TAG, format!("{:?} is not a number: {}", text, e)))?;
    if single.is_finite() {
        if let Some(decimal) = parse_decimal(text) {
            return Ok(if same_value(&single.to_string(), &decimal) {
                Value::Float32(single)
            } else {
                Value::Decimal(decimal)
            });
        }
    }

    let double = text
        .parse::<f64>()
        .map_err(|e| Error::format(TAG, format!("{:?} is not a number: {}", text, e)))?;
    if !double.is_finite() {
        return Err(Error::format(TAG, format!("{:?} is out of range", text)));
    }
    if fraction_digits(text) < MAX_FRACTION_DIGITS {
        if let Some(decimal) = parse_decimal(text) {
            if !same_value(&double.to_string(), &decimal) {
                return Ok(Value::Decimal(decimal));
            }
        }
    }
    Ok(Value::Float64(double))
}

fn is_fractional(text: &str) -> bool {
    text.contains(['.', 'e', 'E'])
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    // Longer fractions would be rounded to fit.
    if fraction_digits(text) > MAX_DECIMAL_SCALE {
        return None;
    }
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text.to_ascii_lowercase()).ok()
    } else {
        Decimal::from_str(text).ok()
    }
}

/// Whether the shortest text of a float denotes exactly `decimal`.
fn same_value(float_text: &str, decimal: &Decimal) -> bool {
    Decimal::from_str(float_text).map_or(false, |narrowed| narrowed == *decimal)
}

fn fraction_digits(text: &str) -> usize {
    text.split_once('.').map_or(0, |(_, fraction)| {
        fraction.chars().take_while(char::is_ascii_digit).count()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    #[test]
    fn test_format_integers() {
        assert_eq!(format(&Value::Int32(0)).unwrap(), "0");
        assert_eq!(format(&Value::Int32(i32::MIN)).unwrap(), "-2147483648");
        assert_eq!(
            format(&Value::Int64(345678923456789123)).unwrap(),
            "345678923456789123"
        );
    }

    #[test]
    fn test_format_floats_shortest() {
        assert_eq!(format(&Value::Float32(-1.23)).unwrap(), "-1.23");
        assert_eq!(format(&Value::Float32(32.456_22)).unwrap(), "32.45622");
        assert_eq!(format(&Value::Float64(34.672)).unwrap(), "34.672");
        assert_eq!(format(&Value::Float64(3.0)).unwrap(), "3");
        assert_eq!(format(&Value::Float64(1e20)).unwrap(), "1e20");
    }

    #[test]
    fn test_format_rejects_non_finite() {
        assert!(matches!(
            format(&Value::Float64(f64::NAN)),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(format(&Value::Float32(f32::INFINITY)).is_err());
    }

    #[test]
    fn test_format_decimal_keeps_text() {
        assert_eq!(
            format(&Value::Decimal(decimal("32.4562203"))).unwrap(),
            "32.4562203"
        );
        assert_eq!(
            format(&Value::Decimal(decimal("0.123456789012345"))).unwrap(),
            "0.123456789012345"
        );
    }

    #[test]
    fn test_format_decimal_beyond_fifteen_digits_uses_double() {
        let d = decimal("0.1234567890123456789");
        assert_eq!(
            format(&Value::Decimal(d)).unwrap(),
            0.123_456_789_012_345_68_f64.to_string()
        );
    }

    #[test]
    fn test_format_rejects_non_numbers() {
        assert!(matches!(
            format(&Value::Text("1".into())),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_integers() {
        assert_eq!(parse("42").unwrap(), Value::Int32(42));
        assert_eq!(parse(" -7 ").unwrap(), Value::Int32(-7));
        assert_eq!(parse("2147483648").unwrap(), Value::Int64(2147483648));
        assert_eq!(
            parse("345678923456789123").unwrap(),
            Value::Int64(345678923456789123)
        );
    }

    #[test]
    fn test_parse_integer_overflow_is_format_error() {
        assert!(matches!(
            parse("99999999999999999999"),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn test_parse_float_when_lossless() {
        assert_eq!(parse("-12.456").unwrap(), Value::Float32(-12.456));
        assert_eq!(parse("-1.23").unwrap(), Value::Float32(-1.23));
        assert_eq!(parse("0.5").unwrap(), Value::Float32(0.5));
    }

    #[test]
    fn test_parse_decimal_when_float_loses_digits() {
        assert_eq!(parse("154523.85").unwrap(), Value::Decimal(decimal("154523.85")));
        assert_eq!(
            parse("32.4562203").unwrap(),
            Value::Decimal(decimal("32.4562203"))
        );
    }

    #[test]
    fn test_parse_beyond_single_range() {
        assert_eq!(parse("1e39").unwrap(), Value::Float64(1e39));
        assert_eq!(parse("-3.5e38").unwrap(), Value::Float64(-3.5e38));
    }

    #[test]
    fn test_parse_exponent_text() {
        assert_eq!(parse("1e20").unwrap(), Value::Float32(1e20));
        assert_eq!(parse("2.5E-3").unwrap(), Value::Float32(0.0025));
    }

    #[test]
    fn test_parse_fifteen_digit_boundary() {
        assert_eq!(
            parse("0.123456789012345").unwrap(),
            Value::Decimal(decimal("0.123456789012345"))
        );
    }

    #[test]
    fn test_parse_tiny_doubles_stay_doubles() {
        let text = 1e-300f64.to_string();
        assert_eq!(parse(&text).unwrap(), Value::Float64(1e-300));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse(""), Err(Error::Format { .. })));
        assert!(matches!(parse("1.2.3"), Err(Error::Format { .. })));
        assert!(matches!(parse("abc"), Err(Error::Format { .. })));
    }

    #[test]
    fn test_fraction_digits() {
        assert_eq!(fraction_digits("1.25"), 2);
        assert_eq!(fraction_digits("1.25e10"), 2);
        assert_eq!(fraction_digits("12"), 0);
    }
}

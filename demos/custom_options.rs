//! Customizing WDDX output and input with WddxOptions.
//!
//! Run with: cargo run --example custom_options

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_wddx::{from_str_with_options, to_string_with_options, Value, WddxOptions, Zone};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize)]
struct Event {
    name: String,
    #[serde(with = "serde_wddx::datetime")]
    at: DateTime<FixedOffset>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let event = Event {
        name: "launch".to_string(),
        at: DateTime::parse_from_rfc3339("2001-06-17T17:00:30Z")?,
    };

    // Default: no declaration, timestamps in the local zone
    println!("Default:");
    println!("{}\n", serde_wddx::to_string(&event)?);

    // XML declaration and a fixed zone
    println!("Declaration, UTC-5:");
    let eastern = FixedOffset::west_opt(5 * 3600).ok_or("invalid offset")?;
    let options = WddxOptions::new()
        .with_xml_declaration(true)
        .with_zone(Zone::Fixed(eastern));
    println!("{}\n", to_string_with_options(&event, options)?);

    // Depth limit
    let mut nested = Value::Null;
    for _ in 0..10 {
        nested = Value::Array(vec![nested]);
    }
    let shallow = WddxOptions::new().with_max_depth(5);
    match to_string_with_options(&nested, shallow) {
        Ok(_) => println!("Depth limit: accepted"),
        Err(e) => println!("Depth limit: {}\n", e),
    }

    // Validation before decoding
    let legacy = r#"<wddxPacket version="1.0"><header/><data><dateTime>6/17/75</dateTime></data></wddxPacket>"#;
    let permissive: Value = from_str_with_options(legacy, WddxOptions::new())?;
    println!("Permissive decode: {}", permissive);

    let strict = WddxOptions::new().with_validation(true);
    match from_str_with_options::<Value>(legacy, strict) {
        Ok(value) => println!("Validating decode: {}", value),
        Err(e) => println!("Validating decode: {}", e),
    }

    Ok(())
}

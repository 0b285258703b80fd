//! Working with Value for runtime flexibility.
//!
//! Run with: cargo run --example dynamic_values

use serde::{Deserialize, Serialize};
use serde_wddx::{from_str, to_string, to_value, Value};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
    roles: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // A packet from an external producer
    let packet = r#"<wddxPacket version="1.0"><header/><data><struct>
        <var name="host"><string>localhost</string></var>
        <var name="port"><number>8080</number></var>
        <var name="rate"><number>154523.85</number></var>
        <var name="updated"><dateTime>2002-6-26T4:0:0-5:0</dateTime></var>
        <var name="features"><array length="2"><string>auth</string><string>logging</string></array></var>
    </struct></data></wddxPacket>"#;

    let config: Value = from_str(packet)?;

    // Access values dynamically
    if let Some(members) = config.as_struct() {
        if let Some(host) = members.get("host").and_then(Value::as_str) {
            println!("host:     {}", host);
        }
        if let Some(port) = members.get("port").and_then(Value::as_i64) {
            println!("port:     {}", port);
        }
        // Kept exact: the nearest f32 would not print as 154523.85
        if let Some(rate) = members.get("rate").and_then(Value::as_decimal) {
            println!("rate:     {} (exact decimal)", rate);
        }
        if let Some(updated) = members.get("updated").and_then(Value::as_timestamp) {
            println!("updated:  {}", updated.to_rfc3339());
        }
        if let Some(features) = members.get("features").and_then(Value::as_array) {
            println!("features: {} items\n", features.len());
        }
    }

    // Convert an existing struct to Value
    let user = User {
        id: 123,
        name: "Alice".to_string(),
        roles: vec!["admin".to_string(), "developer".to_string()],
    };

    let user_value = to_value(&user)?;
    println!("User as WDDX:\n{}\n", to_string(&user_value)?);

    // Runtime type checks
    println!("Type checks:");
    println!("  kind:      {}", user_value.kind());
    println!("  is_struct: {}", user_value.is_struct());
    println!("  is_array:  {}", user_value.is_array());
    println!("  is_text:   {}", user_value.is_text());

    Ok(())
}

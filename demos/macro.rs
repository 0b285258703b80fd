//! Using the wddx! macro for dynamic value construction.
//!
//! Run with: cargo run --example macro

use serde_wddx::{to_string, wddx, Value};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let null_val = wddx!(null);
    let bool_val = wddx!(true);
    let number = wddx!(42);
    let text = wddx!("Hello,\nWDDX!");

    println!("Primitives:");
    println!("  null:   {}", to_string(&null_val)?);
    println!("  bool:   {}", to_string(&bool_val)?);
    println!("  number: {}", to_string(&number)?);
    println!("  text:   {}\n", to_string(&text)?);

    let numbers = wddx!([1, 2, 3, 4, 5]);
    let mixed = wddx!([1, "two", true, null]);

    println!("Arrays:");
    println!("  Numbers: {}", to_string(&numbers)?);
    println!("  Mixed:   {}\n", to_string(&mixed)?);

    let config = wddx!({
        "app": {
            "name": "MyApp",
            "version": "1.0.0"
        },
        "servers": ["web-1", "web-2"],
        "maintenance": false
    });

    println!("Structs:");
    println!("{}\n", to_string(&config)?);

    if let Value::Struct(members) = &config {
        let app = members.get("app").and_then(Value::as_struct);
        let name = app.and_then(|app| app.get("name")).and_then(Value::as_str);
        println!("app.name = {:?}", name);
    }

    Ok(())
}

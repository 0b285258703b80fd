//! Recordsets: tables, table sets and row structs.
//!
//! Run with: cargo run --example recordsets

use serde::Deserialize;
use serde_wddx::{from_str, to_string, Table, TableSet, Value};
use std::error::Error;

#[derive(Debug, Deserialize)]
struct Item {
    id: i32,
    name: String,
    parent: Option<i32>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Build a table row by row
    let mut items = Table::with_fields(["id", "name", "parent"])?.with_name("items");
    items.push_row(vec![Value::from(0), Value::from("root"), Value::Null])?;
    items.push_row(vec![Value::from(1), Value::from("left"), Value::from(0)])?;
    items.push_row(vec![Value::from(2), Value::from("right"), Value::from(0)])?;

    // Recordsets are written column by column
    let wddx = to_string(&items)?;
    println!("Recordset:\n{}\n", wddx);

    // ...and read back as one struct per row
    let rows: Vec<Item> = from_str(&wddx)?;
    for item in &rows {
        println!("  {:?}", item);
    }

    // Or kept as a table
    if let Value::Table(table) = from_str::<Value>(&wddx)? {
        println!(
            "\n{} rows, fields {:?}, 'name' column: {:?}\n",
            table.row_count(),
            table.field_names(),
            table.column("name").map(|cells| cells.collect::<Vec<_>>())
        );
    }

    // Several tables become a struct of recordsets keyed by table name
    let owners = Table::from_columns([("owner", vec![Value::from("ops")])])?.with_name("owners");
    let set = TableSet::from(vec![items, owners]);
    println!("Table set:\n{}", to_string(&set)?);

    Ok(())
}

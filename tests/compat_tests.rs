//! Packets exchanged with legacy WDDX producers and consumers.
//!
//! Expected markup is byte-exact: consumers compare packets as strings.

use chrono::{DateTime, FixedOffset, TimeZone, Timelike};
use rust_decimal::Decimal;
use serde_wddx::{
    from_str, from_str_with_options, is_valid, to_string, to_string_with_options, Error,
    Rectangular, Table, Value, WddxMap, WddxOptions, Zone,
};
use std::str::FromStr;

fn packet(body: &str) -> String {
    format!(
        "<wddxPacket version=\"1.0\"><header /><data>{}</data></wddxPacket>",
        body
    )
}

fn eastern() -> Zone {
    Zone::Fixed(FixedOffset::west_opt(5 * 3600).unwrap())
}

#[test]
fn test_scalar_packets() {
    assert_eq!(
        to_string("This is a test.\nDo not panic.").unwrap(),
        packet("<string>This is a test.<char code=\"0a\" />Do not panic.</string>")
    );
    assert_eq!(to_string(&false).unwrap(), packet("<boolean value=\"false\" />"));
    assert_eq!(to_string(&10).unwrap(), packet("<number>10</number>"));
    assert_eq!(to_string(&34i16).unwrap(), packet("<number>34</number>"));
    assert_eq!(
        to_string(&345678923456789123i64).unwrap(),
        packet("<number>345678923456789123</number>")
    );
    assert_eq!(to_string(&-1.23f32).unwrap(), packet("<number>-1.23</number>"));
    assert_eq!(to_string(&34.672f64).unwrap(), packet("<number>34.672</number>"));
    assert_eq!(
        to_string(&Value::Decimal(Decimal::from_str("32.4562203").unwrap())).unwrap(),
        packet("<number>32.4562203</number>")
    );
    assert_eq!(to_string(&()).unwrap(), packet("<null />"));
    assert_eq!(to_string(&Option::<i32>::None).unwrap(), packet("<null />"));
}

#[test]
fn test_scalar_decoding() {
    let text: String = from_str(&packet(
        "<string>This is a test.<char code=\"0a\" />Do not panic.</string>",
    ))
    .unwrap();
    assert_eq!(text, "This is a test.\nDo not panic.");

    assert!(!from_str::<bool>(&packet("<boolean value=\"false\" />")).unwrap());
    assert_eq!(from_str::<i32>(&packet("<number>10</number>")).unwrap(), 10);
    assert_eq!(
        from_str::<i64>(&packet("<number>3147483647</number>")).unwrap(),
        3147483647
    );
    assert_eq!(from_str::<f32>(&packet("<number>-1.23</number>")).unwrap(), -1.23);
    assert_eq!(
        from_str::<Value>(&packet("<number>32.4562203</number>")).unwrap(),
        Value::Decimal(Decimal::from_str("32.4562203").unwrap())
    );
    assert_eq!(from_str::<Value>(&packet("<null />")).unwrap(), Value::Null);
}

#[test]
fn test_datetime_packets() {
    let instant = eastern_time(2001, 6, 17, 12, 0, 30);
    let options = WddxOptions::new().with_zone(eastern());
    assert_eq!(
        to_string_with_options(&Value::Timestamp(instant), options.clone()).unwrap(),
        packet("<dateTime>2001-06-17T12:00:30-5:0</dateTime>")
    );

    let decoded: Value = from_str_with_options(
        &packet("<dateTime>2001-06-17T12:00:30-5:0</dateTime>"),
        options.clone(),
    )
    .unwrap();
    assert_eq!(decoded, Value::Timestamp(instant));
}

#[test]
fn test_datetime_without_offset_is_utc() {
    let options = WddxOptions::new().with_zone(eastern());
    let decoded: Value =
        from_str_with_options(&packet("<dateTime>2001-06-17T12:00:30</dateTime>"), options).unwrap();
    match decoded {
        Value::Timestamp(dt) => {
            assert_eq!(dt, FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2001, 6, 17, 12, 0, 30).unwrap());
            assert_eq!(dt.hour(), 7);
        }
        other => panic!("Expected timestamp, got {:?}", other),
    }
}

#[test]
fn test_unpadded_datetime_with_legacy_suffix() {
    let options = WddxOptions::new().with_zone(eastern());
    let decoded: Value =
        from_str_with_options(&packet("<dateTime>2002-6-26T4:0:0-5:0</dateTime>"), options).unwrap();
    assert_eq!(decoded, Value::Timestamp(eastern_time(2002, 6, 26, 4, 0, 0)));
}

#[test]
fn test_array_packets() {
    let numbers: Vec<i32> = (1..=10).collect();
    let wddx = to_string(&numbers).unwrap();
    assert_eq!(
        wddx,
        packet(
            "<array length=\"10\"><number>1</number><number>2</number><number>3</number>\
             <number>4</number><number>5</number><number>6</number><number>7</number>\
             <number>8</number><number>9</number><number>10</number></array>"
        )
    );
    assert_eq!(from_str::<Vec<i32>>(&wddx).unwrap(), numbers);

    assert_eq!(to_string(&Vec::<String>::new()).unwrap(), packet("<array length=\"0\" />"));
}

#[test]
fn test_rectangular_arrays_flatten_row_major() {
    let grid = Rectangular(vec![[1, 1], [2, 2], [3, 5], [4, 5]]);
    assert_eq!(
        to_string(&grid).unwrap(),
        packet(
            "<array length=\"8\"><number>1</number><number>1</number><number>2</number>\
             <number>2</number><number>3</number><number>5</number><number>4</number>\
             <number>5</number></array>"
        )
    );
}

#[test]
fn test_binary_packets() {
    let bytes = Value::Bytes(b"Joel rocks!".to_vec());
    assert_eq!(
        to_string(&bytes).unwrap(),
        packet("<binary length=\"11\">Sm9lbCByb2NrcyE=</binary>")
    );

    let with_length: Value = from_str(&packet("<binary length=\"11\">Sm9lbCByb2NrcyE=</binary>")).unwrap();
    let without_length: Value = from_str(&packet("<binary>Sm9lbCByb2NrcyE=</binary>")).unwrap();
    assert_eq!(with_length, bytes);
    assert_eq!(without_length, bytes);
}

#[test]
fn test_binary_length_beyond_content() {
    let huge = packet("<binary length=\"18446744073709551615\">AA==</binary>");
    assert!(matches!(from_str::<Value>(&huge), Err(Error::Format { .. })));

    let short = packet("<binary length=\"12\">Sm9lbCByb2NrcyE=</binary>");
    assert!(matches!(from_str::<Value>(&short), Err(Error::Format { .. })));
}

#[test]
fn test_struct_packets() {
    let mut members = WddxMap::new();
    members.insert("aString".to_string(), Value::from("a string"));
    members.insert("aNumber".to_string(), Value::from(-12.456));
    members.insert("aNull".to_string(), Value::Null);
    members.insert("aBoolean".to_string(), Value::Bool(true));

    assert_eq!(
        to_string(&Value::Struct(members)).unwrap(),
        packet(
            "<struct><var name=\"aString\"><string>a string</string></var>\
             <var name=\"aNumber\"><number>-12.456</number></var>\
             <var name=\"aNull\"><null /></var>\
             <var name=\"aBoolean\"><boolean value=\"true\" /></var></struct>"
        )
    );
}

#[test]
fn test_struct_member_order_and_collisions() {
    let decoded: Value = from_str(&packet(
        "<struct><var name=\"b\"><number>1</number></var>\
         <var name=\"a\"><number>2</number></var>\
         <var name=\"b\"><number>3</number></var></struct>",
    ))
    .unwrap();
    let members = decoded.as_struct().unwrap();
    let keys: Vec<&String> = members.keys().collect();
    assert_eq!(keys, ["b", "a"]);
    assert_eq!(members.get("b"), Some(&Value::Int32(3)));
}

fn parent_table() -> Table {
    Table::from_columns([
        ("id", vec![Value::from(0), Value::from(1), Value::from(2)]),
        (
            "ParentItem",
            vec![
                Value::from("ParentItem 0"),
                Value::from("ParentItem 1"),
                Value::from("ParentItem 2"),
            ],
        ),
    ])
    .unwrap()
}

const PARENT_RECORDSET: &str = "<recordset rowCount=\"3\" fieldNames=\"id,ParentItem\">\
    <field name=\"id\"><number>0</number><number>1</number><number>2</number></field>\
    <field name=\"ParentItem\"><string>ParentItem 0</string><string>ParentItem 1</string>\
    <string>ParentItem 2</string></field></recordset>";

#[test]
fn test_recordset_packets() {
    assert_eq!(to_string(&parent_table()).unwrap(), packet(PARENT_RECORDSET));

    let decoded: Value = from_str(&packet(PARENT_RECORDSET)).unwrap();
    assert_eq!(decoded, Value::Table(parent_table()));
}

#[test]
fn test_recordset_column_kind_comes_from_first_row() {
    let decoded: Value = from_str(&packet(
        "<recordset rowCount=\"2\" fieldNames=\"c\"><field name=\"c\">\
         <number>1</number><string>two</string></field></recordset>",
    ))
    .unwrap();
    let table = match decoded {
        Value::Table(table) => table,
        other => panic!("Expected table, got {:?}", other),
    };
    assert_eq!(table.field_kind("c"), Some(serde_wddx::ValueKind::Int32));
    assert_eq!(table.get(1, "c"), Some(&Value::from("two")));
}

#[test]
fn test_empty_elements() {
    assert_eq!(to_string("").unwrap(), packet("<string />"));
    assert_eq!(from_str::<String>(&packet("<string />")).unwrap(), "");
    assert_eq!(from_str::<String>(&packet("<string></string>")).unwrap(), "");

    let empty = Table::with_fields(["a"]).unwrap();
    assert_eq!(
        to_string(&empty).unwrap(),
        packet("<recordset rowCount=\"0\" fieldNames=\"a\"><field name=\"a\" /></recordset>")
    );
}

#[test]
fn test_unsupported_tag() {
    assert!(matches!(
        from_str::<Value>(&packet("<widget />")),
        Err(Error::UnsupportedTag(name)) if name == "widget"
    ));
}

fn broken_packet() -> String {
    packet(
        "<struct><var name=\"aNull\"><null /></var>\
         <var name=\"aBoolean\"><boolean value=\"true\" /></var>\
         <var name=\"aDateTime\"><dateTime>6/17/75</dateTime></var>\
         <var name=\"aBinary\"><binary length=\"11\">Sm9lb%Byb2NrcyE=</binary></var>\
         <var name=\"aString\"><string>a string</string></var></struct>",
    )
}

#[test]
fn test_validating_decode_rejects_broken_packet() {
    let options = WddxOptions::new().with_validation(true);
    match from_str_with_options::<Value>(&broken_packet(), options) {
        Err(Error::Validation { issues, .. }) => assert_eq!(issues.len(), 2),
        other => panic!("Expected validation error, got {:?}", other),
    }
    assert!(!is_valid(&broken_packet()));
}

#[test]
fn test_permissive_decode_of_broken_packet() {
    assert!(matches!(
        from_str::<Value>(&broken_packet()),
        Err(Error::Format { .. })
    ));

    let date_only = packet("<dateTime>6/17/75</dateTime>");
    assert!(from_str::<Value>(&date_only).unwrap().is_timestamp());
    assert!(!is_valid(&date_only));
}

fn eastern_time(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> DateTime<FixedOffset> {
    FixedOffset::west_opt(5 * 3600)
        .unwrap()
        .with_ymd_and_hms(year, month, day, hour, minute, second)
        .unwrap()
}

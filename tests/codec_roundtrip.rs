use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::json;
use std::str::FromStr;

use annex::codec::{decode, encode};
use annex::datatype::{AttrValue, TypeTag, classify};
use annex::error::AnnexError;

fn roundtrip(value: AttrValue) -> AttrValue {
    let tag = classify(&value);
    let raw = encode(&value, tag);
    decode(raw.as_deref(), tag).expect("decode ok")
}

#[test]
fn classification_follows_rule_order() {
    assert_eq!(classify(&AttrValue::Null), TypeTag::String);
    assert_eq!(classify(&AttrValue::Bool(true)), TypeTag::Boolean);
    assert_eq!(classify(&AttrValue::Int(30)), TypeTag::Integer);
    assert_eq!(classify(&AttrValue::Float(1.5)), TypeTag::Float);
    assert_eq!(classify(&AttrValue::Double(1.5)), TypeTag::Double);
    assert_eq!(classify(&AttrValue::Json(json!({"a": 1}))), TypeTag::Json);
    let noon = NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    assert_eq!(classify(&AttrValue::DateTime(noon)), TypeTag::Datetime);
    assert_eq!(classify(&AttrValue::from("2024-01-15")), TypeTag::Date);
    assert_eq!(classify(&AttrValue::from("12:30:45")), TypeTag::Time);
    assert_eq!(
        classify(&AttrValue::from("2024-01-15 12:30:45")),
        TypeTag::Timestamp
    );
    assert_eq!(classify(&AttrValue::Bytes(vec![0, 159, 146])), TypeTag::Binary);
    assert_eq!(classify(&AttrValue::from("3.14")), TypeTag::Decimal);
    assert_eq!(
        classify(&AttrValue::Decimal(BigDecimal::from_str("3.14").unwrap())),
        TypeTag::Decimal
    );
    assert_eq!(classify(&AttrValue::from("red")), TypeTag::String);
}

#[test]
fn string_length_thresholds() {
    assert_eq!(classify(&AttrValue::from("a".repeat(255).as_str())), TypeTag::String);
    assert_eq!(classify(&AttrValue::from("a".repeat(256).as_str())), TypeTag::Text);
    assert_eq!(classify(&AttrValue::from("a".repeat(65535).as_str())), TypeTag::Text);
    assert_eq!(
        classify(&AttrValue::from("a".repeat(65536).as_str())),
        TypeTag::Longtext
    );
}

#[test]
fn ambiguous_strings_fall_back_to_string() {
    // numeric but no decimal point
    assert_eq!(classify(&AttrValue::from("10")), TypeTag::String);
    // a dot but not numeric
    assert_eq!(classify(&AttrValue::from("3.14.15")), TypeTag::String);
    // date-ish but wrong shape
    assert_eq!(classify(&AttrValue::from("2024-1-15")), TypeTag::String);
}

#[test]
fn null_encodes_to_sql_null_under_any_tag() {
    for tag in [TypeTag::Boolean, TypeTag::Json, TypeTag::Integer, TypeTag::Binary] {
        assert_eq!(encode(&AttrValue::Null, tag), None);
        assert_eq!(decode(None, tag).unwrap(), AttrValue::Null);
    }
}

#[test]
fn boolean_encoding_and_truthiness() {
    assert_eq!(encode(&AttrValue::Bool(true), TypeTag::Boolean), Some("1".into()));
    assert_eq!(encode(&AttrValue::Bool(false), TypeTag::Boolean), Some("0".into()));
    assert_eq!(decode(Some("1"), TypeTag::Boolean).unwrap(), AttrValue::Bool(true));
    assert_eq!(decode(Some("0"), TypeTag::Boolean).unwrap(), AttrValue::Bool(false));
    assert_eq!(decode(Some(""), TypeTag::Boolean).unwrap(), AttrValue::Bool(false));
    // any other string is truthy
    assert_eq!(decode(Some("no"), TypeTag::Boolean).unwrap(), AttrValue::Bool(true));
}

#[test]
fn lossless_roundtrips() {
    assert_eq!(roundtrip(AttrValue::from("red")), AttrValue::from("red"));
    assert_eq!(roundtrip(AttrValue::Int(-42)), AttrValue::Int(-42));
    assert_eq!(roundtrip(AttrValue::Bool(true)), AttrValue::Bool(true));
    assert_eq!(roundtrip(AttrValue::Double(2.25)), AttrValue::Double(2.25));
    assert_eq!(
        roundtrip(AttrValue::Json(json!({"tags": ["a", "b"], "n": 3}))),
        AttrValue::Json(json!({"tags": ["a", "b"], "n": 3}))
    );
    assert_eq!(
        roundtrip(AttrValue::Bytes(vec![0, 1, 2, 255])),
        AttrValue::Bytes(vec![0, 1, 2, 255])
    );
    let dt = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap();
    assert_eq!(roundtrip(AttrValue::DateTime(dt)), AttrValue::DateTime(dt));
    let dec = BigDecimal::from_str("123.450").unwrap();
    assert_eq!(roundtrip(AttrValue::Decimal(dec.clone())), AttrValue::Decimal(dec));
}

#[test]
fn date_decodes_to_start_of_day() {
    let value = AttrValue::from("2024-01-15");
    let tag = classify(&value);
    assert_eq!(tag, TypeTag::Date);
    let raw = encode(&value, tag);
    assert_eq!(raw.as_deref(), Some("2024-01-15"));
    let midnight = NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(decode(raw.as_deref(), tag).unwrap(), AttrValue::DateTime(midnight));
}

#[test]
fn date_tag_truncates_time_of_day() {
    // a calendar value stored under the date tag loses its time component
    let evening = NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(18, 45, 12)
        .unwrap();
    let raw = encode(&AttrValue::DateTime(evening), TypeTag::Date);
    assert_eq!(raw.as_deref(), Some("2024-01-15"));
}

#[test]
fn time_decodes_to_a_plain_string() {
    // time is the one temporal tag that does not come back as a calendar value
    let value = AttrValue::from("12:30:45");
    let tag = classify(&value);
    assert_eq!(tag, TypeTag::Time);
    let raw = encode(&value, tag);
    assert_eq!(decode(raw.as_deref(), tag).unwrap(), AttrValue::from("12:30:45"));
}

#[test]
fn float_and_double_collapse_on_decode() {
    let raw = encode(&AttrValue::Float(1.5), TypeTag::Float);
    assert_eq!(raw.as_deref(), Some("1.5"));
    assert_eq!(decode(raw.as_deref(), TypeTag::Float).unwrap(), AttrValue::Double(1.5));
    assert_eq!(decode(Some("1.5"), TypeTag::Double).unwrap(), AttrValue::Double(1.5));
}

#[test]
fn timestamp_string_roundtrips_as_calendar_value() {
    let value = AttrValue::from("2024-01-15 12:30:45");
    let tag = classify(&value);
    assert_eq!(tag, TypeTag::Timestamp);
    let raw = encode(&value, tag);
    let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(12, 30, 45)
        .unwrap();
    assert_eq!(decode(raw.as_deref(), tag).unwrap(), AttrValue::DateTime(expected));
}

#[test]
fn malformed_values_surface_as_decode_errors() {
    for (raw, tag) in [
        ("{not json", TypeTag::Json),
        ("abc", TypeTag::Integer),
        ("abc", TypeTag::Double),
        ("not base64 ???", TypeTag::Binary),
        ("13:99", TypeTag::Time),
        ("2024-13-45", TypeTag::Date),
    ] {
        let err = decode(Some(raw), tag).unwrap_err();
        assert!(
            matches!(err, AnnexError::Decode { tag: t, .. } if t == tag),
            "expected decode error for {raw:?} under {tag}"
        );
    }
}

#[test]
fn unknown_stored_tag_passes_raw_through() {
    let tag = TypeTag::parse("studlycaps");
    assert_eq!(tag, TypeTag::String);
    assert_eq!(decode(Some("as-is"), tag).unwrap(), AttrValue::from("as-is"));
}

//! Typed serialization of attribute values.
//!
//! A pair of pure functions keyed on [`TypeTag`]: [`encode`] turns a runtime
//! value into the text stored in the `value` column (or SQL NULL), and
//! [`decode`] turns that text back into a runtime value. The pair is lossless
//! for every tag except the documented narrowings: `date` drops the
//! time-of-day, `time` collapses to a plain string, and `float`/`double`
//! collapse to one float representation.

use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as Json;

use crate::datatype::{AttrValue, TypeTag};
use crate::error::{AnnexError, Result};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Serialize a value for storage under the given tag.
///
/// A `Null` value encodes to `None` regardless of the tag; the stored value
/// is NULL if and only if the original value was null. There is no failure
/// path: a value that does not fit its tag falls through to the generic
/// string cast.
pub fn encode(value: &AttrValue, tag: TypeTag) -> Option<String> {
    if value.is_null() {
        return None;
    }
    let raw = match (tag, value) {
        (TypeTag::Boolean, AttrValue::Bool(b)) => {
            if *b {
                "1".to_owned()
            } else {
                "0".to_owned()
            }
        }
        (TypeTag::Json, AttrValue::Json(j)) => j.to_string(),
        (TypeTag::Datetime | TypeTag::Timestamp, AttrValue::DateTime(t)) => {
            t.format(DATETIME_FORMAT).to_string()
        }
        (TypeTag::Date, AttrValue::DateTime(t)) => t.format(DATE_FORMAT).to_string(),
        (TypeTag::Binary, AttrValue::Bytes(b)) => BASE64.encode(b),
        (TypeTag::Binary, AttrValue::Text(s)) => BASE64.encode(s.as_bytes()),
        _ => string_cast(value),
    };
    Some(raw)
}

/// Deserialize a stored value under its declared tag.
///
/// A NULL stored value decodes to `Null`. Malformed text for the tag is a
/// [`AnnexError::Decode`] rather than a low-level parse failure; the caller
/// adds the attribute key via [`AnnexError::keyed`].
pub fn decode(raw: Option<&str>, tag: TypeTag) -> Result<AttrValue> {
    let Some(raw) = raw else {
        return Ok(AttrValue::Null);
    };
    match tag {
        // "0" and the empty string are false, everything else is true
        TypeTag::Boolean => Ok(AttrValue::Bool(raw != "0" && !raw.is_empty())),
        TypeTag::Integer => raw
            .parse::<i64>()
            .map(AttrValue::Int)
            .map_err(|e| decode_error(tag, e)),
        // float and double decode identically, into the wider representation
        TypeTag::Float | TypeTag::Double => raw
            .parse::<f64>()
            .map(AttrValue::Double)
            .map_err(|e| decode_error(tag, e)),
        TypeTag::Decimal => BigDecimal::from_str(raw)
            .map(AttrValue::Decimal)
            .map_err(|e| decode_error(tag, e)),
        TypeTag::Json => serde_json::from_str::<Json>(raw)
            .map(AttrValue::Json)
            .map_err(|e| decode_error(tag, e)),
        TypeTag::Datetime | TypeTag::Timestamp => {
            NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
                .map(AttrValue::DateTime)
                .map_err(|e| decode_error(tag, e))
        }
        // a date comes back as a calendar value at the start of its day
        TypeTag::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(|d| AttrValue::DateTime(d.and_time(NaiveTime::MIN)))
            .map_err(|e| decode_error(tag, e)),
        // time decodes to a re-rendered plain string, not a calendar value
        TypeTag::Time => NaiveTime::parse_from_str(raw, TIME_FORMAT)
            .map(|t| AttrValue::Text(t.format(TIME_FORMAT).to_string()))
            .map_err(|e| decode_error(tag, e)),
        TypeTag::Binary => BASE64
            .decode(raw)
            .map(AttrValue::Bytes)
            .map_err(|e| decode_error(tag, e)),
        TypeTag::Longtext | TypeTag::Text | TypeTag::String => {
            Ok(AttrValue::Text(raw.to_owned()))
        }
    }
}

fn decode_error(tag: TypeTag, source: impl std::fmt::Display) -> AnnexError {
    AnnexError::Decode {
        key: String::new(),
        tag,
        message: source.to_string(),
    }
}

// The generic string cast used by every tag without a dedicated encoding.
fn string_cast(value: &AttrValue) -> String {
    match value {
        AttrValue::Null => String::new(),
        AttrValue::Bool(b) => {
            if *b {
                "1".to_owned()
            } else {
                "0".to_owned()
            }
        }
        AttrValue::Int(i) => i.to_string(),
        AttrValue::Float(f) => f.to_string(),
        AttrValue::Double(f) => f.to_string(),
        AttrValue::Decimal(d) => d.to_string(),
        AttrValue::Text(s) => s.clone(),
        AttrValue::Json(j) => j.to_string(),
        AttrValue::DateTime(t) => t.format(DATETIME_FORMAT).to_string(),
        // bytes have no sensible plain-text cast
        AttrValue::Bytes(b) => BASE64.encode(b),
    }
}

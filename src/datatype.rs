// used for timestamps and temporal values
use chrono::NaiveDateTime;
// used for decimal numbers
use bigdecimal::BigDecimal;
// used for structured (JSON) values
use serde_json::Value as Json;

// used to print out readable forms of values and tags
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

/// The closed vocabulary of storage type tags.
///
/// Every attribute row carries exactly one of these, and the codec in
/// [`crate::codec`] is keyed on it. The vocabulary is closed: tags read back
/// from storage that match none of the canonical names fall back to
/// [`TypeTag::String`], whose decode is a passthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Boolean,
    Integer,
    Float,
    Double,
    Decimal,
    String,
    Text,
    Longtext,
    Date,
    Time,
    Timestamp,
    Datetime,
    Json,
    Binary,
}

impl TypeTag {
    /// The canonical name stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Boolean => "boolean",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Decimal => "decimal",
            TypeTag::String => "string",
            TypeTag::Text => "text",
            TypeTag::Longtext => "longtext",
            TypeTag::Date => "date",
            TypeTag::Time => "time",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Datetime => "datetime",
            TypeTag::Json => "json",
            TypeTag::Binary => "binary",
        }
    }

    /// Parse a stored tag name. Unknown names map to `String`, which decodes
    /// as a raw passthrough.
    pub fn parse(name: &str) -> TypeTag {
        match name {
            "boolean" => TypeTag::Boolean,
            "integer" => TypeTag::Integer,
            "float" => TypeTag::Float,
            "double" => TypeTag::Double,
            "decimal" => TypeTag::Decimal,
            "text" => TypeTag::Text,
            "longtext" => TypeTag::Longtext,
            "date" => TypeTag::Date,
            "time" => TypeTag::Time,
            "timestamp" => TypeTag::Timestamp,
            "datetime" => TypeTag::Datetime,
            "json" => TypeTag::Json,
            "binary" => TypeTag::Binary,
            _ => TypeTag::String,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A runtime attribute value.
///
/// `Float` and `Double` are deliberately separate variants: the tag a value
/// receives is decided by its runtime representation, even though both are
/// serialized and parsed the same way.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    Decimal(BigDecimal),
    Text(String),
    Json(Json),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}
impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}
impl From<i32> for AttrValue {
    fn from(i: i32) -> Self {
        AttrValue::Int(i as i64)
    }
}
impl From<f32> for AttrValue {
    fn from(f: f32) -> Self {
        AttrValue::Float(f)
    }
}
impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Double(f)
    }
}
impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_owned())
    }
}
impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}
impl From<Json> for AttrValue {
    fn from(j: Json) -> Self {
        AttrValue::Json(j)
    }
}
impl From<NaiveDateTime> for AttrValue {
    fn from(t: NaiveDateTime) -> Self {
        AttrValue::DateTime(t)
    }
}
impl From<Vec<u8>> for AttrValue {
    fn from(b: Vec<u8>) -> Self {
        AttrValue::Bytes(b)
    }
}

lazy_static! {
    static ref DATE_PATTERN: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref TIME_PATTERN: Regex = Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap();
    static ref TIMESTAMP_PATTERN: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap();
    static ref NUMERIC_PATTERN: Regex =
        Regex::new(r"^[+-]?(\d+\.\d*|\.\d+|\d+)([eE][+-]?\d+)?$").unwrap();
}

/// Text beyond this many bytes is tagged `longtext`.
const LONGTEXT_THRESHOLD: usize = 65535;
/// Text beyond this many bytes (but within the longtext bound) is tagged `text`.
const TEXT_THRESHOLD: usize = 255;

/// Map a runtime value to its canonical type tag.
///
/// Total and deterministic, no side effects. The rules are ordered and the
/// first match wins; the categories overlap (a `YYYY-MM-DD` string is also a
/// plain string) so the order carries meaning. A `Null` value infers as
/// `string`; callers wanting a different tag must pass one explicitly.
pub fn classify(value: &AttrValue) -> TypeTag {
    match value {
        AttrValue::Null => TypeTag::String,
        AttrValue::Bool(_) => TypeTag::Boolean,
        AttrValue::Int(_) => TypeTag::Integer,
        AttrValue::Float(_) => TypeTag::Float,
        AttrValue::Double(_) => TypeTag::Double,
        AttrValue::Json(_) => TypeTag::Json,
        AttrValue::DateTime(_) => TypeTag::Datetime,
        AttrValue::Text(s) => classify_text(s),
        AttrValue::Bytes(_) => TypeTag::Binary,
        AttrValue::Decimal(_) => TypeTag::Decimal,
    }
}

fn classify_text(s: &str) -> TypeTag {
    if DATE_PATTERN.is_match(s) {
        return TypeTag::Date;
    }
    if TIME_PATTERN.is_match(s) {
        return TypeTag::Time;
    }
    if TIMESTAMP_PATTERN.is_match(s) {
        return TypeTag::Timestamp;
    }
    // thresholds are measured in bytes
    if s.len() > LONGTEXT_THRESHOLD {
        return TypeTag::Longtext;
    }
    if s.len() > TEXT_THRESHOLD {
        return TypeTag::Text;
    }
    if s.contains('.') && NUMERIC_PATTERN.is_match(s) {
        return TypeTag::Decimal;
    }
    TypeTag::String
}

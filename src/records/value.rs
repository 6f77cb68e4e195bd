//! Tagged values carried through tabular buffers
//!
//! [`SqlValue`] is the single value currency of the SDK: record types
//! produce them, buffers validate them against declared column types, and
//! store backends receive them. Each non-null variant reports the
//! primitive type key used for type-map lookups and buffer validation.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// A single typed value, or null
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Absent value; only valid in columns declared nullable
    Null,
    Bool(bool),
    U8(u8),
    I8(i8),
    Char(char),
    I16(i16),
    I32(i32),
    I64(i64),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// Exact decimal value
    Decimal(Decimal),
    String(String),
    /// Date and time without timezone
    DateTime(NaiveDateTime),
    /// Signed span of time
    Duration(Duration),
}

impl SqlValue {
    /// Primitive type key of this value, or `None` for null
    ///
    /// The returned key is what type maps and field descriptors use, so a
    /// value conforms to a column exactly when this matches the column's
    /// declared type.
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(_) => Some("bool"),
            SqlValue::U8(_) => Some("u8"),
            SqlValue::I8(_) => Some("i8"),
            SqlValue::Char(_) => Some("char"),
            SqlValue::I16(_) => Some("i16"),
            SqlValue::I32(_) => Some("i32"),
            SqlValue::I64(_) => Some("i64"),
            SqlValue::U16(_) => Some("u16"),
            SqlValue::U32(_) => Some("u32"),
            SqlValue::U64(_) => Some("u64"),
            SqlValue::F32(_) => Some("f32"),
            SqlValue::F64(_) => Some("f64"),
            SqlValue::Decimal(_) => Some("decimal"),
            SqlValue::String(_) => Some("string"),
            SqlValue::DateTime(_) => Some("datetime"),
            SqlValue::Duration(_) => Some("duration"),
        }
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "null"),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::U8(v) => write!(f, "{}", v),
            SqlValue::I8(v) => write!(f, "{}", v),
            SqlValue::Char(v) => write!(f, "{}", v),
            SqlValue::I16(v) => write!(f, "{}", v),
            SqlValue::I32(v) => write!(f, "{}", v),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::U16(v) => write!(f, "{}", v),
            SqlValue::U32(v) => write!(f, "{}", v),
            SqlValue::U64(v) => write!(f, "{}", v),
            SqlValue::F32(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Decimal(v) => write!(f, "{}", v),
            SqlValue::String(v) => write!(f, "{}", v),
            SqlValue::DateTime(v) => write!(f, "{}", v),
            SqlValue::Duration(v) => write!(f, "{}", v),
        }
    }
}

// JSON scalars rather than tagged variants, so query results render the
// way result rows from any other client would.
impl Serialize for SqlValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SqlValue::Null => serializer.serialize_unit(),
            SqlValue::Bool(v) => serializer.serialize_bool(*v),
            SqlValue::U8(v) => serializer.serialize_u8(*v),
            SqlValue::I8(v) => serializer.serialize_i8(*v),
            SqlValue::Char(v) => serializer.serialize_char(*v),
            SqlValue::I16(v) => serializer.serialize_i16(*v),
            SqlValue::I32(v) => serializer.serialize_i32(*v),
            SqlValue::I64(v) => serializer.serialize_i64(*v),
            SqlValue::U16(v) => serializer.serialize_u16(*v),
            SqlValue::U32(v) => serializer.serialize_u32(*v),
            SqlValue::U64(v) => serializer.serialize_u64(*v),
            SqlValue::F32(v) => serializer.serialize_f32(*v),
            SqlValue::F64(v) => serializer.serialize_f64(*v),
            // Decimal has an inherent `serialize` returning raw bytes; call
            // the trait impl explicitly.
            SqlValue::Decimal(v) => Serialize::serialize(v, serializer),
            SqlValue::String(v) => serializer.serialize_str(v),
            SqlValue::DateTime(v) => v.serialize(serializer),
            SqlValue::Duration(v) => serializer.collect_str(v),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<u8> for SqlValue {
    fn from(v: u8) -> Self {
        SqlValue::U8(v)
    }
}

impl From<i8> for SqlValue {
    fn from(v: i8) -> Self {
        SqlValue::I8(v)
    }
}

impl From<char> for SqlValue {
    fn from(v: char) -> Self {
        SqlValue::Char(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::I16(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<u16> for SqlValue {
    fn from(v: u16) -> Self {
        SqlValue::U16(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::U32(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::F32(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<Duration> for SqlValue {
    fn from(v: Duration) -> Self {
        SqlValue::Duration(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_cover_every_variant() {
        let cases: Vec<(SqlValue, Option<&str>)> = vec![
            (SqlValue::Null, None),
            (SqlValue::Bool(true), Some("bool")),
            (SqlValue::U8(1), Some("u8")),
            (SqlValue::I8(-1), Some("i8")),
            (SqlValue::Char('x'), Some("char")),
            (SqlValue::I16(1), Some("i16")),
            (SqlValue::I32(1), Some("i32")),
            (SqlValue::I64(1), Some("i64")),
            (SqlValue::U16(1), Some("u16")),
            (SqlValue::U32(1), Some("u32")),
            (SqlValue::U64(1), Some("u64")),
            (SqlValue::F32(1.0), Some("f32")),
            (SqlValue::F64(1.0), Some("f64")),
            (SqlValue::Decimal(Decimal::new(125, 2)), Some("decimal")),
            (SqlValue::String("s".to_string()), Some("string")),
            (
                SqlValue::DateTime(NaiveDateTime::default()),
                Some("datetime"),
            ),
            (SqlValue::Duration(Duration::seconds(90)), Some("duration")),
        ];
        for (value, expected) in cases {
            assert_eq!(value.type_name(), expected, "type name of {value:?}");
        }
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(SqlValue::from(42i64), SqlValue::I64(42));
        assert_eq!(SqlValue::from("abc"), SqlValue::String("abc".to_string()));
        assert_eq!(SqlValue::from(true), SqlValue::Bool(true));
        assert_eq!(
            SqlValue::from(Decimal::new(125, 2)),
            SqlValue::Decimal(Decimal::new(125, 2))
        );
    }

    #[test]
    fn test_option_conversions() {
        assert_eq!(SqlValue::from(Some(7i32)), SqlValue::I32(7));
        assert_eq!(SqlValue::from(None::<i32>), SqlValue::Null);
        assert!(SqlValue::from(None::<String>).is_null());
    }

    #[test]
    fn test_serialize_as_json_scalars() {
        assert_eq!(
            serde_json::to_string(&SqlValue::I64(5)).unwrap(),
            "5"
        );
        assert_eq!(
            serde_json::to_string(&SqlValue::String("hi".to_string())).unwrap(),
            "\"hi\""
        );
        assert_eq!(serde_json::to_string(&SqlValue::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&SqlValue::Bool(false)).unwrap(), "false");
        assert_eq!(
            serde_json::to_string(&SqlValue::Decimal(Decimal::new(125, 2))).unwrap(),
            "\"1.25\""
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlValue::Null.to_string(), "null");
        assert_eq!(SqlValue::I64(9).to_string(), "9");
        assert_eq!(SqlValue::String("abc".to_string()).to_string(), "abc");
        assert_eq!(SqlValue::Decimal(Decimal::new(125, 2)).to_string(), "1.25");
    }
}

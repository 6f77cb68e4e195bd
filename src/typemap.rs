//! Primitive-to-column type mapping
//!
//! Maps the primitive value types a record can carry onto store column
//! types. The standard table is built once and shared; writers hold an
//! immutable map, so a lookup miss always means a record declares a
//! primitive the map was never configured for, and the operation fails
//! rather than silently skipping the column.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

/// A store column type, e.g. `bigint` or `nvarchar(4000)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    /// Base type name as emitted into DDL
    pub name: &'static str,
    /// Optional length suffix, rendered as `name(length)`
    pub length: Option<u32>,
}

impl ColumnType {
    /// Column type without a length suffix
    pub const fn new(name: &'static str) -> Self {
        Self { name, length: None }
    }

    /// Column type with a length suffix
    pub const fn with_length(name: &'static str, length: u32) -> Self {
        Self {
            name,
            length: Some(length),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            Some(length) => write!(f, "{}({})", self.name, length),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Error raised when a primitive type key has no column mapping
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No column type mapped for primitive type '{key}'")]
pub struct UnmappedType {
    /// The primitive type key that missed
    pub key: String,
}

static STANDARD: Lazy<TypeMap> = Lazy::new(|| {
    TypeMap::from_entries([
        ("bool", ColumnType::new("bit")),
        ("u8", ColumnType::new("tinyint")),
        ("i8", ColumnType::new("int")),
        ("char", ColumnType::new("char")),
        // Date-bearing values land in a time-of-day column; the date part
        // is not preserved.
        ("datetime", ColumnType::new("time")),
        ("duration", ColumnType::new("time")),
        ("decimal", ColumnType::new("decimal")),
        ("f64", ColumnType::new("float")),
        ("f32", ColumnType::new("real")),
        ("i16", ColumnType::new("smallint")),
        ("i32", ColumnType::new("int")),
        ("i64", ColumnType::new("bigint")),
        // Unsigned keys widen onto the signed columns the store offers.
        ("u16", ColumnType::new("int")),
        ("u32", ColumnType::new("int")),
        ("u64", ColumnType::new("bigint")),
        ("string", ColumnType::with_length("nvarchar", 4000)),
    ])
});

/// Immutable map from primitive type keys to store column types
///
/// Keys are the names reported by [`SqlValue::type_name`], e.g. `"i64"`,
/// `"string"`, `"datetime"`. The map offers no mutation after
/// construction; build an extended one up front when the standard table
/// is not enough.
///
/// [`SqlValue::type_name`]: crate::records::SqlValue::type_name
#[derive(Debug, Clone)]
pub struct TypeMap {
    entries: HashMap<&'static str, ColumnType>,
}

impl TypeMap {
    /// The standard mapping shared by all writers
    pub fn standard() -> &'static TypeMap {
        &STANDARD
    }

    /// Build a map from explicit entries
    pub fn from_entries(
        entries: impl IntoIterator<Item = (&'static str, ColumnType)>,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The standard mapping plus caller-supplied entries
    ///
    /// Caller entries win over standard ones with the same key.
    pub fn extended(
        extra: impl IntoIterator<Item = (&'static str, ColumnType)>,
    ) -> Self {
        let mut entries = STANDARD.entries.clone();
        entries.extend(extra);
        Self { entries }
    }

    /// Look up the column type for a primitive type key
    ///
    /// # Returns
    /// The mapped column type, or [`UnmappedType`] naming the key
    pub fn column_type(&self, key: &str) -> Result<&ColumnType, UnmappedType> {
        self.entries.get(key).ok_or_else(|| UnmappedType {
            key: key.to_string(),
        })
    }

    /// Whether a key has a mapping
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of mapped primitive types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        STANDARD.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_mappings() {
        let map = TypeMap::standard();
        let expected = [
            ("bool", "bit"),
            ("u8", "tinyint"),
            ("i8", "int"),
            ("char", "char"),
            ("datetime", "time"),
            ("duration", "time"),
            ("decimal", "decimal"),
            ("f64", "float"),
            ("f32", "real"),
            ("i16", "smallint"),
            ("i32", "int"),
            ("i64", "bigint"),
            ("u16", "int"),
            ("u32", "int"),
            ("u64", "bigint"),
            ("string", "nvarchar(4000)"),
        ];
        for (key, column) in expected {
            assert_eq!(
                map.column_type(key).unwrap().to_string(),
                column,
                "mapping for {key}"
            );
        }
        assert_eq!(map.len(), expected.len());
    }

    #[test]
    fn test_unmapped_key_is_an_error() {
        let map = TypeMap::standard();
        let err = map.column_type("u128").unwrap_err();
        assert_eq!(err.key, "u128");
        assert!(err.to_string().contains("u128"));
    }

    #[test]
    fn test_extended_map_overrides_and_adds() {
        let map = TypeMap::extended([
            ("string", ColumnType::with_length("nvarchar", 255)),
            ("uuid", ColumnType::new("uniqueidentifier")),
        ]);
        assert_eq!(
            map.column_type("string").unwrap().to_string(),
            "nvarchar(255)"
        );
        assert_eq!(
            map.column_type("uuid").unwrap().to_string(),
            "uniqueidentifier"
        );
        // Untouched entries stay
        assert_eq!(map.column_type("i64").unwrap().to_string(), "bigint");
        assert_eq!(map.len(), TypeMap::standard().len() + 1);
    }

    #[test]
    fn test_column_type_display() {
        assert_eq!(ColumnType::new("bit").to_string(), "bit");
        assert_eq!(
            ColumnType::with_length("nvarchar", 4000).to_string(),
            "nvarchar(4000)"
        );
    }

    #[test]
    fn test_default_is_standard() {
        let map = TypeMap::default();
        assert_eq!(map.len(), TypeMap::standard().len());
        assert!(map.contains("bool"));
    }
}

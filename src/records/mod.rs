//! Record metadata and tabulation
//!
//! Record types declare their persisted shape statically: an ordered list
//! of field descriptors plus a value extractor. [`TabularBuffer`] turns a
//! slice of records into validated columnar form ready for bulk transfer.
//!
//! Declaring the shape up front replaces any runtime inspection of record
//! types: which fields persist, in what order, and under which column
//! names is fixed at compile time, and the tabulator's job is only to
//! check that extracted values agree with the declaration.

pub mod buffer;
pub mod value;

pub use buffer::{TabulateError, TabularBuffer};
pub use value::SqlValue;

/// Descriptor for one persisted field of a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name in the destination table
    pub name: &'static str,
    /// Primitive type key, as looked up in a type map ("i64", "string", ...)
    pub ty: &'static str,
    /// Whether the field may carry [`SqlValue::Null`]
    pub nullable: bool,
}

impl FieldDef {
    /// Non-nullable field descriptor
    pub const fn new(name: &'static str, ty: &'static str) -> Self {
        Self {
            name,
            ty,
            nullable: false,
        }
    }

    /// Nullable field descriptor
    pub const fn nullable(name: &'static str, ty: &'static str) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }
}

/// Statically declared persistence metadata for a record type
///
/// Implementations list every persisted field in declaration order and
/// produce matching values for one record. The two must agree: the
/// tabulator checks each produced row against the descriptors and rejects
/// the whole call on any mismatch.
///
/// # Example
///
/// ```
/// use bulk_loading_sdk::{BulkRecord, FieldDef, SqlValue};
///
/// struct User {
///     id: i64,
///     name: String,
///     active: bool,
/// }
///
/// static USER_FIELDS: [FieldDef; 3] = [
///     FieldDef::new("id", "i64"),
///     FieldDef::new("name", "string"),
///     FieldDef::new("active", "bool"),
/// ];
///
/// impl BulkRecord for User {
///     const TABLE: Option<&'static str> = Some("Users");
///
///     fn fields() -> &'static [FieldDef] {
///         &USER_FIELDS
///     }
///
///     fn values(&self) -> Vec<SqlValue> {
///         vec![
///             self.id.into(),
///             self.name.as_str().into(),
///             self.active.into(),
///         ]
///     }
/// }
/// ```
pub trait BulkRecord {
    /// Default destination table, when the type has a canonical one
    ///
    /// Operations that need a destination use the caller's override first,
    /// then this constant; with neither, they fail rather than guess.
    const TABLE: Option<&'static str> = None;

    /// Ordered descriptors of the persisted fields
    fn fields() -> &'static [FieldDef];

    /// Values for this record, in [`fields`](Self::fields) order
    fn values(&self) -> Vec<SqlValue>;
}

//! Statement text for the staging protocol
//!
//! Builders here emit identifiers verbatim: table names come from record
//! metadata or from the caller, and nothing is quoted or escaped. Only
//! trusted names may reach these functions. The exact text matters to
//! consumers that log, audit, or replay statements, so the shapes below
//! are covered by tests and not changed casually.

use std::fmt;

use crate::records::TabularBuffer;
use crate::typemap::{TypeMap, UnmappedType};

/// Prefix prepended to a destination table name to form its staging table
pub const STAGING_PREFIX: &str = "#TmpTable";

/// Separator joining the two statements of a [`StatementBatch`]
pub const BATCH_SEPARATOR: &str = "; ";

/// Staging table name for a destination table
///
/// Deterministic: every caller staging for the same destination gets the
/// same name. Concurrent callers therefore share a staging table; see
/// [`BulkWriter::merge_load_buffer`](crate::BulkWriter::merge_load_buffer).
pub fn staging_table_name(destination: &str) -> String {
    format!("{STAGING_PREFIX}{destination}")
}

/// Existence probe for a table
///
/// The result is a single scalar: the table's object id, or NULL when no
/// such table exists.
pub fn object_id_probe(table: &str) -> String {
    format!("SELECT OBJECT_ID('{table}')")
}

/// CREATE TABLE statement for a buffer's column layout
///
/// Column types come from the given map; a single unmapped primitive
/// fails the whole statement.
pub fn create_table(
    table: &str,
    buffer: &TabularBuffer,
    types: &TypeMap,
) -> Result<String, UnmappedType> {
    let mut columns = Vec::with_capacity(buffer.columns().len());
    for column in buffer.columns() {
        let ty = types.column_type(column.ty)?;
        columns.push(format!("{} {}", column.name, ty));
    }
    Ok(format!("CREATE TABLE {table} ( {} )", columns.join(", ")))
}

/// Cleanup action appended to a staging batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    /// Empty the staging table but keep it in place
    Truncate,
    /// Remove the staging table entirely
    Drop,
}

impl Cleanup {
    /// Cleanup statement text for a table
    pub fn statement(self, table: &str) -> String {
        match self {
            Cleanup::Truncate => format!("TRUNCATE TABLE {table}"),
            Cleanup::Drop => format!("DROP TABLE {table}"),
        }
    }
}

/// A caller statement with staging cleanup appended in the same batch
///
/// Both parts go to the store in one round trip, joined by
/// [`BATCH_SEPARATOR`], so cleanup runs in the same session and cannot be
/// skipped by a caller forgetting a second call. The two parts are not
/// atomic: if the body fails the cleanup does not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementBatch {
    /// The caller-supplied statement
    pub body: String,
    /// Cleanup statement for the staging table
    pub cleanup: String,
}

impl StatementBatch {
    /// Batch a caller statement with cleanup for a staging table
    pub fn new(body: impl Into<String>, cleanup: Cleanup, staging_table: &str) -> Self {
        Self {
            body: body.into(),
            cleanup: cleanup.statement(staging_table),
        }
    }
}

impl fmt::Display for StatementBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.body, BATCH_SEPARATOR, self.cleanup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BulkRecord, FieldDef, SqlValue};

    struct User {
        id: i64,
        name: String,
        active: bool,
    }

    static USER_FIELDS: [FieldDef; 3] = [
        FieldDef::new("id", "i64"),
        FieldDef::new("name", "string"),
        FieldDef::new("active", "bool"),
    ];

    impl BulkRecord for User {
        const TABLE: Option<&'static str> = Some("Users");

        fn fields() -> &'static [FieldDef] {
            &USER_FIELDS
        }

        fn values(&self) -> Vec<SqlValue> {
            vec![
                self.id.into(),
                self.name.as_str().into(),
                self.active.into(),
            ]
        }
    }

    fn user_buffer() -> TabularBuffer {
        let users = vec![User {
            id: 1,
            name: "ada".to_string(),
            active: true,
        }];
        TabularBuffer::from_records(&users).unwrap()
    }

    #[test]
    fn test_staging_table_name() {
        assert_eq!(staging_table_name("Users"), "#TmpTableUsers");
        assert_eq!(staging_table_name("dbo.Events"), "#TmpTabledbo.Events");
    }

    #[test]
    fn test_object_id_probe() {
        assert_eq!(
            object_id_probe("#TmpTableUsers"),
            "SELECT OBJECT_ID('#TmpTableUsers')"
        );
    }

    #[test]
    fn test_create_table_statement() {
        let ddl = create_table("#TmpTableUsers", &user_buffer(), TypeMap::standard()).unwrap();
        assert_eq!(
            ddl,
            "CREATE TABLE #TmpTableUsers ( id bigint, name nvarchar(4000), active bit )"
        );
    }

    #[test]
    fn test_create_table_single_column() {
        static ONE: [FieldDef; 1] = [FieldDef::new("id", "i64")];
        let buffer = TabularBuffer::new(&ONE);
        let ddl = create_table("#TmpTableIds", &buffer, TypeMap::standard()).unwrap();
        assert_eq!(ddl, "CREATE TABLE #TmpTableIds ( id bigint )");
    }

    #[test]
    fn test_create_table_unmapped_type_fails() {
        static ODD: [FieldDef; 2] = [
            FieldDef::new("id", "i64"),
            FieldDef::new("payload", "blob"),
        ];
        let buffer = TabularBuffer::new(&ODD);
        let err = create_table("#TmpTableOdd", &buffer, TypeMap::standard()).unwrap_err();
        assert_eq!(err.key, "blob");
    }

    #[test]
    fn test_batch_with_truncate_cleanup() {
        let batch = StatementBatch::new(
            "UPDATE Users SET name = t.name FROM #TmpTableUsers t WHERE Users.id = t.id",
            Cleanup::Truncate,
            "#TmpTableUsers",
        );
        assert_eq!(
            batch.to_string(),
            "UPDATE Users SET name = t.name FROM #TmpTableUsers t WHERE Users.id = t.id; TRUNCATE TABLE #TmpTableUsers"
        );
    }

    #[test]
    fn test_batch_with_drop_cleanup() {
        let batch = StatementBatch::new(
            "SELECT * FROM #TmpTableUsers",
            Cleanup::Drop,
            "#TmpTableUsers",
        );
        assert_eq!(
            batch.to_string(),
            "SELECT * FROM #TmpTableUsers; DROP TABLE #TmpTableUsers"
        );
    }

    #[test]
    fn test_cleanup_statements() {
        assert_eq!(
            Cleanup::Truncate.statement("#TmpTableUsers"),
            "TRUNCATE TABLE #TmpTableUsers"
        );
        assert_eq!(
            Cleanup::Drop.statement("#TmpTableUsers"),
            "DROP TABLE #TmpTableUsers"
        );
    }
}

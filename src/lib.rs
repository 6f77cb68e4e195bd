//! Bulk Loading SDK - efficient record loading for relational stores
//!
//! Provides:
//! - Conversion of typed record collections into validated tabular
//!   buffers, driven by statically declared field metadata
//! - Direct bulk inserts through a pluggable transfer mechanism
//! - A staging protocol for set-based merges and join queries: create a
//!   transient table, bulk-load into it, run the caller's statement with
//!   cleanup appended in the same batch
//! - An in-memory store implementation for tests and local development
//!
//! Store connectivity stays with the caller: implement [`StoreConnector`]
//! and [`StoreSession`] over your driver and [`BulkCopy`] over its bulk
//! interface, and hand them to a [`BulkWriter`].
//!
//! # Example
//!
//! ```
//! use bulk_loading_sdk::{
//!     BulkRecord, BulkWriter, FieldDef, MemoryBulkCopy, MemoryStore, SqlValue,
//! };
//!
//! struct User {
//!     id: i64,
//!     name: String,
//!     active: bool,
//! }
//!
//! static USER_FIELDS: [FieldDef; 3] = [
//!     FieldDef::new("id", "i64"),
//!     FieldDef::new("name", "string"),
//!     FieldDef::new("active", "bool"),
//! ];
//!
//! impl BulkRecord for User {
//!     const TABLE: Option<&'static str> = Some("Users");
//!
//!     fn fields() -> &'static [FieldDef] {
//!         &USER_FIELDS
//!     }
//!
//!     fn values(&self) -> Vec<SqlValue> {
//!         vec![self.id.into(), self.name.as_str().into(), self.active.into()]
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), bulk_loading_sdk::WriterError> {
//! let store = MemoryStore::new();
//! store.create_table("Users", &["id", "name", "active"]);
//!
//! let writer = BulkWriter::new(store.clone(), MemoryBulkCopy);
//! let users = vec![
//!     User { id: 1, name: "ada".to_string(), active: true },
//!     User { id: 2, name: "grace".to_string(), active: false },
//! ];
//! let written = writer.insert(&users, None).await?;
//! assert_eq!(written, 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod load;
pub mod records;
pub mod sql;
pub mod store;
pub mod typemap;
pub mod writer;

// Re-export commonly used types
pub use config::{ConfigError, LoaderConfig};
pub use error::{Result, WriterError};
pub use load::BulkLoader;
pub use records::{BulkRecord, FieldDef, SqlValue, TabulateError, TabularBuffer};
pub use sql::{Cleanup, StatementBatch};
pub use store::{
    BulkCopy, MemoryBulkCopy, MemoryStore, OutputFormat, QueryResult, StoreConnector, StoreError,
    StoreSession, TransferError, format_query_result,
};
pub use typemap::{ColumnType, TypeMap, UnmappedType};
pub use writer::{BulkWriter, StagingCause, StagingError};

//! Bulk writer facade
//!
//! [`BulkWriter`] owns a store connector, a transfer mechanism, a type
//! map, and configuration, and exposes the public operations:
//! - [`insert`](BulkWriter::insert): direct bulk insert into a table
//! - [`merge_load`](BulkWriter::merge_load): stage rows, run a set-based
//!   statement against them, clean up in the same batch
//! - [`join_query`](BulkWriter::join_query): stage rows, run a read query
//!   joining against them, clean up in the same batch
//! - [`drop_staging`](BulkWriter::drop_staging): remove a leftover
//!   staging table
//!
//! Every operation opens one session, runs its steps sequentially on it,
//! and closes it on all exit paths. Failures of staged operations carry
//! the destination table and the step that failed.

use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::error::{Result, WriterError};
use crate::load::BulkLoader;
use crate::records::{BulkRecord, SqlValue, TabularBuffer};
use crate::sql::{self, Cleanup, StatementBatch};
use crate::store::{
    BulkCopy, QueryResult, StoreConnector, StoreError, StoreSession, TransferError,
};
use crate::typemap::{TypeMap, UnmappedType};

mod steps {
    pub const OPEN: &str = "opening session";
    pub const CHECK: &str = "checking for staging table";
    pub const CREATE: &str = "creating staging table";
    pub const LOAD: &str = "loading staging table";
    pub const EXECUTE: &str = "executing statement batch";
    pub const DROP: &str = "dropping staging table";
    pub const CLOSE: &str = "closing session";
}

/// Error from a staged operation, tagged with the destination table
#[derive(Debug, thiserror::Error)]
#[error("Staging operation for table '{table}' failed while {step}: {source}")]
pub struct StagingError {
    /// Destination table the operation was staging for
    pub table: String,
    /// Protocol step that failed
    pub step: &'static str,
    /// Underlying failure
    #[source]
    pub source: StagingCause,
}

impl StagingError {
    fn new(table: &str, step: &'static str, source: impl Into<StagingCause>) -> Self {
        Self {
            table: table.to_string(),
            step,
            source: source.into(),
        }
    }
}

/// Underlying cause of a failed staging step
#[derive(Debug, thiserror::Error)]
pub enum StagingCause {
    /// Session operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Bulk transfer failed
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A primitive type had no column mapping
    #[error(transparent)]
    Type(#[from] UnmappedType),
}

/// Bulk writer over a store connector and transfer mechanism
///
/// The writer is stateless between calls: each operation acquires its own
/// session and owns its own buffer, so one writer can serve many tables.
pub struct BulkWriter<C, B>
where
    C: StoreConnector,
    B: BulkCopy<C::Session>,
{
    connector: C,
    loader: BulkLoader<B>,
    types: TypeMap,
    config: LoaderConfig,
}

impl<C, B> BulkWriter<C, B>
where
    C: StoreConnector,
    B: BulkCopy<C::Session>,
{
    /// Create a writer with the standard type map and default configuration
    pub fn new(connector: C, mechanism: B) -> Self {
        Self::with_config(connector, mechanism, LoaderConfig::default())
    }

    /// Create a writer with explicit configuration
    pub fn with_config(connector: C, mechanism: B, config: LoaderConfig) -> Self {
        Self {
            connector,
            loader: BulkLoader::new(mechanism),
            types: TypeMap::default(),
            config,
        }
    }

    /// Replace the type map used for staging table DDL
    pub fn with_types(mut self, types: TypeMap) -> Self {
        self.types = types;
        self
    }

    /// The writer's configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The writer's type map
    pub fn types(&self) -> &TypeMap {
        &self.types
    }

    /// Insert records directly into their destination table
    ///
    /// The destination is `table` when given, else the record type's
    /// declared table; with neither, the call fails without touching the
    /// store. Returns the number of rows written.
    pub async fn insert<T: BulkRecord>(&self, records: &[T], table: Option<&str>) -> Result<u64> {
        let destination = resolve_table::<T>(table)?;
        let buffer = TabularBuffer::from_records(records)?;
        debug!(
            "Inserting {} rows into '{}'",
            buffer.row_count(),
            destination
        );

        let mut session = self.connector.open().await?;
        let outcome = self
            .loader
            .load(
                &mut session,
                &buffer,
                destination,
                self.config.load.batch_size,
                self.config.timeouts.insert_secs,
            )
            .await;
        let closed = session.close().await;

        let written = outcome?;
        closed?;
        info!("Inserted {} rows into '{}'", written, destination);
        Ok(written)
    }

    /// Stage records and run a set-based merge statement against them
    ///
    /// See [`merge_load_buffer`](Self::merge_load_buffer).
    pub async fn merge_load<T: BulkRecord>(
        &self,
        records: &[T],
        destination: &str,
        merge_sql: &str,
        keep_staging_table: bool,
    ) -> Result<u64> {
        let buffer = TabularBuffer::from_records(records)?;
        self.merge_load_buffer(&buffer, destination, merge_sql, keep_staging_table)
            .await
    }

    /// Stage a buffer and run a set-based merge statement against it
    ///
    /// The buffer is loaded into the staging table for `destination`
    /// (created first when absent), then `merge_sql` runs with cleanup
    /// appended in the same batch: the staging table is truncated when
    /// `keep_staging_table` is set, dropped otherwise. Returns the rows
    /// affected by the batch.
    ///
    /// The staging table name is a pure function of `destination`, so
    /// concurrent callers staging for the same table share one staging
    /// table and will interleave. Callers coordinate externally when that
    /// matters.
    pub async fn merge_load_buffer(
        &self,
        buffer: &TabularBuffer,
        destination: &str,
        merge_sql: &str,
        keep_staging_table: bool,
    ) -> Result<u64> {
        let staging = sql::staging_table_name(destination);
        let cleanup = if keep_staging_table {
            Cleanup::Truncate
        } else {
            Cleanup::Drop
        };
        let batch = StatementBatch::new(merge_sql, cleanup, &staging);
        debug!(
            "Merge load for '{}': staging {} rows through '{}'",
            destination,
            buffer.row_count(),
            staging
        );

        let mut session = self
            .connector
            .open()
            .await
            .map_err(|e| StagingError::new(destination, steps::OPEN, e))?;
        let outcome = self
            .merge_steps(&mut session, buffer, destination, &staging, &batch)
            .await;
        self.warn_on_residue(&outcome, destination, &staging);
        let closed = session.close().await;

        let affected = outcome?;
        closed.map_err(|e| StagingError::new(destination, steps::CLOSE, e))?;
        info!(
            "Merge load for '{}' affected {} rows (staging table {})",
            destination,
            affected,
            if keep_staging_table { "kept" } else { "dropped" }
        );
        Ok(affected)
    }

    /// Stage records and run a read query joining against them
    ///
    /// See [`join_query_buffer`](Self::join_query_buffer).
    pub async fn join_query<T: BulkRecord>(
        &self,
        records: &[T],
        destination: &str,
        query_sql: &str,
        keep_staging_table: bool,
    ) -> Result<QueryResult> {
        let buffer = TabularBuffer::from_records(records)?;
        self.join_query_buffer(&buffer, destination, query_sql, keep_staging_table)
            .await
    }

    /// Stage a buffer and run a read query joining against it
    ///
    /// Same staging protocol as
    /// [`merge_load_buffer`](Self::merge_load_buffer), but `query_sql`
    /// produces rows: its first result set is materialized and returned,
    /// and the cleanup appended to the batch still runs after it.
    pub async fn join_query_buffer(
        &self,
        buffer: &TabularBuffer,
        destination: &str,
        query_sql: &str,
        keep_staging_table: bool,
    ) -> Result<QueryResult> {
        let staging = sql::staging_table_name(destination);
        let cleanup = if keep_staging_table {
            Cleanup::Truncate
        } else {
            Cleanup::Drop
        };
        let batch = StatementBatch::new(query_sql, cleanup, &staging);
        debug!(
            "Join query for '{}': staging {} rows through '{}'",
            destination,
            buffer.row_count(),
            staging
        );

        let mut session = self
            .connector
            .open()
            .await
            .map_err(|e| StagingError::new(destination, steps::OPEN, e))?;
        let outcome = self
            .join_steps(&mut session, buffer, destination, &staging, &batch)
            .await;
        self.warn_on_residue(&outcome, destination, &staging);
        let closed = session.close().await;

        let result = outcome?;
        closed.map_err(|e| StagingError::new(destination, steps::CLOSE, e))?;
        info!(
            "Join query for '{}' returned {} rows",
            destination,
            result.row_count()
        );
        Ok(result)
    }

    /// Drop the staging table for a destination, when present
    ///
    /// Safe to call when nothing is staged: an existence probe decides
    /// whether a drop runs at all, so repeated calls are no-ops. Uses its
    /// own session, released on every path.
    pub async fn drop_staging(&self, destination: &str) -> Result<()> {
        let staging = sql::staging_table_name(destination);
        let mut session = self
            .connector
            .open()
            .await
            .map_err(|e| StagingError::new(destination, steps::OPEN, e))?;
        let outcome = self.drop_steps(&mut session, destination, &staging).await;
        let closed = session.close().await;

        outcome?;
        closed.map_err(|e| StagingError::new(destination, steps::CLOSE, e))?;
        Ok(())
    }

    /// Probe for the staging table, create it when absent, and load the
    /// buffer into it.
    async fn stage(
        &self,
        session: &mut C::Session,
        buffer: &TabularBuffer,
        destination: &str,
        staging: &str,
    ) -> std::result::Result<(), StagingError> {
        let probe = sql::object_id_probe(staging);
        let probed = session
            .query(&probe, self.config.timeouts.statement_secs)
            .await
            .map_err(|e| StagingError::new(destination, steps::CHECK, e))?;

        match probed.rows.first().and_then(|row| row.first()) {
            // Create only on an explicit NULL scalar
            Some(SqlValue::Null) => {
                let ddl = sql::create_table(staging, buffer, &self.types)
                    .map_err(|e| StagingError::new(destination, steps::CREATE, e))?;
                debug!("Creating staging table: {}", ddl);
                session
                    .execute(&ddl, self.config.timeouts.statement_secs)
                    .await
                    .map_err(|e| StagingError::new(destination, steps::CREATE, e))?;
            }
            Some(_) => {
                debug!("Staging table '{}' already present", staging);
            }
            None => {
                debug!(
                    "Existence probe for '{}' returned no rows; not creating",
                    staging
                );
            }
        }

        self.loader
            .load(
                session,
                buffer,
                staging,
                self.config.load.batch_size,
                self.config.timeouts.staging_load_secs,
            )
            .await
            .map_err(|e| StagingError::new(destination, steps::LOAD, e))?;
        Ok(())
    }

    async fn merge_steps(
        &self,
        session: &mut C::Session,
        buffer: &TabularBuffer,
        destination: &str,
        staging: &str,
        batch: &StatementBatch,
    ) -> std::result::Result<u64, StagingError> {
        self.stage(session, buffer, destination, staging).await?;
        session
            .execute(&batch.to_string(), self.config.timeouts.statement_secs)
            .await
            .map_err(|e| StagingError::new(destination, steps::EXECUTE, e))
    }

    async fn join_steps(
        &self,
        session: &mut C::Session,
        buffer: &TabularBuffer,
        destination: &str,
        staging: &str,
        batch: &StatementBatch,
    ) -> std::result::Result<QueryResult, StagingError> {
        self.stage(session, buffer, destination, staging).await?;
        session
            .query(&batch.to_string(), self.config.timeouts.statement_secs)
            .await
            .map_err(|e| StagingError::new(destination, steps::EXECUTE, e))
    }

    async fn drop_steps(
        &self,
        session: &mut C::Session,
        destination: &str,
        staging: &str,
    ) -> std::result::Result<(), StagingError> {
        let probe = sql::object_id_probe(staging);
        let probed = session
            .query(&probe, self.config.timeouts.statement_secs)
            .await
            .map_err(|e| StagingError::new(destination, steps::CHECK, e))?;

        // Drop only on a non-null scalar
        let present = matches!(
            probed.rows.first().and_then(|row| row.first()),
            Some(value) if !value.is_null()
        );
        if present {
            session
                .execute(
                    &Cleanup::Drop.statement(staging),
                    self.config.timeouts.statement_secs,
                )
                .await
                .map_err(|e| StagingError::new(destination, steps::DROP, e))?;
            info!("Dropped staging table '{}'", staging);
        } else {
            debug!("No staging table '{}' to drop", staging);
        }
        Ok(())
    }

    // Staging rows survive a failure past the create step; the staging
    // table is only cleaned up by the statement batch that never ran.
    fn warn_on_residue<T>(
        &self,
        outcome: &std::result::Result<T, StagingError>,
        destination: &str,
        staging: &str,
    ) {
        if let Err(err) = outcome {
            if err.step == steps::LOAD || err.step == steps::EXECUTE {
                warn!(
                    "Staged operation for '{}' failed while {}; staging table '{}' may be left behind",
                    destination, err.step, staging
                );
            }
        }
    }
}

fn resolve_table<'a, T: BulkRecord>(override_name: Option<&'a str>) -> Result<&'a str> {
    override_name.or(T::TABLE).ok_or_else(|| {
        WriterError::MissingTableName {
            record: std::any::type_name::<T>(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FieldDef;

    struct Named;
    struct Unnamed;

    static NO_FIELDS: [FieldDef; 0] = [];

    impl BulkRecord for Named {
        const TABLE: Option<&'static str> = Some("Events");
        fn fields() -> &'static [FieldDef] {
            &NO_FIELDS
        }
        fn values(&self) -> Vec<SqlValue> {
            Vec::new()
        }
    }

    impl BulkRecord for Unnamed {
        fn fields() -> &'static [FieldDef] {
            &NO_FIELDS
        }
        fn values(&self) -> Vec<SqlValue> {
            Vec::new()
        }
    }

    #[test]
    fn test_resolve_table_prefers_override() {
        assert_eq!(resolve_table::<Named>(Some("Override")).unwrap(), "Override");
    }

    #[test]
    fn test_resolve_table_falls_back_to_declared() {
        assert_eq!(resolve_table::<Named>(None).unwrap(), "Events");
    }

    #[test]
    fn test_resolve_table_missing_names_record_type() {
        let err = resolve_table::<Unnamed>(None).unwrap_err();
        match err {
            WriterError::MissingTableName { record } => {
                assert!(record.contains("Unnamed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_staging_error_names_table_and_step() {
        let err = StagingError::new(
            "Users",
            steps::LOAD,
            StoreError::ExecuteFailed("boom".to_string()),
        );
        let text = err.to_string();
        assert!(text.contains("Users"));
        assert!(text.contains("loading staging table"));
        assert!(text.contains("boom"));
    }
}

//! Store access traits and shared result types
//!
//! This module defines the seam between the SDK and whatever store the
//! caller runs against:
//! - [`StoreConnector`] / [`StoreSession`]: session lifecycle and
//!   statement execution
//! - [`BulkCopy`]: the vendor bulk-transfer mechanism
//!
//! The SDK ships no network driver. Callers implement the traits over
//! their driver of choice; [`MemoryStore`] provides an in-process
//! implementation for tests and local development.

use async_trait::async_trait;
use serde::Serialize;

use crate::records::{SqlValue, TabularBuffer};

pub mod memory;

pub use memory::{MemoryBulkCopy, MemorySession, MemoryStore};

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open a session
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement execution failed
    #[error("Execute failed: {0}")]
    ExecuteFailed(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Session close failed
    #[error("Close failed: {0}")]
    CloseFailed(String),
}

/// Error reported by the bulk-transfer mechanism
///
/// Transfers are never retried: whatever the mechanism reports surfaces
/// here unchanged, tagged with the destination table.
#[derive(Debug, thiserror::Error)]
#[error("Bulk transfer into '{table}' failed: {reason}")]
pub struct TransferError {
    /// Destination table of the failed transfer
    pub table: String,
    /// The mechanism's report
    pub reason: String,
}

/// Query result set with positional values
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data, one value per column
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at a row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut object = serde_json::Map::new();
                for (column, value) in self.columns.iter().zip(row) {
                    object.insert(
                        column.clone(),
                        serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
                    );
                }
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

/// Connector handing out store sessions
///
/// One session per SDK operation: the SDK opens it, runs the operation's
/// statements on it, and closes it on every exit path. Connectors may
/// pool under the hood, but the SDK never holds more than one session at
/// a time per operation.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Session type handed out by this connector
    type Session: StoreSession;

    /// Open a new session
    async fn open(&self) -> Result<Self::Session, StoreError>;
}

/// A single open store session
#[async_trait]
pub trait StoreSession: Send {
    /// Execute a statement batch, returning rows affected
    ///
    /// # Arguments
    /// * `sql` - one statement, or several joined by `;`
    /// * `timeout_secs` - server-side timeout for the whole batch
    ///
    /// # Returns
    /// Total rows affected across the batch
    async fn execute(&mut self, sql: &str, timeout_secs: u32) -> Result<u64, StoreError>;

    /// Execute a statement batch and return its first result set
    ///
    /// Later statements in the batch still run; only the first result set
    /// is materialized and returned.
    async fn query(&mut self, sql: &str, timeout_secs: u32) -> Result<QueryResult, StoreError>;

    /// Close the session, releasing its resources
    async fn close(self) -> Result<(), StoreError>;
}

/// Vendor bulk-transfer mechanism
///
/// Implementations move a whole buffer into a destination table over an
/// open session. The SDK never retries a transfer; a failed transfer may
/// leave partial batches behind, and recovery is the caller's call.
#[async_trait]
pub trait BulkCopy<S: StoreSession>: Send + Sync {
    /// Transfer every row of `buffer` into `destination`
    ///
    /// # Arguments
    /// * `session` - open session the transfer rides on
    /// * `destination` - table receiving the rows
    /// * `buffer` - validated tabular data
    /// * `batch_size` - rows per transfer batch; `0` sends all rows in one
    /// * `timeout_secs` - server-side timeout for the whole transfer
    ///
    /// # Returns
    /// Number of rows written
    async fn transfer(
        &self,
        session: &mut S,
        destination: &str,
        buffer: &TabularBuffer,
        batch_size: usize,
        timeout_secs: u32,
    ) -> Result<u64, TransferError>;
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Format query results for display
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_as_csv(result),
        OutputFormat::Table => format_as_table(result),
    }
}

fn format_as_csv(result: &QueryResult) -> String {
    let mut output = String::new();

    // Header row
    output.push_str(&result.columns.join(","));
    output.push('\n');

    // Data rows
    for row in &result.rows {
        let values: Vec<String> = row.iter().map(csv_cell).collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

fn csv_cell(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::String(s) => {
            // Escape quotes and wrap in quotes if contains comma
            if s.contains(',') || s.contains('"') || s.contains('\n') {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}

fn format_as_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return "(0 rows)".to_string();
    }

    // Calculate column widths
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.len()).collect();

    for row in &result.rows {
        for (i, value) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(value.to_string().len());
            }
        }
    }

    let mut output = String::new();

    // Header
    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
        .collect();
    output.push_str(&header.join(" | "));
    output.push('\n');

    // Separator
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    // Data rows
    for row in &result.rows {
        let values: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", value.to_string(), width = width)
            })
            .collect();
        output.push_str(&values.join(" | "));
        output.push('\n');
    }

    output.push_str(&format!("({} rows)", result.row_count()));

    output
}

//! In-memory store backend
//!
//! Implements [`StoreConnector`], [`StoreSession`], and [`BulkCopy`] over
//! shared in-process state and the statement subset the SDK emits:
//! existence probes, CREATE/DROP/TRUNCATE TABLE, plain SELECTs, and the
//! set-based `UPDATE ... FROM` form.
//!
//! Intended for tests and local development. Beyond holding tables, the
//! store records every submitted statement batch, timeout, and bulk
//! transfer so suites can assert on protocol behavior, counts opened and
//! closed sessions, and supports one-shot fault injection for
//! failure-path coverage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{BulkCopy, QueryResult, StoreConnector, StoreError, StoreSession, TransferError};
use crate::records::{SqlValue, TabularBuffer};

static RE_OBJECT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^SELECT OBJECT_ID\('([^']+)'\)$").expect("Invalid regex"));
static RE_CREATE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^CREATE TABLE (\S+) \( (.+) \)$").expect("Invalid regex"));
static RE_DROP_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^DROP TABLE (\S+)$").expect("Invalid regex"));
static RE_TRUNCATE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^TRUNCATE TABLE (\S+)$").expect("Invalid regex"));
static RE_SELECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^SELECT (.+) FROM (\S+)$").expect("Invalid regex"));
static RE_UPDATE_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^UPDATE (\S+) SET (.+) FROM (\S+) (\S+) WHERE (\S+)\.(\S+) = (\S+)\.(\S+)$")
        .expect("Invalid regex")
});

/// A table held by the store
#[derive(Debug, Clone)]
pub struct StoredTable {
    /// Column names in declaration order
    pub columns: Vec<String>,
    /// Row values, one per column
    pub rows: Vec<Vec<SqlValue>>,
    object_id: i32,
}

/// One statement batch observed by the store
#[derive(Debug, Clone)]
pub struct ExecutedStatement {
    /// Batch text exactly as submitted
    pub sql: String,
    /// Timeout the caller passed with it
    pub timeout_secs: u32,
}

/// One bulk transfer observed by the store
#[derive(Debug, Clone)]
pub struct TransferRecord {
    /// Destination table
    pub destination: String,
    /// Rows written
    pub rows: u64,
    /// Batch size the caller passed
    pub batch_size: usize,
    /// Timeout the caller passed
    pub timeout_secs: u32,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<String, StoredTable>,
    statements: Vec<ExecutedStatement>,
    transfers: Vec<TransferRecord>,
    sessions_opened: usize,
    sessions_closed: usize,
    next_object_id: i32,
    fail_next_execute: Option<String>,
    fail_matching: Option<(String, String)>,
    fail_next_transfer: Option<String>,
}

impl StoreState {
    fn allocate_object_id(&mut self) -> i32 {
        self.next_object_id += 1;
        self.next_object_id
    }
}

/// In-memory store for tests and local development
///
/// Cloning is cheap and clones share state, so a test can keep one handle
/// for assertions while the writer owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another test thread panicked mid-call;
    // the state itself is still usable for assertions.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a table with the given columns
    pub fn create_table(&self, name: &str, columns: &[&str]) {
        let mut state = self.lock();
        let object_id = state.allocate_object_id();
        state.tables.insert(
            name.to_string(),
            StoredTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
                object_id,
            },
        );
    }

    /// Append a row to a table, for seeding test data
    pub fn insert_row(&self, table: &str, values: Vec<SqlValue>) -> Result<(), StoreError> {
        let mut state = self.lock();
        let stored = state
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::ExecuteFailed(format!("Invalid object name '{}'", table)))?;
        if values.len() != stored.columns.len() {
            return Err(StoreError::ExecuteFailed(format!(
                "Row has {} values, table '{}' has {} columns",
                values.len(),
                table,
                stored.columns.len()
            )));
        }
        stored.rows.push(values);
        Ok(())
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.lock().tables.contains_key(name)
    }

    /// Snapshot of a table, when present
    pub fn table(&self, name: &str) -> Option<StoredTable> {
        self.lock().tables.get(name).cloned()
    }

    /// Every statement batch observed so far, in submission order
    pub fn statements(&self) -> Vec<ExecutedStatement> {
        self.lock().statements.clone()
    }

    /// Every bulk transfer observed so far, in order
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.lock().transfers.clone()
    }

    /// Sessions opened so far
    pub fn sessions_opened(&self) -> usize {
        self.lock().sessions_opened
    }

    /// Sessions closed so far
    pub fn sessions_closed(&self) -> usize {
        self.lock().sessions_closed
    }

    /// Sessions opened but never closed
    pub fn open_sessions(&self) -> usize {
        let state = self.lock();
        state.sessions_opened.saturating_sub(state.sessions_closed)
    }

    /// Fail the next execute or query call with the given message
    pub fn fail_next_execute(&self, reason: &str) {
        self.lock().fail_next_execute = Some(reason.to_string());
    }

    /// Fail the first batch whose text contains `fragment`
    ///
    /// One-shot like [`fail_next_execute`](Self::fail_next_execute), but
    /// lets a test target one statement of a multi-step protocol without
    /// tripping the probes that run before it.
    pub fn fail_statement_containing(&self, fragment: &str, reason: &str) {
        self.lock().fail_matching = Some((fragment.to_string(), reason.to_string()));
    }

    /// Fail the next bulk transfer with the given message
    pub fn fail_next_transfer(&self, reason: &str) {
        self.lock().fail_next_transfer = Some(reason.to_string());
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    type Session = MemorySession;

    async fn open(&self) -> Result<MemorySession, StoreError> {
        let mut state = self.lock();
        state.sessions_opened += 1;
        Ok(MemorySession {
            state: Arc::clone(&self.state),
        })
    }
}

/// A live session against a [`MemoryStore`]
#[derive(Debug)]
pub struct MemorySession {
    state: Arc<Mutex<StoreState>>,
}

impl MemorySession {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn execute(&mut self, sql: &str, timeout_secs: u32) -> Result<u64, StoreError> {
        let mut state = self.lock();
        let (affected, _) = run_batch(&mut state, sql, timeout_secs)?;
        Ok(affected)
    }

    async fn query(&mut self, sql: &str, timeout_secs: u32) -> Result<QueryResult, StoreError> {
        let mut state = self.lock();
        let (_, rows) = run_batch(&mut state, sql, timeout_secs)?;
        rows.ok_or_else(|| {
            StoreError::QueryFailed(format!("Statement returned no result set: {}", sql))
        })
    }

    async fn close(self) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.sessions_closed += 1;
        Ok(())
    }
}

/// Bulk transfer into a [`MemoryStore`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBulkCopy;

#[async_trait]
impl BulkCopy<MemorySession> for MemoryBulkCopy {
    async fn transfer(
        &self,
        session: &mut MemorySession,
        destination: &str,
        buffer: &TabularBuffer,
        batch_size: usize,
        timeout_secs: u32,
    ) -> Result<u64, TransferError> {
        let mut state = session.lock();
        if let Some(reason) = state.fail_next_transfer.take() {
            return Err(TransferError {
                table: destination.to_string(),
                reason,
            });
        }
        let table = state.tables.get_mut(destination).ok_or_else(|| TransferError {
            table: destination.to_string(),
            reason: format!("Invalid object name '{}'", destination),
        })?;
        if table.columns.len() != buffer.columns().len() {
            return Err(TransferError {
                table: destination.to_string(),
                reason: format!(
                    "Column count mismatch: table has {}, buffer has {}",
                    table.columns.len(),
                    buffer.columns().len()
                ),
            });
        }

        // Zero means a single batch carrying every row
        let chunk = if batch_size == 0 {
            buffer.row_count().max(1)
        } else {
            batch_size
        };
        let mut written = 0u64;
        for batch in buffer.rows().chunks(chunk) {
            table.rows.extend(batch.iter().cloned());
            written += batch.len() as u64;
        }
        state.transfers.push(TransferRecord {
            destination: destination.to_string(),
            rows: written,
            batch_size,
            timeout_secs,
        });
        Ok(written)
    }
}

enum StatementOutcome {
    Rows(QueryResult),
    Affected(u64),
}

fn run_batch(
    state: &mut StoreState,
    sql: &str,
    timeout_secs: u32,
) -> Result<(u64, Option<QueryResult>), StoreError> {
    state.statements.push(ExecutedStatement {
        sql: sql.to_string(),
        timeout_secs,
    });
    if let Some(reason) = state.fail_next_execute.take() {
        return Err(StoreError::ExecuteFailed(reason));
    }
    let matched = state
        .fail_matching
        .as_ref()
        .is_some_and(|(fragment, _)| sql.contains(fragment.as_str()));
    if matched && let Some((_, reason)) = state.fail_matching.take() {
        return Err(StoreError::ExecuteFailed(reason));
    }

    let mut affected = 0u64;
    let mut first_rows: Option<QueryResult> = None;
    for part in sql.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match run_statement(state, part)? {
            StatementOutcome::Affected(n) => affected += n,
            StatementOutcome::Rows(rows) => {
                if first_rows.is_none() {
                    first_rows = Some(rows);
                }
            }
        }
    }
    Ok((affected, first_rows))
}

fn run_statement(state: &mut StoreState, sql: &str) -> Result<StatementOutcome, StoreError> {
    if let Some(caps) = RE_OBJECT_ID.captures(sql) {
        // Always one row: the object id, or NULL when the table is absent
        let scalar = state
            .tables
            .get(&caps[1])
            .map(|t| SqlValue::I32(t.object_id))
            .unwrap_or(SqlValue::Null);
        return Ok(StatementOutcome::Rows(QueryResult::new(
            vec!["object_id".to_string()],
            vec![vec![scalar]],
        )));
    }

    if let Some(caps) = RE_UPDATE_FROM.captures(sql) {
        return run_update_from(state, &caps);
    }

    if let Some(caps) = RE_CREATE_TABLE.captures(sql) {
        let name = caps[1].to_string();
        if state.tables.contains_key(&name) {
            return Err(StoreError::ExecuteFailed(format!(
                "There is already an object named '{}'",
                name
            )));
        }
        let columns: Vec<String> = caps[2]
            .split(", ")
            .map(|def| {
                def.split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        let object_id = state.allocate_object_id();
        state.tables.insert(
            name,
            StoredTable {
                columns,
                rows: Vec::new(),
                object_id,
            },
        );
        return Ok(StatementOutcome::Affected(0));
    }

    if let Some(caps) = RE_DROP_TABLE.captures(sql) {
        state.tables.remove(&caps[1]).ok_or_else(|| {
            StoreError::ExecuteFailed(format!(
                "Cannot drop the table '{}' because it does not exist",
                &caps[1]
            ))
        })?;
        return Ok(StatementOutcome::Affected(0));
    }

    if let Some(caps) = RE_TRUNCATE_TABLE.captures(sql) {
        let table = state.tables.get_mut(&caps[1]).ok_or_else(|| {
            StoreError::ExecuteFailed(format!(
                "Cannot truncate the table '{}' because it does not exist",
                &caps[1]
            ))
        })?;
        table.rows.clear();
        return Ok(StatementOutcome::Affected(0));
    }

    if let Some(caps) = RE_SELECT.captures(sql) {
        return run_select(state, &caps[1], &caps[2]);
    }

    Err(StoreError::ExecuteFailed(format!(
        "Unsupported statement: {}",
        sql
    )))
}

fn run_select(
    state: &StoreState,
    projection: &str,
    table: &str,
) -> Result<StatementOutcome, StoreError> {
    let stored = state
        .tables
        .get(table)
        .ok_or_else(|| StoreError::QueryFailed(format!("Invalid object name '{}'", table)))?;

    if projection.trim() == "*" {
        return Ok(StatementOutcome::Rows(QueryResult::new(
            stored.columns.clone(),
            stored.rows.clone(),
        )));
    }

    let wanted: Vec<&str> = projection.split(',').map(str::trim).collect();
    let mut indices = Vec::with_capacity(wanted.len());
    for name in &wanted {
        let index = stored
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| StoreError::QueryFailed(format!("Invalid column name '{}'", name)))?;
        indices.push(index);
    }
    let rows = stored
        .rows
        .iter()
        .map(|row| {
            indices
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(SqlValue::Null))
                .collect()
        })
        .collect();
    Ok(StatementOutcome::Rows(QueryResult::new(
        wanted.iter().map(|s| s.to_string()).collect(),
        rows,
    )))
}

// The set-based merge form:
//   UPDATE <target> SET a = s.a, b = s.b FROM <source> s WHERE <target>.k = s.k
// Each target row takes its values from the first source row whose key
// matches.
fn run_update_from(
    state: &mut StoreState,
    caps: &regex::Captures<'_>,
) -> Result<StatementOutcome, StoreError> {
    let target_name = &caps[1];
    let assignments_text = &caps[2];
    let source_name = &caps[3];
    let alias = &caps[4];

    let (target_key, source_key) = join_keys(
        target_name,
        alias,
        (&caps[5], &caps[6]),
        (&caps[7], &caps[8]),
    )?;

    let source = state.tables.get(source_name).cloned().ok_or_else(|| {
        StoreError::ExecuteFailed(format!("Invalid object name '{}'", source_name))
    })?;
    let source_key_index = column_index(&source.columns, &source_key, source_name)?;

    let mut assignments = Vec::new();
    for assignment in assignments_text.split(", ") {
        let (left, right) = assignment.split_once(" = ").ok_or_else(|| {
            StoreError::ExecuteFailed(format!("Unsupported assignment: {}", assignment))
        })?;
        let source_column = right.strip_prefix(&format!("{alias}.")).ok_or_else(|| {
            StoreError::ExecuteFailed(format!("Unsupported assignment: {}", assignment))
        })?;
        assignments.push((left.trim(), source_column.trim()));
    }

    let target = state.tables.get_mut(target_name).ok_or_else(|| {
        StoreError::ExecuteFailed(format!("Invalid object name '{}'", target_name))
    })?;
    let target_key_index = column_index(&target.columns, &target_key, target_name)?;

    let mut pairs = Vec::with_capacity(assignments.len());
    for (target_column, source_column) in assignments {
        let target_index = column_index(&target.columns, target_column, target_name)?;
        let source_index = column_index(&source.columns, source_column, source_name)?;
        pairs.push((target_index, source_index));
    }

    let mut affected = 0u64;
    for row in &mut target.rows {
        // A null join key matches no row, not even another null
        let matched = match row.get(target_key_index) {
            Some(key) if !key.is_null() => source
                .rows
                .iter()
                .find(|source_row| source_row.get(source_key_index) == Some(key)),
            _ => None,
        };
        if let Some(source_row) = matched {
            for &(target_index, source_index) in &pairs {
                if let (Some(cell), Some(value)) =
                    (row.get_mut(target_index), source_row.get(source_index))
                {
                    *cell = value.clone();
                }
            }
            affected += 1;
        }
    }
    Ok(StatementOutcome::Affected(affected))
}

fn join_keys(
    target_name: &str,
    alias: &str,
    left: (&str, &str),
    right: (&str, &str),
) -> Result<(String, String), StoreError> {
    let (left_qualifier, left_column) = left;
    let (right_qualifier, right_column) = right;
    if left_qualifier == target_name && right_qualifier == alias {
        Ok((left_column.to_string(), right_column.to_string()))
    } else if left_qualifier == alias && right_qualifier == target_name {
        Ok((right_column.to_string(), left_column.to_string()))
    } else {
        Err(StoreError::ExecuteFailed(format!(
            "Unsupported join condition: {}.{} = {}.{}",
            left_qualifier, left_column, right_qualifier, right_column
        )))
    }
}

fn column_index(columns: &[String], name: &str, table: &str) -> Result<usize, StoreError> {
    columns.iter().position(|c| c == name).ok_or_else(|| {
        StoreError::ExecuteFailed(format!("Invalid column name '{}' for '{}'", name, table))
    })
}

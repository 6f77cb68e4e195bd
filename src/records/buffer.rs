//! Validated columnar buffer
//!
//! The buffer owns its column layout and rows; validation happens on the
//! way in, so everything downstream (DDL generation, bulk transfer) can
//! trust that rows and columns agree.

use super::value::SqlValue;
use super::{BulkRecord, FieldDef};

/// Error raised when a record disagrees with its declared field metadata
///
/// Any single mismatch fails the whole tabulation call; no partial buffer
/// is ever handed to a loader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TabulateError {
    /// Row produced a different number of values than declared
    #[error("Row {row} produced {got} values, expected {expected}")]
    ColumnCount {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// Value's primitive type does not match the column's declared type
    #[error(
        "Row {row}, column '{column}': value of type '{got}' does not match declared type '{expected}'"
    )]
    TypeMismatch {
        row: usize,
        column: String,
        expected: String,
        got: String,
    },

    /// Null value in a column not declared nullable
    #[error("Row {row}, column '{column}': null value in non-nullable column")]
    UnexpectedNull { row: usize, column: String },
}

/// Columnar buffer of validated rows
///
/// Every row holds exactly one value per column, each conforming to the
/// column's declared type (or null where the column allows it). Buffers
/// are built fresh per operation and never shared between calls.
#[derive(Debug, Clone)]
pub struct TabularBuffer {
    columns: Vec<FieldDef>,
    rows: Vec<Vec<SqlValue>>,
}

impl TabularBuffer {
    /// Empty buffer with the given column layout
    pub fn new(columns: &[FieldDef]) -> Self {
        Self {
            columns: columns.to_vec(),
            rows: Vec::new(),
        }
    }

    /// Tabulate a slice of records into a fresh buffer
    ///
    /// An empty slice is valid and yields a zero-row buffer whose columns
    /// are still populated from the type's metadata, so downstream DDL
    /// generation works regardless of row count.
    pub fn from_records<T: BulkRecord>(records: &[T]) -> Result<Self, TabulateError> {
        let mut buffer = Self::new(T::fields());
        buffer.rows.reserve(records.len());
        for record in records {
            buffer.push_row(record.values())?;
        }
        Ok(buffer)
    }

    /// Append one row, validating it against the column layout
    pub fn push_row(&mut self, values: Vec<SqlValue>) -> Result<(), TabulateError> {
        let row = self.rows.len();
        if values.len() != self.columns.len() {
            return Err(TabulateError::ColumnCount {
                row,
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        for (column, value) in self.columns.iter().zip(&values) {
            match value.type_name() {
                None => {
                    if !column.nullable {
                        return Err(TabulateError::UnexpectedNull {
                            row,
                            column: column.name.to_string(),
                        });
                    }
                }
                Some(ty) if ty != column.ty => {
                    return Err(TabulateError::TypeMismatch {
                        row,
                        column: column.name.to_string(),
                        expected: column.ty.to_string(),
                        got: ty.to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        self.rows.push(values);
        Ok(())
    }

    /// Column layout of this buffer
    pub fn columns(&self) -> &[FieldDef] {
        &self.columns
    }

    /// Validated rows
    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the buffer has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

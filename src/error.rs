//! Crate-level error surface
//!
//! Every public operation returns [`WriterError`]. Component errors keep
//! their own types and convert in via `From`, so callers can match on the
//! failure class without string inspection. One failure produces one
//! wrapped error; nothing is swallowed, and sessions are released before
//! errors surface.

use crate::config::ConfigError;
use crate::records::TabulateError;
use crate::store::{StoreError, TransferError};
use crate::typemap::UnmappedType;
use crate::writer::StagingError;

/// Error type for writer operations
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// No destination table: no override given and the record type
    /// declares none
    #[error("No destination table for record type '{record}': no override given and the type declares none")]
    MissingTableName {
        /// The record type that lacked a table
        record: &'static str,
    },

    /// Records disagreed with their declared field metadata
    #[error(transparent)]
    Tabulate(#[from] TabulateError),

    /// A primitive type had no column mapping
    #[error(transparent)]
    UnmappedType(#[from] UnmappedType),

    /// Session operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Bulk transfer failed
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A staged operation failed
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// Configuration loading failed
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for writer operations
pub type Result<T> = std::result::Result<T, WriterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_errors_convert_in() {
        let err: WriterError = UnmappedType {
            key: "blob".to_string(),
        }
        .into();
        assert!(matches!(err, WriterError::UnmappedType(_)));

        let err: WriterError = StoreError::QueryFailed("x".to_string()).into();
        assert!(matches!(err, WriterError::Store(_)));
    }

    #[test]
    fn test_missing_table_name_message() {
        let err = WriterError::MissingTableName { record: "my::User" };
        assert!(err.to_string().contains("my::User"));
    }
}

//! Error types for the import pipeline.
//!
//! Library operations return these typed errors; command handlers wrap them
//! with `anyhow` context before they reach the user.

use thiserror::Error;

/// Failures reported by a schema catalog or record store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object type '{0}' not found")]
    ObjectTypeNotFound(String),
    #[error("Record '{0}' not found")]
    RecordNotFound(String),
    #[error("Field with api name '{api_name}' already exists on '{object_type}'")]
    DuplicateApiName {
        object_type: String,
        api_name: String,
    },
    #[error("Update has no target record")]
    MissingTarget,
    #[error("Field name cannot be empty")]
    EmptyFieldName,
    #[error("{0}")]
    Backend(String),
}

/// Rejected column mapping edits.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Column index {index} is out of range ({count} column(s))")]
    ColumnOutOfRange { index: usize, count: usize },
    #[error("Field '{field}' is already mapped to column '{column}'")]
    FieldAlreadyMapped { field: String, column: String },
    #[error("Field '{0}' not found on the target object")]
    FieldNotFound(String),
    #[error("Match field '{0}' is not mapped to any column")]
    MatchFieldUnmapped(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No tables were found in the source")]
    NoTables,
    #[error("{count} tables were found; select one with --table-index")]
    AmbiguousTables { count: usize },
    #[error("Table index {index} is out of range ({count} table(s) found)")]
    TableIndexOutOfRange { index: usize, count: usize },
    #[error("Failed to tokenize delimited input: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

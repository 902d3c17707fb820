//! Error types for all engine operations.

use thiserror::Error;

use crate::api::condition::Operator;
use crate::types::ItemPointer;

/// Top-level error type for engine operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error("item not found in table '{table}': {pointer}")]
    NotFound { table: String, pointer: ItemPointer },
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table not found: {0}")]
    UnknownTable(String),

    #[error("table already exists: {0}")]
    DuplicateTable(String),

    #[error("index not found: {0}")]
    UnknownIndex(String),

    #[error("missing key attribute: {0}")]
    MissingKeyAttribute(String),

    #[error("attribute '{name}' holds an unsupported value: {kind}")]
    UnsupportedValue { name: String, kind: &'static str },

    #[error("record must be a JSON object")]
    NotAnObject,

    #[error("invalid schema for table '{table}': {reason}")]
    InvalidSchema { table: String, reason: String },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("attribute '{attribute}' is not the {role} key '{expected}'")]
    NonKeyAttribute {
        attribute: String,
        role: &'static str,
        expected: String,
    },

    #[error("a sort key condition requires a hash key condition")]
    SortWithoutHash,

    #[error("sort key not supported on this table")]
    SortKeyNotSupported,

    #[error("index '{0}' has no sort key")]
    IndexSortKeyNotSupported(String),

    #[error("scan does not accept key conditions")]
    KeyConditionOnScan,

    #[error("invalid page token: {0}")]
    InvalidPageToken(String),
}

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("operator {0:?} is not implemented")]
    NotImplemented(Operator),
}

/// Flat classification of every error, for callers that only need to
/// branch on the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownTable,
    DuplicateTable,
    UnknownIndex,
    SchemaViolation,
    InvalidQuery,
    NotFound,
    NotImplemented,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Schema(SchemaError::UnknownTable(_)) => ErrorKind::UnknownTable,
            Error::Schema(SchemaError::DuplicateTable(_)) => ErrorKind::DuplicateTable,
            Error::Schema(SchemaError::UnknownIndex(_)) => ErrorKind::UnknownIndex,
            Error::Schema(_) => ErrorKind::SchemaViolation,
            Error::Query(_) => ErrorKind::InvalidQuery,
            Error::Condition(ConditionError::NotImplemented(_)) => ErrorKind::NotImplemented,
            Error::NotFound { .. } => ErrorKind::NotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Repository errors
//!
//! Every failure of a repository call is a [`RepositoryError`]. Callers that only
//! care about the category (HTTP mapping, retries) match on [`RepositoryError::kind`].

use crate::dtos::ConversionError;
use thiserror::Error;

/// Error category, independent of the concrete variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Configuration,
    Integrity,
    Storage,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} with id {id} not found in database")]
    NotFound { entity: &'static str, id: String },

    #[error("page size {requested} exceeds maximum allowed {max}")]
    PageSizeExceeded { requested: u32, max: u32 },

    #[error("unknown field '{field}' for {entity}")]
    UnknownField { entity: &'static str, field: String },

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("unsupported sort: {0}")]
    UnsupportedSort(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("invalid timestamp for '{field}': {value}")]
    InvalidTimestamp { field: String, value: String },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(
        "composite index on ({sort_field}, {unique_field}) is required for pagination on table '{table}'"
    )]
    MissingIndex {
        table: &'static str,
        sort_field: String,
        unique_field: String,
    },

    #[error("integrity violation: {0}")]
    Integrity(#[source] sqlx::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::NotFound { .. } => ErrorKind::NotFound,
            RepositoryError::PageSizeExceeded { .. }
            | RepositoryError::UnknownField { .. }
            | RepositoryError::UnsupportedFilter(_)
            | RepositoryError::UnsupportedSort(_)
            | RepositoryError::InvalidCursor(_)
            | RepositoryError::InvalidTimestamp { .. }
            | RepositoryError::Conversion(_) => ErrorKind::Validation,
            RepositoryError::MissingIndex { .. } => ErrorKind::Configuration,
            RepositoryError::Integrity(_) => ErrorKind::Integrity,
            RepositoryError::Database(_) => ErrorKind::Storage,
        }
    }
}

/// Whether a driver error is a constraint violation (unique, foreign key, not null, check)
pub fn is_integrity_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => !matches!(db.kind(), sqlx::error::ErrorKind::Other),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let not_found = RepositoryError::NotFound {
            entity: "Item",
            id: "42".to_string(),
        };
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.to_string(), "Item with id 42 not found in database");

        let exceeded = RepositoryError::PageSizeExceeded { requested: 2000, max: 1000 };
        assert_eq!(exceeded.kind(), ErrorKind::Validation);

        let missing = RepositoryError::MissingIndex {
            table: "items",
            sort_field: "order".to_string(),
            unique_field: "id".to_string(),
        };
        assert_eq!(missing.kind(), ErrorKind::Configuration);

        assert_eq!(RepositoryError::from(sqlx::Error::PoolTimedOut).kind(), ErrorKind::Storage);
        assert_eq!(RepositoryError::Integrity(sqlx::Error::PoolClosed).kind(), ErrorKind::Integrity);
    }

    #[test]
    fn test_non_database_errors_are_not_integrity_violations() {
        assert!(!is_integrity_violation(&sqlx::Error::RowNotFound));
        assert!(!is_integrity_violation(&sqlx::Error::PoolTimedOut));
    }
}

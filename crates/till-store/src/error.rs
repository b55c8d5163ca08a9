//! # Store Error Types
//!
//! Error types for storage and service operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite / JSON failure (sqlx::Error, serde_json::Error)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds collection + operation context        │
//! │       │                                                                 │
//! │       │        CoreError (till-core) ← business rule failures          │
//! │       │             │                                                   │
//! │       ▼             ▼                                                   │
//! │  ServiceError ← what repositories and the sale service return          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UI: is_validation() ? "fix your input" : "failed to save"             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use till_core::{CoreError, ValidationError};

use crate::document::Collection;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record matched an update or lookup.
    ///
    /// ## When This Occurs
    /// - `update` where no record has `field == value`
    /// - Product id missing during a stock mutation
    #[error("No record in {collection} with {field} = {value}")]
    NotFound {
        collection: Collection,
        field: String,
        value: String,
    },

    /// A record or collection blob could not be encoded or decoded.
    ///
    /// ## When This Occurs
    /// - The stored JSON for a collection is corrupt
    /// - A record does not match the typed shape it is read as
    #[error("Serialization failed for {collection} during {operation}: {message}")]
    Serialization {
        collection: Collection,
        operation: &'static str,
        message: String,
    },

    /// The substrate rejected a write.
    #[error("Write to {collection} failed during {operation}: {message}")]
    Write {
        collection: Collection,
        operation: &'static str,
        message: String,
    },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created or opened
    /// - Pool closed or exhausted
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Anything else the substrate reports.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a NotFound error.
    pub fn not_found(collection: Collection, field: impl Into<String>, value: impl ToString) -> Self {
        StoreError::NotFound {
            collection,
            field: field.into(),
            value: value.to_string(),
        }
    }

    pub(crate) fn serialization(
        collection: Collection,
        operation: &'static str,
        err: impl ToString,
    ) -> Self {
        StoreError::Serialization {
            collection,
            operation,
            message: err.to_string(),
        }
    }

    pub(crate) fn write(collection: Collection, operation: &'static str, err: impl ToString) -> Self {
        StoreError::Write {
            collection,
            operation,
            message: err.to_string(),
        }
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::PoolTimedOut   → StoreError::Connection
/// sqlx::Error::PoolClosed     → StoreError::Connection
/// sqlx::Error::Io             → StoreError::Connection
/// Other                       → StoreError::Internal
/// ```
///
/// Writes that know their collection map through [`StoreError::write`]
/// instead, so the message names what failed.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                StoreError::Connection("Timed out waiting for a connection".to_string())
            }
            sqlx::Error::PoolClosed => StoreError::Connection("Pool is closed".to_string()),
            sqlx::Error::Io(io) => StoreError::Connection(io.to_string()),
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Service Error
// =============================================================================

/// What repositories and the sale service return: either the input broke a
/// business rule, or persistence failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Whether the caller can fix this by changing the input.
    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Core(_))
    }

    /// The business rule failure, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            ServiceError::Core(err) => Some(err),
            ServiceError::Store(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = StoreError::not_found(Collection::Products, "id", 42);
        assert_eq!(err.to_string(), "No record in products with id = 42");
    }

    #[test]
    fn test_service_error_classification() {
        let input: ServiceError = CoreError::EmptySale.into();
        assert!(input.is_validation());
        assert_eq!(input.as_core(), Some(&CoreError::EmptySale));

        let storage: ServiceError = StoreError::Internal("disk".to_string()).into();
        assert!(!storage.is_validation());
        assert!(storage.as_core().is_none());
    }

    #[test]
    fn test_validation_error_lifts_to_core() {
        let err: ServiceError = ValidationError::required("name").into();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));
    }
}

use thiserror::Error;

const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The transaction could not be serialized against a concurrent one
    /// (serialization failure or deadlock). It has been aborted.
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A check constraint rejected the write.
    #[error("Check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    /// A stored value could not be mapped back to a record.
    #[error("Invalid data in column {column}: {reason}")]
    InvalidData {
        column: &'static str,
        reason: String,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if the error is a unique violation on `constraint`.
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint: c } if c == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = || db.constraint().unwrap_or_default().to_string();
            match db.code().as_deref() {
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                    return StoreError::Conflict(db.message().to_string());
                }
                Some(UNIQUE_VIOLATION) => {
                    return StoreError::UniqueViolation {
                        constraint: constraint(),
                    };
                }
                Some(CHECK_VIOLATION) => {
                    return StoreError::CheckViolation {
                        constraint: constraint(),
                    };
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

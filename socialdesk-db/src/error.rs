//! Error types for socialdesk-db
//!
//! Two sentinel conditions belong to the engine itself: [`DbError::NoRecords`]
//! and [`DbError::NoRowsAffected`]. Driver errors pass through untouched in
//! [`DbError::Sqlx`], so callers match on variants, never on message text.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, DbError>;

/// Database error type
#[derive(Debug, Error)]
pub enum DbError {
    /// The query ran but matched zero rows, or the entity had no query for the op.
    #[error("no records found")]
    NoRecords,

    /// A write in a consistency-checked batch changed zero rows.
    #[error("no rows affected")]
    NoRowsAffected,

    /// The transaction handle was already committed or rolled back.
    #[error("transaction has already been committed or rolled back")]
    TxDone,

    /// Configuration rejected before any connection was attempted.
    #[error("invalid database configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    pub fn is_no_records(&self) -> bool {
        matches!(self, Self::NoRecords)
    }

    pub fn is_no_rows_affected(&self) -> bool {
        matches!(self, Self::NoRowsAffected)
    }
}

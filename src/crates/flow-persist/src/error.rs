//! Error types for persistence operations
//!
//! Store errors are surfaced with their `sqlx::Error` source attached. The only
//! error that is ever swallowed is [`PersistError::AlreadyExists`] during schema
//! bootstrap, when a concurrent bootstrap created the table first.

use std::fmt;
use thiserror::Error;

/// Result type for persistence operations
pub type PersistResult<T> = std::result::Result<T, PersistError>;

/// Stage of the checkpoint + record write that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStage {
    /// Opening the transaction
    Begin,
    /// Inserting one of the checkpoint rows
    Checkpoint,
    /// Inserting the recovery record row
    Record,
    /// Committing
    Commit,
}

impl fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStage::Begin => write!(f, "begin"),
            TransactionStage::Checkpoint => write!(f, "checkpoint insert"),
            TransactionStage::Record => write!(f, "record insert"),
            TransactionStage::Commit => write!(f, "commit"),
        }
    }
}

/// Errors produced by the persistence adapter
#[derive(Debug, Error)]
pub enum PersistError {
    /// Table creation failed for a reason other than a concurrent create
    #[error("Schema error on table {table}: {source}")]
    Schema {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// The object being created already exists
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// Insert collided with an existing identifier
    #[error("Write conflict: {entity} with id {id} already exists")]
    WriteConflict {
        entity: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },

    /// The checkpoint + record write did not commit; nothing was persisted
    #[error("Transaction failed at {stage} for recover id {recover_id}: {source}")]
    TransactionFailure {
        recover_id: String,
        stage: TransactionStage,
        #[source]
        source: sqlx::Error,
    },

    /// No matching row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Status change not allowed from the row's current status
    #[error("Invalid transition for {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },

    /// Caller supplied data that cannot be persisted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other store error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PersistError {
    /// Create a new NotFound error with context
    pub fn not_found(context: impl Into<String>) -> Self {
        PersistError::NotFound(context.into())
    }

    /// Create a new InvalidInput error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        PersistError::InvalidInput(msg.into())
    }

    /// Check if this is a not found error
    ///
    /// For recovery lookups this means "nothing to recover", not a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistError::NotFound(_))
    }

    /// Check if this is a duplicate-id insert
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, PersistError::WriteConflict { .. })
    }

    /// Check if this is a failed checkpoint + record write
    pub fn is_transaction_failure(&self) -> bool {
        matches!(self, PersistError::TransactionFailure { .. })
    }

    /// Map an insert error, turning unique violations into [`PersistError::WriteConflict`]
    pub(crate) fn from_insert(err: sqlx::Error, entity: &str, id: &str) -> Self {
        if is_unique_violation(&err) {
            PersistError::WriteConflict {
                entity: entity.to_string(),
                id: id.to_string(),
                source: err,
            }
        } else {
            PersistError::Database(err)
        }
    }
}

/// SQLite reports primary key and unique index collisions with extended codes
/// 1555 and 2067; older drivers only expose the generic kind.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                || matches!(db_err.code().as_deref(), Some("1555") | Some("2067"))
        }
        _ => false,
    }
}

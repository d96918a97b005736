use thiserror::Error;

/// Store outcomes.  `AlreadyExists` and `NotFound` are part of the
/// idempotency contract, not exceptional conditions; callers are expected
/// to match on them.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("entry already exists")]
    AlreadyExists,

    #[error("entry not found")]
    NotFound,

    #[error("last processed height may not move backwards (current {current}, attempted {attempted})")]
    NonMonotonicHeight { current: u64, attempted: u64 },

    #[error("unsupported schema version {found}, expected {expected}")]
    InvalidSchemaVersion { expected: u64, found: u64 },

    #[error("codec error in table {table}: {reason}")]
    Codec { table: &'static str, reason: String },

    #[error("backend error: {0}")]
    Backend(String),
}

pub type DbResult<T> = Result<T, DbError>;

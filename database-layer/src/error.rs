use thiserror::Error;

/// PostgreSQL SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// How a failed query should be treated by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A unique constraint rejected the write
    UniqueViolation,
    /// The query matched no row where one was required
    RowNotFound,
    /// Anything else: connectivity, pool exhaustion, schema mismatch, decode errors
    Unavailable,
}

/// Classify a `sqlx` error
pub fn classify(err: &sqlx::Error) -> FailureKind {
    match err {
        sqlx::Error::RowNotFound => FailureKind::RowNotFound,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            FailureKind::UniqueViolation
        }
        _ => FailureKind::Unavailable,
    }
}

/// Name of the constraint behind a unique violation, when the driver reports one
pub fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_owned),
        _ => None,
    }
}

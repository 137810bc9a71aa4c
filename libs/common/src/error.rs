//! Error types shared by the database layer

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Errors raised while configuring or talking to PostgreSQL
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Could not establish a connection or build the pool
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// A query failed after the pool was up
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Schema migration failed
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Missing or malformed configuration
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

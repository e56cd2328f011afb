//! Error types for connection validation
//!
//! Every failure that originates in the query or transport layer is a
//! [`ConnectionError`]. Pool managers treat any of them the same way as a
//! `false` validation result.

use thiserror::Error;

/// Connection-level errors raised while probing a connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Resource already closed: {0}")]
    Closed(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),
}

impl ConnectionError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }
}

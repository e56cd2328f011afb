//! Error types for the poolkit crate
//!
//! This module aggregates the errors of the member crates into one type for
//! callers that wire validation and event dispatch together.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolKitError {
    #[error("Connection error: {0}")]
    Connection(#[from] connection_validator::ConnectionError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] signal_system::DispatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

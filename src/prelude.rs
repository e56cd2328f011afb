//! Convenience re-exports for common poolkit usage
//!
//! # Example
//!
//! ```rust
//! use poolkit::prelude::*;
//!
//! let validator = QueryValidator::select_one();
//! assert_eq!(validator.probe().query_string(), "SELECT 1");
//! ```

// Core poolkit components
pub use crate::core::{HealthMonitor, PoolListener};
pub use crate::errors::PoolKitError;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, DispatchConfig, ValidatorConfig};

// Connection validation
pub use connection_validator::prelude::*;

// Event dispatch
pub use signal_system::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;

// Commonly used types
pub use chrono::{DateTime, Utc};
pub use sqlx::postgres::PgConnection;
pub use sqlx::Connection as SqlxConnection;
pub use uuid::Uuid;

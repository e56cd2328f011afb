//! # poolkit
//!
//! Building blocks for a database connection pool: probe-query connection
//! validation with guaranteed release of query resources, and asynchronous,
//! fault-isolated delivery of pool events to listeners.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use poolkit::prelude::*;
//! use std::sync::Arc;
//!
//! struct AuditLog;
//!
//! impl Listener<PoolEvent> for AuditLog {
//!     fn notify_listener(&self, event: &PoolEvent) -> anyhow::Result<()> {
//!         println!("{:?} on {}", event.kind, event.pool_name);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let monitor = HealthMonitor::<PgConnection>::from_config("primary", &config)?;
//!
//!     let audit = Arc::new(AuditLog);
//!     monitor.subscribe(PoolEventKind::ValidationFailed, &audit);
//!
//!     let mut con = PgConnection::connect("postgresql://postgres@localhost/app").await?;
//!     if !monitor.check(&mut con).await {
//!         // discard the connection
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::{HealthMonitor, PoolListener};
pub use errors::PoolKitError;

// Re-export centralized config
pub use config::{AppConfig, DispatchConfig, ValidatorConfig};

// Re-export member crates
pub use connection_validator;
pub use signal_system;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;

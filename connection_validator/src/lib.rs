//! Connection validation for pooled database connections
//!
//! A pool manager calls [`ConnectionValidator::is_valid`] to decide whether a
//! connection is kept or discarded. [`QueryValidator`] does this by issuing a
//! probe query and guarantees that the statement and cursor it opens are
//! released whatever the outcome.

pub mod connection;
pub mod errors;
pub mod postgres;
pub mod prelude;
pub mod probes;
pub mod validator;

// Re-export centralized config
pub use config::ValidatorConfig;

pub use connection::{Connection, ProbeRow, ProbeValue, ResultCursor, RowCursor, Statement};
pub use errors::ConnectionError;
pub use postgres::{PgStatement, PingValidator};
pub use probes::{ExpectedValue, FnQuery, RowExists};
pub use validator::{ConnectionValidator, QueryValidator, ValidationQuery};

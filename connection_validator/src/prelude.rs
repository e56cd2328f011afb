//! Convenience re-exports for common connection-validator usage

pub use crate::connection::{Connection, ProbeRow, ProbeValue, ResultCursor, RowCursor, Statement};
pub use crate::errors::ConnectionError;
pub use crate::postgres::PingValidator;
pub use crate::probes::{ExpectedValue, FnQuery, RowExists};
pub use crate::validator::{ConnectionValidator, QueryValidator, ValidationQuery};

pub use async_trait::async_trait;

//! Signal system for connection pool events
//!
//! This crate delivers pool events to interested listeners on a dedicated
//! dispatch thread, so the code raising an event never runs listener logic
//! and a misbehaving listener cannot disturb the others.

pub mod dispatcher;
pub mod errors;
pub mod event;
pub mod prelude;
pub mod registry;
pub mod types;

// Re-export centralized config
pub use config::DispatchConfig;

pub use dispatcher::{DispatchStats, EventDispatcher};
pub use errors::DispatchError;
pub use event::{Event, PoolEvent, PoolEventKind};
pub use registry::{ListenerId, ListenerRegistry};
pub use types::{EventNotifier, Listener, LoggingNotifier};

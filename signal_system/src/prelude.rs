//! Convenience re-exports for common signal-system usage

// Core signal system components
pub use crate::dispatcher::{DispatchStats, EventDispatcher};
pub use crate::errors::DispatchError;
pub use crate::event::{Event, PoolEvent, PoolEventKind};
pub use crate::registry::{ListenerId, ListenerRegistry};
pub use crate::types::{EventNotifier, Listener, LoggingNotifier};

// Common external dependencies
pub use serde::{Deserialize, Serialize};
pub use serde_json;

//! Listener and notifier capabilities
//!
//! A [`Listener`] is application code reacting to an event. An
//! [`EventNotifier`] is the strategy the dispatch loop uses to call a listener
//! of a given type with an event of a given type.

use std::panic::{self, AssertUnwindSafe};

use crate::dispatcher::panic_message;
use crate::event::Event;

/// Receives events from the dispatch loop
pub trait Listener<E>: Send + Sync {
    fn notify_listener(&self, event: &E) -> anyhow::Result<()>;
}

impl<E, F> Listener<E> for F
where
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync,
{
    fn notify_listener(&self, event: &E) -> anyhow::Result<()> {
        self(event)
    }
}

/// Delivers one event to one listener.
///
/// Runs on the shared dispatch thread, so implementations must not panic or
/// otherwise let a failure escape: report it and return. The dispatch loop
/// still isolates every call in case an implementation gets this wrong.
pub trait EventNotifier<L: ?Sized, E>: Send + Sync {
    fn notify_listener(&self, listener: &L, event: &E);
}

/// Calls the listener and logs any error it returns or panic it raises
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

impl<L, E> EventNotifier<L, E> for LoggingNotifier
where
    L: Listener<E> + ?Sized,
    E: Event,
{
    fn notify_listener(&self, listener: &L, event: &E) {
        match panic::catch_unwind(AssertUnwindSafe(|| listener.notify_listener(event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(
                    kind = ?event.kind(),
                    error = %err,
                    "Listener failed to handle event"
                );
            }
            Err(payload) => {
                tracing::error!(
                    kind = ?event.kind(),
                    panic = %panic_message(payload.as_ref()),
                    "Listener panicked while handling event"
                );
            }
        }
    }
}

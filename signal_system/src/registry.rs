//! Listener registry
//!
//! Maps event kinds to the listeners subscribed to them. The registry only
//! keeps [`Weak`] references: a listener lives exactly as long as the
//! application holds it, and entries whose listener is gone are pruned the
//! next time their kind is looked up. Removing a live listener is explicit,
//! through [`ListenerRegistry::unsubscribe`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::dispatcher::EventDispatcher;
use crate::errors::DispatchError;
use crate::event::Event;
use crate::types::EventNotifier;

/// Handle returned by [`ListenerRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Subscription<L: ?Sized> {
    id: ListenerId,
    listener: Weak<L>,
}

/// Relation from event kind to subscribed listeners
pub struct ListenerRegistry<L: ?Sized, E: Event> {
    subscriptions: RwLock<HashMap<E::Kind, Vec<Subscription<L>>>>,
    next_id: AtomicU64,
}

impl<L: ?Sized, E: Event> std::fmt::Debug for ListenerRegistry<L, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

impl<L: ?Sized, E: Event> Default for ListenerRegistry<L, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized, E: Event> ListenerRegistry<L, E> {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe `listener` to events of `kind` without taking ownership of it
    pub fn subscribe(&self, kind: E::Kind, listener: &Arc<L>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(Subscription {
                id,
                listener: Arc::downgrade(listener),
            });
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut removed = false;
        for entries in subscriptions.values_mut() {
            let before = entries.len();
            entries.retain(|s| s.id != id);
            removed |= entries.len() != before;
        }
        subscriptions.retain(|_, entries| !entries.is_empty());
        removed
    }

    /// Live listeners subscribed to `kind`, in subscription order
    pub fn listeners_for(&self, kind: &E::Kind) -> Vec<Arc<L>> {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(entries) = subscriptions.get_mut(kind) else {
            return Vec::new();
        };

        let mut live = Vec::with_capacity(entries.len());
        entries.retain(|s| match s.listener.upgrade() {
            Some(listener) => {
                live.push(listener);
                true
            }
            None => false,
        });
        if entries.is_empty() {
            subscriptions.remove(kind);
        }
        live
    }

    /// Number of subscriptions whose listener is still alive
    pub fn listener_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flatten()
            .filter(|s| s.listener.strong_count() > 0)
            .count()
    }

    pub fn clear(&self) {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<L, E> ListenerRegistry<L, E>
where
    L: ?Sized + Send + Sync + 'static,
    E: Event,
{
    /// Queue `event` for every live listener subscribed to its kind.
    ///
    /// Returns how many notifications were queued. Either every subscriber
    /// gets a notification or, on error, none does. A queued notification
    /// holds its listener until it has been delivered.
    pub fn publish<N>(
        &self,
        dispatcher: &EventDispatcher,
        notifier: &Arc<N>,
        event: &E,
    ) -> Result<usize, DispatchError>
    where
        N: EventNotifier<L, E> + ?Sized + 'static,
    {
        let listeners = self.listeners_for(&event.kind());
        let count = dispatcher.enqueue_all(notifier, listeners, event)?;

        #[cfg(feature = "debug-logging")]
        tracing::trace!(kind = ?event.kind(), count, "Published event");

        Ok(count)
    }
}

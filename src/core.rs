//! Core poolkit functionality
//!
//! [`HealthMonitor`] is the glue a pool manager holds: it validates a
//! connection, turns any validation error into a plain "discard" answer, and
//! tells subscribed listeners what happened.

use std::sync::Arc;

use config::AppConfig;
use connection_validator::{Connection, ConnectionValidator, QueryValidator};
use signal_system::{
    DispatchError, EventDispatcher, Listener, ListenerId, ListenerRegistry, LoggingNotifier,
    PoolEvent, PoolEventKind,
};

use crate::errors::PoolKitError;

pub type PoolListener = dyn Listener<PoolEvent>;

/// Validates connections for one pool and reports the outcome as events
pub struct HealthMonitor<C: Connection> {
    pool_name: String,
    validator: Arc<dyn ConnectionValidator<C>>,
    registry: ListenerRegistry<PoolListener, PoolEvent>,
    notifier: Arc<LoggingNotifier>,
    dispatcher: Arc<EventDispatcher>,
}

impl<C: Connection> std::fmt::Debug for HealthMonitor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("pool_name", &self.pool_name)
            .field("registry", &self.registry)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl<C: Connection> HealthMonitor<C> {
    pub fn new(
        pool_name: impl Into<String>,
        validator: Arc<dyn ConnectionValidator<C>>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            pool_name: pool_name.into(),
            validator,
            registry: ListenerRegistry::new(),
            notifier: Arc::new(LoggingNotifier),
            dispatcher,
        }
    }

    /// Build the probe validator and start a dispatcher from configuration
    pub fn from_config(pool_name: impl Into<String>, config: &AppConfig) -> Result<Self, PoolKitError> {
        let validator = Arc::new(QueryValidator::from_config(&config.validator));
        let dispatcher = Arc::new(EventDispatcher::new(config.dispatch.clone())?);
        Ok(Self::new(pool_name, validator, dispatcher))
    }

    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &ListenerRegistry<PoolListener, PoolEvent> {
        &self.registry
    }

    /// Subscribe `listener` to `kind`. The monitor does not keep it alive.
    pub fn subscribe<T>(&self, kind: PoolEventKind, listener: &Arc<T>) -> ListenerId
    where
        T: Listener<PoolEvent> + 'static,
    {
        let listener: Arc<PoolListener> = listener.clone();
        self.registry.subscribe(kind, &listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.registry.unsubscribe(id)
    }

    /// Queue `event` for its subscribers
    pub fn publish(&self, event: &PoolEvent) -> Result<usize, DispatchError> {
        self.registry.publish(&self.dispatcher, &self.notifier, event)
    }

    /// Validate `con`, returning whether the pool should keep it.
    ///
    /// A validation error counts as `false`. Either way a
    /// `ValidationSucceeded` or `ValidationFailed` event is published.
    pub async fn check(&self, con: &mut C) -> bool {
        match self.validate(con).await {
            Ok(valid) => valid,
            Err(err) => {
                tracing::warn!(pool = %self.pool_name, error = %err, "Connection validation failed");
                false
            }
        }
    }

    /// Validate `con` and publish the outcome, returning a validation error
    /// to the caller instead of folding it into `false`.
    pub async fn validate(&self, con: &mut C) -> Result<bool, PoolKitError> {
        let outcome = self.validator.is_valid(con).await;

        let event = match &outcome {
            Ok(true) => PoolEvent::new(PoolEventKind::ValidationSucceeded, self.pool_name.as_str()),
            Ok(false) => PoolEvent::new(PoolEventKind::ValidationFailed, self.pool_name.as_str())
                .with_payload("reason", "probe rejected connection"),
            Err(err) => PoolEvent::new(PoolEventKind::ValidationFailed, self.pool_name.as_str())
                .with_payload("reason", "validation error")
                .with_payload("error", err.to_string()),
        };

        if let Err(err) = self.publish(&event) {
            tracing::warn!(pool = %self.pool_name, error = %err, "Failed to publish validation event");
        }

        Ok(outcome?)
    }
}

//! Event dispatch loop
//!
//! [`EventDispatcher`] owns one named OS thread that drains a queue of
//! pending notifications in the order they were enqueued. Producers never
//! wait on listener code: enqueueing only pushes a job onto the queue.
//!
//! Every notification runs inside its own unwind boundary, so a panicking
//! notifier or listener is logged and counted while the rest of the queue
//! keeps flowing.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle, ThreadId};

use config::DispatchConfig;
use tokio::sync::{mpsc, oneshot};

use crate::errors::DispatchError;
use crate::types::EventNotifier;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Deliver(Job),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
enum QueueSender {
    Bounded(mpsc::Sender<Message>),
    Unbounded(mpsc::UnboundedSender<Message>),
}

enum QueueReceiver {
    Bounded(mpsc::Receiver<Message>),
    Unbounded(mpsc::UnboundedReceiver<Message>),
}

impl QueueSender {
    fn try_send(&self, message: Message) -> Result<(), DispatchError> {
        match self {
            QueueSender::Bounded(tx) => tx.try_send(message).map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
            }),
            QueueSender::Unbounded(tx) => tx.send(message).map_err(|_| DispatchError::Closed),
        }
    }

    /// Send all of `messages` or none of them
    fn try_send_all(&self, messages: Vec<Message>) -> Result<(), DispatchError> {
        match self {
            QueueSender::Bounded(tx) => {
                let permits = tx.try_reserve_many(messages.len()).map_err(|err| match err {
                    mpsc::error::TrySendError::Full(()) => DispatchError::QueueFull,
                    mpsc::error::TrySendError::Closed(()) => DispatchError::Closed,
                })?;
                for (permit, message) in permits.zip(messages) {
                    permit.send(message);
                }
                Ok(())
            }
            // The receiver lives until every sender is gone, so this only fails up front
            QueueSender::Unbounded(tx) => messages
                .into_iter()
                .try_for_each(|message| tx.send(message).map_err(|_| DispatchError::Closed)),
        }
    }

    async fn send(&self, message: Message) -> Result<(), DispatchError> {
        match self {
            QueueSender::Bounded(tx) => tx.send(message).await.map_err(|_| DispatchError::Closed),
            QueueSender::Unbounded(tx) => tx.send(message).map_err(|_| DispatchError::Closed),
        }
    }
}

impl QueueReceiver {
    fn blocking_recv(&mut self) -> Option<Message> {
        match self {
            QueueReceiver::Bounded(rx) => rx.blocking_recv(),
            QueueReceiver::Unbounded(rx) => rx.blocking_recv(),
        }
    }
}

fn queue(capacity: usize) -> (QueueSender, QueueReceiver) {
    if capacity == 0 {
        let (tx, rx) = mpsc::unbounded_channel();
        (QueueSender::Unbounded(tx), QueueReceiver::Unbounded(rx))
    } else {
        let (tx, rx) = mpsc::channel(capacity);
        (QueueSender::Bounded(tx), QueueReceiver::Bounded(rx))
    }
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    panicked: AtomicU64,
}

/// Snapshot of dispatch loop activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub enqueued: u64,
    /// Notifications that returned normally
    pub delivered: u64,
    /// Notifications that panicked and were isolated by the loop
    pub panicked: u64,
}

impl DispatchStats {
    pub fn pending(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.delivered)
            .saturating_sub(self.panicked)
    }
}

/// Single-consumer dispatch loop for event notifications
pub struct EventDispatcher {
    sender: RwLock<Option<QueueSender>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    counters: Arc<Counters>,
    config: DispatchConfig,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}

impl EventDispatcher {
    /// Start a dispatch thread configured by `config`
    pub fn new(config: DispatchConfig) -> Result<Self, DispatchError> {
        let (sender, receiver) = queue(config.queue_capacity);
        let counters = Arc::new(Counters::default());

        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn({
                let counters = counters.clone();
                move || run(receiver, counters)
            })?;

        tracing::debug!(
            thread = %config.thread_name,
            capacity = config.queue_capacity,
            "Event dispatcher started"
        );

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            worker_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
            counters,
            config,
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Queue one notification of `listener` about `event`.
    ///
    /// Never waits for the dispatch thread. A bounded queue that is full
    /// rejects the notification with [`DispatchError::QueueFull`].
    pub fn enqueue<N, L, E>(
        &self,
        notifier: Arc<N>,
        listener: Arc<L>,
        event: E,
    ) -> Result<(), DispatchError>
    where
        N: EventNotifier<L, E> + ?Sized + 'static,
        L: ?Sized + Send + Sync + 'static,
        E: Send + 'static,
    {
        let job: Job = Box::new(move || notifier.notify_listener(&*listener, &event));

        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let sender = sender.as_ref().ok_or(DispatchError::Closed)?;

        // Counted before the send so `delivered` never runs ahead of `enqueued`
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = sender.try_send(Message::Deliver(job)) {
            self.counters.enqueued.fetch_sub(1, Ordering::Relaxed);
            return Err(err);
        }
        Ok(())
    }

    /// Queue one notification of `event` for each of `listeners`, all or none.
    ///
    /// When a bounded queue lacks room for every notification, nothing is
    /// queued and [`DispatchError::QueueFull`] is returned, so the caller can
    /// retry without notifying anyone twice. Returns the number queued.
    pub fn enqueue_all<N, L, E>(
        &self,
        notifier: &Arc<N>,
        listeners: Vec<Arc<L>>,
        event: &E,
    ) -> Result<usize, DispatchError>
    where
        N: EventNotifier<L, E> + ?Sized + 'static,
        L: ?Sized + Send + Sync + 'static,
        E: Clone + Send + 'static,
    {
        let messages: Vec<Message> = listeners
            .into_iter()
            .map(|listener| {
                let notifier = notifier.clone();
                let event = event.clone();
                let job: Job = Box::new(move || notifier.notify_listener(&*listener, &event));
                Message::Deliver(job)
            })
            .collect();
        let count = messages.len();

        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let sender = sender.as_ref().ok_or(DispatchError::Closed)?;
        if count == 0 {
            return Ok(0);
        }

        self.counters.enqueued.fetch_add(count as u64, Ordering::Relaxed);
        if let Err(err) = sender.try_send_all(messages) {
            self.counters.enqueued.fetch_sub(count as u64, Ordering::Relaxed);
            return Err(err);
        }
        Ok(count)
    }

    /// Wait until every notification enqueued before this call has run.
    ///
    /// Must not be awaited from listener code, which runs on the dispatch
    /// thread itself. Unlike [`shutdown`](Self::shutdown) this yields to the
    /// runtime while it waits, so async callers should flush before shutting
    /// down or dropping the last handle.
    pub async fn flush(&self) -> Result<(), DispatchError> {
        let sender = self
            .sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DispatchError::Closed)?;

        let (done_tx, done_rx) = oneshot::channel();
        sender.send(Message::Flush(done_tx)).await?;
        done_rx.await.map_err(|_| DispatchError::Closed)
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }

    /// Close the queue, deliver what is still pending, and stop the thread.
    ///
    /// Later calls to [`enqueue`](Self::enqueue) fail with
    /// [`DispatchError::Closed`]. Calling this again is a no-op.
    ///
    /// This blocks the calling thread on `join()` until every pending
    /// listener has run, and dropping the last handle does the same. Inside a
    /// tokio runtime that stalls the executor thread: `flush().await` first so
    /// the join is short, or call it from `tokio::task::spawn_blocking`.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        // Dropped from a listener: the loop ends on its own once the queue drains
        if thread::current().id() == self.worker_id {
            return;
        }

        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!(thread = %self.config.thread_name, "Dispatch thread terminated abnormally");
            }
        }

        tracing::debug!(
            thread = %self.config.thread_name,
            stats = ?self.stats(),
            "Event dispatcher stopped"
        );
    }
}

/// Shuts the dispatcher down, blocking until the queue is drained
impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mut receiver: QueueReceiver, counters: Arc<Counters>) {
    while let Some(message) = receiver.blocking_recv() {
        match message {
            Message::Deliver(job) => match panic::catch_unwind(AssertUnwindSafe(job)) {
                Ok(()) => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(payload) => {
                    counters.panicked.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        panic = %panic_message(payload.as_ref()),
                        "Event notification panicked; continuing with the next one"
                    );
                }
            },
            Message::Flush(done) => {
                #[cfg(feature = "debug-logging")]
                tracing::trace!("Dispatch queue flushed");
                let _ = done.send(());
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

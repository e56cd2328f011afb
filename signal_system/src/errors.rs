use thiserror::Error;

/// Errors returned when handing work to the dispatch loop
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Dispatch queue is full")]
    QueueFull,

    #[error("Dispatcher has been shut down")]
    Closed,

    #[error("Failed to spawn dispatch thread: {0}")]
    Spawn(#[from] std::io::Error),
}

use thiserror::Error;

/// Outcome of a failed enqueue-and-wait, returned to the Admission API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// This sender's operation was evicted from a batch, either because
    /// simulation rejected it or because the whole `submit` call failed.
    #[error("operation conflicted during batching and was not included")]
    Conflict,
    /// The caller's wait was cancelled (request dropped) before a tick
    /// resolved the slot.
    #[error("enqueue was cancelled before a result was produced")]
    Cancelled,
    /// The coordinator task is not running (shut down or never started).
    #[error("scheduler coordinator is not accepting enqueues")]
    NotRunning,
}

use thiserror::Error;

/// Errors that can occur within the `futures_throttle` limiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LimitError {
  #[error("Expected concurrency to be a number from 1 and up (or unbounded), got: {0}")]
  InvalidConcurrency(String),

  #[error("Submitted task panicked")]
  TaskPanicked,

  #[error("Task was discarded from the pending queue before it started")]
  TaskDiscarded,
}

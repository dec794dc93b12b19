use crate::error::LimitError;

use tokio::sync::oneshot;
use tracing::debug;

/// A handle to a task submitted to a `ConcurrencyLimiter`.
///
/// Returned immediately by the `submit*` methods, before the task has
/// necessarily started. Dropping the handle does not cancel the task.
#[derive(Debug)]
pub struct TaskHandle<R: Send + 'static> {
  pub(crate) task_id: u64,
  pub(crate) result_receiver: oneshot::Receiver<Result<R, LimitError>>,
}

impl<R: Send + 'static> TaskHandle<R> {
  /// Returns the unique ID of this task.
  pub fn id(&self) -> u64 {
    self.task_id
  }

  /// Awaits the completion of the task and returns the value its work produced.
  ///
  /// # Errors
  /// Returns `LimitError::TaskPanicked` if the work function panicked.
  /// Returns `LimitError::TaskDiscarded` if the task was dropped from the
  /// pending queue (e.g. by `clear_queue`) before it started.
  pub async fn await_result(self) -> Result<R, LimitError> {
    match self.result_receiver.await {
      Ok(task_outcome) => task_outcome,
      Err(_recv_error) => {
        // The sender lives inside the pending task, so a closed channel means
        // the task was dropped without ever running.
        debug!(task_id = %self.task_id, "Task was discarded before it started.");
        Err(LimitError::TaskDiscarded)
      }
    }
  }
}

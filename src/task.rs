use crate::error::LimitError;

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{error, trace, warn};

/// A queued, not yet started task.
///
/// `future` is lazy: the captured work function is only called on the first
/// poll, after the limiter has admitted the task.
pub(crate) struct PendingTask {
  pub(crate) task_id: u64,
  pub(crate) future: BoxFuture<'static, ()>,
}

impl PendingTask {
  /// Wraps `work` so that its outcome, including a panic, is delivered to
  /// `result_sender` and never unwinds into the limiter.
  pub(crate) fn new<W, Fut, R>(
    task_id: u64,
    work: W,
    result_sender: oneshot::Sender<Result<R, LimitError>>,
  ) -> Self
  where
    W: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
  {
    let future = async move {
      // Calling `work` inside the caught future covers panics raised before
      // the work's own future exists.
      let outcome = AssertUnwindSafe(async move { work().await })
        .catch_unwind()
        .await
        .map_err(|_panic_payload| {
          error!(%task_id, "Task panicked during execution.");
          LimitError::TaskPanicked
        });

      if outcome.is_ok() {
        trace!(%task_id, "Task executed successfully.");
      }

      if result_sender.send(outcome).is_err() {
        warn!(%task_id, "Result receiver for task was dropped. Task outcome has been discarded.");
      }
    };

    Self {
      task_id,
      future: future.boxed(),
    }
  }
}

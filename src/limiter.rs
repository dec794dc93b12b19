use crate::error::LimitError;
use crate::handle::TaskHandle;
use crate::limit::{ConcurrencyLimit, IntoConcurrencyLimit};
use crate::queue::SimpleQueue;
use crate::task::PendingTask;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::oneshot;
use tracing::{debug, info, info_span, trace, warn, Instrument};

lazy_static::lazy_static! {
  static ref NEXT_TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

/// Runs submitted work with at most `concurrency` tasks active at a time.
///
/// Work that cannot start immediately waits in a FIFO queue and is admitted
/// in submission order as running tasks complete. Clones share the same queue
/// and active count.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
  inner: Arc<LimiterInner>,
}

struct LimiterInner {
  name: String,
  concurrency: ConcurrencyLimit,
  tokio_handle: TokioHandle,
  state: Mutex<LimiterState>,
}

/// Active count and pending queue change together under one lock, so an
/// admission decision always sees every earlier admission.
#[derive(Default)]
struct LimiterState {
  active_count: usize,
  pending: SimpleQueue<PendingTask>,
}

impl LimiterState {
  fn take_next(&mut self) -> Option<PendingTask> {
    let task = self.pending.dequeue()?;
    self.active_count += 1;
    Some(task)
  }
}

/// Marks one admitted task as active. Dropping it frees the slot.
///
/// A slot whose task was polled admits the next pending task on release. A
/// slot dropped before its first poll belongs to a runtime that is shutting
/// down and refuses new tasks, so it only gives the slot back.
struct ActiveSlot {
  inner: Arc<LimiterInner>,
  task_id: u64,
  started: bool,
}

impl Drop for ActiveSlot {
  fn drop(&mut self) {
    if self.started {
      self.inner.release_slot(self.task_id);
    } else {
      self.inner.abandon_slot(self.task_id);
    }
  }
}

impl fmt::Debug for ConcurrencyLimiter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.inner.state.lock();
    f.debug_struct("ConcurrencyLimiter")
      .field("name", &self.inner.name)
      .field("concurrency", &self.inner.concurrency)
      .field("active_count", &state.active_count)
      .field("pending_count", &state.pending.len())
      .finish()
  }
}

impl ConcurrencyLimiter {
  /// Creates a limiter that spawns admitted tasks on `tokio_handle`.
  ///
  /// # Errors
  /// Returns `LimitError::InvalidConcurrency` unless `concurrency` is a
  /// positive integer or unbounded (`f64::INFINITY`, `ConcurrencyLimit::Unbounded`,
  /// `"unbounded"`).
  pub fn new(
    concurrency: impl IntoConcurrencyLimit,
    tokio_handle: TokioHandle,
    name: &str,
  ) -> Result<Self, LimitError> {
    let concurrency = concurrency.into_concurrency_limit().map_err(|e| {
      warn!(limiter = %name, "Rejected limiter construction: {}", e);
      e
    })?;

    info!(limiter = %name, %concurrency, "Concurrency limiter created.");

    Ok(Self {
      inner: Arc::new(LimiterInner {
        name: name.to_string(),
        concurrency,
        tokio_handle,
        state: Mutex::new(LimiterState::default()),
      }),
    })
  }

  /// Returns the name this limiter was created with.
  pub fn name(&self) -> &str {
    &self.inner.name
  }

  /// Returns the configured concurrency limit.
  pub fn concurrency(&self) -> ConcurrencyLimit {
    self.inner.concurrency
  }

  /// The number of tasks that have been admitted and have not completed yet.
  pub fn active_count(&self) -> usize {
    self.inner.state.lock().active_count
  }

  /// The number of tasks waiting to be admitted.
  pub fn pending_count(&self) -> usize {
    self.inner.state.lock().pending.len()
  }

  /// Queues `work` and returns a handle to its eventual result.
  ///
  /// `work` is not called until the task is admitted. The admission check for
  /// this submission runs on the runtime's next scheduling tick, never inside
  /// this call, so right after `submit` the task is always counted as pending.
  pub fn submit<W, Fut, R>(&self, work: W) -> TaskHandle<R>
  where
    W: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
  {
    let task_id = NEXT_TASK_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    let (result_tx, result_rx) = oneshot::channel::<Result<R, LimitError>>();
    let task = PendingTask::new(task_id, work, result_tx);

    let pending_count = {
      let mut state = self.inner.state.lock();
      state.pending.enqueue(task);
      state.pending.len()
    };
    debug!(limiter = %self.inner.name, %task_id, pending_count, "Task queued.");

    self.inner.schedule_admission_check();

    TaskHandle {
      task_id,
      result_receiver: result_rx,
    }
  }

  /// Like [`submit`](Self::submit), passing `args` to `work` when it runs.
  /// Use a tuple to pass several arguments.
  pub fn submit_with<W, A, Fut, R>(&self, work: W, args: A) -> TaskHandle<R>
  where
    W: FnOnce(A) -> Fut + Send + 'static,
    A: Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
  {
    self.submit(move || work(args))
  }

  /// Like [`submit`](Self::submit) for work that produces its value directly.
  pub fn submit_sync<W, R>(&self, work: W) -> TaskHandle<R>
  where
    W: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
  {
    self.submit(move || async move { work() })
  }

  /// Discards every task that has not started yet and returns how many were
  /// dropped. Their handles resolve to `LimitError::TaskDiscarded`; active
  /// tasks keep running.
  pub fn clear_queue(&self) -> usize {
    // Dropped tasks run user `Drop` impls, which may call back into the
    // limiter, so they must be released after the lock.
    let mut discarded = std::mem::take(&mut self.inner.state.lock().pending);
    let count = discarded.len();
    discarded.clear();
    info!(limiter = %self.inner.name, discarded = count, "Cleared pending queue.");
    count
  }
}

impl LimiterInner {
  fn schedule_admission_check(self: &Arc<Self>) {
    let inner = Arc::clone(self);
    self.tokio_handle.spawn(async move {
      inner.admit_if_capacity();
    });
  }

  fn admit_if_capacity(self: &Arc<Self>) {
    let admitted = {
      let mut state = self.state.lock();
      if self.concurrency.admits(state.active_count) {
        state.take_next()
      } else {
        None
      }
    };

    match admitted {
      Some(task) => self.spawn_admitted(task),
      None => trace!(limiter = %self.name, "Admission check: at capacity or nothing pending."),
    }
  }

  fn release_slot(self: &Arc<Self>, finished_task_id: u64) {
    let next = {
      let mut state = self.state.lock();
      state.active_count -= 1;
      state.take_next()
    };
    trace!(limiter = %self.name, task_id = %finished_task_id, "Task finished, slot released.");

    if let Some(task) = next {
      self.spawn_admitted(task);
    }
  }

  fn abandon_slot(&self, task_id: u64) {
    self.state.lock().active_count -= 1;
    debug!(
      limiter = %self.name,
      %task_id,
      "Admitted task was dropped before it started. Runtime is shutting down, not admitting further work."
    );
  }

  fn spawn_admitted(self: &Arc<Self>, task: PendingTask) {
    let PendingTask { task_id, future } = task;
    debug!(limiter = %self.name, %task_id, "Admitted task. Spawning.");

    let slot = ActiveSlot {
      inner: Arc::clone(self),
      task_id,
      started: false,
    };
    self.tokio_handle.spawn(
      async move {
        let mut slot = slot;
        slot.started = true;
        future.await;
        drop(slot);
      }
      .instrument(info_span!("limited_task", limiter = %self.name, %task_id)),
    );
  }
}

impl Drop for LimiterInner {
  fn drop(&mut self) {
    let pending = self.state.get_mut().pending.len();
    if pending > 0 {
      debug!(
        limiter = %self.name,
        pending,
        "Last limiter reference dropped. Discarding pending tasks."
      );
    }
  }
}

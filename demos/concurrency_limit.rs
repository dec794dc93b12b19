use futures_throttle::{ConcurrencyLimiter, TaskHandle};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::info;

async fn long_task_fn(id: usize) -> String {
  info!("Task {} starting (concurrency test - should take 1s)", id);
  tokio::time::sleep(Duration::from_secs(1)).await;
  let result = format!("Task {} finished", id);
  info!("{}", result);
  result
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Concurrency Limit Example (Limit: 2) ---");

  // Accepts anything a config file or env var would hold, e.g. "2" or "unbounded".
  let configured_limit = std::env::var("THROTTLE_LIMIT").unwrap_or_else(|_| "2".to_string());
  let limiter = match ConcurrencyLimiter::new(configured_limit.as_str(), Handle::current(), "concurrency_limiter") {
    Ok(limiter) => limiter,
    Err(e) => {
      tracing::error!("Invalid THROTTLE_LIMIT {:?}: {}", configured_limit, e);
      return;
    }
  };

  let num_tasks = 5;
  let start = Instant::now();
  let mut handles: Vec<TaskHandle<String>> = Vec::new();

  info!(
    "Submitting {} tasks, each takes 1 sec, with concurrency {}.",
    num_tasks,
    limiter.concurrency()
  );

  for i in 0..num_tasks {
    handles.push(limiter.submit_with(long_task_fn, i));
  }
  info!(
    "Submitted. Active: {}, pending: {} (admission runs on the next tick).",
    limiter.active_count(),
    limiter.pending_count()
  );

  tokio::task::yield_now().await;
  info!(
    "After one tick. Active: {}, pending: {}.",
    limiter.active_count(),
    limiter.pending_count()
  );

  for handle in handles {
    let task_id = handle.id();
    match handle.await_result().await {
      Ok(result) => info!("Task {} main: Received result: {}", task_id, result),
      Err(e) => info!("Task {} main: Received error: {:?}", task_id, e),
    }
  }

  info!("All tasks processed in {:?}.", start.elapsed());
  info!("--- Concurrency Limit Example End ---");
}

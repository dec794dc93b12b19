use futures_throttle::{ConcurrencyLimiter, LimitError};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

async fn panicking_task() -> String {
  info!("Panicking Task: Starting...");
  tokio::time::sleep(Duration::from_millis(100)).await;
  info!("Panicking Task: About to panic!");
  panic!("This task is designed to panic!")
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Task Panic Example ---");

  let limiter = ConcurrencyLimiter::new(1, Handle::current(), "panic_limiter").expect("valid concurrency limit");

  let panicking = limiter.submit(panicking_task);
  let doomed: Vec<_> = (0..3)
    .map(|i| limiter.submit_sync(move || format!("Queued task {} should never run", i)))
    .collect();

  tokio::task::yield_now().await;
  info!(
    "Active: {}, pending: {}. Clearing the pending queue.",
    limiter.active_count(),
    limiter.pending_count()
  );
  let discarded = limiter.clear_queue();
  info!("Discarded {} pending tasks.", discarded);

  // Queued after the clear; it must still run once the panicking task frees its slot.
  let survivor = limiter.submit_sync(|| "Survivor ran after the panic".to_string());

  let panicking_id = panicking.id();
  match panicking.await_result().await {
    Ok(result) => info!("Task {} completed with UNEXPECTED result: {}", panicking_id, result),
    Err(LimitError::TaskPanicked) => {
      info!("Task {} correctly resulted in LimitError::TaskPanicked.", panicking_id);
    }
    Err(e) => info!("Task {} resulted in unexpected error: {:?}", panicking_id, e),
  }

  match survivor.await_result().await {
    Ok(message) => info!("{}", message),
    Err(e) => info!("Survivor failed: {:?}", e),
  }

  for handle in doomed {
    let task_id = handle.id();
    info!("Task {} outcome: {:?}", task_id, handle.await_result().await);
  }

  info!("--- Task Panic Example End ---");
}

//! A Tokio-based concurrency limiter: submitted futures run at most N at a
//! time, the rest wait in a FIFO queue and start in submission order.

mod error;
mod handle;
mod limit;
mod limiter;
pub mod queue;
mod task;

pub use error::LimitError;
pub use handle::TaskHandle;
pub use limit::{ConcurrencyLimit, IntoConcurrencyLimit};
pub use limiter::ConcurrencyLimiter;
pub use queue::SimpleQueue;

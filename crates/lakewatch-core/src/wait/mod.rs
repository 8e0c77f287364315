//! Remote-operation waiting: bounded polling until a terminal status.

mod retry;
mod source;
mod waiter;

pub use retry::RetryPolicy;
pub use source::{MonitorProbe, RefreshProbe, StatusSource};
pub use waiter::{WaitOutcome, WaitSpec, Waiter};

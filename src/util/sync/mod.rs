pub mod retry_mutex;

pub use retry_mutex::{RetryMutex, RetryMutexGuard, Unlocked};

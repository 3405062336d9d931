//! Utility modules for the directory watcher.

pub mod path;
pub mod retry;

pub use path::absolute;
pub use retry::{sleep_or_cancel, try_with_retries};

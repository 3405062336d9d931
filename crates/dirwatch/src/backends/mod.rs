//! Native watch backends.
//!
//! A backend hands out [`Session`]s: one native watcher with its event and
//! error streams. The watcher asks for a fresh session every time the previous
//! one fails.

use crate::{error::Result, traits::Session};
use async_trait::async_trait;

pub mod memory;
pub mod notify_backend;

pub use memory::{MemoryFactory, MemoryWatcher};
pub use notify_backend::{NotifyFactory, NotifyWatcher};

/// Factory for native watch sessions.
#[async_trait]
pub trait WatcherFactory: Send + Sync {
    /// Create a new native watcher and its streams.
    async fn create_session(&self) -> Result<Session>;

    /// Get the backend type identifier.
    fn backend_type(&self) -> &'static str;
}

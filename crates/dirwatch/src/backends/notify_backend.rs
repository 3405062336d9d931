//! Notify-based native watch backend.

use crate::{
    backends::WatcherFactory,
    error::{Error, Result},
    traits::{NativeWatcher, Session},
};
use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Native watcher backed by the platform's recommended notify implementation.
///
/// Paths are always subscribed non-recursively; recursion is driven by the
/// watch agent so that it can apply exclusions to every directory.
pub struct NotifyWatcher {
    inner: Option<RecommendedWatcher>,
}

impl NotifyWatcher {
    fn new(inner: RecommendedWatcher) -> Self {
        Self { inner: Some(inner) }
    }
}

impl NativeWatcher for NotifyWatcher {
    fn add_watch(&mut self, path: &Path) -> Result<()> {
        let watcher = self
            .inner
            .as_mut()
            .ok_or_else(|| Error::Watch("Notify watcher is closed".to_string()))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch(format!("Failed to watch {}: {}", path.display(), e)))?;

        debug!("Added notify watch: {}", path.display());
        Ok(())
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("Notify watcher closed");
        }
    }
}

/// Factory for notify-based sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyFactory;

impl NotifyFactory {
    /// Create a new notify factory.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WatcherFactory for NotifyFactory {
    async fn create_session(&self) -> Result<Session> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();

        // Send failures mean the session is gone and nobody is listening.
        let watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(err) => {
                    let _ = error_tx.send(err);
                }
            },
        )
        .map_err(|e| Error::Watch(format!("Failed to create notify watcher: {}", e)))?;

        info!("Notify watcher initialized");
        Ok(Session::new(
            Box::new(NotifyWatcher::new(watcher)),
            event_rx,
            error_rx,
        ))
    }

    fn backend_type(&self) -> &'static str {
        "notify"
    }
}

//! Core traits for the directory watcher.
//!
//! Two seams live here: [`EventHandler`] is the user-facing callback, and
//! [`NativeWatcher`] is the OS notification capability a [`Session`] wraps.

use crate::{error::Result, events::ChangeEvent};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use tokio::sync::mpsc;

/// Receiver of accepted change events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle a single change event.
    ///
    /// A returned error causes the delivery to be retried up to the
    /// configured number of attempts, then it is dropped.
    async fn handle(&self, event: ChangeEvent) -> Result<()>;

    /// Get the handler name.
    fn name(&self) -> &'static str {
        "handler"
    }
}

/// Adapter turning a plain closure into an [`EventHandler`].
pub struct FnHandler<F> {
    func: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(ChangeEvent) -> Result<()> + Send + Sync,
{
    async fn handle(&self, event: ChangeEvent) -> Result<()> {
        (self.func)(event)
    }

    fn name(&self) -> &'static str {
        "fn"
    }
}

/// Wrap a closure as an event handler.
pub fn handler_fn<F>(func: F) -> FnHandler<F>
where
    F: Fn(ChangeEvent) -> Result<()> + Send + Sync,
{
    FnHandler { func }
}

/// OS-level watch list for a single session.
pub trait NativeWatcher: Send {
    /// Subscribe a single path (never recursive at this layer).
    fn add_watch(&mut self, path: &Path) -> Result<()>;

    /// Release the native resources. Called exactly once, when the owning
    /// session is dropped.
    fn close(&mut self);
}

/// One lifetime of a native watcher plus its event and error streams.
///
/// Dropping the session closes the native watcher, whichever way the
/// session loop exits.
pub struct Session {
    watcher: Box<dyn NativeWatcher>,
    /// Raw change notifications.
    pub events: mpsc::UnboundedReceiver<notify::Event>,
    /// Internal errors of the native layer.
    pub errors: mpsc::UnboundedReceiver<notify::Error>,
}

impl Session {
    /// Assemble a session from its parts.
    pub fn new(
        watcher: Box<dyn NativeWatcher>,
        events: mpsc::UnboundedReceiver<notify::Event>,
        errors: mpsc::UnboundedReceiver<notify::Error>,
    ) -> Self {
        Self {
            watcher,
            events,
            errors,
        }
    }

    /// Subscribe a path with the native watcher.
    pub fn add_watch(&mut self, path: &Path) -> Result<()> {
        self.watcher.add_watch(path)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.watcher.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::events::ChangeKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_handler_fn_forwards_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = handler_fn(move |event: ChangeEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            if event.kind == ChangeKind::Remove {
                Err(Error::Handler("refused".to_string()))
            } else {
                Ok(())
            }
        });

        assert!(handler
            .handle(ChangeEvent::new("/a", ChangeKind::Create))
            .await
            .is_ok());
        assert!(handler
            .handle(ChangeEvent::new("/a", ChangeKind::Remove))
            .await
            .is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(handler.name(), "fn");
    }

    struct CountingWatcher {
        closed: Arc<AtomicUsize>,
    }

    impl NativeWatcher for CountingWatcher {
        fn add_watch(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_session_drop_closes_watcher() {
        let closed = Arc::new(AtomicUsize::new(0));
        let (_event_tx, events) = mpsc::unbounded_channel();
        let (_error_tx, errors) = mpsc::unbounded_channel();
        let session = Session::new(
            Box::new(CountingWatcher {
                closed: closed.clone(),
            }),
            events,
            errors,
        );

        drop(session);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}

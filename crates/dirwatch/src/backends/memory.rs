//! In-memory native backend.
//!
//! Records every subscription instead of touching the OS, and lets the caller
//! inject native events, native errors and session initialization failures.
//! Used to drive the watch agent deterministically in tests.

use crate::{
    backends::WatcherFactory,
    error::{Error, Result},
    traits::{NativeWatcher, Session},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    pending_failures: usize,
    failing_paths: HashSet<PathBuf>,
    sessions_created: usize,
    sessions_closed: usize,
    /// (session number, path), in subscription order.
    subscriptions: Vec<(usize, PathBuf)>,
    event_tx: Option<mpsc::UnboundedSender<notify::Event>>,
    error_tx: Option<mpsc::UnboundedSender<notify::Error>>,
}

/// Factory handing out in-memory sessions. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryFactory {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFactory {
    /// Create a new in-memory factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` session creations fail.
    pub fn fail_next_sessions(&self, count: usize) {
        self.state.lock().pending_failures = count;
    }

    /// Make every subscription of `path` fail.
    pub fn fail_watch(&self, path: impl Into<PathBuf>) {
        self.state.lock().failing_paths.insert(path.into());
    }

    /// Number of sessions successfully created so far.
    pub fn sessions_created(&self) -> usize {
        self.state.lock().sessions_created
    }

    /// Number of sessions whose watcher has been closed.
    pub fn sessions_closed(&self) -> usize {
        self.state.lock().sessions_closed
    }

    /// Every subscribed path across all sessions, in order.
    pub fn subscriptions(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .subscriptions
            .iter()
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Paths subscribed during the given session (numbered from 1).
    pub fn subscriptions_in(&self, session: usize) -> Vec<PathBuf> {
        self.state
            .lock()
            .subscriptions
            .iter()
            .filter(|(id, _)| *id == session)
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// How many times `path` was subscribed across all sessions.
    pub fn subscription_count(&self, path: &Path) -> usize {
        self.state
            .lock()
            .subscriptions
            .iter()
            .filter(|(_, p)| p == path)
            .count()
    }

    /// Deliver a native event to the live session. Returns false if there is
    /// no live session.
    pub fn emit(&self, event: notify::Event) -> bool {
        match &self.state.lock().event_tx {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver a native error to the live session.
    pub fn emit_error(&self, error: notify::Error) -> bool {
        match &self.state.lock().error_tx {
            Some(tx) => tx.send(error).is_ok(),
            None => false,
        }
    }

    /// Close the live session's event stream, as a crashed native layer would.
    pub fn end_session(&self) {
        let mut state = self.state.lock();
        state.event_tx = None;
        state.error_tx = None;
    }
}

#[async_trait]
impl WatcherFactory for MemoryFactory {
    async fn create_session(&self) -> Result<Session> {
        let mut state = self.state.lock();
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(Error::Watch("Injected session failure".to_string()));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        state.sessions_created += 1;
        state.event_tx = Some(event_tx);
        state.error_tx = Some(error_tx);

        let watcher = MemoryWatcher {
            session: state.sessions_created,
            state: self.state.clone(),
            closed: false,
        };
        debug!("Memory session {} created", watcher.session);
        Ok(Session::new(Box::new(watcher), event_rx, error_rx))
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

/// Native watcher of an in-memory session.
pub struct MemoryWatcher {
    session: usize,
    state: Arc<Mutex<MemoryState>>,
    closed: bool,
}

impl NativeWatcher for MemoryWatcher {
    fn add_watch(&mut self, path: &Path) -> Result<()> {
        if self.closed {
            return Err(Error::Watch("Memory watcher is closed".to_string()));
        }
        let mut state = self.state.lock();
        if state.failing_paths.contains(path) {
            return Err(Error::Watch(format!(
                "Injected watch failure for {}",
                path.display()
            )));
        }
        state.subscriptions.push((self.session, path.to_path_buf()));
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.state.lock();
        state.sessions_closed += 1;
        if state.sessions_created == self.session {
            state.event_tx = None;
            state.error_tx = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, EventKind};

    #[tokio::test]
    async fn test_records_subscriptions_per_session() {
        let factory = MemoryFactory::new();
        let mut first = factory.create_session().await.unwrap();
        first.add_watch(Path::new("/a")).unwrap();
        drop(first);

        let mut second = factory.create_session().await.unwrap();
        second.add_watch(Path::new("/b")).unwrap();

        assert_eq!(factory.sessions_created(), 2);
        assert_eq!(factory.sessions_closed(), 1);
        assert_eq!(factory.subscriptions_in(1), vec![PathBuf::from("/a")]);
        assert_eq!(factory.subscriptions_in(2), vec![PathBuf::from("/b")]);
        assert_eq!(factory.subscription_count(Path::new("/a")), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let factory = MemoryFactory::new();
        factory.fail_next_sessions(1);
        factory.fail_watch("/denied");

        assert!(factory.create_session().await.is_err());
        let mut session = factory.create_session().await.unwrap();
        assert!(session.add_watch(Path::new("/denied")).is_err());
        assert!(factory.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_emit_reaches_live_session() {
        let factory = MemoryFactory::new();
        assert!(!factory.emit(notify::Event::new(EventKind::Any)));

        let mut session = factory.create_session().await.unwrap();
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/a/file"));
        assert!(factory.emit(event.clone()));
        assert_eq!(session.events.recv().await, Some(event));

        factory.end_session();
        assert_eq!(session.events.recv().await, None);
    }
}

//! The watch agent: a single task that owns the watch registry.
//!
//! Every mutation of the registry happens here, one message at a time.
//! Other tasks talk to the agent only through its command channel, and the
//! agent feeds that same channel from short-lived producer tasks when it
//! expands a subtree or notices a new directory. The channel holds a single
//! message, so producers advance at the agent's pace.

use crate::{
    backends::WatcherFactory,
    error::{Error, Result},
    events::ChangeEvent,
    filter::ExclusionFilter,
    registry::{Registration, WatchRegistry, WatchedPath},
    traits::{EventHandler, Session},
    tree,
    utils::{absolute, try_with_retries},
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Where an add request came from. Decides how a missing flag is filled in
/// and whether the subtree gets walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOrigin {
    /// `Watcher::add`; carries an explicit flag.
    Caller,
    /// A directory found while walking a recursive root.
    Subtree,
    /// A directory that showed up in a change event.
    Discovered,
}

/// Request to start watching a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub path: PathBuf,
    /// `None` keeps the stored flag of a known path; new paths inherit the
    /// flag of their parent entry.
    pub recursive: Option<bool>,
    pub origin: AddOrigin,
}

impl AddRequest {
    pub fn caller(path: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            recursive: Some(recursive),
            origin: AddOrigin::Caller,
        }
    }

    pub fn subtree(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: None,
            origin: AddOrigin::Subtree,
        }
    }

    pub fn discovered(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: None,
            origin: AddOrigin::Discovered,
        }
    }
}

/// Messages accepted by the agent.
#[derive(Debug)]
pub enum Command {
    Add(AddRequest),
    Snapshot(oneshot::Sender<Vec<WatchedPath>>),
}

/// Send a command unless cancellation comes first. Returns whether the agent
/// accepted it.
pub async fn submit(
    commands: &mpsc::Sender<Command>,
    cancel: &CancellationToken,
    command: Command,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = commands.send(command) => sent.is_ok(),
    }
}

/// Settings the agent needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub callback_attempts: u32,
    pub callback_retry_delay: Duration,
}

/// Owner of the watch registry and driver of native sessions.
pub struct WatchAgent {
    registry: WatchRegistry,
    filter: Arc<ExclusionFilter>,
    handler: Arc<dyn EventHandler>,
    factory: Arc<dyn WatcherFactory>,
    commands: mpsc::Receiver<Command>,
    resubmit: mpsc::Sender<Command>,
    cancel: CancellationToken,
    settings: AgentSettings,
    sessions: u64,
}

impl WatchAgent {
    /// Create an agent reading from `commands`; `resubmit` must feed the
    /// same channel.
    pub fn new(
        filter: ExclusionFilter,
        handler: Arc<dyn EventHandler>,
        factory: Arc<dyn WatcherFactory>,
        commands: mpsc::Receiver<Command>,
        resubmit: mpsc::Sender<Command>,
        cancel: CancellationToken,
        settings: AgentSettings,
    ) -> Self {
        Self {
            registry: WatchRegistry::new(),
            filter: Arc::new(filter),
            handler,
            factory,
            commands,
            resubmit,
            cancel,
            settings,
            sessions: 0,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn backend_type(&self) -> &'static str {
        self.factory.backend_type()
    }

    /// Run one native session until cancellation (`Ok`) or failure (`Err`).
    ///
    /// The session is closed on every exit path. The registry outlives the
    /// session; a later session re-subscribes everything in it.
    pub async fn run_session(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        let mut session = self.factory.create_session().await?;
        self.sessions += 1;
        info!(
            "Watch session {} started ({} backend)",
            self.sessions,
            self.factory.backend_type()
        );

        if self.sessions > 1 {
            self.rearm(&mut session).await;
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Watch session {} cancelled", self.sessions);
                    return Ok(());
                }
                event = session.events.recv() => match event {
                    Some(event) => self.on_event(event).await,
                    None => return Err(Error::Watch("Native event stream closed".to_string())),
                },
                error = session.errors.recv() => match error {
                    Some(error) => warn!("Native watcher error: {}", error),
                    None => return Err(Error::Watch("Native error stream closed".to_string())),
                },
                command = self.commands.recv() => match command {
                    Some(Command::Add(request)) => self.on_add(&mut session, request).await,
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.registry.snapshot());
                    }
                    None => return Ok(()),
                },
            }
        }
    }

    /// Register one path. Per-path failures are reported and the request is
    /// dropped; nothing here ends the session.
    async fn on_add(&mut self, session: &mut Session, request: AddRequest) {
        if request.path.as_os_str().is_empty() {
            return;
        }

        let path = match absolute(&request.path) {
            Ok(path) => path,
            Err(e) => {
                warn!("Cannot resolve {}: {}", request.path.display(), e);
                return;
            }
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.registry.remove(&path) {
                    debug!("Unwatched vanished path {}", path.display());
                }
                return;
            }
            Err(e) => {
                warn!("Cannot stat {}: {}", path.display(), e);
                return;
            }
        };
        let is_dir = metadata.is_dir();

        if self.registry.contains(&path) {
            // Known path: never subscribe twice, only honour an explicit flag.
            if let Some(recursive) = request.recursive {
                if self.registry.update(&path, recursive) == Some(Registration::Upgraded) && is_dir
                {
                    debug!("Watch on {} is now recursive", path.display());
                    self.expand(path);
                }
            }
            return;
        }

        if self.filter.is_excluded(&path) {
            debug!("Excluded {}", path.display());
            return;
        }

        if let Err(e) = session.add_watch(&path) {
            warn!("Failed to watch {}: {}", path.display(), e);
        }

        let recursive = request
            .recursive
            .unwrap_or_else(|| self.parent_is_recursive(&path));
        self.registry.insert(path.clone(), recursive);
        trace!("Watching {} (recursive: {})", path.display(), recursive);

        let walk = match request.origin {
            AddOrigin::Caller | AddOrigin::Discovered => recursive,
            // The walk that produced this request already covers its subtree.
            AddOrigin::Subtree => false,
        };
        if walk && is_dir {
            self.expand(path);
        }
    }

    async fn on_event(&mut self, event: notify::Event) {
        for change in ChangeEvent::from_notify(event) {
            self.on_change(change).await;
        }
    }

    async fn on_change(&mut self, change: ChangeEvent) {
        if self.filter.is_excluded(&change.path) {
            trace!("Dropped excluded event {}", change);
            return;
        }

        let path = change.path.clone();
        self.dispatch(change);

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {
                let commands = self.resubmit.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    submit(&commands, &cancel, Command::Add(AddRequest::discovered(path))).await;
                });
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.registry.remove(&path) {
                    debug!("Unwatched removed path {}", path.display());
                }
            }
            Err(e) => warn!("Cannot stat {}: {}", path.display(), e),
        }
    }

    /// Hand an event to the user handler on its own task, with retries.
    /// Handler failures never reach the registry.
    fn dispatch(&self, change: ChangeEvent) {
        let handler = self.handler.clone();
        let attempts = self.settings.callback_attempts;
        let delay = self.settings.callback_retry_delay;

        tokio::spawn(async move {
            let result = try_with_retries(attempts, delay, || handler.handle(change.clone())).await;
            if let Err(e) = result {
                warn!(
                    "Handler '{}' failed for {} after {} attempt(s): {}",
                    handler.name(),
                    change,
                    attempts.max(1),
                    e
                );
            }
        });
    }

    /// Walk the subtree of `root` on a producer task and feed every directory
    /// back in as an add request.
    fn expand(&self, root: PathBuf) {
        let commands = self.resubmit.clone();
        let cancel = self.cancel.clone();
        let filter = self.filter.clone();

        tokio::spawn(async move {
            let mut dirs = tree::enumerate(root, filter, cancel.clone());
            loop {
                let path = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = dirs.recv() => match next {
                        Some(path) => path,
                        None => break,
                    },
                };
                if !submit(&commands, &cancel, Command::Add(AddRequest::subtree(path))).await {
                    break;
                }
            }
        });
    }

    /// Subscribe every registered path on a fresh session.
    async fn rearm(&mut self, session: &mut Session) {
        let entries = self.registry.snapshot();
        let mut armed = 0;
        let mut recursive_dirs = Vec::new();

        for entry in entries {
            let is_dir = match tokio::fs::metadata(&entry.path).await {
                Ok(metadata) => metadata.is_dir(),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    self.registry.remove(&entry.path);
                    continue;
                }
                Err(e) => {
                    warn!("Cannot stat {}: {}", entry.path.display(), e);
                    false
                }
            };
            match session.add_watch(&entry.path) {
                Ok(()) => armed += 1,
                Err(e) => warn!("Failed to re-watch {}: {}", entry.path.display(), e),
            }
            if entry.recursive && is_dir {
                recursive_dirs.push(entry.path);
            }
        }

        // Directories created while no session was running are picked up by
        // walking the recursive roots again.
        for path in recursive_dirs {
            if !self.parent_is_recursive(&path) {
                self.expand(path);
            }
        }

        info!("Re-armed {} of {} watches", armed, self.registry.len());
    }

    fn parent_is_recursive(&self, path: &Path) -> bool {
        path.parent()
            .and_then(|parent| self.registry.get(parent))
            .unwrap_or(false)
    }
}

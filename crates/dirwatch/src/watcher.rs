//! Public handle for a running directory watcher.

use crate::{
    agent::{submit, AddRequest, AgentSettings, Command, WatchAgent},
    backends::{NotifyFactory, WatcherFactory},
    config::WatcherConfig,
    error::{Error, Result},
    filter::ExclusionFilter,
    registry::WatchedPath,
    supervisor::supervise,
    traits::EventHandler,
    utils::absolute,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Watches directories, recursively on request, and forwards every change
/// to an [`EventHandler`].
///
/// The watcher keeps running until [`stop`](Watcher::stop) is called or the
/// handle is dropped. Native watch failures are recovered from internally by
/// starting a new session after the configured delay.
pub struct Watcher {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    runtime: Handle,
    task: Mutex<Option<JoinHandle<()>>>,
    backend: &'static str,
}

impl Watcher {
    /// Start a notify-backed watcher with the given exclusion patterns.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn new<H, I, S>(handler: H, exclude: I) -> Result<Self>
    where
        H: EventHandler + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder()
            .handler(handler)
            .exclude(exclude)
            .spawn()
            .await
    }

    /// Create a builder for a customised watcher.
    pub fn builder() -> WatcherBuilder {
        WatcherBuilder::default()
    }

    /// Start watching `path`; with `recursive`, every directory below it as
    /// well, including ones created later.
    ///
    /// Returns immediately. Failures are reported through `tracing` and never
    /// returned. Adding a path that is already watched does not subscribe it
    /// again.
    pub fn add(&self, path: impl AsRef<Path>, recursive: bool) {
        let path = path.as_ref();
        // Resolved before spawning so the working directory at call time applies.
        let path = if path.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            match absolute(path) {
                Ok(path) => path,
                Err(e) => {
                    warn!("Cannot resolve {}: {}", path.display(), e);
                    return;
                }
            }
        };
        let commands = self.commands.clone();
        let cancel = self.cancel.clone();

        self.runtime.spawn(async move {
            let request = AddRequest::caller(path, recursive);
            if !submit(&commands, &cancel, Command::Add(request)).await {
                debug!("Add dropped, watcher is stopped");
            }
        });
    }

    /// Stop watching. Safe to call any number of times, from any thread.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            info!("Stopping directory watcher");
        }
        self.cancel.cancel();
    }

    /// Whether [`stop`](Watcher::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop watching and wait for the agent task to finish.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Watch agent task ended abnormally: {}", e);
            }
        }
    }

    /// Snapshot of the watched paths, sorted by path.
    ///
    /// Answered by the agent between two messages. Empty once stopped.
    pub async fn watched_paths(&self) -> Vec<WatchedPath> {
        let (reply, response) = oneshot::channel();
        if !submit(&self.commands, &self.cancel, Command::Snapshot(reply)).await {
            return Vec::new();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Vec::new(),
            paths = response => paths.unwrap_or_default(),
        }
    }

    /// Identifier of the native backend in use.
    pub fn backend_type(&self) -> &'static str {
        self.backend
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("backend", &self.backend)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Builder for [`Watcher`].
#[derive(Default)]
pub struct WatcherBuilder {
    handler: Option<Arc<dyn EventHandler>>,
    config: WatcherConfig,
    factory: Option<Arc<dyn WatcherFactory>>,
}

impl WatcherBuilder {
    /// Set the event handler. Required.
    pub fn handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Set an already shared event handler.
    pub fn shared_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Replace the exclusion patterns.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the whole configuration, exclusion patterns included.
    pub fn config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a different native backend. Defaults to notify.
    pub fn factory(mut self, factory: impl WatcherFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Start the watcher on the current tokio runtime.
    ///
    /// Waits for the configured startup grace period before returning so the
    /// first native session is usually up by the time paths are added.
    pub async fn spawn(self) -> Result<Watcher> {
        let handler = self.handler.ok_or(Error::MissingHandler)?;
        self.config.validate()?;
        let runtime = Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;

        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(NotifyFactory::new()));
        let backend = factory.backend_type();
        let filter = ExclusionFilter::new(&self.config.exclude);
        let cancel = CancellationToken::new();
        let (commands, receiver) = mpsc::channel(1);

        let agent = WatchAgent::new(
            filter,
            handler,
            factory,
            receiver,
            commands.clone(),
            cancel.clone(),
            AgentSettings {
                callback_attempts: self.config.callback_attempts,
                callback_retry_delay: self.config.callback_retry_delay(),
            },
        );
        let task = runtime.spawn(supervise(agent, self.config.restart_delay()));
        info!("Directory watcher started ({} backend)", backend);

        tokio::time::sleep(self.config.startup_grace()).await;

        Ok(Watcher {
            commands,
            cancel,
            runtime,
            task: Mutex::new(Some(task)),
            backend,
        })
    }
}

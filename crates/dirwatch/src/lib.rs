//! # dirwatch
//!
//! Recursive directory watching on top of non-recursive native notifications.
//!
//! A [`Watcher`] subscribes individual directories with the platform backend
//! and, for recursive roots, walks the tree itself: every existing
//! subdirectory is subscribed on add, and every directory created later is
//! picked up from its creation event. Every change is forwarded to a
//! user-supplied [`EventHandler`], except those whose path matches one of the
//! exclusion patterns.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐   commands   ┌──────────────────┐   add_watch   ┌─────────────────┐
//! │     Watcher     │─────────────▶│    WatchAgent    │──────────────▶│  Native session │
//! │ (add/stop/...)  │              │ (owns registry)  │◀──────────────│ (notify/memory) │
//! └─────────────────┘              └──────────────────┘  events/errs  └─────────────────┘
//!                                     │   ▲       │
//!                        subtree walk │   │ re-   │ dispatch
//!                                     ▼   │ submit▼
//!                                  ┌────────────┐  ┌─────────────────┐
//!                                  │  producers │  │  EventHandler   │
//!                                  └────────────┘  └─────────────────┘
//! ```
//!
//! The agent is the only owner of the registry of watched paths; everything
//! else talks to it over a channel. When a native session fails, a supervisor
//! starts a new one after a fixed delay and re-subscribes the registry.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dirwatch::{handler_fn, Watcher};
//!
//! # async fn run() -> dirwatch::Result<()> {
//! let watcher = Watcher::new(
//!     handler_fn(|event| {
//!         println!("{event}");
//!         Ok(())
//!     }),
//!     ["/**/.git"],
//! )
//! .await?;
//!
//! watcher.add("/srv/project", true);
//! // ...
//! watcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod agent;
pub mod backends;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod registry;
mod supervisor;
pub mod traits;
mod tree;
mod utils;
mod watcher;

pub use backends::{MemoryFactory, NotifyFactory, WatcherFactory};
pub use config::WatcherConfig;
pub use error::{Error, Result};
pub use events::{ChangeEvent, ChangeKind};
pub use filter::ExclusionFilter;
pub use registry::WatchedPath;
pub use traits::{handler_fn, EventHandler, FnHandler, NativeWatcher, Session};
pub use watcher::{Watcher, WatcherBuilder};

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::{
        handler_fn, ChangeEvent, ChangeKind, Error, EventHandler, Result, WatchedPath, Watcher,
        WatcherConfig,
    };
}

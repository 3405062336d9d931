//! Change event types and conversion from native notifications.

use notify::event::ModifyKind;
use notify::EventKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single filesystem change delivered to the event handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Path the change was reported for.
    pub path: PathBuf,

    /// What happened to the path.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Split a native event into one change event per reported path.
    ///
    /// Native kinds without a counterpart (access notifications, unknown
    /// kinds) yield nothing.
    pub fn from_notify(event: notify::Event) -> Vec<ChangeEvent> {
        let Some(kind) = ChangeKind::from_notify(&event.kind) else {
            return Vec::new();
        };
        event
            .paths
            .into_iter()
            .map(|path| ChangeEvent::new(path, kind))
            .collect()
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())
    }
}

/// Kinds of change that are forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Path was created.
    Create,
    /// File content was written.
    Write,
    /// Path was removed.
    Remove,
    /// Path was renamed or moved.
    Rename,
    /// Permissions or other metadata changed.
    Chmod,
}

impl ChangeKind {
    /// Map a native event kind; `None` for kinds that are not forwarded.
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Remove(_) => Some(Self::Remove),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            EventKind::Modify(ModifyKind::Metadata(_)) => Some(Self::Chmod),
            EventKind::Modify(_) => Some(Self::Write),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }

    /// Get a string representation of the change kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Write => "write",
            Self::Remove => "remove",
            Self::Rename => "rename",
            Self::Chmod => "chmod",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{
        AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode,
    };

    fn native(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_kind_mapping() {
        let cases = [
            (EventKind::Create(CreateKind::Folder), Some(ChangeKind::Create)),
            (
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                Some(ChangeKind::Write),
            ),
            (EventKind::Modify(ModifyKind::Any), Some(ChangeKind::Write)),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                Some(ChangeKind::Rename),
            ),
            (
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                Some(ChangeKind::Chmod),
            ),
            (EventKind::Remove(RemoveKind::File), Some(ChangeKind::Remove)),
            (EventKind::Access(AccessKind::Read), None),
            (EventKind::Other, None),
        ];

        for (kind, expected) in cases {
            assert_eq!(ChangeKind::from_notify(&kind), expected, "{:?}", kind);
        }
    }

    #[test]
    fn test_multi_path_event_is_split() {
        let event = native(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/tmp/old", "/tmp/new"],
        );

        let events = ChangeEvent::from_notify(event);
        assert_eq!(
            events,
            vec![
                ChangeEvent::new("/tmp/old", ChangeKind::Rename),
                ChangeEvent::new("/tmp/new", ChangeKind::Rename),
            ]
        );
    }

    #[test]
    fn test_access_event_dropped() {
        let event = native(EventKind::Access(AccessKind::Any), &["/tmp/file"]);
        assert!(ChangeEvent::from_notify(event).is_empty());
    }

    #[test]
    fn test_display() {
        let event = ChangeEvent::new("/tmp/a.txt", ChangeKind::Write);
        assert_eq!(event.to_string(), "write /tmp/a.txt");
    }
}

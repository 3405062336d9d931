//! The set of currently watched paths.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A registered path and whether its subtree is watched too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchedPath {
    /// Absolute path of the watched entry.
    pub path: PathBuf,
    /// Whether descendant directories are watched as well.
    pub recursive: bool,
}

/// Outcome of applying an explicit recursive flag to a registered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The recursive flag was raised from false to true.
    Upgraded,
    /// Nothing changed that needs follow-up work.
    Unchanged,
}

/// Mapping from absolute path to recursive flag. Keys are unique.
///
/// Owned by the watch agent; every read and write happens on its task.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    paths: HashMap<PathBuf, bool>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recursive flag of a registered path.
    pub fn get(&self, path: &Path) -> Option<bool> {
        self.paths.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains_key(path)
    }

    /// Register a path. Returns whether it was new; a known path keeps its
    /// entry but takes the given flag.
    pub fn insert(&mut self, path: PathBuf, recursive: bool) -> bool {
        self.paths.insert(path, recursive).is_none()
    }

    /// Apply an explicit recursive flag to an already registered path.
    ///
    /// Returns `None` if the path is not registered.
    pub fn update(&mut self, path: &Path, recursive: bool) -> Option<Registration> {
        let stored = self.paths.get_mut(path)?;
        let upgraded = !*stored && recursive;
        *stored = recursive;
        Some(if upgraded {
            Registration::Upgraded
        } else {
            Registration::Unchanged
        })
    }

    /// Forget a path. Returns whether it was registered.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.paths.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// All entries, sorted by path.
    pub fn snapshot(&self) -> Vec<WatchedPath> {
        let mut entries: Vec<WatchedPath> = self
            .paths
            .iter()
            .map(|(path, recursive)| WatchedPath {
                path: path.clone(),
                recursive: *recursive,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_keyed_by_path() {
        let mut registry = WatchRegistry::new();

        assert!(registry.insert(PathBuf::from("/a"), false));
        assert!(!registry.insert(PathBuf::from("/a"), true));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(Path::new("/a")), Some(true));
    }

    #[test]
    fn test_update_reports_upgrade() {
        let mut registry = WatchRegistry::new();
        registry.insert(PathBuf::from("/a"), false);

        assert_eq!(
            registry.update(Path::new("/a"), true),
            Some(Registration::Upgraded)
        );
        assert_eq!(
            registry.update(Path::new("/a"), true),
            Some(Registration::Unchanged)
        );
        assert_eq!(
            registry.update(Path::new("/a"), false),
            Some(Registration::Unchanged)
        );
        assert_eq!(registry.get(Path::new("/a")), Some(false));
        assert_eq!(registry.update(Path::new("/missing"), true), None);
    }

    #[test]
    fn test_remove() {
        let mut registry = WatchRegistry::new();
        registry.insert(PathBuf::from("/a"), true);

        assert!(registry.remove(Path::new("/a")));
        assert!(!registry.remove(Path::new("/a")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let mut registry = WatchRegistry::new();
        registry.insert(PathBuf::from("/b"), false);
        registry.insert(PathBuf::from("/a"), true);

        let snapshot = registry.snapshot();
        assert_eq!(
            snapshot,
            vec![
                WatchedPath {
                    path: PathBuf::from("/a"),
                    recursive: true
                },
                WatchedPath {
                    path: PathBuf::from("/b"),
                    recursive: false
                },
            ]
        );
    }
}

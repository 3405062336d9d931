//! Lazy enumeration of the directories below a root.

use crate::filter::ExclusionFilter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};
use walkdir::WalkDir;

/// Depth-first walk yielding every directory strictly below `root`.
///
/// Files are skipped and excluded directories are pruned together with their
/// contents. Symlinks are not followed. The walk stops at the first traversal
/// error, which is yielded as the last item, and before the next entry once
/// `cancel` fires.
pub fn subdirectories(
    root: &Path,
    filter: Arc<ExclusionFilter>,
    cancel: CancellationToken,
) -> impl Iterator<Item = walkdir::Result<PathBuf>> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| !filter.is_excluded(entry.path()))
        .take_while(move |_| !cancel.is_cancelled())
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .scan(false, |failed, item| {
            if *failed {
                return None;
            }
            *failed = item.is_err();
            Some(item)
        })
}

/// Stream the directories below `root` from a blocking producer.
///
/// The channel holds a single item, so the walk advances only as fast as the
/// receiver consumes it. The producer stops when the walk ends, when a
/// traversal error occurs (it is reported), when `cancel` fires, or when the
/// receiver is dropped.
pub fn enumerate(
    root: PathBuf,
    filter: Arc<ExclusionFilter>,
    cancel: CancellationToken,
) -> mpsc::Receiver<PathBuf> {
    let (tx, rx) = mpsc::channel(1);

    tokio::task::spawn_blocking(move || {
        for item in subdirectories(&root, filter, cancel.clone()) {
            match item {
                Ok(path) => {
                    trace!("Discovered directory {}", path.display());
                    if tx.blocking_send(path).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Stopped walking {}: {}", root.display(), e);
                    break;
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_filter() -> Arc<ExclusionFilter> {
        Arc::new(ExclusionFilter::default())
    }

    fn walk_all(root: &Path, filter: Arc<ExclusionFilter>) -> Vec<PathBuf> {
        subdirectories(root, filter, CancellationToken::new())
            .map(|r| r.unwrap())
            .collect()
    }

    fn tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join("d")).unwrap();
        fs::write(root.join("c"), "file").unwrap();
        fs::write(root.join("a/file.txt"), "file").unwrap();
        temp_dir
    }

    #[test]
    fn test_subdirectories_excludes_root_and_files() {
        let temp_dir = tree();
        let root = temp_dir.path();

        let found = walk_all(root, no_filter());
        assert_eq!(
            found,
            vec![root.join("a"), root.join("a/b"), root.join("d")]
        );
    }

    #[test]
    fn test_subdirectories_prunes_excluded() {
        let temp_dir = tree();
        let root = temp_dir.path();
        let pattern = format!("{}/a", root.display());
        let filter = Arc::new(ExclusionFilter::new([pattern]));

        assert_eq!(walk_all(root, filter), vec![root.join("d")]);
    }

    #[test]
    fn test_subdirectories_of_missing_root_ends_with_error() {
        let temp_dir = TempDir::new().unwrap();
        let items: Vec<_> = subdirectories(
            &temp_dir.path().join("missing"),
            no_filter(),
            CancellationToken::new(),
        )
        .collect();

        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[test]
    fn test_subdirectories_of_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(walk_all(temp_dir.path(), no_filter()).is_empty());
    }

    #[test]
    fn test_subdirectories_stop_inside_file_only_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("files")).unwrap();
        for i in 0..50 {
            fs::write(root.join(format!("files/{i:02}")), "file").unwrap();
        }
        fs::create_dir(root.join("last")).unwrap();

        let cancel = CancellationToken::new();
        let mut walk = subdirectories(root, no_filter(), cancel.clone());
        assert_eq!(walk.next().unwrap().unwrap(), root.join("files"));

        cancel.cancel();
        assert!(walk.next().is_none());
    }

    #[tokio::test]
    async fn test_enumerate_streams_all_directories() {
        let temp_dir = tree();
        let root = temp_dir.path().to_path_buf();

        let mut rx = enumerate(root.clone(), no_filter(), CancellationToken::new());
        let mut found = Vec::new();
        while let Some(path) = rx.recv().await {
            found.push(path);
        }

        assert_eq!(
            found,
            vec![root.join("a"), root.join("a/b"), root.join("d")]
        );
    }

    #[tokio::test]
    async fn test_enumerate_stops_when_cancelled() {
        let temp_dir = tree();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut rx = enumerate(temp_dir.path().to_path_buf(), no_filter(), cancel);
        assert_eq!(rx.recv().await, None);
    }
}

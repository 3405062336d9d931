//! Path resolution helpers.

use path_absolutize::Absolutize;
use std::io;
use std::path::{Path, PathBuf};

/// Resolve `path` against the current directory and clean it lexically.
///
/// Symlinks are not resolved, so the result names the path the caller used.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    Ok(path.absolutize()?.into_owned())
}

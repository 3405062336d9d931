//! Exclusion filtering by shell-glob patterns.

use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::warn;

/// Shell semantics: `*` and `?` never match a path separator.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Ordered set of exclusion patterns, fixed for the watcher's lifetime.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    patterns: Vec<Pattern>,
}

impl ExclusionFilter {
    /// Compile the given patterns, in order.
    ///
    /// A malformed pattern is reported and left out; it can never match.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|raw| match Pattern::new(raw.as_ref()) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Ignoring exclusion pattern {:?}: {}", raw.as_ref(), e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// True if any pattern matches the full path, or the full path of one of
    /// its ancestors. First match wins.
    ///
    /// Matching ancestors keeps everything below an excluded directory out,
    /// even when the native layer reports it.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        path.ancestors().any(|candidate| self.matches(candidate))
    }

    fn matches(&self, path: &Path) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_path_with(path, MATCH_OPTIONS))
    }

    /// Number of usable patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

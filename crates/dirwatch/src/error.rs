//! Error types for the directory watcher.

use thiserror::Error;

/// Errors that can occur while watching directories.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Native watch layer error.
    #[error("File watching error: {0}")]
    Watch(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Exclusion pattern could not be compiled.
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Event handler (user callback) failed.
    #[error("Event handling error: {0}")]
    Handler(String),

    /// No event handler was supplied at construction.
    #[error("An event handler is required to build a watcher")]
    MissingHandler,

    /// Construction was attempted outside a tokio runtime.
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Result type for directory watching operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert notify errors to our error type.
impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err.to_string())
    }
}

/// Convert glob pattern errors to our error type.
impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::Pattern(err.to_string())
    }
}

/// Convert TOML parse errors to our error type.
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_error_conversion() {
        let err: Error = notify::Error::generic("inotify limit reached").into();
        assert!(matches!(err, Error::Watch(_)));
        assert!(err.to_string().contains("inotify limit reached"));
    }

    #[test]
    fn test_pattern_error_conversion() {
        let err: Error = glob::Pattern::new("[unclosed").unwrap_err().into();
        assert!(matches!(err, Error::Pattern(_)));
    }
}

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors (default)
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "dirwatch")]
#[command(about = "dirwatch - print filesystem changes below one or more directories")]
#[command(version)]
pub struct Cli {
    /// Directories (or files) to watch
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Watch only the given paths, not their subdirectories
    #[arg(long)]
    pub no_recursive: bool,

    /// Exclusion glob matched against full paths; repeatable
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// TOML config file with exclusion patterns and timings
    #[arg(short = 'C', long, env = "DIRWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print one JSON object per event instead of plain text
    #[arg(long)]
    pub json: bool,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Effective log level: explicit level, then `--verbose`, then warn.
    pub fn level(&self) -> LogLevel {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level,
            (None, true) => LogLevel::Debug,
            (None, false) => LogLevel::Warn,
        }
    }

    pub fn recursive(&self) -> bool {
        !self.no_recursive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["dirwatch", "/srv"]).unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from("/srv")]);
        assert!(cli.recursive());
        assert!(!cli.json);
        assert!(cli.exclude.is_empty());
        assert_eq!(cli.level(), LogLevel::Warn);
    }

    #[test]
    fn test_parse_repeated_excludes() {
        let cli = Cli::try_parse_from([
            "dirwatch",
            "-x",
            "/**/.git",
            "--exclude",
            "/**/target",
            "--no-recursive",
            "a",
            "b",
        ])
        .unwrap();
        assert_eq!(cli.exclude, vec!["/**/.git", "/**/target"]);
        assert_eq!(cli.paths.len(), 2);
        assert!(!cli.recursive());
    }

    #[test]
    fn test_log_level_precedence() {
        let cli = Cli::try_parse_from(["dirwatch", "-v", "-l", "trace", "."]).unwrap();
        assert_eq!(cli.level(), LogLevel::Trace);

        let cli = Cli::try_parse_from(["dirwatch", "-v", "."]).unwrap();
        assert_eq!(cli.level(), LogLevel::Debug);
        assert_eq!(LevelFilter::from(cli.level()), LevelFilter::DEBUG);
    }

    #[test]
    fn test_paths_are_required() {
        assert!(Cli::try_parse_from(["dirwatch"]).is_err());
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use dirwatch::{handler_fn, ChangeEvent, Watcher, WatcherConfig};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

mod cli;

use cli::Cli;

/// Merge the config file (if any) with command-line exclusions.
fn load_config(cli: &Cli) -> Result<WatcherConfig> {
    let mut config = match &cli.config {
        Some(path) => WatcherConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => WatcherConfig::default(),
    };
    config.exclude.extend(cli.exclude.iter().cloned());
    Ok(config)
}

fn render(event: &ChangeEvent, json: bool) -> dirwatch::Result<String> {
    if json {
        serde_json::to_string(event).map_err(|e| dirwatch::Error::Handler(e.to_string()))
    } else {
        Ok(event.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = LevelFilter::from(cli.level());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let json = cli.json;

    let watcher = Watcher::builder()
        .handler(handler_fn(move |event| {
            println!("{}", render(&event, json)?);
            Ok(())
        }))
        .config(config)
        .spawn()
        .await
        .context("Failed to start watcher")?;

    for path in &cli.paths {
        watcher.add(path, cli.recursive());
    }
    info!("Watching {} path(s), press Ctrl-C to stop", cli.paths.len());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    watcher.shutdown().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirwatch::ChangeKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_render_plain_and_json() {
        let event = ChangeEvent::new("/srv/a.txt", ChangeKind::Write);
        assert_eq!(render(&event, false).unwrap(), "write /srv/a.txt");

        let json: serde_json::Value = serde_json::from_str(&render(&event, true).unwrap()).unwrap();
        assert_eq!(json["path"], "/srv/a.txt");
        assert_eq!(json["kind"], "write");
    }

    #[test]
    fn test_load_config_merges_excludes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dirwatch.toml");
        fs::write(&path, "exclude = [\"/**/.git\"]\nrestart_delay_ms = 100\n").unwrap();

        let cli = Cli::try_parse_from([
            "dirwatch",
            "-C",
            path.to_str().unwrap(),
            "-x",
            "/**/target",
            ".",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();

        assert_eq!(config.exclude, vec!["/**/.git", "/**/target"]);
        assert_eq!(config.restart_delay_ms, 100);
    }

    #[test]
    fn test_load_missing_config_fails() {
        let cli =
            Cli::try_parse_from(["dirwatch", "-C", "/nonexistent/dirwatch.toml", "."]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}

//! Command-line arguments and command dispatch.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use personio_extract::{Catalog, JsonLinesSink, State, SyncEngine, TapConfig};
use tracing::info;

use crate::error::CliResult;

/// Extract Personio HR data as a Singer message stream
#[derive(Debug, Parser)]
#[command(name = "tap-personio")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file (client_id, client_secret, start_date)
    #[arg(short, long)]
    pub config: PathBuf,

    /// State file written by an earlier run
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Catalog of selected streams; all streams are synced when omitted
    #[arg(long, alias = "properties")]
    pub catalog: Option<PathBuf>,

    /// Print the catalog and exit
    #[arg(short, long)]
    pub discover: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Runs discovery or a sync, writing to `out`.
pub async fn run<W: Write>(args: Args, out: W) -> CliResult<()> {
    let config = TapConfig::from_file(&args.config)?;
    let mut engine = SyncEngine::new(config, JsonLinesSink::new(out))?;

    if args.discover {
        let catalog = engine.discover();
        let mut out = engine.into_sink().into_inner();
        serde_json::to_writer_pretty(&mut out, &catalog)?;
        writeln!(out)?;
        out.flush()?;
        return Ok(());
    }

    let state = match args.state {
        Some(ref path) => State::from_file(path)?,
        None => State::default(),
    };
    let catalog = match args.catalog {
        Some(ref path) => Catalog::from_file(path)?,
        None => engine.discover(),
    };

    let summary = engine.sync(state, &catalog).await?;
    for stream in &summary.streams {
        info!(
            stream = %stream.stream,
            emitted = stream.counters.emitted,
            pages = stream.pages,
            failed_pages = stream.failed_pages,
            "Stream complete"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_parse_sync_args() {
        let args = Args::try_parse_from([
            "tap-personio",
            "--config",
            "config.json",
            "--state",
            "state.json",
            "--properties",
            "catalog.json",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert_eq!(args.state, Some(PathBuf::from("state.json")));
        assert_eq!(args.catalog, Some(PathBuf::from("catalog.json")));
        assert!(!args.discover);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_config_is_required() {
        assert!(Args::try_parse_from(["tap-personio", "--discover"]).is_err());
    }

    #[tokio::test]
    async fn test_discover_writes_catalog() {
        let mut config = tempfile::NamedTempFile::new().unwrap();
        write!(
            config,
            r#"{{"client_id": "id", "client_secret": "secret", "start_date": "2023-01-01"}}"#
        )
        .unwrap();

        let args = Args::try_parse_from([
            "tap-personio",
            "--config",
            config.path().to_str().unwrap(),
            "--discover",
        ])
        .unwrap();

        let mut out = Vec::new();
        run(args, &mut out).await.unwrap();

        let catalog: Catalog = serde_json::from_slice(&out).unwrap();
        let ids: Vec<&str> = catalog
            .streams
            .iter()
            .map(|s| s.tap_stream_id.as_str())
            .collect();
        assert_eq!(ids, vec!["employees", "attendances", "projects", "time-offs"]);
    }

    #[tokio::test]
    async fn test_missing_config_keys_fail() {
        let mut config = tempfile::NamedTempFile::new().unwrap();
        write!(config, r#"{{"client_id": "id"}}"#).unwrap();

        let args = Args::try_parse_from([
            "tap-personio",
            "-c",
            config.path().to_str().unwrap(),
            "-d",
        ])
        .unwrap();

        let err = run(args, Vec::new()).await.unwrap_err();
        assert!(err.to_string().contains("client_secret"));
    }
}

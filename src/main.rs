use std::path::PathBuf;

use clap::Parser;
use cycler::{
    config::CyclerConfig,
    cycling::{CycleOptions, CycleOutcome, DataSource, fabricate_data_cycler},
    db::DbPool,
    observability,
};

/// CLI arguments for the data cycler
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Cycle data that exceeds the time constraint limit",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "cycler.toml")]
    config: PathBuf,

    /// Data cycle interval expressed in days. Defaults to the configured
    /// retention of the chosen data source.
    #[arg(long, global = true)]
    days: Option<u32>,

    /// Maximum number of rows to delete per statement
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    chunk_size: Option<u32>,

    /// Seconds to pause between job chunks (ignored for performance data)
    #[arg(long, global = true)]
    sleep_time: Option<u64>,

    /// Write debug messages to stdout
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(clap::Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Cycle job results and their ancillary data (default)
    #[command(name = "from:treeherder")]
    FromTreeherder,
    /// Cycle performance data
    #[command(name = "from:perfherder")]
    FromPerfherder,
}

impl Command {
    fn source(self) -> DataSource {
        match self {
            Command::FromTreeherder => DataSource::Treeherder,
            Command::FromPerfherder => DataSource::Perfherder,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let config = match CyclerConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Failed to load config from {}: {}",
                args.config.display(),
                e
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability.logging, args.debug) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let source = args
        .command
        .map(Command::source)
        .unwrap_or_default();
    let options = CycleOptions {
        days: args.days,
        chunk_size: args.chunk_size,
        sleep_time: args.sleep_time,
    };
    let site_hostname = std::env::var("SITE_HOSTNAME").ok();

    let cycler = match fabricate_data_cycler(
        source,
        &options,
        &config.retention,
        site_hostname.as_deref(),
    ) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, source = %source, "Invalid cycling options");
            std::process::exit(1);
        }
    };

    tracing::info!(
        config_file = %args.config.display(),
        "Cycle interval: {} days",
        cycler.policy().days()
    );

    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    if let Err(e) = db.health_check().await {
        tracing::error!(error = %e, "Database health check failed");
        db.close().await;
        std::process::exit(1);
    }

    let result = cycler.cycle(&db).await;
    db.close().await;

    match result {
        Ok(CycleOutcome::Completed(report)) => {
            tracing::info!(
                source = %report.source,
                deleted = report.total_deleted(),
                elapsed_secs = report.elapsed.as_secs(),
                "Cycling complete"
            );
            for step in report.steps.iter().filter(|s| s.error.is_some()) {
                tracing::warn!(
                    step = %step.name,
                    error = step.error.as_deref().unwrap_or_default(),
                    "Step did not finish"
                );
            }
        }
        Ok(CycleOutcome::Aborted { report, reason }) => {
            tracing::warn!(
                source = %report.source,
                deleted = report.total_deleted(),
                "{}, remaining data is left for the next run",
                reason
            );
        }
        Err(e) => {
            tracing::error!(error = %e, source = %source, "Cycling failed");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_source_is_treeherder() {
        let args = Args::try_parse_from(["cycle-data"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.config, PathBuf::from("cycler.toml"));
        assert_eq!(
            args.command.map(Command::source).unwrap_or_default(),
            DataSource::Treeherder
        );
    }

    #[test]
    fn test_perfherder_subcommand_with_options() {
        let args = Args::try_parse_from([
            "cycle-data",
            "from:perfherder",
            "--days",
            "400",
            "--chunk-size",
            "1000",
            "--debug",
        ])
        .unwrap();
        assert_eq!(
            args.command.map(Command::source),
            Some(DataSource::Perfherder)
        );
        assert_eq!(args.days, Some(400));
        assert_eq!(args.chunk_size, Some(1000));
        assert!(args.debug);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let result = Args::try_parse_from(["cycle-data", "--chunk-size", "0"]);
        assert!(result.is_err());
    }
}

//! qscaled — the qscale daemon.
//!
//! Loads the alert config, then runs one watcher per alert until the
//! configured runtime expires or Ctrl-C arrives.
//!
//! # Usage
//!
//! ```text
//! qscaled run --config /etc/qscale/qscale.json
//! qscaled check --config qscale.toml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod daemon;

#[derive(Parser)]
#[command(name = "qscaled", about = "qscale daemon", version)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch every configured queue and launch worker tasks.
    Run {
        /// Config file (JSON, or TOML when it ends in `.toml`).
        #[arg(long, env = "QSCALE_CONFIG")]
        config: PathBuf,

        /// Default polling interval in seconds for alerts without their own.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Stop after this many seconds.
        #[arg(long)]
        runtime: Option<u64>,
    },
    /// Validate the config and list the alerts that would be watched.
    Check {
        #[arg(long, env = "QSCALE_CONFIG")]
        config: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,qscale=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Command::Run {
            config,
            interval,
            runtime,
        } => daemon::run(&config, interval, runtime).await,
        Command::Check { config } => daemon::check(&config).await,
    }
}

//! indexed-lines - print lines of a file by their number
//!
//! Indexes the given file once, then asks for line numbers until `0` is entered. If no valid
//! number arrives in time, the whole file is printed instead.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use async_std::io::{self, BufReader};
use clap::Parser;
use indexed_lines::{
    config::DEFAULT_DEADLINE, Backend, BackendKind, Outcome, Session, SessionConfig,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// indexed-lines - print lines of a file by their number
#[derive(Parser, Debug)]
#[command(name = "indexed-lines")]
#[command(version, about, long_about = None)]
struct Cli {
    /// File to index
    path: PathBuf,

    /// How the file gets accessed
    #[arg(short, long, value_enum, default_value_t = BackendKind::default())]
    backend: BackendKind,

    /// Seconds to wait for the first line number before printing the whole file
    #[arg(short, long, default_value_t = DEFAULT_DEADLINE.as_secs())]
    timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.backend, Duration::from_secs(self.timeout))
    }
}

#[async_std::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help and --version end up here as well
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(&cli).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "exiting");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<Outcome> {
    let config = cli.session_config();

    let (backend, table) = Backend::open(&cli.path, config.backend)
        .await
        .with_context(|| format!("failed to open {}", cli.path.display()))?;
    tracing::debug!(backend = ?backend.kind(), lines = table.len(), "indexed file");

    let session = Session::new(
        cli.path.display().to_string(),
        table,
        backend,
        config.deadline,
    );

    let mut stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();

    session
        .run(&mut stdin, &mut stdout)
        .await
        .context("failed writing to stdout")
}

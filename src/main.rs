use anyhow::{Context, Result};
use clap::Parser;
use sqlbatch::{
    AnyConnectionProvider, ConnectionConfig, ExecutionMode, RunConfig, Runner,
    ledger::DEFAULT_LEDGER_FILE,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlbatch")]
#[command(about = "Execute SQL files with specified prefixes, simulating each batch before committing it")]
struct Cli {
    /// Directory containing SQL files
    directory: PathBuf,

    /// Prefixes to search for (default: Prefix1 Prefix2)
    prefixes: Vec<String>,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(long, env = "SQLBATCH_LEDGER", default_value = DEFAULT_LEDGER_FILE)]
    ledger: PathBuf,

    /// Stop after the simulation pass
    #[arg(long)]
    simulate_only: bool,

    /// Keep processing prefixes after one fails
    #[arg(long)]
    keep_going: bool,

    /// Write the run summary as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Seconds to wait for a database connection
    #[arg(long, default_value_t = 30)]
    connect_timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    let code = match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("An error occurred. Error details: {err:#}");
            ExitCode::FAILURE
        }
    };

    info!(
        "Total Elapsed: {:.2} seconds.",
        start.elapsed().as_secs_f64()
    );
    code
}

async fn run(cli: Cli) -> Result<bool> {
    let mode = if cli.simulate_only {
        ExecutionMode::SimulateOnly
    } else {
        ExecutionMode::SimulateThenCommit
    };

    let config = RunConfig::new(&cli.directory)
        .prefixes(cli.prefixes)
        .ledger_path(cli.ledger)
        .mode(mode)
        .keep_going(cli.keep_going);

    let mut runner = match Runner::start(config) {
        Ok(runner) => runner,
        Err(err) if err.is_config() => {
            eprintln!("Error: {err}");
            return Ok(false);
        }
        Err(err) => return Err(err.into()),
    };

    let db_config = ConnectionConfig::new(&cli.database_url)
        .connect_timeout(Duration::from_secs(cli.connect_timeout));
    let provider = AnyConnectionProvider::connect(&db_config)
        .await
        .with_context(|| format!("failed to connect to {}", db_config.redacted_url()))?;

    let summary = runner.run(Arc::new(provider.clone())).await;
    provider.close().await;

    summary.print();
    if let Some(path) = &cli.report {
        summary
            .write_json(path)
            .with_context(|| format!("failed to write report to '{}'", path.display()))?;
    }

    if let Some(fault) = &summary.fault {
        anyhow::bail!("{fault}");
    }
    if let Err(err) = summary.check() {
        error!("{err}");
        return Ok(false);
    }
    Ok(true)
}

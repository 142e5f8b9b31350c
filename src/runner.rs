// ============================================================================
// Run Driver
// ============================================================================
//
// Processes the requested prefixes one after another against a single
// ledger. A prefix that ends dirty stops the run unless `keep_going` is set;
// a fault always stops it.
//
// ============================================================================

use crate::connection::ConnectionProvider;
use crate::core::{DEFAULT_PREFIXES, Result, RunError};
use crate::executor::{BatchExecutor, ExecutionMode};
use crate::ledger::{DEFAULT_LEDGER_FILE, Ledger};
use crate::report::RunSummary;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Everything a run needs besides the database
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root of the batch file tree
    pub directory: PathBuf,

    /// Prefixes in the order they are processed
    pub prefixes: Vec<String>,

    /// Ledger file, truncated when the run starts
    pub ledger_path: PathBuf,

    pub mode: ExecutionMode,

    /// Continue with the next prefix after a dirty one
    pub keep_going: bool,
}

impl RunConfig {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: expand_home(directory.as_ref()),
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
            mode: ExecutionMode::default(),
            keep_going: false,
        }
    }

    /// Replace the default prefixes; an empty list keeps them
    pub fn prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        if !prefixes.is_empty() {
            self.prefixes = prefixes;
        }
        self
    }

    pub fn ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.directory.exists() {
            return Err(RunError::DirectoryNotFound(self.directory.clone()));
        }
        if !self.directory.is_dir() {
            return Err(RunError::NotADirectory(self.directory.clone()));
        }
        if let Some(prefix) = self.prefixes.iter().find(|p| p.trim().is_empty()) {
            return Err(RunError::InvalidConfig(format!(
                "prefix '{prefix}' is empty"
            )));
        }
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

/// A run whose ledger is open and whose configuration has been checked
pub struct Runner {
    config: RunConfig,
    ledger: Ledger,
}

impl Runner {
    /// Open the ledger, then validate the configuration
    ///
    /// The ledger is truncated even when validation fails.
    pub fn start(config: RunConfig) -> Result<Self> {
        let ledger = Ledger::create(&config.ledger_path)?;
        config.validate()?;
        Ok(Self { config, ledger })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Run every prefix; faults end up in `RunSummary::fault`
    pub async fn run(&mut self, provider: Arc<dyn ConnectionProvider>) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new();
        let executor =
            BatchExecutor::new(provider, &self.config.directory).mode(self.config.mode);

        info!(
            run_id = %summary.run_id,
            directory = %self.config.directory.display(),
            prefixes = ?self.config.prefixes,
            "run started"
        );

        for prefix in &self.config.prefixes {
            match executor.run_prefix(prefix, &mut self.ledger).await {
                Ok(outcome) => {
                    let success = outcome.is_success();
                    summary.prefixes.push(outcome);

                    if !success {
                        if self.config.keep_going {
                            warn!(prefix = %prefix, "prefix failed, continuing with the next one");
                        } else {
                            warn!(prefix = %prefix, "prefix failed, stopping the run");
                            break;
                        }
                    }
                }
                Err(err) => {
                    error!(prefix = %prefix, "run aborted: {err}");
                    summary.fault = Some(err.to_string());
                    break;
                }
            }
        }

        summary.set_elapsed(started.elapsed());
        summary
    }
}

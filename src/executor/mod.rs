// ============================================================================
// Batch Executor
// ============================================================================
//
// Per-prefix state machine:
//
// ```text
// Simulating ──dirty──> DirtySimulation
//     │
//     └──clean──> CleanSimulation ──> Committing ──> CleanCommit
//                                          │
//                                          └──dirty──> FailedCommit
// ```
//
// The commit pass walks and reads the directory again instead of replaying
// the simulation, so it only ever commits what it observed itself.
//
// ============================================================================

mod pass;

use crate::connection::ConnectionProvider;
use crate::core::{NO_ERRORS_MSG, Pass, Result};
use crate::ledger::Ledger;
use crate::report::{BatchReport, PrefixOutcome, PrefixState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Instrument, info, info_span};

pub use pass::PassRunner;

/// How far a prefix is taken after a clean simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Commit and rename after a clean simulation
    #[default]
    SimulateThenCommit,
    /// Never go past the simulation
    SimulateOnly,
}

pub struct BatchExecutor {
    provider: Arc<dyn ConnectionProvider>,
    root: PathBuf,
    mode: ExecutionMode,
}

impl BatchExecutor {
    pub fn new(provider: Arc<dyn ConnectionProvider>, root: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            root: root.into(),
            mode: ExecutionMode::default(),
        }
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Simulate `prefix` and, if the simulation is clean, commit it
    ///
    /// Anomalies never produce an `Err`: they end in a dirty terminal state.
    /// `Err` means a fault, after which the open transaction was rolled back.
    pub async fn run_prefix(&self, prefix: &str, ledger: &mut Ledger) -> Result<PrefixOutcome> {
        let simulation = self
            .run_pass(prefix, Pass::Simulation, ledger)
            .instrument(info_span!("pass", prefix, pass = %Pass::Simulation))
            .await?;

        if simulation.has_error {
            info!(prefix, "simulation found errors, nothing committed");
            return Ok(PrefixOutcome {
                prefix: prefix.to_string(),
                state: PrefixState::DirtySimulation,
                simulation,
                commit: None,
            });
        }

        if self.mode == ExecutionMode::SimulateOnly {
            return Ok(PrefixOutcome {
                prefix: prefix.to_string(),
                state: PrefixState::CleanSimulation,
                simulation,
                commit: None,
            });
        }

        let commit = self
            .run_pass(prefix, Pass::Commit, ledger)
            .instrument(info_span!("pass", prefix, pass = %Pass::Commit))
            .await?;

        let state = if commit.has_error {
            PrefixState::FailedCommit
        } else {
            PrefixState::CleanCommit
        };

        Ok(PrefixOutcome {
            prefix: prefix.to_string(),
            state,
            simulation,
            commit: Some(commit),
        })
    }

    async fn run_pass(
        &self,
        prefix: &str,
        pass: Pass,
        ledger: &mut Ledger,
    ) -> Result<BatchReport> {
        let report = PassRunner::new(self.provider.as_ref(), &self.root, prefix, pass)
            .run(ledger)
            .await?;

        if report.is_clean() {
            ledger.record(NO_ERRORS_MSG)?;
        }
        Ok(report)
    }
}

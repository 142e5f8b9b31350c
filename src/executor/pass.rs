use crate::connection::{ConnectionProvider, Transaction};
use crate::core::{BatchFile, Pass, Result, RunError, StatementOutcome};
use crate::fileset;
use crate::ledger::Ledger;
use crate::report::{BatchReport, FileReport};
use crate::statement::read_statements;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// One simulation or commit pass over a prefix, inside one transaction
pub struct PassRunner<'a> {
    provider: &'a dyn ConnectionProvider,
    root: &'a Path,
    prefix: &'a str,
    pass: Pass,
}

impl<'a> PassRunner<'a> {
    pub fn new(
        provider: &'a dyn ConnectionProvider,
        root: &'a Path,
        prefix: &'a str,
        pass: Pass,
    ) -> Self {
        Self {
            provider,
            root,
            prefix,
            pass,
        }
    }

    /// Execute every file of the prefix, then roll back or commit
    ///
    /// The transaction is rolled back whenever the pass is a simulation, found
    /// an anomaly, or hit a fault. Only a clean commit pass commits, after
    /// which the files are renamed to their `.done` form.
    pub async fn run(self, ledger: &mut Ledger) -> Result<BatchReport> {
        ledger.record(&self.header())?;
        match self.pass {
            Pass::Simulation => info!("{} simulation", self.prefix),
            Pass::Commit => info!("{} COMMITTING!", self.prefix),
        }

        let mut txn = Transaction::begin(self.provider).await?;

        let executed = self.execute_files(&mut txn, ledger).await;
        let (report, files) = match executed {
            Ok(executed) => executed,
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!("rollback after fault failed: {rollback_err}");
                }
                error!("Transaction rolled back. Error details: {err}");
                return Err(err);
            }
        };

        self.finish(txn, report, &files).await
    }

    fn header(&self) -> String {
        match self.pass {
            Pass::Simulation => format!("{} simulation errors (rollback):", self.prefix),
            Pass::Commit => format!("{} DB Transaction errors:", self.prefix),
        }
    }

    async fn execute_files(
        &self,
        txn: &mut Transaction,
        ledger: &mut Ledger,
    ) -> Result<(BatchReport, Vec<BatchFile>)> {
        let mut report = BatchReport::new(self.prefix, self.pass);
        let files = fileset::resolve(self.root, self.prefix)?;

        for file in &files {
            let started = Instant::now();
            info!("Executing SQL statements from {}...", file.file_name());

            let statements = read_statements(file.path()).await?;
            let mut file_report = FileReport::new(file.path(), file.file_name());
            file_report.lines_read = statements.len();

            for statement in &statements {
                let outcome = match txn.execute(&statement.text).await {
                    Ok(rows) => StatementOutcome::from_rows(rows),
                    Err(err) => StatementOutcome::ExecutionError(err.to_string()),
                };

                file_report.lines_modified += outcome.rows_modified();
                if let Some(entry) = outcome.ledger_entry(file.file_name(), statement) {
                    ledger.record(&entry)?;
                }
                if outcome.is_error() {
                    report.has_error = true;
                }
            }

            if file_report.is_mismatched() {
                ledger.record(&format!(
                    "{}: {} lines modified out of {} lines read.\n---\n",
                    file.file_name(),
                    file_report.lines_modified,
                    file_report.lines_read
                ))?;
                report.has_error = true;
            }

            if self.pass == Pass::Commit && report.has_error {
                ledger.record(&format!(
                    "{} file statements not committed. Errors were found.\n",
                    file.file_name()
                ))?;
            }

            file_report.has_error = report.has_error;
            file_report.set_elapsed(started.elapsed());
            info!(
                "{} lines read; {} lines modified. Elapsed: {} s.",
                file_report.lines_read, file_report.lines_modified, file_report.elapsed_secs
            );
            report.files.push(file_report);
        }

        Ok((report, files))
    }

    async fn finish(
        &self,
        txn: Transaction,
        mut report: BatchReport,
        files: &[BatchFile],
    ) -> Result<BatchReport> {
        let commit = self.pass == Pass::Commit && !report.has_error;
        let finished = if commit {
            txn.commit().await
        } else {
            txn.rollback().await
        };
        if let Err(err) = finished {
            let err = RunError::from(err);
            error!("Transaction rolled back. Error details: {err}");
            return Err(err);
        }
        if !commit {
            return Ok(report);
        }

        // Committed: a failure from here on leaves the remaining files to be
        // executed again by the next run.
        for (file, file_report) in files.iter().zip(report.files.iter_mut()) {
            if let Err(err) = tokio::fs::rename(file.path(), file.done_path()).await {
                error!(
                    "{} was committed but could not be renamed: {err}",
                    file.file_name()
                );
                return Err(RunError::io(file.path(), err));
            }
            file_report.renamed = true;
        }

        Ok(report)
    }
}

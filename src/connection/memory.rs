// ============================================================================
// Scripted in-memory provider
// ============================================================================
//
// Answers statements from a script instead of a database: every statement
// text can be given a row count or a failure, anything else affects
// `default_rows`. Commits and rollbacks are counted so that callers can check
// what a run would have made durable.
//
// ============================================================================

use super::{ConnectionProvider, SqlSession};
use crate::core::{DbError, DbResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Script {
    default_rows: u64,
    rows: HashMap<String, u64>,
    failures: HashMap<String, String>,
    /// Failures that only start with the given session number (1-based)
    late_failures: HashMap<String, (usize, String)>,
    begin_failure: Option<String>,
    commit_failure: Option<String>,
    executed: Vec<String>,
    committed: Vec<String>,
    sessions: usize,
    commits: usize,
    rollbacks: usize,
}

/// Test double for [`ConnectionProvider`]
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    /// Every statement affects exactly one row unless scripted otherwise
    pub fn new() -> Self {
        Self::with_default_rows(1)
    }

    pub fn with_default_rows(default_rows: u64) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                default_rows,
                ..Script::default()
            })),
        }
    }

    pub fn set_rows(&self, sql: &str, rows: u64) {
        self.script().rows.insert(sql.to_string(), rows);
    }

    pub fn fail_on(&self, sql: &str, message: &str) {
        self.script()
            .failures
            .insert(sql.to_string(), message.to_string());
    }

    /// Fail `sql` only in sessions opened after the first `after` ones
    pub fn fail_after_sessions(&self, after: usize, sql: &str, message: &str) {
        self.script()
            .late_failures
            .insert(sql.to_string(), (after + 1, message.to_string()));
    }

    pub fn fail_begin(&self, message: &str) {
        self.script().begin_failure = Some(message.to_string());
    }

    pub fn fail_commit(&self, message: &str) {
        self.script().commit_failure = Some(message.to_string());
    }

    /// Every statement received, across all sessions
    pub fn executed(&self) -> Vec<String> {
        self.script().executed.clone()
    }

    /// Statements made durable by a commit
    pub fn committed(&self) -> Vec<String> {
        self.script().committed.clone()
    }

    pub fn sessions(&self) -> usize {
        self.script().sessions
    }

    pub fn commits(&self) -> usize {
        self.script().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.script().rollbacks
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        lock(&self.script)
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ConnectionProvider for ScriptedProvider {
    async fn begin(&self) -> DbResult<Box<dyn SqlSession>> {
        let mut script = self.script();
        if let Some(message) = &script.begin_failure {
            return Err(DbError::Connect(message.clone()));
        }
        script.sessions += 1;

        Ok(Box::new(ScriptedSession {
            number: script.sessions,
            script: Arc::clone(&self.script),
            pending: Vec::new(),
            finished: false,
        }))
    }
}

struct ScriptedSession {
    number: usize,
    script: Arc<Mutex<Script>>,
    pending: Vec<String>,
    finished: bool,
}

#[async_trait]
impl SqlSession for ScriptedSession {
    async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        let mut script = lock(&self.script);
        script.executed.push(sql.to_string());

        if let Some(message) = script.failures.get(sql) {
            return Err(DbError::Execute(message.clone()));
        }
        if let Some((from, message)) = script.late_failures.get(sql) {
            if self.number >= *from {
                return Err(DbError::Execute(message.clone()));
            }
        }
        if sql.is_empty() {
            return Err(DbError::Execute("empty statement".into()));
        }

        let rows = script.rows.get(sql).copied().unwrap_or(script.default_rows);
        self.pending.push(sql.to_string());
        Ok(rows)
    }

    async fn commit(mut self: Box<Self>) -> DbResult<()> {
        self.finished = true;
        let pending = std::mem::take(&mut self.pending);

        let mut script = lock(&self.script);
        if let Some(message) = &script.commit_failure {
            return Err(DbError::Commit(message.clone()));
        }
        script.committed.extend(pending);
        script.commits += 1;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> DbResult<()> {
        self.finished = true;
        lock(&self.script).rollbacks += 1;
        Ok(())
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        if !self.finished {
            lock(&self.script).rollbacks += 1;
        }
    }
}

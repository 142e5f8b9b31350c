/// End-to-end batch tests against SQLite
///
/// Every test gets its own database file and batch directory.
/// Run with: cargo test --test sqlite_batch_tests

use sqlbatch::{
    AnyConnectionProvider, ConnectionConfig, ExecutionMode, PrefixState, RunConfig, RunSummary,
    Runner,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
    provider: AnyConnectionProvider,
}

impl Env {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("batches")).unwrap();

        let url = format!("sqlite://{}?mode=rwc", dir.path().join("db.sqlite").display());
        let provider = AnyConnectionProvider::connect(&ConnectionConfig::new(&url))
            .await
            .unwrap();

        sqlx::raw_sql("CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance INTEGER NOT NULL)")
            .execute(provider.pool())
            .await
            .unwrap();

        Self { dir, provider }
    }

    fn batches(&self) -> PathBuf {
        self.dir.path().join("batches")
    }

    fn ledger_path(&self) -> PathBuf {
        self.dir.path().join("ImportErrors.txt")
    }

    fn write(&self, name: &str, contents: &str) {
        fs::write(self.batches().join(name), contents).unwrap();
    }

    fn exists(&self, name: &str) -> bool {
        self.batches().join(name).exists()
    }

    fn ledger(&self) -> String {
        fs::read_to_string(self.ledger_path()).unwrap()
    }

    fn config(&self, prefix: &str) -> RunConfig {
        RunConfig::new(self.batches())
            .prefixes([prefix])
            .ledger_path(self.ledger_path())
    }

    async fn run(&self, config: RunConfig) -> RunSummary {
        let mut runner = Runner::start(config).unwrap();
        runner.run(Arc::new(self.provider.clone())).await
    }

    async fn count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(self.provider.pool())
            .await
            .unwrap()
    }

    async fn balance(&self, id: i64) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT balance FROM accounts WHERE id = {id}"))
            .fetch_one(self.provider.pool())
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_clean_batch_end_to_end() {
    let env = Env::new().await;
    env.write(
        "acc_1.sql",
        "INSERT INTO accounts VALUES (1, 100)\nINSERT INTO accounts VALUES (2, 200)\n",
    );
    env.write("acc_2.sql", "UPDATE accounts SET balance = 150 WHERE id = 1\n");

    let summary = env.run(env.config("acc")).await;

    assert!(summary.is_success());
    assert_eq!(summary.prefixes[0].state, PrefixState::CleanCommit);
    assert_eq!(env.count().await, 2);
    assert_eq!(env.balance(1).await, 150);

    assert!(env.exists("acc_1.sql.done"));
    assert!(env.exists("acc_2.sql.done"));

    let ledger = env.ledger();
    assert_eq!(ledger.matches("No errors").count(), 2);
    assert!(!ledger.contains("statement modified"));
    assert!(!ledger.contains("lines modified out of"));
}

#[tokio::test]
async fn test_second_run_finds_nothing() {
    let env = Env::new().await;
    env.write("acc_1.sql", "INSERT INTO accounts VALUES (1, 100)\n");

    assert!(env.run(env.config("acc")).await.is_success());
    let summary = env.run(env.config("acc")).await;

    assert!(summary.is_success());
    assert!(summary.prefixes[0].simulation.files.is_empty());
    assert_eq!(env.count().await, 1);
}

#[tokio::test]
async fn test_simulation_leaves_database_untouched() {
    let env = Env::new().await;
    sqlx::raw_sql("INSERT INTO accounts VALUES (1, 100)")
        .execute(env.provider.pool())
        .await
        .unwrap();

    env.write(
        "acc_1.sql",
        "INSERT INTO accounts VALUES (2, 200)\nUPDATE accounts SET balance = 0 WHERE id = 1\n",
    );

    let summary = env
        .run(env.config("acc").mode(ExecutionMode::SimulateOnly))
        .await;

    assert_eq!(summary.prefixes[0].state, PrefixState::CleanSimulation);
    assert_eq!(env.count().await, 1);
    assert_eq!(env.balance(1).await, 100);
    assert!(env.exists("acc_1.sql"));
}

#[tokio::test]
async fn test_dirty_simulation_leaves_database_untouched() {
    let env = Env::new().await;
    env.write(
        "acc_1.sql",
        "INSERT INTO accounts VALUES (1, 100)\nUPDATE accounts SET balance = 5 WHERE id = 42\n",
    );

    let summary = env.run(env.config("acc")).await;

    assert_eq!(summary.prefixes[0].state, PrefixState::DirtySimulation);
    assert_eq!(env.count().await, 0);
    assert!(env.exists("acc_1.sql"));
    assert!(!env.exists("acc_1.sql.done"));
    assert!(env.ledger().contains(
        "acc_1.sql line 2 statement modified no records:\nUPDATE accounts SET balance = 5 WHERE id = 42\n"
    ));
}

#[tokio::test]
async fn test_files_run_in_natural_order() {
    let env = Env::new().await;
    // Each update only matches if the previous file already ran
    env.write("b_1.sql", "INSERT INTO accounts VALUES (1, 1)\n");
    env.write("b_2.sql", "UPDATE accounts SET balance = 2 WHERE id = 1 AND balance = 1\n");
    env.write("b_10.sql", "UPDATE accounts SET balance = 10 WHERE id = 1 AND balance = 2\n");

    let summary = env.run(env.config("b")).await;

    assert!(summary.is_success());
    let names: Vec<&str> = summary.prefixes[0]
        .simulation
        .files
        .iter()
        .map(|f| f.file_name.as_str())
        .collect();
    assert_eq!(names, vec!["b_1.sql", "b_2.sql", "b_10.sql"]);
    assert_eq!(env.balance(1).await, 10);
}

#[tokio::test]
async fn test_failing_statement_does_not_stop_the_file() {
    let env = Env::new().await;
    env.write(
        "acc_1.sql",
        "INSERT INTO accounts VALUES (1, 100)\nINSERT INTO no_such_table VALUES (1)\nINSERT INTO accounts VALUES (3, 300)\n",
    );

    let summary = env.run(env.config("acc")).await;

    let report = &summary.prefixes[0].simulation;
    assert_eq!(summary.prefixes[0].state, PrefixState::DirtySimulation);
    assert_eq!(report.files[0].lines_read, 3);
    // Statement 3 still ran
    assert_eq!(report.files[0].lines_modified, 2);
    assert_eq!(env.count().await, 0);

    let ledger = env.ledger();
    assert!(ledger.contains("acc_1.sql line 2\nINSERT INTO no_such_table VALUES (1)\n"));
    assert_eq!(ledger.matches("acc_1.sql line").count(), 1);
}

#[tokio::test]
async fn test_multi_row_update_is_logged() {
    let env = Env::new().await;
    sqlx::raw_sql("INSERT INTO accounts VALUES (1, 1); INSERT INTO accounts VALUES (2, 1)")
        .execute(env.provider.pool())
        .await
        .unwrap();
    env.write("acc_1.sql", "UPDATE accounts SET balance = 0\n");

    let summary = env.run(env.config("acc")).await;

    assert_eq!(summary.prefixes[0].state, PrefixState::DirtySimulation);
    let ledger = env.ledger();
    assert!(ledger.contains("acc_1.sql line 1 statement modified 2 records:\nUPDATE accounts SET balance = 0\n"));
    assert!(ledger.contains("acc_1.sql: 2 lines modified out of 1 lines read."));
    assert_eq!(env.balance(1).await, 1);
}

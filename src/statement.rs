use crate::core::{Result, RunError, Statement};
use std::path::Path;

/// Read a batch file as one statement per physical line
///
/// Lines are trimmed but never skipped: a blank line is still handed to the
/// database and reported like any other statement.
pub async fn read_statements(path: &Path) -> Result<Vec<Statement>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| RunError::io(path, err))?;

    Ok(split_statements(&contents))
}

pub fn split_statements(contents: &str) -> Vec<Statement> {
    contents
        .lines()
        .enumerate()
        .map(|(i, line)| Statement::new(i + 1, line.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_keeps_line_numbers() {
        let statements = split_statements("  INSERT INTO t VALUES (1);\r\n\nUPDATE t SET a = 2\t\n");

        assert_eq!(
            statements,
            vec![
                Statement::new(1, "INSERT INTO t VALUES (1);"),
                Statement::new(2, ""),
                Statement::new(3, "UPDATE t SET a = 2"),
            ]
        );
    }

    #[test]
    fn test_empty_file_has_no_statements() {
        assert!(split_statements("").is_empty());
    }

    #[tokio::test]
    async fn test_read_statements_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p_1.sql");
        std::fs::write(&path, "DELETE FROM t WHERE id = 1\nDELETE FROM t WHERE id = 2").unwrap();

        let statements = read_statements(&path).await.unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].line, 2);
        assert_eq!(statements[1].text, "DELETE FROM t WHERE id = 2");
    }

    #[tokio::test]
    async fn test_unreadable_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = read_statements(&dir.path().join("missing.sql")).await;
        assert!(matches!(result, Err(RunError::Io { .. })));
    }
}

// ============================================================================
// FileSet Resolver
// ============================================================================
//
// Walks a directory tree top-down and selects the batch files of a prefix.
// Within each directory the files come first, in case-insensitive natural
// order (`x_2.sql` before `x_10.sql`), followed by the subdirectories.
//
// ============================================================================

use crate::core::{BatchFile, Result, RunError};
use std::cmp::Ordering;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Resolve every batch file for `prefix` below `root`, in execution order
pub fn resolve(root: &Path, prefix: &str) -> Result<Vec<BatchFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by(walk_order) {
        let entry = entry.map_err(|err| RunError::Walk {
            path: err.path().unwrap_or(root).to_path_buf(),
            message: err.to_string(),
        })?;

        if !is_file(&entry) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if BatchFile::matches(&file_name, prefix) {
            files.push(BatchFile::new(entry.path()));
        }
    }

    Ok(files)
}

fn is_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

/// Files before directories, each group in natural order ignoring case
fn walk_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();

    a_dir.cmp(&b_dir).then_with(|| {
        natord::compare_ignore_case(
            &a.file_name().to_string_lossy(),
            &b.file_name().to_string_lossy(),
        )
    })
}

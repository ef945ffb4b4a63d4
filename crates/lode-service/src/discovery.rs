//! Bulk discovery of managed files.
//!
//! Walks the working directory once at startup and classifies every file
//! against the configured pattern sets. The walk itself is synchronous and
//! runs on the blocking pool.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use lode_graph::Role;

use crate::config::PatternSets;
use crate::error::{Result, ServiceError};

/// Find every file under `cwd` matching a configured pattern set.
///
/// Results are sorted by path so initial population order is deterministic.
pub async fn discover(cwd: &Path, patterns: &PatternSets) -> Result<Vec<(PathBuf, Role)>> {
    let cwd = cwd.to_path_buf();
    let patterns = patterns.clone();

    tokio::task::spawn_blocking(move || walk(&cwd, &patterns))
        .await
        .map_err(|err| ServiceError::Io(std::io::Error::other(err)))?
}

fn walk(cwd: &Path, patterns: &PatternSets) -> Result<Vec<(PathBuf, Role)>> {
    let mut found = Vec::new();
    for entry in WalkBuilder::new(cwd).standard_filters(false).hidden(true).build() {
        let entry = entry.map_err(ServiceError::Walk)?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if let Some(role) = patterns.classify(entry.path()) {
            found.push((entry.path().to_path_buf(), role));
        }
    }
    found.sort();
    tracing::debug!(files = found.len(), cwd = %cwd.display(), "discovery finished");
    Ok(found)
}

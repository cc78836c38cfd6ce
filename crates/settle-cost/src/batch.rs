//! Concurrent reading of an upload batch.
//!
//! All files are read before any pipeline stage runs. One unreadable file
//! rejects the whole batch so a partially applied upload is never observed.

use crate::error::{CostError, Result};
use crate::parser::decode_contents;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A decoded upload file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name as shown to the user
    pub name: String,
    /// UTF-8 text, BOM removed
    pub contents: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_one(path: PathBuf) -> Result<SourceFile> {
    let name = display_name(&path);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| CostError::unreadable(&name, e.to_string()))?;
    let contents = decode_contents(&name, bytes)?;
    debug!(file = %name, bytes = contents.len(), "Read batch file");
    Ok(SourceFile { name, contents })
}

/// Read every file concurrently, returning them in selection order.
pub async fn read_batch(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let results = join_all(paths.iter().cloned().map(read_one)).await;

    let mut files = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!(error = %e, "Rejecting batch");
                return Err(e);
            }
        }
    }

    Ok(files)
}

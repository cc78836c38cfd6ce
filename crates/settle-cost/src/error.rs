//! Error types for the cost engine.

use thiserror::Error;

/// Cost engine errors.
///
/// Per-row problems (bad cost cells, odd dates) never show up here: the
/// normalizer absorbs them. These variants are batch-level or rate-level
/// failures that the caller reports to the user.
#[derive(Error, Debug)]
pub enum CostError {
    /// IO error (file reading, export writing)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A whole file could not be read or decoded
    #[error("cannot read {file}: {reason}")]
    UnreadableFile {
        /// File name as selected by the user
        file: String,
        /// Human-readable reason
        reason: String,
    },

    /// Exchange rate rejected before conversion
    #[error("invalid exchange rate: {0}")]
    InvalidExchangeRate(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Export could not be produced
    #[error("export error: {0}")]
    Export(String),
}

impl CostError {
    /// Create an unreadable-file error.
    pub fn unreadable(file: impl Into<String>, reason: impl Into<String>) -> Self {
        CostError::UnreadableFile {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error rejected a batch as a whole.
    pub fn is_batch_failure(&self) -> bool {
        matches!(self, CostError::UnreadableFile { .. } | CostError::Csv(_))
    }

    /// Create a user-friendly message for this error.
    pub fn friendly_message(&self) -> String {
        match self {
            CostError::UnreadableFile { file, reason } => {
                format!("{} could not be read ({}). No files from this upload were applied.", file, reason)
            }
            CostError::InvalidExchangeRate(value) => {
                format!("Exchange rate {} is not usable. Enter a positive number such as 1320.50.", value)
            }
            CostError::Io(e) => {
                let msg = e.to_string().to_lowercase();
                if msg.contains("permission") {
                    "Permission denied. Check file permissions.".to_string()
                } else if msg.contains("not found") {
                    "File or directory not found.".to_string()
                } else {
                    format!("File system error: {}", e)
                }
            }
            _ => format!("Error: {}", self),
        }
    }
}

/// Result type for cost engine operations.
pub type Result<T> = std::result::Result<T, CostError>;

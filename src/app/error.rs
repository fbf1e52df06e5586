use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop an analysis run or one of its exports.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The domain input was blank after trimming.
    #[error("no domain or URL entered")]
    EmptyInput,

    /// The server answered, but not with 200.
    #[error("failed to fetch {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// DNS, connect, TLS or body read failure.
    #[error("failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("chart rendering failed: {0}")]
    Render(String),

    /// A saved report could not be turned back into metrics.
    #[error("invalid report {path}: {reason}")]
    Report { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    /// True when the page itself could not be retrieved.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AnalysisError::HttpStatus { .. } | AnalysisError::Transport { .. }
        )
    }
}

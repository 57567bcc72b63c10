use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single extractor invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("blocked by remote (HTTP {0})")]
    Blocked(u16),
    #[error("{0}")]
    Failed(String),
    /// The worker task panicked or was cancelled before settling.
    #[error("worker aborted: {0}")]
    Aborted(String),
}

/// Errors surfaced by the pipeline stores, sources and dispatcher.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("work source for '{category}' is unavailable: {reason}")]
    SourceUnavailable { category: String, reason: String },
    #[error("chunk starting at {start_index} of '{category}' failed ({failed} item(s)): {reason}")]
    ChunkFailed {
        category: String,
        start_index: usize,
        failed: usize,
        reason: ExtractionError,
    },
    #[error("store I/O error on {}: {source}", path.display())]
    StoreIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed store file {}: {source}", path.display())]
    StoreFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub(crate) fn store_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::StoreIo {
            path: path.into(),
            source,
        }
    }

    /// Store failures risk desynchronising progress from results.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            PipelineError::StoreIo { .. } | PipelineError::StoreFormat { .. }
        )
    }
}

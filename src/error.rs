//! Failure taxonomy for the fetch-filter-persist pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("download failed with HTTP status {status}: {message}")]
    DownloadFailed { status: u16, message: String },

    #[error("invalid feed URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("downloaded file is not a valid ZIP archive: {0}")]
    InvalidArchive(String),

    #[error("member {0:?} not found in archive")]
    MemberNotFound(String),

    #[error("malformed CSV table: {0}")]
    MalformedTable(String),

    #[error("no stop times to save in {}", .0.display())]
    NothingToPersist(PathBuf),

    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Process exit status for this failure.
    ///
    /// Unclassified faults share status 1 with download failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::DownloadFailed { .. } => 1,
            PipelineError::MemberNotFound(_) => 2,
            PipelineError::InvalidArchive(_) => 3,
            PipelineError::WriteFailed { .. } => 4,
            PipelineError::NothingToPersist(_) => 5,
            PipelineError::InvalidUrl { .. }
            | PipelineError::Transport(_)
            | PipelineError::MalformedTable(_)
            | PipelineError::ReadFailed { .. } => 1,
        }
    }
}

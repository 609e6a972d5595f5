//! Error types for the extractor and the two background tasks

use thiserror::Error;

/// Failures talking to yt-dlp
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("yt-dlp not found. Please install yt-dlp or pass --yt-dlp <PATH>")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

/// What the user sees when a task ends badly
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Detail is logged, not shown
    #[error("Analysis failed: check the URL.")]
    Analysis,

    #[error("Error during download: {0}")]
    Download(String),
}

// Error types for the extraction backend

use thiserror::Error;

use super::diagnostics::{diagnose_error, last_error_line, FailureReason};

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// yt-dlp (or ffmpeg behind it) is not installed / not resolvable
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Search query cannot be empty.")]
    EmptyQuery,

    /// The tool ran but reported a failure
    #[error("{message}")]
    Failed {
        message: String,
        reason: Option<FailureReason>,
    },

    /// The tool succeeded but printed no direct stream URL
    #[error("No playable stream URL was returned for {0}")]
    NoStreamUrl(String),

    /// Interrupted by the user; the process was stopped and reaped
    #[error("Cancelled by user")]
    Cancelled,

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    /// Spawning or talking to the process failed
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

impl DownloadError {
    /// Build a failure from raw yt-dlp stderr, keeping only the line a user
    /// needs to see.
    pub fn from_stderr(stderr: &str) -> Self {
        let message = last_error_line(stderr)
            .unwrap_or("yt-dlp exited with an error")
            .to_string();
        Self::Failed {
            message,
            reason: diagnose_error(stderr),
        }
    }

    /// One-line suggestion for the user, if the failure was recognised.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ToolNotFound(_) => {
                Some("Install yt-dlp and ffmpeg and make sure they are on your PATH.")
            }
            Self::Timeout { .. } => FailureReason::NetworkTimeout.hint(),
            Self::Failed {
                reason: Some(reason),
                ..
            } => reason.hint(),
            _ => None,
        }
    }
}

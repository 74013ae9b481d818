// Playback: supervising the external player process

pub mod session;
pub mod supervisor;

use async_trait::async_trait;
use thiserror::Error;

pub use session::{PlaybackOutcome, PlaybackSession, SessionState};
pub use supervisor::{PlaybackSupervisor, PlayerCommand, DEFAULT_GRACE_PERIOD};

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The player binary is not installed / not on PATH
    #[error("Player not found: {0}. Please make sure it is installed and on your PATH.")]
    ExecutableNotFound(String),

    #[error("Failed to start {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on or signalling the player failed; it was killed and reaped
    #[error("Unexpected error while supervising the player: {0}")]
    Supervision(#[source] std::io::Error),

    #[error("No stream URL to play")]
    EmptyLocator,
}

/// Something that can play a resolved stream to completion
#[async_trait]
pub trait Playback: Send + Sync {
    async fn play(&self, locator: &str, title: &str) -> Result<PlaybackOutcome, PlaybackError>;
}

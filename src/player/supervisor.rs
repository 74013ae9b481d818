use async_trait::async_trait;
use std::future::Future;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::session::{PlaybackOutcome, PlaybackSession, SessionState};
use super::{Playback, PlaybackError};

/// mpv flags for headless audio playback
pub const DEFAULT_PLAYER_ARGS: [&str; 4] = [
    "--no-video",
    "--force-window=no",
    "--no-input-terminal",
    "--really-quiet",
];

/// How long a player gets to exit after a termination request
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Player executable plus the flags placed before the title and URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub grace_period: Duration,
}

impl PlayerCommand {
    pub fn mpv(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: DEFAULT_PLAYER_ARGS.iter().map(|s| s.to_string()).collect(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

impl Default for PlayerCommand {
    fn default() -> Self {
        Self::mpv("mpv")
    }
}

fn title_arg(title: &str) -> String {
    format!("--force-media-title={}", title.replace('"', ""))
}

/// Runs one player process at a time and owns it until it is reaped.
pub struct PlaybackSupervisor {
    player: PlayerCommand,
}

impl PlaybackSupervisor {
    pub fn new(player: PlayerCommand) -> Self {
        Self { player }
    }

    /// Play `stream_url` and block until the player is gone; Ctrl+C (or the
    /// terminal hanging up) stops it.
    pub async fn start(
        &self,
        stream_url: &str,
        title: &str,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        self.start_with_cancel(stream_url, title, interrupted()).await
    }

    /// Same as [`start`](Self::start) with the interruption source supplied by
    /// the caller. `cancel` is awaited at most once.
    pub async fn start_with_cancel<C>(
        &self,
        stream_url: &str,
        title: &str,
        cancel: C,
    ) -> Result<PlaybackOutcome, PlaybackError>
    where
        C: Future<Output = ()>,
    {
        if stream_url.trim().is_empty() {
            return Err(PlaybackError::EmptyLocator);
        }

        let mut session = self.spawn(stream_url, title)?;
        tracing::info!(
            "[Supervisor] playing '{}' with {} (pid {:?})",
            session.title(),
            self.player.program,
            session.pid()
        );
        tracing::debug!("[Supervisor] stream: {}", session.target_url());

        tokio::pin!(cancel);
        let waited = tokio::select! {
            status = session.wait() => Some(status),
            _ = &mut cancel => None,
        };

        match waited {
            Some(Ok(status)) => {
                session.transition(SessionState::ExitedNormally {
                    code: status.code(),
                });
                tracing::info!("[Supervisor] player exited: {}", status);
                Ok(session.finish(false))
            }
            Some(Err(e)) => {
                session.abort().await;
                Err(PlaybackError::Supervision(e))
            }
            None => self.shutdown(session).await,
        }
    }

    fn spawn(&self, stream_url: &str, title: &str) -> Result<PlaybackSession, PlaybackError> {
        let mut cmd = Command::new(&self.player.program);
        cmd.args(&self.player.args)
            .arg(title_arg(title))
            .arg(stream_url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // Own process group: the terminal's Ctrl+C reaches us, not the player
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                PlaybackError::ExecutableNotFound(self.player.program.clone())
            } else {
                PlaybackError::SpawnFailed {
                    program: self.player.program.clone(),
                    source: e,
                }
            }
        })?;

        Ok(PlaybackSession::new(stream_url, title, child))
    }

    /// Two-phase stop after an interruption: terminate, wait up to the grace
    /// period, then kill. The process is reaped on every path.
    async fn shutdown(
        &self,
        mut session: PlaybackSession,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        match session.try_reap() {
            Ok(Some(status)) => {
                tracing::info!("[Supervisor] player had already stopped: {}", status);
                session.transition(SessionState::ExitedNormally {
                    code: status.code(),
                });
                return Ok(session.finish(true));
            }
            Ok(None) => {}
            Err(e) => {
                session.abort().await;
                return Err(PlaybackError::Supervision(e));
            }
        }

        tracing::info!("[Supervisor] stopping player (pid {:?})", session.pid());
        if let Err(e) = session.request_termination() {
            session.abort().await;
            return Err(PlaybackError::Supervision(e));
        }

        match tokio::time::timeout(self.player.grace_period, session.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!("[Supervisor] player terminated gracefully: {}", status);
                session.transition(SessionState::Terminated);
                Ok(session.finish(true))
            }
            Ok(Err(e)) => {
                session.abort().await;
                Err(PlaybackError::Supervision(e))
            }
            Err(_) => {
                tracing::warn!(
                    "[Supervisor] player ignored termination for {:?}, killing",
                    self.player.grace_period
                );
                if let Err(e) = session.kill().await {
                    session.abort().await;
                    return Err(PlaybackError::Supervision(e));
                }
                session.transition(SessionState::Killed);
                Ok(session.finish(true))
            }
        }
    }
}

/// Resolves on the first Ctrl+C; never resolves if the handler can't be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("[Supervisor] cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Ctrl+C, or SIGHUP on unix. The player sits in its own process group, so
/// a closed terminal only reaches it through us.
async fn interrupted() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::hangup()) {
            Ok(mut hangup) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = hangup.recv() => {
                        tracing::warn!("[Supervisor] terminal hung up, stopping player");
                    }
                }
                return;
            }
            Err(e) => tracing::warn!("[Supervisor] cannot listen for SIGHUP: {}", e),
        }
    }
    ctrl_c().await
}

#[async_trait]
impl Playback for PlaybackSupervisor {
    async fn play(&self, locator: &str, title: &str) -> Result<PlaybackOutcome, PlaybackError> {
        self.start(locator, title).await
    }
}

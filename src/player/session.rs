// Playback session: one spawned player process and where it is in its shutdown

use std::io;
use std::process::ExitStatus;
use tokio::process::Child;

/// Lifecycle of a player process.
///
/// `Running -> ExitedNormally` on its own, or
/// `Running -> TerminationRequested -> (Terminated | Killed)` after an
/// interruption. `Running -> Killed` only when supervision itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    TerminationRequested,
    /// Exited without us asking it to stop; `code` is `None` when it died by a signal
    ExitedNormally { code: Option<i32> },
    /// Exited within the grace period after a termination request
    Terminated,
    /// Forcefully killed and reaped
    Killed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ExitedNormally { .. } | Self::Terminated | Self::Killed
        )
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (self, next) {
            (Self::Running, Self::TerminationRequested) => true,
            (Self::Running, Self::ExitedNormally { .. }) => true,
            (Self::Running, Self::Killed) => true,
            (Self::TerminationRequested, Self::Terminated) => true,
            (Self::TerminationRequested, Self::Killed) => true,
            _ => false,
        }
    }
}

/// What `start` reports once the player is gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackOutcome {
    pub pid: Option<u32>,
    /// Always a terminal state
    pub state: SessionState,
    /// The user interrupted playback
    pub interrupted: bool,
    /// Every state the session passed through, in order
    pub history: Vec<SessionState>,
}

impl PlaybackOutcome {
    /// Exit code worth warning about: non-zero and not caused by an interruption
    pub fn abnormal_exit_code(&self) -> Option<i32> {
        match self.state {
            SessionState::ExitedNormally { code: Some(code) } if code != 0 && !self.interrupted => {
                Some(code)
            }
            _ => None,
        }
    }
}

/// Owns the child process until it has been reaped
pub struct PlaybackSession {
    target_url: String,
    title: String,
    child: Child,
    pid: Option<u32>,
    state: SessionState,
    history: Vec<SessionState>,
}

impl PlaybackSession {
    pub fn new(target_url: &str, title: &str, child: Child) -> Self {
        let pid = child.id();
        Self {
            target_url: target_url.to_string(),
            title: title.to_string(),
            child,
            pid,
            state: SessionState::Running,
            history: vec![SessionState::Running],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid session transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!("[Session] {:?} -> {:?} (pid {:?})", self.state, next, self.pid);
        self.state = next;
        self.history.push(next);
    }

    /// Wait for the process to exit; reaps it.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Non-blocking liveness check; `Some` means it has exited and is now reaped.
    pub fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Ask the process to stop (SIGTERM on unix).
    pub fn request_termination(&mut self) -> io::Result<()> {
        self.transition(SessionState::TerminationRequested);
        self.send_terminate()
    }

    #[cfg(unix)]
    fn send_terminate(&mut self) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.pid else {
            // Already reaped by tokio
            return Ok(());
        };
        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }

    #[cfg(not(unix))]
    fn send_terminate(&mut self) -> io::Result<()> {
        // No cooperative stop signal here; the grace wait still applies
        self.child.start_kill()
    }

    /// Kill and reap.
    pub async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }

    /// Last-resort cleanup after a supervision fault: kill, reap, mark killed.
    pub async fn abort(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!("[Session] failed to kill player (pid {:?}): {}", self.pid, e);
        }
        if !self.state.is_terminal() {
            self.transition(SessionState::Killed);
        }
    }

    pub fn finish(self, interrupted: bool) -> PlaybackOutcome {
        debug_assert!(self.state.is_terminal());
        PlaybackOutcome {
            pid: self.pid,
            state: self.state,
            interrupted,
            history: self.history,
        }
    }
}

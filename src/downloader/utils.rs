// Helper functions for backend implementations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::DownloadError;

/// Longest sanitized title used in file names
pub const MAX_FILE_TITLE_CHARS: usize = 100;

/// Run command with timeout; the child is killed and reaped if the timeout hits.
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stdout from {}", program))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stderr from {}", program))
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res.map_err(|e| {
                DownloadError::ExecutionError(format!("Failed to wait for {}: {}", program, e))
            })?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            tracing::warn!("[Process] {} timed out after {}s, killing", program, timeout_secs);
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout {
                program: program.to_string(),
                secs: timeout_secs,
            })
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::ExecutionError(format!("{} task failed: {}", name, e)))?
        .map_err(|e| DownloadError::ExecutionError(format!("Failed to read {}: {}", name, e)))
}

/// Map a spawn failure, keeping "not installed" apart from everything else
pub fn spawn_error(program: &str, err: std::io::Error) -> DownloadError {
    if err.kind() == ErrorKind::NotFound {
        DownloadError::ToolNotFound(program.to_string())
    } else {
        DownloadError::ExecutionError(format!("Failed to start {}: {}", program, err))
    }
}

/// File-name-safe version of a title: alphanumerics and ` .-_()` survive,
/// everything else becomes `_`; capped at [`MAX_FILE_TITLE_CHARS`].
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || " .-_()".contains(c) {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_TITLE_CHARS)
        .collect()
}

/// Base file name (no extension) for a downloaded item
pub fn file_base_name(title: &str, id: Option<&str>) -> String {
    let safe_title = sanitize_title(title);
    match id {
        Some(id) if !id.is_empty() => format!("{}_{}", safe_title, sanitize_title(id)),
        _ => safe_title,
    }
}

pub fn is_url(query: &str) -> bool {
    let q = query.trim().to_lowercase();
    q.starts_with("http://") || q.starts_with("https://")
}

pub fn is_watch_url(url: &str) -> bool {
    url.contains("watch?v=")
}

pub fn canonical_watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Shorten a title for one-line display, marking the cut with "..."
pub fn truncate_for_display(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let mut short: String = title.chars().take(max_chars).collect();
    short.push_str("...");
    short
}

/// Expand a leading `~` to the home directory
pub fn expand_home(input: &str) -> PathBuf {
    let trimmed = input.trim();
    if trimmed == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}

/// First file in `dir` whose name is `<base>.<anything>`
pub fn find_output_file(dir: &Path, base: &str) -> Option<PathBuf> {
    let prefix = format!("{}.", base);
    let entries = std::fs::read_dir(dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(&prefix) && !n.ends_with(".part"))
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

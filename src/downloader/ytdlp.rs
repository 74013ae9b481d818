use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::errors::DownloadError;
use super::models::{DownloadPhase, DownloadProgress, DownloadReport, MediaKind, MediaRef};
use super::progress::{LineEvent, ProgressParser, PROGRESS_TEMPLATE, SAVED_TEMPLATE};
use super::traits::{MediaBackend, ProgressSink};
use super::utils::{
    canonical_watch_url, file_base_name, find_output_file, is_url, is_watch_url,
    run_output_with_timeout, spawn_error,
};

/// One line of `--flat-playlist --dump-json` output
#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

/// Extraction backend driving the `yt-dlp` binary
pub struct YtDlpBackend {
    ytdlp_bin: String,
    timeout_secs: u64,
}

impl YtDlpBackend {
    pub fn new(ytdlp_bin: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            ytdlp_bin: ytdlp_bin.into(),
            timeout_secs,
        }
    }

    fn search_args(query: &str, limit: usize) -> Vec<String> {
        let target = if is_url(query) {
            query.trim().to_string()
        } else {
            format!("ytsearch{}:{}", limit, query.trim())
        };
        vec![
            "--flat-playlist".to_string(),
            "--dump-json".to_string(),
            "--no-warnings".to_string(),
            "--playlist-end".to_string(),
            limit.to_string(),
            target,
        ]
    }

    fn resolve_args(url: &str) -> Vec<String> {
        vec![
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--get-url".to_string(),
            url.to_string(),
        ]
    }

    fn download_args(media: &MediaRef, kind: MediaKind, dir: &Path, base: &str) -> Vec<String> {
        let mut args = kind.format_args();
        args.extend([
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--print".to_string(),
            SAVED_TEMPLATE.to_string(),
            "-P".to_string(),
            dir.to_string_lossy().to_string(),
            "-o".to_string(),
            format!("{}.%(ext)s", base),
            media.url.clone(),
        ]);
        args
    }
}

/// Parse one JSON line of search output; entries without title or id are skipped.
fn parse_search_line(line: &str) -> Option<MediaRef> {
    let entry: SearchEntry = match serde_json::from_str(line) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::debug!("[YtDlp] skipping unparsable search line: {}", e);
            return None;
        }
    };

    let title = entry.title.filter(|t| !t.is_empty())?;
    let id = entry.id.filter(|i| !i.is_empty())?;

    // Flat entries repeat `url` in `webpage_url`; only a watch URL is kept as is
    let url = [entry.url, entry.webpage_url]
        .into_iter()
        .flatten()
        .find(|u| is_watch_url(u))
        .unwrap_or_else(|| canonical_watch_url(&id));

    Some(MediaRef::new(title, url, Some(id)))
}

pub(crate) fn parse_search_output(stdout: &str, limit: usize) -> Vec<MediaRef> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(parse_search_line)
        .take(limit)
        .collect()
}

async fn forward_lines<R>(reader: R, is_stderr: bool, tx: mpsc::UnboundedSender<(bool, String)>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send((is_stderr, line)).is_err() {
            break;
        }
    }
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MediaRef>, DownloadError> {
        if query.trim().is_empty() {
            return Err(DownloadError::EmptyQuery);
        }

        let args = Self::search_args(query, limit);
        tracing::info!("[YtDlp] search: {} {}", self.ytdlp_bin, args.join(" "));
        let output = run_output_with_timeout(&self.ytdlp_bin, args, self.timeout_secs).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // A partial listing is still a valid answer
            let partial = parse_search_output(&stdout, limit);
            if partial.is_empty() {
                return Err(DownloadError::from_stderr(&stderr));
            }
            tracing::warn!("[YtDlp] search exited with {}, keeping {} results", output.status, partial.len());
            return Ok(partial);
        }

        let results = parse_search_output(&stdout, limit);
        tracing::info!("[YtDlp] search returned {} results", results.len());
        Ok(results)
    }

    async fn resolve_stream(&self, url: &str) -> Result<String, DownloadError> {
        let output =
            run_output_with_timeout(&self.ytdlp_bin, Self::resolve_args(url), self.timeout_secs)
                .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::from_stderr(&stderr));
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DownloadError::NoStreamUrl(url.to_string()))
    }

    async fn download(
        &self,
        media: &MediaRef,
        kind: MediaKind,
        dir: &Path,
        progress: &mut (dyn ProgressSink + Send),
    ) -> Result<DownloadReport, DownloadError> {
        let base = file_base_name(&media.title, media.id.as_deref());
        let args = Self::download_args(media, kind, dir, &base);
        tracing::info!("[YtDlp] download {} as {} into {}", media.url, kind, dir.display());

        let mut parser = ProgressParser::new();
        progress.emit(parser.current());

        let mut child = Command::new(&self.ytdlp_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.ytdlp_bin, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stderr".to_string()))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let out_task = tokio::spawn(forward_lines(stdout, false, tx.clone()));
        let err_task = tokio::spawn(forward_lines(stderr, true, tx));

        let mut saved = None;
        let mut error_output = String::new();
        let mut interrupted = false;

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                line = rx.recv() => {
                    let Some((is_stderr, line)) = line else { break };
                    if is_stderr && !line.starts_with("[progress]") {
                        error_output.push_str(&line);
                        error_output.push('\n');
                    }
                    match parser.feed(&line) {
                        Some(LineEvent::Progress(p)) => progress.emit(&p),
                        Some(LineEvent::Saved(path)) => {
                            progress.emit(parser.current());
                            saved = Some(path);
                        }
                        None => {}
                    }
                }
                _ = &mut ctrl_c, if !interrupted => {
                    interrupted = true;
                    tracing::warn!("[YtDlp] download interrupted, stopping yt-dlp");
                    let _ = child.start_kill();
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::ExecutionError(format!("Process error: {}", e)))?;
        let _ = out_task.await;
        let _ = err_task.await;

        if interrupted {
            progress.emit(&DownloadProgress::phase(DownloadPhase::Failed));
            return Err(DownloadError::Cancelled);
        }

        if !status.success() {
            progress.emit(&DownloadProgress::phase(DownloadPhase::Failed));
            return Err(DownloadError::from_stderr(&error_output));
        }

        let file = saved
            .filter(|p| p.exists())
            .or_else(|| find_output_file(dir, &base));
        let mut done = parser.current().clone();
        done.phase = DownloadPhase::Finished;
        progress.emit(&done);

        Ok(DownloadReport {
            file,
            directory: dir.to_path_buf(),
        })
    }
}

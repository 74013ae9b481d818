// yt-dlp output parsing for live download progress

use regex::Regex;
use std::path::PathBuf;

use super::models::{DownloadPhase, DownloadProgress};

/// Passed to `--progress-template`; fields missing at runtime print as `NA`.
pub const PROGRESS_TEMPLATE: &str = "download:[progress] %(progress.status)s %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s %(progress.filename)s";

/// Passed to `--print` so the final path can be picked out of stdout.
pub const SAVED_TEMPLATE: &str = "after_move:[saved] %(filepath)s";

lazy_static::lazy_static! {
    static ref PROGRESS_RE: Regex = Regex::new(
        r"^\[progress\]\s+(\w+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(.*)$"
    ).unwrap();
    static ref SAVED_RE: Regex = Regex::new(r"^\[saved\]\s+(.+)$").unwrap();
    static ref DEST_RE: Regex = Regex::new(r"^\[download\]\s+Destination:\s+(.+)$").unwrap();
    static ref ALREADY_RE: Regex = Regex::new(r"^\[download\]\s+(.+?) has already been downloaded").unwrap();
    static ref POSTPROCESS_RE: Regex = Regex::new(
        r"^\[(ExtractAudio|Merger|VideoConvertor|EmbedThumbnail|ThumbnailsConvertor|Metadata|FixupM4a|FixupM3u8)\]"
    ).unwrap();
}

/// Something worth reacting to in a line of output
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    Progress(DownloadProgress),
    Saved(PathBuf),
}

/// Folds yt-dlp output lines into a running [`DownloadProgress`]
#[derive(Debug, Clone)]
pub struct ProgressParser {
    current: DownloadProgress,
}

impl Default for ProgressParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressParser {
    pub fn new() -> Self {
        Self {
            current: DownloadProgress::phase(DownloadPhase::Preparing),
        }
    }

    pub fn current(&self) -> &DownloadProgress {
        &self.current
    }

    pub fn feed(&mut self, line: &str) -> Option<LineEvent> {
        let line = line.trim();

        if let Some(caps) = SAVED_RE.captures(line) {
            let path = PathBuf::from(caps.get(1)?.as_str().trim());
            self.current.phase = DownloadPhase::Finished;
            if let Some(name) = file_name(&path.to_string_lossy()) {
                self.current.file_name = Some(name);
            }
            return Some(LineEvent::Saved(path));
        }

        if let Some(caps) = PROGRESS_RE.captures(line) {
            let status = caps.get(1)?.as_str();
            let downloaded = parse_bytes(caps.get(2)?.as_str());
            let total = parse_bytes(caps.get(3)?.as_str())
                .or_else(|| parse_bytes(caps.get(4).map_or("NA", |m| m.as_str())));
            if let Some(name) = caps.get(5).and_then(|m| file_name(m.as_str())) {
                self.current.file_name = Some(name);
            }

            match status {
                "downloading" => {
                    self.current.phase = DownloadPhase::Downloading;
                    self.current.downloaded_bytes = downloaded.unwrap_or(self.current.downloaded_bytes);
                    if total.is_some() {
                        self.current.total_bytes = total;
                    }
                }
                "finished" => {
                    let total = total.or(self.current.total_bytes).or(downloaded);
                    self.current.phase = DownloadPhase::Downloading;
                    self.current.total_bytes = total;
                    self.current.downloaded_bytes = total.unwrap_or(self.current.downloaded_bytes);
                }
                "error" => self.current.phase = DownloadPhase::Failed,
                _ => return None,
            }
            return Some(LineEvent::Progress(self.current.clone()));
        }

        if let Some(caps) = DEST_RE.captures(line) {
            self.current = DownloadProgress::phase(DownloadPhase::Downloading);
            self.current.file_name = caps.get(1).and_then(|m| file_name(m.as_str()));
            return Some(LineEvent::Progress(self.current.clone()));
        }

        if let Some(caps) = ALREADY_RE.captures(line) {
            self.current.phase = DownloadPhase::Finished;
            self.current.file_name = caps.get(1).and_then(|m| file_name(m.as_str()));
            return Some(LineEvent::Progress(self.current.clone()));
        }

        if let Some(caps) = POSTPROCESS_RE.captures(line) {
            let step = caps.get(1)?.as_str().to_string();
            if self.current.phase != DownloadPhase::PostProcessing(step.clone()) {
                self.current.phase = DownloadPhase::PostProcessing(step);
                return Some(LineEvent::Progress(self.current.clone()));
            }
        }

        None
    }
}

fn parse_bytes(raw: &str) -> Option<u64> {
    match raw {
        "NA" | "None" | "" => None,
        n => n.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64),
    }
}

fn file_name(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "NA" {
        return None;
    }
    let name = trimmed
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(trimmed);
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(event: Option<LineEvent>) -> DownloadProgress {
        match event {
            Some(LineEvent::Progress(p)) => p,
            other => panic!("expected progress, got {:?}", other),
        }
    }

    #[test]
    fn test_downloading_line_with_exact_total() {
        let mut parser = ProgressParser::new();
        let p = progress(parser.feed(
            "[progress] downloading 1048576 4194304 NA /music/My Song_abc.webm",
        ));
        assert_eq!(p.phase, DownloadPhase::Downloading);
        assert_eq!(p.downloaded_bytes, 1_048_576);
        assert_eq!(p.total_bytes, Some(4_194_304));
        assert_eq!(p.file_name.as_deref(), Some("My Song_abc.webm"));
        assert_eq!(p.percent(), Some(25.0));
    }

    #[test]
    fn test_estimate_used_when_total_unknown() {
        let mut parser = ProgressParser::new();
        let p = progress(parser.feed("[progress] downloading 500 NA 2000.0 f.webm"));
        assert_eq!(p.total_bytes, Some(2000));
    }

    #[test]
    fn test_finished_fills_total_from_downloaded() {
        let mut parser = ProgressParser::new();
        let p = progress(parser.feed("[progress] finished 3000 NA NA f.webm"));
        assert_eq!(p.downloaded_bytes, 3000);
        assert_eq!(p.total_bytes, Some(3000));
    }

    #[test]
    fn test_postprocessing_phase_reported_once() {
        let mut parser = ProgressParser::new();
        let p = progress(parser.feed("[ExtractAudio] Destination: /music/a_b.mp3"));
        assert_eq!(p.phase, DownloadPhase::PostProcessing("ExtractAudio".to_string()));
        assert_eq!(parser.feed("[ExtractAudio] still going"), None);
        let p = progress(parser.feed("[EmbedThumbnail] ffmpeg: Adding thumbnail to \"a_b.mp3\""));
        assert_eq!(p.phase, DownloadPhase::PostProcessing("EmbedThumbnail".to_string()));
    }

    #[test]
    fn test_saved_line() {
        let mut parser = ProgressParser::new();
        assert_eq!(
            parser.feed("[saved] /home/me/Music/Song_abc.mp3"),
            Some(LineEvent::Saved(PathBuf::from("/home/me/Music/Song_abc.mp3")))
        );
        assert_eq!(parser.current().phase, DownloadPhase::Finished);
    }

    #[test]
    fn test_destination_and_already_downloaded() {
        let mut parser = ProgressParser::new();
        let p = progress(parser.feed("[download] Destination: /tmp/x/Song_abc.webm"));
        assert_eq!(p.file_name.as_deref(), Some("Song_abc.webm"));
        let p = progress(parser.feed("[download] /tmp/x/Song_abc.mp3 has already been downloaded"));
        assert_eq!(p.phase, DownloadPhase::Finished);
    }

    #[test]
    fn test_unrelated_lines_ignored() {
        let mut parser = ProgressParser::new();
        assert_eq!(parser.feed("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parser.feed(""), None);
    }
}

// Common data models for the extraction backend

use std::fmt;
use std::path::PathBuf;

/// One searchable item: what search returns and what stream/download consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub title: String,
    /// Canonical watch URL
    pub url: String,
    pub id: Option<String>,
}

impl MediaRef {
    pub fn new(title: impl Into<String>, url: impl Into<String>, id: Option<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            id,
        }
    }
}

/// What a download should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    /// Best audio, converted to MP3
    #[default]
    Audio,
    /// Best video + best audio, converted to MP4
    Video,
}

impl MediaKind {
    /// Extension of the file yt-dlp leaves behind after post-processing
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Audio => "mp3",
            Self::Video => "mp4",
        }
    }

    /// yt-dlp arguments selecting and converting the format
    pub fn format_args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::Audio => &[
                "-f",
                "bestaudio/best",
                "-x",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "192K",
                "--embed-thumbnail",
            ],
            Self::Video => &[
                "-f",
                "bestvideo+bestaudio/best",
                "--recode-video",
                "mp4",
                "--embed-thumbnail",
            ],
        };
        args.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Where a download currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPhase {
    Preparing,
    Downloading,
    /// Post-processor name as yt-dlp prints it (ExtractAudio, Merger, ...)
    PostProcessing(String),
    Finished,
    Failed,
}

/// Download progress information
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub phase: DownloadPhase,
    pub downloaded_bytes: u64,
    /// Exact size, or yt-dlp's estimate when the exact size is unknown
    pub total_bytes: Option<u64>,
    /// File name (no directory) currently being written
    pub file_name: Option<String>,
}

impl DownloadProgress {
    pub fn phase(phase: DownloadPhase) -> Self {
        Self {
            phase,
            downloaded_bytes: 0,
            total_bytes: None,
            file_name: None,
        }
    }

    pub fn percent(&self) -> Option<f32> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.downloaded_bytes as f64 / total as f64 * 100.0).min(100.0) as f32)
            }
            _ => None,
        }
    }
}

/// Outcome of a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    /// Final file, when yt-dlp reported it or it could be found on disk
    pub file: Option<PathBuf>,
    pub directory: PathBuf,
}

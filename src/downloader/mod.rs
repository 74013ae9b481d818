// Extraction backend: search, stream resolution and downloads via yt-dlp

pub mod diagnostics;
pub mod errors;
pub mod models;
pub mod progress;
pub mod tools;
pub mod traits;
pub mod utils;
pub mod ytdlp;

pub use diagnostics::{diagnose_error, FailureReason};
pub use errors::DownloadError;
pub use models::{DownloadPhase, DownloadProgress, DownloadReport, MediaKind, MediaRef};
pub use tools::{ToolInfo, ToolManager, ToolType};
pub use traits::{MediaBackend, ProgressSink};
pub use ytdlp::YtDlpBackend;

// Backend trait definition

use async_trait::async_trait;
use std::path::Path;

use super::errors::DownloadError;
use super::models::{DownloadProgress, DownloadReport, MediaKind, MediaRef};

/// Search, stream resolution and download, as provided by an extraction tool
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Ordered results for a free-text query or a direct URL; possibly empty.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MediaRef>, DownloadError>;

    /// Direct, player-consumable locator for a canonical URL
    async fn resolve_stream(&self, url: &str) -> Result<String, DownloadError>;

    /// Download one item into `dir`, reporting progress as it goes
    async fn download(
        &self,
        media: &MediaRef,
        kind: MediaKind,
        dir: &Path,
        progress: &mut (dyn ProgressSink + Send),
    ) -> Result<DownloadReport, DownloadError>;
}

/// Receives download progress updates
pub trait ProgressSink {
    fn emit(&mut self, progress: &DownloadProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(&DownloadProgress),
{
    fn emit(&mut self, progress: &DownloadProgress) {
        self(progress)
    }
}

// Application configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::downloader::tools::{ToolManager, ToolType};
use crate::player::PlayerCommand;

pub const MAX_SEARCH_RESULTS: usize = 10;

/// Seconds a search or stream lookup may take before yt-dlp is killed
pub const COMMAND_TIMEOUT_SECS: u64 = 30;

const DOWNLOAD_SUBDIR: &str = "MusicStreamerCLI";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub search_limit: usize,
    /// Used when the user leaves the download path prompt empty
    pub download_dir: PathBuf,
    pub ytdlp_path: String,
    pub player: PlayerCommand,
    pub command_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_limit: MAX_SEARCH_RESULTS,
            download_dir: default_download_dir(),
            ytdlp_path: ToolType::YtDlp.as_str().to_string(),
            player: PlayerCommand::default(),
            command_timeout_secs: COMMAND_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Defaults with tool paths resolved from the system
    pub fn detect() -> Self {
        let tools = ToolManager::new();
        let config = Self::default()
            .with_ytdlp_path(tools.resolve(ToolType::YtDlp))
            .with_player(PlayerCommand::mpv(tools.resolve(ToolType::Mpv)));
        tracing::info!(
            "[Config] yt-dlp={} player={} downloads={}",
            config.ytdlp_path,
            config.player.program,
            config.download_dir.display()
        );
        config
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.download_dir = dir;
        self
    }

    pub fn with_ytdlp_path(mut self, path: String) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_player(mut self, player: PlayerCommand) -> Self {
        self.player = player;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.player.grace_period = grace;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.command_timeout_secs = seconds;
        self
    }

    /// Create the default download directory if needed
    pub fn ensure_download_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.download_dir)
    }
}

/// `<Downloads>/MusicStreamerCLI`, falling back to `~/Downloads` and then `.`
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DOWNLOAD_SUBDIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.search_limit, 10);
        assert_eq!(config.command_timeout_secs, 30);
        assert_eq!(config.player.grace_period, Duration::from_secs(3));
        assert!(config.download_dir.ends_with("MusicStreamerCLI"));
        assert!(config.player.args.contains(&"--no-video".to_string()));
    }

    #[test]
    fn test_builders() {
        let config = AppConfig::default()
            .with_search_limit(0)
            .with_download_dir(PathBuf::from("/tmp/x"))
            .with_grace_period(Duration::from_millis(500))
            .with_timeout(5);
        assert_eq!(config.search_limit, 1);
        assert_eq!(config.download_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.player.grace_period, Duration::from_millis(500));
        assert_eq!(config.command_timeout_secs, 5);
    }
}

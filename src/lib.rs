pub mod app;
pub mod config;
pub mod downloader;
pub mod player;
pub mod ui;

use app::App;
use config::AppConfig;
use downloader::YtDlpBackend;
use player::PlaybackSupervisor;
use ui::ConsoleTerminal;

/// Build the CLI from detected tools and run the menu loop until exit
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::detect();
    if let Err(e) = config.ensure_download_dir() {
        tracing::warn!(
            "[Main] could not create {}: {}",
            config.download_dir.display(),
            e
        );
    }

    let backend = YtDlpBackend::new(config.ytdlp_path.clone(), config.command_timeout_secs);
    let supervisor = PlaybackSupervisor::new(config.player.clone());
    let mut app = App::new(config, backend, supervisor, ConsoleTerminal::new());
    app.run().await;
    Ok(())
}

// Interactive menu loop: search, stream, download, settings

use std::path::PathBuf;

use crate::config::AppConfig;
use crate::downloader::utils::{expand_home, truncate_for_display};
use crate::downloader::{
    DownloadError, DownloadProgress, MediaBackend, MediaKind, MediaRef, ToolManager,
};
use crate::player::{Playback, PlaybackError, PlaybackOutcome, SessionState};
use crate::ui::{Input, Terminal, Tone};

const DISPLAY_TITLE_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Stream,
    Download,
    Settings,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Stream),
            "2" => Some(Self::Download),
            "3" => Some(Self::Settings),
            "0" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// How the user answered the "pick a result" prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Back,
    Pick(usize),
    Invalid,
}

/// Parse a 1-based choice among `count` results
pub fn parse_selection(input: &str, count: usize) -> Selection {
    let input = input.trim();
    if input.is_empty() {
        return Selection::Back;
    }
    match input.parse::<usize>() {
        Ok(n) if n >= 1 && n <= count => Selection::Pick(n - 1),
        _ => Selection::Invalid,
    }
}

pub fn parse_media_kind(input: &str) -> Option<MediaKind> {
    match input.trim().to_lowercase().as_str() {
        "" | "a" | "audio" => Some(MediaKind::Audio),
        "v" | "video" => Some(MediaKind::Video),
        _ => None,
    }
}

pub struct App<B, P, T> {
    config: AppConfig,
    backend: B,
    player: P,
    term: T,
}

impl<B, P, T> App<B, P, T>
where
    B: MediaBackend,
    P: Playback,
    T: Terminal,
{
    pub fn new(config: AppConfig, backend: B, player: P, term: T) -> Self {
        Self {
            config,
            backend,
            player,
            term,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run until the user picks Exit, presses Ctrl+C at the menu or closes stdin
    pub async fn run(&mut self) {
        tracing::info!("[App] starting with backend {}", self.backend.name());
        // Only once: later menus are drawn below the last flow's messages
        self.term.clear();
        while let Some(choice) = self.main_menu().await {
            match choice {
                MenuChoice::Stream => self.search_and_stream().await,
                MenuChoice::Download => self.search_and_download().await,
                MenuChoice::Settings => self.settings().await,
                MenuChoice::Exit => break,
            }
        }
        self.term.say(Tone::Heading, "Thank you for using YouTube Music CLI. Goodbye!");
    }

    async fn main_menu(&mut self) -> Option<MenuChoice> {
        self.term.say(Tone::Plain, "");
        self.term.say(Tone::Heading, "YouTube Music CLI");
        self.term.say(Tone::Plain, "  1. Search and Stream Song");
        self.term.say(Tone::Plain, "  2. Search and Download Media");
        self.term.say(Tone::Plain, "  3. Settings");
        self.term.say(Tone::Plain, "  0. Exit");
        loop {
            match self.term.prompt("Enter your choice:").await {
                Input::Line(line) => match MenuChoice::parse(&line) {
                    Some(choice) => return Some(choice),
                    None => self.term.say(Tone::Warning, "Please choose 1, 2, 3 or 0."),
                },
                Input::Interrupted | Input::Closed => return None,
            }
        }
    }

    /// `None` when the user backs out or the query is empty
    async fn ask_query(&mut self, question: &str) -> Option<String> {
        match self.term.prompt(question).await {
            Input::Line(query) if query.trim().is_empty() => {
                self.term.say(Tone::Error, "Search query cannot be empty.");
                None
            }
            Input::Line(query) => Some(query.trim().to_string()),
            Input::Interrupted | Input::Closed => {
                self.term.say(Tone::Muted, "Returning to menu...");
                None
            }
        }
    }

    async fn search(&mut self, query: &str) -> Option<Vec<MediaRef>> {
        self.term.say(Tone::Muted, &format!("Searching YouTube for '{}'...", query));
        match self.backend.search(query, self.config.search_limit).await {
            Ok(results) if results.is_empty() => {
                self.term.say(
                    Tone::Warning,
                    &format!("No videos found for '{}'. Try a different search term.", query),
                );
                None
            }
            Ok(results) => Some(results),
            Err(e) => {
                self.report_download_error("Error fetching results", &e);
                None
            }
        }
    }

    async fn choose(&mut self, results: &[MediaRef], action: &str) -> Option<MediaRef> {
        self.term
            .say(Tone::Success, &format!("Found {} result(s):", results.len()));
        for (i, media) in results.iter().enumerate() {
            self.term.say(
                Tone::Plain,
                &format!("  {:>2}. {}", i + 1, truncate_for_display(&media.title, 70)),
            );
        }
        let question = format!(
            "Enter the number of the video to {} (1-{}, Enter to go back):",
            action,
            results.len()
        );
        match self.term.prompt(&question).await {
            Input::Line(line) => match parse_selection(&line, results.len()) {
                Selection::Pick(index) => Some(results[index].clone()),
                Selection::Back => {
                    self.term.say(Tone::Muted, "Returning to menu...");
                    None
                }
                Selection::Invalid => {
                    self.term.say(
                        Tone::Error,
                        &format!("Invalid selection: choose a number from 1 to {}.", results.len()),
                    );
                    None
                }
            },
            Input::Interrupted | Input::Closed => {
                self.term.say(Tone::Muted, "Returning to menu...");
                None
            }
        }
    }

    pub async fn search_and_stream(&mut self) {
        let Some(query) = self.ask_query("Enter song name to stream:").await else {
            return;
        };
        let Some(results) = self.search(&query).await else {
            return;
        };
        let Some(media) = self.choose(&results, "stream").await else {
            return;
        };
        self.stream(&media).await;
    }

    async fn stream(&mut self, media: &MediaRef) {
        let short = truncate_for_display(&media.title, DISPLAY_TITLE_CHARS);
        self.term
            .say(Tone::Info, &format!("Fetching audio stream for: {}", short));

        let locator = match self.backend.resolve_stream(&media.url).await {
            Ok(locator) => locator,
            Err(e) => {
                self.report_download_error("Could not retrieve audio for streaming", &e);
                return;
            }
        };

        self.term.say(Tone::Success, &format!("Now streaming: {}", short));
        self.term.say(
            Tone::Muted,
            "Press Ctrl+C in this terminal to stop playback and return to the menu.",
        );

        match self.player.play(&locator, &media.title).await {
            Ok(outcome) => self.report_outcome(&outcome),
            Err(PlaybackError::ExecutableNotFound(program)) => {
                tracing::warn!("[App] player {} not found", program);
                self.term.say(
                    Tone::Error,
                    &format!(
                        "MPV player not found ({}). Please install mpv and make sure it is on your PATH.",
                        program
                    ),
                );
            }
            Err(e) => self.term.say(Tone::Error, &format!("Playback error: {}", e)),
        }
    }

    fn report_outcome(&mut self, outcome: &PlaybackOutcome) {
        tracing::debug!("[App] playback finished: {:?}", outcome);
        if let Some(code) = outcome.abnormal_exit_code() {
            self.term
                .say(Tone::Warning, &format!("Player exited with code {}.", code));
            return;
        }
        let message = match (outcome.state, outcome.interrupted) {
            (SessionState::Terminated, _) => "Playback stopped.",
            (SessionState::Killed, true) => "Player did not stop in time and was killed.",
            (SessionState::Killed, false) => "Player was killed after an unexpected error.",
            (SessionState::ExitedNormally { .. }, true) => "Player had already stopped.",
            _ => "Playback finished.",
        };
        self.term.say(Tone::Info, message);
    }

    pub async fn search_and_download(&mut self) {
        let Some(query) = self.ask_query("Enter song name to download:").await else {
            return;
        };
        let Some(results) = self.search(&query).await else {
            return;
        };
        let Some(media) = self.choose(&results, "download").await else {
            return;
        };
        let Some(kind) = self.ask_kind().await else {
            return;
        };
        let Some(dir) = self.ask_download_dir().await else {
            return;
        };
        self.download(&media, kind, dir).await;
    }

    async fn ask_kind(&mut self) -> Option<MediaKind> {
        loop {
            match self.term.prompt("(A)udio (MP3) or (V)ideo (MP4)? [a]:").await {
                Input::Line(line) => match parse_media_kind(&line) {
                    Some(kind) => return Some(kind),
                    None => self.term.say(Tone::Warning, "Please enter 'a' or 'v'."),
                },
                Input::Interrupted | Input::Closed => {
                    self.term.say(Tone::Muted, "Returning to menu...");
                    return None;
                }
            }
        }
    }

    async fn ask_download_dir(&mut self) -> Option<PathBuf> {
        let question = format!(
            "Download path (Enter for {}):",
            self.config.download_dir.display()
        );
        match self.term.prompt(&question).await {
            Input::Line(line) => Some(self.prepare_download_dir(&line)),
            Input::Interrupted | Input::Closed => {
                self.term.say(Tone::Muted, "Returning to menu...");
                None
            }
        }
    }

    /// Resolve the answer to the path prompt to a directory that exists,
    /// falling back to the configured default.
    fn prepare_download_dir(&mut self, answer: &str) -> PathBuf {
        let default = self.config.download_dir.clone();
        let requested = if answer.trim().is_empty() {
            default.clone()
        } else {
            expand_home(answer)
        };

        match std::fs::create_dir_all(&requested) {
            Ok(()) => requested,
            Err(e) if requested != default => {
                tracing::warn!("[App] cannot use {}: {}", requested.display(), e);
                self.term.say(
                    Tone::Warning,
                    &format!(
                        "Could not use {} ({}). Using default: {}",
                        requested.display(),
                        e,
                        default.display()
                    ),
                );
                if let Err(e) = std::fs::create_dir_all(&default) {
                    tracing::warn!("[App] cannot create {}: {}", default.display(), e);
                }
                default
            }
            Err(e) => {
                tracing::warn!("[App] cannot create {}: {}", default.display(), e);
                default
            }
        }
    }

    async fn download(&mut self, media: &MediaRef, kind: MediaKind, dir: PathBuf) {
        self.term.say(
            Tone::Info,
            &format!(
                "Preparing to download {}: {}",
                kind,
                truncate_for_display(&media.title, DISPLAY_TITLE_CHARS)
            ),
        );

        let term = &mut self.term;
        let mut sink = |progress: &DownloadProgress| term.progress(progress);
        let result = self.backend.download(media, kind, &dir, &mut sink).await;

        match result {
            Ok(report) => {
                let saved = report.file.as_ref().unwrap_or(&report.directory);
                self.term.say(
                    Tone::Success,
                    &format!("Download complete! Saved to: {}", saved.display()),
                );
            }
            Err(DownloadError::Cancelled) => {
                self.term.say(Tone::Warning, "Download cancelled.");
            }
            Err(e) => self.report_download_error("Download failed", &e),
        }
        self.term.say(
            Tone::Muted,
            &format!("Find your downloads in: {}", dir.display()),
        );
    }

    pub async fn settings(&mut self) {
        self.term.say(Tone::Heading, "Settings");
        self.term.say(
            Tone::Plain,
            &format!("  Download directory: {}", self.config.download_dir.display()),
        );
        self.term.say(
            Tone::Plain,
            &format!("  Results per search: {}", self.config.search_limit),
        );

        let tools = match tokio::task::spawn_blocking(|| ToolManager::new().get_all_tools()).await {
            Ok(tools) => tools,
            Err(e) => {
                tracing::warn!("[App] tool detection failed: {}", e);
                Vec::new()
            }
        };
        for tool in tools {
            let line = match (&tool.version, tool.is_available) {
                (Some(version), true) => format!(
                    "  {:<7} {} ({})",
                    tool.name,
                    version,
                    tool.tool_type.purpose()
                ),
                _ => format!(
                    "  {:<7} not found ({})",
                    tool.name,
                    tool.tool_type.purpose()
                ),
            };
            let tone = if tool.is_available { Tone::Plain } else { Tone::Warning };
            self.term.say(tone, &line);
        }

        // Any answer returns to the menu
        let _ = self.term.prompt("Press Enter to return to the menu").await;
    }

    fn report_download_error(&mut self, context: &str, err: &DownloadError) {
        tracing::warn!("[App] {}: {}", context, err);
        self.term.say(Tone::Error, &format!("{}: {}", context, err));
        if let Some(hint) = err.hint() {
            self.term.say(Tone::Muted, &format!("Hint: {}", hint));
        }
        if let DownloadError::Failed {
            reason: Some(reason),
            ..
        } = err
        {
            tracing::debug!("[App] diagnosed as: {}", reason.description());
            if reason.is_transient() {
                self.term
                    .say(Tone::Muted, "This is usually temporary. Try again in a moment.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::{DownloadPhase, DownloadReport, ProgressSink};
    use crate::ui::testing::ScriptedTerminal;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        results: Vec<MediaRef>,
        search_error: Option<DownloadError>,
        resolve_error: Option<DownloadError>,
        searches: Mutex<Vec<String>>,
        resolved: Mutex<Vec<String>>,
        downloads: Mutex<Vec<(MediaRef, MediaKind, PathBuf)>>,
    }

    impl FakeBackend {
        fn with_songs(count: usize) -> Self {
            let results = (1..=count)
                .map(|i| {
                    MediaRef::new(
                        format!("Song {}", i),
                        format!("https://www.youtube.com/watch?v=id{}", i),
                        Some(format!("id{}", i)),
                    )
                })
                .collect();
            Self {
                results,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl MediaBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn search(&self, query: &str, limit: usize) -> Result<Vec<MediaRef>, DownloadError> {
            self.searches.lock().unwrap().push(query.to_string());
            if let Some(e) = &self.search_error {
                return Err(e.clone());
            }
            Ok(self.results.iter().take(limit).cloned().collect())
        }

        async fn resolve_stream(&self, url: &str) -> Result<String, DownloadError> {
            self.resolved.lock().unwrap().push(url.to_string());
            if let Some(e) = &self.resolve_error {
                return Err(e.clone());
            }
            Ok(format!("https://stream.example/{}", url.rsplit('=').next().unwrap()))
        }

        async fn download(
            &self,
            media: &MediaRef,
            kind: MediaKind,
            dir: &Path,
            progress: &mut (dyn ProgressSink + Send),
        ) -> Result<DownloadReport, DownloadError> {
            self.downloads
                .lock()
                .unwrap()
                .push((media.clone(), kind, dir.to_path_buf()));
            progress.emit(&DownloadProgress::phase(DownloadPhase::Finished));
            let file = dir.join(format!("{}.{}", media.title, kind.extension()));
            Ok(DownloadReport {
                file: Some(file),
                directory: dir.to_path_buf(),
            })
        }
    }

    struct FakePlayer {
        result: fn() -> Result<PlaybackOutcome, PlaybackError>,
        played: Mutex<Vec<(String, String)>>,
    }

    fn exited(code: i32) -> Result<PlaybackOutcome, PlaybackError> {
        Ok(PlaybackOutcome {
            pid: Some(42),
            state: SessionState::ExitedNormally { code: Some(code) },
            interrupted: false,
            history: vec![
                SessionState::Running,
                SessionState::ExitedNormally { code: Some(code) },
            ],
        })
    }

    impl FakePlayer {
        fn ok() -> Self {
            Self::returning(|| exited(0))
        }

        fn returning(result: fn() -> Result<PlaybackOutcome, PlaybackError>) -> Self {
            Self {
                result,
                played: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Playback for FakePlayer {
        async fn play(&self, locator: &str, title: &str) -> Result<PlaybackOutcome, PlaybackError> {
            self.played
                .lock()
                .unwrap()
                .push((locator.to_string(), title.to_string()));
            (self.result)()
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("yt-music-app-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn app(
        backend: FakeBackend,
        player: FakePlayer,
        inputs: &[&str],
    ) -> App<FakeBackend, FakePlayer, ScriptedTerminal> {
        let config = AppConfig::default().with_download_dir(temp_dir("default"));
        App::new(config, backend, player, ScriptedTerminal::new(inputs))
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("2", 3), Selection::Pick(1));
        assert_eq!(parse_selection(" 3 ", 3), Selection::Pick(2));
        assert_eq!(parse_selection("0", 3), Selection::Invalid);
        assert_eq!(parse_selection("4", 3), Selection::Invalid);
        assert_eq!(parse_selection("two", 3), Selection::Invalid);
        assert_eq!(parse_selection("-1", 3), Selection::Invalid);
        assert_eq!(parse_selection("", 3), Selection::Back);
    }

    #[test]
    fn test_parse_menu_and_kind() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::Stream));
        assert_eq!(MenuChoice::parse("0"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("9"), None);
        assert_eq!(parse_media_kind(""), Some(MediaKind::Audio));
        assert_eq!(parse_media_kind("V"), Some(MediaKind::Video));
        assert_eq!(parse_media_kind("x"), None);
    }

    #[tokio::test]
    async fn test_stream_selected_result() {
        let mut app = app(FakeBackend::with_songs(3), FakePlayer::ok(), &["1", "test song", "2"]);
        app.run().await;

        assert_eq!(*app.backend.searches.lock().unwrap(), vec!["test song".to_string()]);
        assert_eq!(
            *app.backend.resolved.lock().unwrap(),
            vec!["https://www.youtube.com/watch?v=id2".to_string()]
        );
        let played = app.player.played.lock().unwrap();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].0, "https://stream.example/id2");
        assert_eq!(played[0].1, "Song 2");
        assert!(app.term.said("Found 3 result(s)"));
        assert!(app.term.said("Goodbye"));
    }

    #[tokio::test]
    async fn test_out_of_range_selection_does_nothing() {
        for choice in ["0", "4", "abc"] {
            let mut app = app(FakeBackend::with_songs(3), FakePlayer::ok(), &["1", "test song", choice]);
            app.run().await;

            assert!(app.backend.resolved.lock().unwrap().is_empty());
            assert!(app.player.played.lock().unwrap().is_empty());
            assert!(app.term.said_with(Tone::Error, "Invalid selection"));
        }
    }

    #[tokio::test]
    async fn test_out_of_range_download_selection() {
        let mut app = app(FakeBackend::with_songs(3), FakePlayer::ok(), &["2", "test song", "7"]);
        app.run().await;

        assert!(app.backend.downloads.lock().unwrap().is_empty());
        assert!(app.term.said("Invalid selection"));
    }

    #[tokio::test]
    async fn test_empty_query_skips_search() {
        let mut app = app(FakeBackend::with_songs(3), FakePlayer::ok(), &["1", "   "]);
        app.run().await;

        assert!(app.backend.searches.lock().unwrap().is_empty());
        assert!(app.term.said("Search query cannot be empty."));
    }

    #[tokio::test]
    async fn test_search_failure_returns_to_menu() {
        let backend = FakeBackend {
            search_error: Some(DownloadError::ToolNotFound("yt-dlp".to_string())),
            ..FakeBackend::with_songs(3)
        };
        let mut app = app(backend, FakePlayer::ok(), &["1", "test song", "0"]);
        app.run().await;

        assert!(app.term.said_with(Tone::Error, "Error fetching results"));
        assert!(app.player.played.lock().unwrap().is_empty());
        // The "0" was read by the main menu, not a result prompt
        assert!(app.term.said("Goodbye"));
    }

    #[tokio::test]
    async fn test_no_results() {
        let mut app = app(FakeBackend::default(), FakePlayer::ok(), &["1", "nothing"]);
        app.run().await;
        assert!(app.term.said("No videos found for 'nothing'"));
    }

    #[tokio::test]
    async fn test_resolve_failure_skips_player() {
        let backend = FakeBackend {
            resolve_error: Some(DownloadError::NoStreamUrl("empty output".to_string())),
            ..FakeBackend::with_songs(2)
        };
        let mut app = app(backend, FakePlayer::ok(), &["1", "q", "1"]);
        app.run().await;

        assert!(app.player.played.lock().unwrap().is_empty());
        assert!(app.term.said("Could not retrieve audio for streaming"));
    }

    #[tokio::test]
    async fn test_missing_player_is_reported() {
        let player =
            FakePlayer::returning(|| Err(PlaybackError::ExecutableNotFound("mpv".to_string())));
        let mut app = app(FakeBackend::with_songs(1), player, &["1", "q", "1", "3", ""]);
        app.run().await;

        assert!(app.term.said_with(Tone::Error, "MPV player not found"));
        // Still usable afterwards
        assert!(app.term.said("Download directory:"));
    }

    #[tokio::test]
    async fn test_abnormal_exit_warns() {
        let mut app = app(FakeBackend::with_songs(1), FakePlayer::returning(|| exited(2)), &["1", "q", "1"]);
        app.run().await;
        assert!(app.term.said_with(Tone::Warning, "Player exited with code 2"));
    }

    #[tokio::test]
    async fn test_interrupted_playback_reports_stop() {
        let player = FakePlayer::returning(|| {
            Ok(PlaybackOutcome {
                pid: Some(7),
                state: SessionState::Terminated,
                interrupted: true,
                history: vec![
                    SessionState::Running,
                    SessionState::TerminationRequested,
                    SessionState::Terminated,
                ],
            })
        });
        let mut app = app(FakeBackend::with_songs(1), player, &["1", "q", "1"]);
        app.run().await;
        assert!(app.term.said("Playback stopped."));
    }

    #[tokio::test]
    async fn test_download_video_to_chosen_dir() {
        let dir = temp_dir("chosen");
        let dir_str = dir.to_string_lossy().to_string();
        let mut app = app(
            FakeBackend::with_songs(3),
            FakePlayer::ok(),
            &["2", "test song", "1", "x", "v", dir_str.as_str()],
        );
        app.run().await;

        let downloads = app.backend.downloads.lock().unwrap();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].0.title, "Song 1");
        assert_eq!(downloads[0].1, MediaKind::Video);
        assert_eq!(downloads[0].2, dir);
        assert!(dir.is_dir());
        assert!(app.term.said("Please enter 'a' or 'v'."));
        assert!(app.term.said_with(Tone::Success, "Download complete!"));
        assert_eq!(app.term.progress.len(), 1);
        assert!(app.player.played.lock().unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_download_defaults() {
        let mut app = app(FakeBackend::with_songs(1), FakePlayer::ok(), &["2", "q", "1", "", ""]);
        app.run().await;

        let default = app.config().download_dir.clone();
        let downloads = app.backend.downloads.lock().unwrap();
        assert_eq!(downloads[0].1, MediaKind::Audio);
        assert_eq!(downloads[0].2, default);
        let _ = std::fs::remove_dir_all(&default);
    }

    #[tokio::test]
    async fn test_unusable_download_dir_falls_back() {
        let base = temp_dir("blocked");
        std::fs::create_dir_all(&base).unwrap();
        let file = base.join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let mut app = app(FakeBackend::with_songs(1), FakePlayer::ok(), &[]);
        let chosen = app.prepare_download_dir(&file.join("sub").to_string_lossy());

        assert_eq!(chosen, app.config().download_dir);
        assert!(app.term.said_with(Tone::Warning, "Using default"));
        let _ = std::fs::remove_dir_all(&base);
        let _ = std::fs::remove_dir_all(&chosen);
    }

    #[tokio::test]
    async fn test_interrupt_at_prompt_returns_to_menu() {
        let term = ScriptedTerminal::with_inputs(vec![
            Input::Line("1".to_string()),
            Input::Interrupted,
            Input::Line("0".to_string()),
        ]);
        let config = AppConfig::default().with_download_dir(temp_dir("interrupt"));
        let mut app = App::new(config, FakeBackend::with_songs(1), FakePlayer::ok(), term);
        app.run().await;

        assert!(app.backend.searches.lock().unwrap().is_empty());
        assert!(app.term.said("Returning to menu..."));
        assert_eq!(app.term.prompts.len(), 3);
    }

    fn clears_after(term: &ScriptedTerminal, needle: &str) -> usize {
        let at = term
            .events
            .iter()
            .position(|e| e.starts_with("say:") && e.contains(needle))
            .unwrap_or_else(|| panic!("{:?} never said", needle));
        term.events[at..].iter().filter(|e| *e == "clear").count()
    }

    #[tokio::test]
    async fn test_flow_messages_stay_on_screen() {
        let mut app = app(FakeBackend::with_songs(1), FakePlayer::ok(), &["1", "q", "9", "2", "q", "1", "a", ""]);
        app.run().await;

        assert_eq!(app.term.events.first().map(String::as_str), Some("clear"));
        assert_eq!(app.term.events.iter().filter(|e| *e == "clear").count(), 1);
        assert_eq!(clears_after(&app.term, "Invalid selection"), 0);
        assert_eq!(clears_after(&app.term, "Download complete!"), 0);

        let invalid = app
            .term
            .events
            .iter()
            .position(|e| e.contains("Invalid selection"))
            .unwrap();
        assert!(app.term.events[invalid + 1..]
            .iter()
            .any(|e| e.starts_with("prompt:Enter your choice")));
        let _ = std::fs::remove_dir_all(&app.config().download_dir);
    }

    #[tokio::test]
    async fn test_invalid_menu_choice_reprompts() {
        let mut app = app(FakeBackend::default(), FakePlayer::ok(), &["7", "0"]);
        app.run().await;
        assert!(app.term.said("Please choose 1, 2, 3 or 0."));
        assert_eq!(app.term.prompts.len(), 2);
    }

    #[tokio::test]
    async fn test_interrupt_at_menu_exits() {
        let term = ScriptedTerminal::with_inputs(vec![Input::Interrupted, Input::Line("1".to_string())]);
        let config = AppConfig::default().with_download_dir(temp_dir("menu-exit"));
        let mut app = App::new(config, FakeBackend::default(), FakePlayer::ok(), term);
        app.run().await;
        assert_eq!(app.term.prompts.len(), 1);
        assert!(app.term.said("Goodbye"));
    }
}

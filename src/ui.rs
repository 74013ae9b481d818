// Terminal front-end: prompts, styled messages and the download progress line

use async_trait::async_trait;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, execute, queue};
use std::io::{Stdout, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::downloader::models::{DownloadPhase, DownloadProgress};

const BAR_WIDTH: usize = 24;

/// Result of asking the user something
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// Ctrl+C while the prompt was open
    Interrupted,
    /// stdin closed
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Heading,
    Info,
    Success,
    Warning,
    Error,
    Muted,
}

#[async_trait]
pub trait Terminal: Send {
    async fn prompt(&mut self, question: &str) -> Input;

    fn say(&mut self, tone: Tone, text: &str);

    /// Redraw the live download line
    fn progress(&mut self, progress: &DownloadProgress);

    fn clear(&mut self) {}
}

/// Interactive terminal on stdin/stdout
pub struct ConsoleTerminal {
    lines: Lines<BufReader<Stdin>>,
    out: Stdout,
    progress_active: bool,
}

impl Default for ConsoleTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleTerminal {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            out: std::io::stdout(),
            progress_active: false,
        }
    }

    fn end_progress(&mut self) {
        if self.progress_active {
            let _ = writeln!(self.out);
            self.progress_active = false;
        }
    }
}

#[async_trait]
impl Terminal for ConsoleTerminal {
    async fn prompt(&mut self, question: &str) -> Input {
        self.end_progress();
        let _ = execute!(self.out, Print(format!("{} ", question).bold().yellow()));

        tokio::select! {
            line = self.lines.next_line() => match line {
                Ok(Some(line)) => Input::Line(line.trim().to_string()),
                Ok(None) => Input::Closed,
                Err(e) => {
                    tracing::warn!("[Terminal] failed to read stdin: {}", e);
                    Input::Closed
                }
            },
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => {
                    let _ = writeln!(self.out);
                    Input::Interrupted
                }
                Err(e) => {
                    tracing::warn!("[Terminal] cannot listen for Ctrl+C: {}", e);
                    Input::Closed
                }
            },
        }
    }

    fn say(&mut self, tone: Tone, text: &str) {
        self.end_progress();
        let _ = match tone {
            Tone::Plain => writeln!(self.out, "{}", text),
            Tone::Heading => writeln!(self.out, "{}", text.bold().cyan()),
            Tone::Info => writeln!(self.out, "{}", text.blue()),
            Tone::Success => writeln!(self.out, "{}", text.bold().green()),
            Tone::Warning => writeln!(self.out, "{}", text.yellow()),
            Tone::Error => writeln!(self.out, "{}", text.bold().red()),
            Tone::Muted => writeln!(self.out, "{}", text.dark_grey()),
        };
    }

    fn progress(&mut self, progress: &DownloadProgress) {
        let _ = queue!(
            self.out,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(format_progress(progress))
        );
        self.progress_active = true;
        if matches!(progress.phase, DownloadPhase::Finished | DownloadPhase::Failed) {
            self.end_progress();
        }
        let _ = self.out.flush();
    }

    fn clear(&mut self) {
        self.end_progress();
        let _ = execute!(self.out, Clear(ClearType::All), cursor::MoveTo(0, 0));
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// One-line rendering of a progress update
pub fn format_progress(progress: &DownloadProgress) -> String {
    let name = progress.file_name.as_deref().unwrap_or("file");
    match &progress.phase {
        DownloadPhase::Preparing => "Preparing download...".to_string(),
        DownloadPhase::Downloading => match (progress.percent(), progress.total_bytes) {
            (Some(percent), Some(total)) => {
                let filled = ((percent / 100.0) * BAR_WIDTH as f32).round() as usize;
                let filled = filled.min(BAR_WIDTH);
                format!(
                    "Downloading {} [{}{}] {:5.1}%  {} / {}",
                    name,
                    "#".repeat(filled),
                    "-".repeat(BAR_WIDTH - filled),
                    percent,
                    format_bytes(progress.downloaded_bytes),
                    format_bytes(total)
                )
            }
            _ => format!(
                "Downloading {} (size unknown) {}",
                name,
                format_bytes(progress.downloaded_bytes)
            ),
        },
        DownloadPhase::PostProcessing(step) => format!("Processing {}: {}", name, step),
        DownloadPhase::Finished => format!("Finished {}", name),
        DownloadPhase::Failed => "Download failed".to_string(),
    }
}

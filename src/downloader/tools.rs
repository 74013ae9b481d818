use std::path::Path;
use std::process::{Command, Stdio};

/// External programs the CLI drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Mpv,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Mpv => "mpv",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Mpv => "--version",
            ToolType::Ffmpeg => "-version",
        }
    }

    /// What the tool is needed for, for the settings screen
    pub fn purpose(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "search, stream URLs, downloads",
            ToolType::Mpv => "streaming playback",
            ToolType::Ffmpeg => "MP3/MP4 conversion, thumbnails",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

pub struct ToolManager;

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.find_path(tool_type);
        let version = path.as_deref().and_then(|p| self.get_version(p, tool_type));

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::Mpv),
            self.get_tool_info(ToolType::Ffmpeg),
        ]
    }

    /// Path to launch the tool with: a detected absolute path, or the bare
    /// name so the OS resolves it (and reports it missing) at spawn time.
    pub fn resolve(&self, tool_type: ToolType) -> String {
        self.find_path(tool_type)
            .unwrap_or_else(|| tool_type.as_str().to_string())
    }

    fn find_path(&self, tool_type: ToolType) -> Option<String> {
        let binary_name = tool_type.as_str();

        // 1. Common install locations
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];
        for path in common_paths {
            if Path::new(&path).exists() {
                return Some(path);
            }
        }

        // 2. PATH
        let locator = if cfg!(windows) { "where" } else { "which" };
        match Command::new(locator)
            .arg(binary_name)
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => {
                let path = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_string();
                if path.is_empty() {
                    None
                } else {
                    Some(path)
                }
            }
            _ => None,
        }
    }

    fn get_version(&self, path: &str, tool_type: ToolType) -> Option<String> {
        match Command::new(path)
            .arg(tool_type.version_arg())
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => {
                // mpv and ffmpeg print a banner; the first line carries the version
                let first = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_string();
                if first.is_empty() {
                    None
                } else {
                    Some(first)
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_bare_name() {
        let resolved = ToolManager::new().resolve(ToolType::Mpv);
        assert!(resolved.ends_with("mpv"));
    }

    #[test]
    fn test_all_tools_listed() {
        let names: Vec<String> = ToolManager::new()
            .get_all_tools()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["yt-dlp", "mpv", "ffmpeg"]);
    }
}

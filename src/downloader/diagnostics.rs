// Failure diagnostics - turns yt-dlp stderr into something a user can act on

/// Recognised reasons why yt-dlp refused a search, resolve or download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Deleted, removed for copyright, or otherwise gone
    VideoUnavailable,

    PrivateVideo,

    /// Needs a logged-in account
    AgeRestricted,

    GeoBlocked,

    /// 429 / too many requests
    RateLimited,

    /// Captcha or "confirm you're not a bot"
    BotDetection,

    /// HTTP 403 on the media URL
    Forbidden,

    NetworkTimeout,

    /// ffmpeg missing for the post-processing step
    FfmpegMissing,

    Unknown,
}

impl FailureReason {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::VideoUnavailable => "Video unavailable",
            Self::PrivateVideo => "Private video",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Not available in your country",
            Self::RateLimited => "Rate limited by the platform",
            Self::BotDetection => "Bot detection triggered",
            Self::Forbidden => "Access denied (HTTP 403)",
            Self::NetworkTimeout => "Network timeout",
            Self::FfmpegMissing => "ffmpeg not found",
            Self::Unknown => "Unknown error",
        }
    }

    /// Short suggestion shown under the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::VideoUnavailable | Self::PrivateVideo => {
                Some("Pick another result; this one cannot be fetched.")
            }
            Self::AgeRestricted => Some("This item needs a signed-in account and cannot be fetched here."),
            Self::GeoBlocked => Some("Try a VPN or proxy in a different region."),
            Self::RateLimited | Self::BotDetection => Some("Wait a few minutes and try again."),
            Self::Forbidden => Some("Update yt-dlp; stream URLs are rejected by older versions."),
            Self::NetworkTimeout => Some("Check your internet connection and try again."),
            Self::FfmpegMissing => Some("Install ffmpeg; it is needed to convert and tag downloads."),
            Self::Unknown => None,
        }
    }

    /// Whether trying the same request again later is reasonable
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::BotDetection | Self::Forbidden | Self::NetworkTimeout
        )
    }
}

/// Analyze error output and return the failure reason
pub fn diagnose_error(error: &str) -> Option<FailureReason> {
    let lower = error.to_lowercase();

    if lower.contains("ffmpeg not found")
        || lower.contains("ffprobe and ffmpeg not found")
        || lower.contains("ffmpeg is not installed")
    {
        return Some(FailureReason::FfmpegMissing);
    }

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("sign in if you've been granted access")
    {
        return Some(FailureReason::PrivateVideo);
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(FailureReason::AgeRestricted);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("this video is no longer available")
        || lower.contains("video is unavailable")
    {
        return Some(FailureReason::VideoUnavailable);
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restriction")
        || lower.contains("geo-restricted")
    {
        return Some(FailureReason::GeoBlocked);
    }

    if lower.contains("http error 429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(FailureReason::RateLimited);
    }

    if lower.contains("not a bot") || lower.contains("captcha") || lower.contains("unusual traffic") {
        return Some(FailureReason::BotDetection);
    }

    if lower.contains("http error 403") || lower.contains("forbidden") {
        return Some(FailureReason::Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
        || lower.contains("temporary failure in name resolution")
    {
        return Some(FailureReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(FailureReason::Unknown);
    }

    None
}

/// The line of stderr worth showing: the last `ERROR:` line, otherwise the
/// last non-empty one.
pub fn last_error_line(stderr: &str) -> Option<&str> {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()))
}

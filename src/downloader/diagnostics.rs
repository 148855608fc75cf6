// Failure diagnostics for the yt-dlp engine
//
// Classifies yt-dlp error text so the log carries an actionable hint.
// The message returned to the caller stays the tool's own text.

/// Why a TikTok request through yt-dlp failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// HTTP 403 from the CDN or page
    Forbidden,

    /// 429 / "too many requests"
    RateLimited,

    /// Video set to private or friends-only
    PrivateVideo,

    /// Deleted, removed or never existed
    VideoUnavailable,

    /// Not available in the requester's region
    GeoBlocked,

    /// Account or content requires login
    LoginRequired,

    /// Site/URL not handled by the extractor
    UnsupportedUrl,

    /// Network timeout or refused connection
    NetworkTimeout,

    /// Anything else
    Unknown,
}

impl FailureReason {
    /// Whether running again later (or via another network) may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Forbidden | Self::RateLimited | Self::NetworkTimeout)
    }

    pub fn proxy_might_help(&self) -> bool {
        matches!(
            self,
            Self::Forbidden | Self::GeoBlocked | Self::RateLimited | Self::NetworkTimeout
        )
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Forbidden => "Access denied (HTTP 403)",
            Self::RateLimited => "Rate limited by TikTok",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::LoginRequired => "Login required",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::NetworkTimeout => "Network timeout",
            Self::Unknown => "Unknown failure",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::Forbidden => "update yt-dlp or retry through a proxy",
            Self::RateLimited => "wait a few minutes before retrying",
            Self::PrivateVideo | Self::LoginRequired => "the video cannot be fetched anonymously",
            Self::VideoUnavailable => "check that the video still exists",
            Self::GeoBlocked => "retry through a proxy in another region",
            Self::UnsupportedUrl => "check the URL or try the tiktok-api engine",
            Self::NetworkTimeout => "check the connection and retry",
            Self::Unknown => "see the yt-dlp error text",
        }
    }
}

/// Analyze error text and return the failure reason; `None` for empty text
pub fn diagnose_error(error: &str) -> Option<FailureReason> {
    if error.trim().is_empty() {
        return None;
    }
    let lower = error.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    // Checked in order of specificity
    let reason = if has(&["unsupported url", "no suitable extractor"]) {
        FailureReason::UnsupportedUrl
    } else if has(&["private video", "video is private", "this account is private"]) {
        FailureReason::PrivateVideo
    } else if has(&[
        "video unavailable",
        "video is unavailable",
        "video has been removed",
        "video currently unavailable",
        "404",
    ]) {
        FailureReason::VideoUnavailable
    } else if has(&["not available in your country", "geo restricted", "geo-restricted", "region"]) {
        FailureReason::GeoBlocked
    } else if has(&["log in", "login required", "sign in", "requires authentication"]) {
        FailureReason::LoginRequired
    } else if has(&["429", "too many requests", "rate limit"]) {
        FailureReason::RateLimited
    } else if has(&["403", "forbidden"]) {
        FailureReason::Forbidden
    } else if has(&["timed out", "timeout", "connection refused", "network is unreachable"]) {
        FailureReason::NetworkTimeout
    } else {
        FailureReason::Unknown
    };
    Some(reason)
}

/// Most useful line of a yt-dlp error dump
pub fn summarize(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).rev().find(|l| !l.is_empty()))
        .unwrap_or("yt-dlp exited with an error")
        .to_string()
}

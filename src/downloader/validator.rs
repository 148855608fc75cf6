// TikTok URL validation
//
// Pre-flight check run by the caller before any engine is selected. Engines
// keep their own `validate_url` so their matching rules can drift from this
// one without coupling.

use regex::Regex;
use url::Url;

use super::models::UrlCheck;

lazy_static::lazy_static! {
    static ref TIKTOK_PATTERNS: Vec<Regex> = [
        // canonical video URL
        r"(?i)^https?://(?:www\.)?tiktok\.com/@[\w.-]+/video/\d+",
        r"(?i)^https?://(?:www\.)?tiktok\.com/.*?/video/\d+",
        // short-link domains
        r"(?i)^https?://(?:vm|vt)\.tiktok\.com/\w+",
        // short-path form
        r"(?i)^https?://(?:www\.)?tiktok\.com/t/\w+",
        // mobile / embed
        r"(?i)^https?://m\.tiktok\.com/.*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref VIDEO_ID_PATTERNS: Vec<Regex> = [
        r"(?i)tiktok\.com/@[\w.-]+/video/(\d+)",
        r"(?i)tiktok\.com/.*?/video/(\d+)",
        r"(?i)(?:vm|vt)\.tiktok\.com/(\w+)",
        r"(?i)tiktok\.com/t/(\w+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

/// Check `url` against the known TikTok URL shapes
pub fn validate(url: &str) -> UrlCheck {
    let url = url.trim();
    if url.is_empty() {
        return UrlCheck::invalid("URL is empty or invalid");
    }

    let host = match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_lowercase(),
            _ => return UrlCheck::invalid("Invalid URL format"),
        },
        Err(_) => return UrlCheck::invalid("Invalid URL format"),
    };

    if !host.contains("tiktok.com") {
        return UrlCheck::invalid("URL is not from TikTok");
    }

    if TIKTOK_PATTERNS.iter().any(|re| re.is_match(url)) {
        UrlCheck::valid("Valid TikTok URL detected")
    } else {
        UrlCheck::invalid("URL format not recognized")
    }
}

pub fn is_valid(url: &str) -> bool {
    validate(url).valid
}

/// Video id (numeric) or short-link code embedded in `url`
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Prefix `https://` when no scheme is present
pub fn normalize(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    let lower = url.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

// Common data models for downloader

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// The only quality label ever populated or honored
pub const BEST_QUALITY: &str = "best";

/// Normalized video record produced by the metadata resolver.
///
/// A value of this type always has a non-empty `id` and a non-empty
/// `download_urls["best"]`; the resolver returns `None` instead of a
/// partially filled record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    /// Account handle, without the leading `@`
    pub uploader: Option<String>,
    /// Display name
    pub channel: Option<String>,
    pub download_urls: HashMap<String, String>,
}

impl VideoMetadata {
    /// Best available media URL
    pub fn best_url(&self) -> Option<&str> {
        self.download_urls
            .get(BEST_QUALITY)
            .map(String::as_str)
            .filter(|u| !u.is_empty())
    }
}

/// Static, engine-owned description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub advantages: &'static [&'static str],
    pub recommended: bool,
}

/// Download progress information
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferProgress {
    /// 0.0 ..= 100.0
    pub percent: f32,
    pub speed_bytes_per_sec: Option<f64>,
}

/// Result of a URL check: validity plus a human message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCheck {
    pub valid: bool,
    pub message: String,
}

impl UrlCheck {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Terminal result of an engine download. Never an uncaught fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub success: bool,
    pub message: String,
}

impl DownloadOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Download options
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    /// Accepted for every engine, always resolved to "best"
    pub quality: String,
    /// Overrides the synthesized file name when non-blank
    pub custom_filename: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    pub fn with_custom_filename(mut self, name: Option<String>) -> Self {
        self.custom_filename = name;
        self
    }
}

impl Default for DownloadRequest {
    fn default() -> Self {
        Self {
            url: String::new(),
            output_dir: default_output_dir(),
            quality: BEST_QUALITY.to_string(),
            custom_filename: None,
        }
    }
}

/// Platform download directory, or the working directory
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

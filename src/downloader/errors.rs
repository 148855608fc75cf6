// Error types for download engines

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// URL does not match any known TikTok shape
    #[error("Could not extract video ID from URL")]
    UrlUnrecognized(String),

    /// Page fetch failed or no extraction strategy produced a usable record
    #[error("Could not retrieve video information")]
    MetadataUnavailable,

    /// Metadata resolved but carries no media URL
    #[error("Could not get download URL")]
    DownloadUrlUnavailable,

    /// Network or disk error while streaming the file
    #[error("Download failed")]
    TransferFailed(String),

    /// Output directory missing and could not be created
    #[error("Output directory is not writable: {path} ({cause})")]
    DestinationUnwritable { path: String, cause: String },

    /// yt-dlp not found in system
    #[error("yt-dlp not found: {0}")]
    ToolNotFound(String),

    /// External tool exited with an error; carries its own error text
    #[error("{0}")]
    ExecutionError(String),

    /// Failed to parse yt-dlp JSON output
    #[error("could not parse yt-dlp output: {0}")]
    ParseError(String),
}

impl DownloadError {
    /// Stable short label, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UrlUnrecognized(_) => "url_unrecognized",
            Self::MetadataUnavailable => "metadata_unavailable",
            Self::DownloadUrlUnavailable => "download_url_unavailable",
            Self::TransferFailed(_) => "transfer_failed",
            Self::DestinationUnwritable { .. } => "destination_unwritable",
            Self::ToolNotFound(_) => "tool_not_found",
            Self::ExecutionError(_) => "execution_error",
            Self::ParseError(_) => "parse_error",
        }
    }
}

// Engine selection and caller-level pre-flight checks

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::backends::{DirectApiEngine, YtDlpEngine};
use super::config::EngineConfig;
use super::errors::DownloadError;
use super::models::{DownloadOutcome, DownloadRequest, EngineDescriptor};
use super::traits::{DownloadEngine, ProgressReporter};
use super::validator;

/// The closed set of engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Page scraping + direct transfer
    DirectApi,
    /// Delegates to yt-dlp
    #[default]
    YtDlp,
}

impl EngineKind {
    pub const ALL: [EngineKind; 2] = [EngineKind::YtDlp, EngineKind::DirectApi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectApi => DirectApiEngine::NAME,
            Self::YtDlp => YtDlpEngine::NAME,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiktok-api" | "api" | "direct" => Ok(Self::DirectApi),
            "yt-dlp" | "ytdlp" => Ok(Self::YtDlp),
            other => Err(format!(
                "Unknown engine '{}' (available: {}, {})",
                other,
                YtDlpEngine::NAME,
                DirectApiEngine::NAME
            )),
        }
    }
}

/// Holds one instance of every engine and picks one by name per call
pub struct Downloader {
    direct: DirectApiEngine,
    ytdlp: YtDlpEngine,
}

impl Downloader {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            direct: DirectApiEngine::new(config),
            ytdlp: YtDlpEngine::new(config),
        }
    }

    pub fn engine(&self, kind: EngineKind) -> &dyn DownloadEngine {
        match kind {
            EngineKind::DirectApi => &self.direct,
            EngineKind::YtDlp => &self.ytdlp,
        }
    }

    pub fn engine_by_name(&self, name: &str) -> Option<&dyn DownloadEngine> {
        name.parse::<EngineKind>().ok().map(|kind| self.engine(kind))
    }

    pub fn descriptors(&self) -> Vec<EngineDescriptor> {
        EngineKind::ALL.iter().map(|kind| self.engine(*kind).describe()).collect()
    }

    /// Validate the URL, make sure the destination exists, then hand off
    pub async fn download(
        &self,
        kind: EngineKind,
        request: &DownloadRequest,
        reporter: &ProgressReporter,
    ) -> DownloadOutcome {
        let check = validator::validate(&request.url);
        if !check.valid {
            tracing::info!(url = %request.url, reason = %check.message, "URL rejected before engine selection");
            return DownloadOutcome::failed(check.message);
        }

        if let Err(e) = ensure_output_dir(&request.output_dir) {
            tracing::warn!(error = %e, "destination check failed");
            return DownloadOutcome::failed(e.to_string());
        }

        let engine = self.engine(kind);
        tracing::info!(engine = engine.name(), url = %request.url, "dispatching download");
        engine.download(request, reporter).await
    }
}

/// Create the output directory when missing
pub fn ensure_output_dir(dir: &Path) -> Result<(), DownloadError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| DownloadError::DestinationUnwritable {
        path: dir.display().to_string(),
        cause: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::transfer::test_server::closed_port_url;

    fn offline_config() -> EngineConfig {
        EngineConfig::default()
            .with_timeout(2)
            .with_ytdlp_path(Some("/nonexistent/yt-dlp".into()))
    }

    #[test]
    fn test_engine_names() {
        assert_eq!("yt-dlp".parse::<EngineKind>(), Ok(EngineKind::YtDlp));
        assert_eq!("TikTok-API".parse::<EngineKind>(), Ok(EngineKind::DirectApi));
        assert!("youtube-dl".parse::<EngineKind>().is_err());
        assert_eq!(EngineKind::default().to_string(), "yt-dlp");
    }

    #[test]
    fn test_selection_by_name() {
        let downloader = Downloader::new(&offline_config());
        assert_eq!(downloader.engine_by_name("tiktok-api").unwrap().name(), "tiktok-api");
        assert_eq!(downloader.engine_by_name("yt-dlp").unwrap().name(), "yt-dlp");
        assert!(downloader.engine_by_name("nope").is_none());

        let names: Vec<_> = downloader.descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["yt-dlp", "tiktok-api"]);
    }

    #[tokio::test]
    async fn test_rejects_non_tiktok_url() {
        let downloader = Downloader::new(&offline_config());
        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest::new("https://example.com/video/1", dir.path());
        let outcome = downloader
            .download(EngineKind::DirectApi, &request, &ProgressReporter::silent())
            .await;
        assert_eq!(outcome, DownloadOutcome::failed("URL is not from TikTok"));
    }

    #[tokio::test]
    async fn test_unwritable_destination() {
        let downloader = Downloader::new(&offline_config());
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let request = DownloadRequest::new("https://www.tiktok.com/@foo/video/12345", file.join("sub"));
        let outcome = downloader
            .download(EngineKind::YtDlp, &request, &ProgressReporter::silent())
            .await;
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Output directory is not writable"));
    }

    #[test]
    fn test_creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        ensure_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_both_engines_terminate_with_outcome() {
        let downloader = Downloader::new(&offline_config());
        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/tiktok.com/@foo/video/12345", closed_port_url().await);
        for kind in EngineKind::ALL {
            let request = DownloadRequest::new(url.clone(), dir.path());
            let outcome = downloader.engine(kind).download(&request, &ProgressReporter::silent()).await;
            assert!(!outcome.message.is_empty(), "{} returned an empty message", kind);
        }
    }
}

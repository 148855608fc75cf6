use async_trait::async_trait;
use regex::Regex;

use crate::downloader::config::EngineConfig;
use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::MetadataResolver;
use crate::downloader::filename;
use crate::downloader::models::{DownloadOutcome, DownloadRequest, EngineDescriptor, UrlCheck};
use crate::downloader::traits::{DownloadEngine, ProgressReporter};
use crate::downloader::transfer;

lazy_static::lazy_static! {
    // Narrower than the validator: no bare /v/ links
    static ref ID_PATTERNS: Vec<Regex> = [
        r"tiktok\.com/@[\w.-]+/video/(\d+)",
        r"tiktok\.com/.*?/video/(\d+)",
        r"(?:vm|vt)\.tiktok\.com/(\w+)",
        r"tiktok\.com/t/(\w+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

/// Scrapes the video page and streams the media file itself
pub struct DirectApiEngine {
    resolver: MetadataResolver,
    transfer_client: reqwest::Client,
}

impl DirectApiEngine {
    pub const NAME: &'static str = "tiktok-api";

    pub fn new(config: &EngineConfig) -> Self {
        let transfer_client = config.transfer_client().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to build configured transfer client, using defaults");
            reqwest::Client::new()
        });
        Self {
            resolver: MetadataResolver::new(config),
            transfer_client,
        }
    }

    pub fn extract_video_id(url: &str) -> Option<String> {
        ID_PATTERNS
            .iter()
            .find_map(|re| re.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Every stage in order; the first missing piece short-circuits
    async fn run(&self, request: &DownloadRequest, reporter: &ProgressReporter) -> Result<String, DownloadError> {
        reporter.status("Extracting video information...");

        let video_id = Self::extract_video_id(&request.url)
            .ok_or_else(|| DownloadError::UrlUnrecognized(request.url.clone()))?;
        tracing::debug!(video_id = %video_id, "video id extracted");

        // The full URL keeps the account segment the page needs
        let metadata = self
            .resolver
            .resolve(&request.url)
            .await
            .ok_or(DownloadError::MetadataUnavailable)?;

        // Only "best" is ever populated; the requested quality is ignored
        if request.quality != crate::downloader::models::BEST_QUALITY {
            tracing::debug!(quality = %request.quality, "quality hint ignored");
        }
        let media_url = metadata
            .best_url()
            .ok_or(DownloadError::DownloadUrlUnavailable)?
            .to_string();

        let file_name = match filename::sanitize_custom(request.custom_filename.as_deref()) {
            Some(name) => format!("{}.mp4", name),
            None => filename::synthesize(&metadata),
        };
        let destination = request.output_dir.join(&file_name);

        reporter.status(&format!("Downloading: {}", metadata.title));
        tracing::info!(id = %metadata.id, path = %destination.display(), "starting transfer");

        if transfer::transfer(&self.transfer_client, &media_url, &destination, reporter).await {
            Ok(file_name)
        } else {
            Err(DownloadError::TransferFailed(media_url))
        }
    }
}

#[async_trait]
impl DownloadEngine for DirectApiEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn describe(&self) -> EngineDescriptor {
        EngineDescriptor {
            name: Self::NAME,
            description: "Direct API access for faster downloads",
            advantages: &[
                "Faster download speed",
                "Lower resource usage",
                "Direct API access",
                "Lightweight",
            ],
            recommended: false,
        }
    }

    async fn validate_url(&self, url: &str) -> UrlCheck {
        match Self::extract_video_id(url) {
            Some(id) => UrlCheck::valid(format!("TikTok video detected (ID: {})", id)),
            None => UrlCheck::invalid("Invalid TikTok URL format"),
        }
    }

    async fn download(&self, request: &DownloadRequest, reporter: &ProgressReporter) -> DownloadOutcome {
        match self.run(request, reporter).await {
            Ok(file_name) => {
                reporter.status("Download completed successfully!");
                DownloadOutcome::ok(format!("Download completed successfully: {}", file_name))
            }
            Err(e) => {
                tracing::warn!(engine = Self::NAME, kind = e.kind(), error = ?e, "download failed");
                let message = e.to_string();
                reporter.status(&message);
                DownloadOutcome::failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::transfer::test_server::{closed_port_url, ok_with_length, serve};
    use std::sync::{Arc, Mutex};

    fn engine() -> DirectApiEngine {
        DirectApiEngine::new(&EngineConfig::default().with_timeout(5))
    }

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            DirectApiEngine::extract_video_id("https://www.tiktok.com/@alice/video/987654321").as_deref(),
            Some("987654321")
        );
        assert_eq!(
            DirectApiEngine::extract_video_id("https://vt.tiktok.com/ZTabc123/").as_deref(),
            Some("ZTabc123")
        );
        assert_eq!(DirectApiEngine::extract_video_id("https://example.com/video/1"), None);
    }

    #[tokio::test]
    async fn test_validate_url_is_offline() {
        let check = engine().validate_url("https://www.tiktok.com/@foo/video/12345").await;
        assert!(check.valid);
        assert_eq!(check.message, "TikTok video detected (ID: 12345)");
        assert!(!engine().validate_url("https://example.com/x").await.valid);
    }

    #[test]
    fn test_descriptor() {
        let d = engine().describe();
        assert_eq!(d.name, "tiktok-api");
        assert!(!d.recommended);
        assert_eq!(d.advantages.len(), 4);
    }

    #[tokio::test]
    async fn test_unrecognized_url() {
        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest::new("https://example.com/video/1", dir.path());
        let outcome = engine().download(&request, &ProgressReporter::silent()).await;
        assert_eq!(outcome, DownloadOutcome::failed("Could not extract video ID from URL"));
    }

    #[tokio::test]
    async fn test_metadata_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // Id pattern matches, page fetch fails
        let url = format!("{}/tiktok.com/@a/video/1", closed_port_url().await);
        let request = DownloadRequest::new(url, dir.path()).with_quality("720p");
        let outcome = engine().download(&request, &ProgressReporter::silent()).await;
        assert_eq!(outcome, DownloadOutcome::failed("Could not retrieve video information"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_download() {
        let video = vec![1u8; 10_000];
        let media_base = serve(ok_with_length(&video, "video/mp4"), video.clone()).await;
        let html = format!(
            r#"<script id="__NEXT_DATA__" type="application/json">{{"props":{{"pageProps":{{"itemInfo":{{"itemStruct":{{"id":"77","desc":"Hi*There","author":{{"uniqueId":"x:y","nickname":"A/B"}},"video":{{"downloadAddr":"{}/clip.mp4"}}}}}}}}}}}}</script>"#,
            media_base
        );
        let page_base = serve(ok_with_length(html.as_bytes(), "text/html"), html.into_bytes()).await;

        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest::new(format!("{}/tiktok.com/@x/video/77", page_base), dir.path());
        let statuses = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = statuses.clone();
        let reporter = ProgressReporter::silent().on_status(move |s| sink.lock().unwrap().push(s.to_string()));

        let outcome = engine().download(&request, &reporter).await;
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.message, "Download completed successfully: 【A_B｜tt@x_y】Hi_There.mp4");

        let written = std::fs::read(dir.path().join("【A_B｜tt@x_y】Hi_There.mp4")).unwrap();
        assert_eq!(written, video);

        let statuses = statuses.lock().unwrap();
        assert_eq!(statuses.first().map(String::as_str), Some("Extracting video information..."));
        assert_eq!(statuses.last().map(String::as_str), Some("Download completed successfully!"));
    }

    #[tokio::test]
    async fn test_media_fetch_failure() {
        let media_base = serve(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n".to_string(),
            Vec::new(),
        )
        .await;
        let html = format!(r#"<video src="{}/gone.mp4"></video>"#, media_base);
        let page_base = serve(ok_with_length(html.as_bytes(), "text/html"), html.into_bytes()).await;

        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest::new(format!("{}/tiktok.com/@x/video/9", page_base), dir.path());
        let statuses = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = statuses.clone();
        let reporter = ProgressReporter::silent().on_status(move |s| sink.lock().unwrap().push(s.to_string()));

        let outcome = engine().download(&request, &reporter).await;
        assert_eq!(outcome, DownloadOutcome::failed("Download failed"));
        assert_eq!(statuses.lock().unwrap().last().map(String::as_str), Some("Download failed"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_media_url() {
        let html = format!(r#"<video src="{}/clip.mp4"></video>"#, closed_port_url().await);
        let page_base = serve(ok_with_length(html.as_bytes(), "text/html"), html.into_bytes()).await;

        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest::new(format!("{}/tiktok.com/@x/video/9", page_base), dir.path());
        let outcome = engine().download(&request, &ProgressReporter::silent()).await;
        assert_eq!(outcome, DownloadOutcome::failed("Download failed"));
    }

    #[tokio::test]
    async fn test_custom_filename_overrides_template() {
        let video = b"tiny".to_vec();
        let media_base = serve(ok_with_length(&video, "video/mp4"), video.clone()).await;
        let html = format!(r#"<video src="{}/raw.mp4"></video>"#, media_base);
        let page_base = serve(ok_with_length(html.as_bytes(), "text/html"), html.into_bytes()).await;

        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest::new(format!("{}/tiktok.com/@x/video/5", page_base), dir.path())
            .with_custom_filename(Some(" my:clip ".into()));
        let outcome = engine().download(&request, &ProgressReporter::silent()).await;
        assert!(outcome.success, "{}", outcome.message);
        assert!(dir.path().join("myclip.mp4").exists());
    }
}

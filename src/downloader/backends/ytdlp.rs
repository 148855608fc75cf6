use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::downloader::config::EngineConfig;
use crate::downloader::diagnostics::{self, diagnose_error};
use crate::downloader::errors::DownloadError;
use crate::downloader::filename;
use crate::downloader::models::{DownloadOutcome, DownloadRequest, EngineDescriptor, TransferProgress, UrlCheck};
use crate::downloader::traits::{DownloadEngine, ProgressReporter};
use crate::downloader::utils::{self, parse_ytdlp_progress, ProgressLine};

/// Best available, preferring mp4, otherwise best in any container.
/// Used for every quality hint.
const FORMAT_SELECTOR: &str = "best[ext=mp4]/best";

/// yt-dlp output template matching the direct engine's file names
const DEFAULT_FILENAME_TEMPLATE: &str = "【%(channel,uploader|UnknownUser)s｜tt@%(uploader|unknown_id)s】%(title)s";

/// Subset of `yt-dlp --dump-json` this engine reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtDlpInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
}

impl YtDlpInfo {
    fn display_name(&self) -> String {
        format!(
            "【{}｜tt@{}】{}",
            self.channel.as_deref().unwrap_or("UnknownChannel"),
            self.uploader.as_deref().unwrap_or("UnknownUploader"),
            self.title.as_deref().unwrap_or("UnknownTitle")
        )
    }
}

/// Delegates extraction and transfer to the yt-dlp executable
pub struct YtDlpEngine {
    ytdlp_bin: String,
    proxy: Option<String>,
    socket_timeout: u64,
    metadata_timeout: u64,
}

impl YtDlpEngine {
    pub const NAME: &'static str = "yt-dlp";

    pub fn new(config: &EngineConfig) -> Self {
        let ytdlp_bin = config.ytdlp_path.clone().unwrap_or_else(utils::find_ytdlp);
        Self {
            ytdlp_bin,
            proxy: config.proxy.clone(),
            socket_timeout: config.timeout_seconds,
            metadata_timeout: config.metadata_timeout_seconds,
        }
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout.to_string(),
        ];
        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        args
    }

    /// Metadata only, nothing is downloaded
    pub async fn extract_info(&self, url: &str) -> Result<YtDlpInfo, DownloadError> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(self.common_args());
        args.push(url.to_string());

        let output = utils::run_output_with_timeout(&self.ytdlp_bin, args, self.metadata_timeout).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::ExecutionError(diagnostics::summarize(&stderr)));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| DownloadError::ParseError(e.to_string()))
    }

    fn build_download_args(&self, url: &str, output_template: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().into_owned(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ];
        args.extend(self.common_args());
        args.push(url.to_string());
        args
    }

    async fn run(&self, request: &DownloadRequest, reporter: &ProgressReporter) -> Result<String, DownloadError> {
        reporter.status("Extracting video information...");
        let info = self.extract_info(&request.url).await?;

        if request.quality != crate::downloader::models::BEST_QUALITY {
            tracing::debug!(quality = %request.quality, "quality hint ignored, using {}", FORMAT_SELECTOR);
        }

        let custom = filename::sanitize_custom(request.custom_filename.as_deref());
        let display_name = custom.clone().unwrap_or_else(|| info.display_name());
        // `%` would otherwise be read as a template field
        let stem = custom
            .map(|name| name.replace('%', "%%"))
            .unwrap_or_else(|| DEFAULT_FILENAME_TEMPLATE.to_string());
        let output_template = request.output_dir.join(format!("{}.%(ext)s", stem));

        reporter.status(&format!("Downloading: {}", display_name));
        tracing::info!(engine = Self::NAME, id = ?info.id, "starting yt-dlp download");

        let mut child = Command::new(&self.ytdlp_bin)
            .args(self.build_download_args(&request.url, &output_template))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::ToolNotFound(format!("{}: {}", self.ytdlp_bin, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stderr".to_string()))?;

        let gate = ProgressGate::default();
        let (stdout_lines, stderr_lines) = tokio::join!(
            pump_lines(stdout, reporter, &gate),
            pump_lines(stderr, reporter, &gate)
        );

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::ExecutionError(format!("Process error: {}", e)))?;

        if !status.success() {
            let stderr_text = stderr_lines.join("\n");
            if let Some(reason) = diagnose_error(&stderr_text) {
                tracing::warn!(
                    reason = reason.description(),
                    hint = reason.hint(),
                    retryable = reason.is_retryable(),
                    proxy_configured = self.proxy.is_some(),
                    proxy_might_help = reason.proxy_might_help(),
                    "yt-dlp download failed"
                );
            }
            return Err(DownloadError::ExecutionError(diagnostics::summarize(&stderr_text)));
        }

        gate.report(
            reporter,
            ProgressLine {
                percent: 100.0,
                speed_bytes_per_sec: None,
            },
        );
        reporter.status("Processing download...");

        let final_path = stdout_lines
            .iter()
            .rev()
            .map(|l| l.trim())
            .find(|l| !l.starts_with('[') && !l.is_empty())
            .map(|l| {
                Path::new(l)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| l.to_string())
            })
            .unwrap_or(display_name);
        Ok(final_path)
    }
}

/// Keeps reported percentages non-decreasing across both output streams
#[derive(Default)]
struct ProgressGate {
    last: Mutex<f32>,
}

impl ProgressGate {
    fn report(&self, reporter: &ProgressReporter, line: ProgressLine) {
        let percent = {
            let Ok(mut last) = self.last.lock() else {
                return;
            };
            if line.percent < *last {
                return;
            }
            *last = line.percent;
            line.percent
        };
        reporter.progress(TransferProgress {
            percent,
            speed_bytes_per_sec: line.speed_bytes_per_sec,
        });
        let speed = line
            .speed_bytes_per_sec
            .map(|s| format!(" ({:.1} MB/s)", s / 1024.0 / 1024.0))
            .unwrap_or_default();
        reporter.status(&format!("Downloading... {:.1}%{}", percent, speed));
    }
}

/// Forward progress lines, return every other non-empty line
async fn pump_lines<R: AsyncRead + Unpin>(reader: R, reporter: &ProgressReporter, gate: &ProgressGate) -> Vec<String> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut rest = Vec::new();
    // Drain to EOF; lines that are not UTF-8 are decoded lossily
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "yt-dlp output read failed");
                break;
            }
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if let Some(progress) = parse_ytdlp_progress(line) {
            gate.report(reporter, progress);
        } else if !line.trim().is_empty() {
            tracing::debug!(target: "tiktok_downloader::ytdlp", "{}", line);
            rest.push(line.to_string());
        }
    }
    rest
}

#[async_trait]
impl DownloadEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn describe(&self) -> EngineDescriptor {
        EngineDescriptor {
            name: Self::NAME,
            description: "Advanced downloader with best compatibility",
            advantages: &[
                "Highest success rate",
                "Multiple quality options",
                "Regular updates",
                "Supports watermark removal",
            ],
            recommended: true,
        }
    }

    /// Live, metadata-only extraction
    async fn validate_url(&self, url: &str) -> UrlCheck {
        match self.extract_info(url).await {
            Ok(info) => UrlCheck::valid(info.title.unwrap_or_else(|| "Unknown content".to_string())),
            Err(e) => UrlCheck::invalid(e.to_string()),
        }
    }

    async fn download(&self, request: &DownloadRequest, reporter: &ProgressReporter) -> DownloadOutcome {
        match self.run(request, reporter).await {
            Ok(file_name) => {
                reporter.status("Download completed successfully!");
                DownloadOutcome::ok(format!("Download completed successfully: {}", file_name))
            }
            Err(e) => {
                tracing::warn!(engine = Self::NAME, kind = e.kind(), error = %e, "download failed");
                let message = format!("Download failed: {}", e);
                reporter.status(&message);
                DownloadOutcome::failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn missing_tool_engine() -> YtDlpEngine {
        YtDlpEngine::new(&EngineConfig::default().with_ytdlp_path(Some("/nonexistent/yt-dlp".into())))
    }

    #[test]
    fn test_descriptor() {
        let d = missing_tool_engine().describe();
        assert_eq!(d.name, "yt-dlp");
        assert!(d.recommended);
        assert_eq!(d.advantages[0], "Highest success rate");
    }

    #[test]
    fn test_download_args_use_fixed_selector() {
        let engine = YtDlpEngine::new(
            &EngineConfig::default()
                .with_ytdlp_path(Some("yt-dlp".into()))
                .with_proxy(Some("socks5h://127.0.0.1:1080".into())),
        );
        let args = engine.build_download_args("https://www.tiktok.com/@a/video/1", Path::new("/tmp/x.%(ext)s"));
        assert_eq!(args[0..2], ["-f".to_string(), "best[ext=mp4]/best".to_string()]);
        assert!(args.windows(2).any(|w| w[0] == "--proxy" && w[1] == "socks5h://127.0.0.1:1080"));
        assert!(args.windows(2).any(|w| w[0] == "--print" && w[1] == "after_move:filepath"));
        assert_eq!(args.last().map(String::as_str), Some("https://www.tiktok.com/@a/video/1"));
    }

    #[test]
    fn test_display_name_defaults() {
        let info = YtDlpInfo {
            title: Some("clip".into()),
            ..Default::default()
        };
        assert_eq!(info.display_name(), "【UnknownChannel｜tt@UnknownUploader】clip");
    }

    #[test]
    fn test_progress_gate_is_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::silent().on_progress(move |p| sink.lock().unwrap().push(p.percent));
        let gate = ProgressGate::default();
        for percent in [10.0, 50.0, 20.0, 100.0] {
            gate.report(&reporter, ProgressLine { percent, speed_bytes_per_sec: None });
        }
        assert_eq!(*seen.lock().unwrap(), vec![10.0, 50.0, 100.0]);
    }

    #[tokio::test]
    async fn test_pump_survives_invalid_utf8() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::silent().on_progress(move |p| sink.lock().unwrap().push(p.percent));
        let gate = ProgressGate::default();
        let output: &[u8] = b"\xff\xfe garbled\r\n[download]  42.0% of 1.00MiB at 1.00MiB/s ETA 00:01\n/tmp/out.mp4\n";

        let rest = pump_lines(output, &reporter, &gate).await;

        assert_eq!(*seen.lock().unwrap(), vec![42.0]);
        assert_eq!(rest.len(), 2);
        assert!(rest[0].ends_with("garbled"));
        assert_eq!(rest[1], "/tmp/out.mp4");
    }

    #[tokio::test]
    async fn test_missing_tool_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest::new("https://www.tiktok.com/@foo/video/12345", dir.path()).with_quality("1080p");
        let outcome = missing_tool_engine().download(&request, &ProgressReporter::silent()).await;
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Download failed: yt-dlp not found"));
    }

    #[tokio::test]
    async fn test_validate_reports_tool_error() {
        let check = missing_tool_engine().validate_url("https://www.tiktok.com/@foo/video/1").await;
        assert!(!check.valid);
        assert!(check.message.contains("yt-dlp not found"));
    }
}

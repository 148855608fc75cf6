// Helper functions for the yt-dlp engine

use regex::Regex;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::DownloadError;

/// Run command with timeout, capturing stdout and stderr
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DownloadError::ToolNotFound(format!("{}: {}", program, e)))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::ExecutionError(format!("Failed to capture stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::ExecutionError(format!("Failed to capture stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res
                .map_err(|e| DownloadError::ExecutionError(format!("Failed to wait for {}: {}", program, e)))?;
            let stdout = join_output(stdout_task).await?;
            let stderr = join_output(stderr_task).await?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::ExecutionError(format!("Timed out after {}s", timeout_secs)))
        }
    }
}

async fn join_output(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::ExecutionError(format!("output reader failed: {}", e)))?
        .map_err(|e| DownloadError::ExecutionError(format!("Failed to read output: {}", e)))
}

/// Find yt-dlp executable in common paths
pub fn find_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
        "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
        "/usr/bin/yt-dlp",
    ];

    common_paths
        .iter()
        .find(|path| std::path::Path::new(path).exists())
        .map(|path| path.to_string())
        .unwrap_or_else(|| "yt-dlp".to_string())
}

/// One parsed `[download]` progress line
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    pub percent: f32,
    pub speed_bytes_per_sec: Option<f64>,
}

lazy_static::lazy_static! {
    // [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32
    // [download] 100% of   12.40MiB in 00:00:02 at 5.63MiB/s
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+(?:\.\d+)?)%(?:.*?\bat\s+(\d+(?:\.\d+)?)\s*([KMGT]?i?B)/s)?"
    ).unwrap();
}

/// Parse a yt-dlp `--newline` progress line
pub fn parse_ytdlp_progress(line: &str) -> Option<ProgressLine> {
    let caps = PROGRESS_RE.captures(line)?;
    let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
    let speed_bytes_per_sec = match (caps.get(2), caps.get(3)) {
        (Some(value), Some(unit)) => parse_rate(value.as_str(), unit.as_str()),
        _ => None,
    };
    Some(ProgressLine {
        percent: percent.clamp(0.0, 100.0),
        speed_bytes_per_sec,
    })
}

fn parse_rate(value: &str, unit: &str) -> Option<f64> {
    let value: f64 = value.parse().ok()?;
    let multiplier = match unit {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return None,
    };
    Some(value * multiplier)
}

// Streamed HTTP transfer to a local file

use std::path::Path;
use std::time::Instant;

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::errors::DownloadError;
use super::models::TransferProgress;
use super::traits::ProgressReporter;

const WRITE_BUFFER: usize = 8 * 1024;

/// Stream `source_url` into `destination`.
///
/// Progress is only reported when the response declares a content length.
/// A failed transfer leaves whatever was written on disk.
pub async fn transfer(
    client: &reqwest::Client,
    source_url: &str,
    destination: &Path,
    reporter: &ProgressReporter,
) -> bool {
    match try_transfer(client, source_url, destination, reporter).await {
        Ok(bytes) => {
            tracing::info!(path = %destination.display(), bytes, "transfer complete");
            true
        }
        Err(e) => {
            tracing::warn!(url = source_url, path = %destination.display(), error = ?e, "transfer failed");
            false
        }
    }
}

async fn try_transfer(
    client: &reqwest::Client,
    source_url: &str,
    destination: &Path,
    reporter: &ProgressReporter,
) -> Result<u64, DownloadError> {
    let mut response = client
        .get(source_url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| DownloadError::TransferFailed(e.to_string()))?;

    let total = response.content_length().filter(|&len| len > 0);
    tracing::debug!(url = source_url, total = ?total, "transfer started");

    let file = File::create(destination)
        .await
        .map_err(|e| DownloadError::TransferFailed(format!("create {}: {}", destination.display(), e)))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER, file);

    let started = Instant::now();
    let mut downloaded: u64 = 0;
    let mut last_percent: f32 = 0.0;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| DownloadError::TransferFailed(e.to_string()))?
    {
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::TransferFailed(e.to_string()))?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total {
            let percent = ((downloaded as f64 / total as f64) * 100.0).min(100.0) as f32;
            last_percent = last_percent.max(percent);
            let elapsed = started.elapsed().as_secs_f64();
            reporter.progress(TransferProgress {
                percent: last_percent,
                speed_bytes_per_sec: (elapsed > 0.0).then(|| downloaded as f64 / elapsed),
            });
            reporter.status(&format!("Downloading... {:.1}%", last_percent));
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::TransferFailed(e.to_string()))?;
    Ok(downloaded)
}

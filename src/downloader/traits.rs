// Download engine trait definition

use async_trait::async_trait;
use std::sync::Arc;

use super::models::{DownloadOutcome, DownloadRequest, EngineDescriptor, TransferProgress, UrlCheck};

/// Contract shared by every download engine.
///
/// Callers stay engine-agnostic: none of these methods panics or returns
/// an error type, failures come back as `valid == false` / `success == false`
/// with a message meant to be shown verbatim.
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Name of the engine (for selection and logging)
    fn name(&self) -> &'static str;

    /// Static engine description
    fn describe(&self) -> EngineDescriptor;

    /// Check whether this engine can handle `url`
    async fn validate_url(&self, url: &str) -> UrlCheck;

    /// Download `request.url` into `request.output_dir`, reporting through `reporter`
    async fn download(&self, request: &DownloadRequest, reporter: &ProgressReporter) -> DownloadOutcome;
}

type ProgressFn = dyn Fn(TransferProgress) + Send + Sync;
type StatusFn = dyn Fn(&str) + Send + Sync;

/// Optional progress and status callbacks for one download.
///
/// Callbacks run on the engine's task; callers owning UI state marshal
/// from there themselves.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    on_progress: Option<Arc<ProgressFn>>,
    on_status: Option<Arc<StatusFn>>,
}

impl ProgressReporter {
    /// Reporter without callbacks
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl Fn(TransferProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn on_status(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Arc::new(f));
        self
    }

    pub fn progress(&self, progress: TransferProgress) {
        if let Some(f) = &self.on_progress {
            f(progress);
        }
    }

    pub fn status(&self, message: &str) {
        if let Some(f) = &self.on_status {
            f(message);
        }
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_status", &self.on_status.is_some())
            .finish()
    }
}

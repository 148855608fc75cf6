// Downloader module - engine abstraction over TikTok extraction and transfer

pub mod backends;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod extractors;
pub mod filename;
pub mod models;
pub mod orchestrator;
pub mod traits;
pub mod transfer;
pub mod utils;
pub mod validator;

pub use config::EngineConfig;
pub use errors::DownloadError;
pub use extractors::MetadataResolver;
pub use models::{DownloadOutcome, DownloadRequest, EngineDescriptor, TransferProgress, UrlCheck, VideoMetadata};
pub use orchestrator::{Downloader, EngineKind};
pub use traits::{DownloadEngine, ProgressReporter};

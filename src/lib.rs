pub mod downloader;
pub mod logging;

pub use downloader::{
    DownloadEngine, DownloadError, DownloadOutcome, DownloadRequest, Downloader, EngineConfig, EngineDescriptor,
    EngineKind, MetadataResolver, ProgressReporter, TransferProgress, UrlCheck, VideoMetadata,
};

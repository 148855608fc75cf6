// Download engines

pub mod direct;
pub mod ytdlp;

pub use direct::DirectApiEngine;
pub use ytdlp::{YtDlpEngine, YtDlpInfo};

// Network and tool configuration shared by the engines

use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120 Safari/537.36";

/// Configuration for page fetches, transfers and the yt-dlp engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Page fetch timeout in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub referer: String,
    /// HTTP or SOCKS5 proxy URL (e.g., "socks5h://127.0.0.1:1080")
    pub proxy: Option<String>,
    /// Explicit yt-dlp binary; discovered when unset
    pub ytdlp_path: Option<String>,
    /// Timeout for yt-dlp metadata-only runs
    pub metadata_timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            referer: "https://www.tiktok.com/".to_string(),
            proxy: None,
            ytdlp_path: None,
            metadata_timeout_seconds: 60,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `TIKTOK_DL_PROXY`, `TIKTOK_DL_YTDLP` and `TIKTOK_DL_TIMEOUT`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(proxy) = env_value("TIKTOK_DL_PROXY") {
            config.proxy = Some(proxy);
        }
        if let Some(path) = env_value("TIKTOK_DL_YTDLP") {
            config.ytdlp_path = Some(path);
        }
        if let Some(secs) = env_value("TIKTOK_DL_TIMEOUT").and_then(|s| s.parse().ok()) {
            config.timeout_seconds = secs;
        }
        config
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<String>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Client for page fetches: browser-like headers and a bounded timeout
    pub fn page_client(&self) -> reqwest::Result<reqwest::Client> {
        self.client_builder().timeout(self.timeout()).build()
    }

    /// Client for streamed transfers. Only the connect phase is bounded,
    /// a large video may legitimately take longer than the page timeout.
    pub fn transfer_client(&self) -> reqwest::Result<reqwest::Client> {
        self.client_builder().connect_timeout(self.timeout()).build()
    }

    fn client_builder(&self) -> reqwest::ClientBuilder {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&self.accept_language) {
            headers.insert(reqwest::header::ACCEPT_LANGUAGE, value);
        }
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&self.referer) {
            headers.insert(reqwest::header::REFERER, value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .default_headers(headers);

        if let Some(proxy_url) = self.proxy.as_deref() {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!(proxy = proxy_url, error = %e, "invalid proxy URL, using direct connection"),
            }
        }
        builder
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert!(config.proxy.is_none());
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_proxy(Some("socks5h://127.0.0.1:1080".into()))
            .with_timeout(3)
            .with_ytdlp_path(Some("/usr/bin/yt-dlp".into()));
        assert_eq!(config.timeout_seconds, 3);
        assert_eq!(config.ytdlp_path.as_deref(), Some("/usr/bin/yt-dlp"));
        assert!(config.page_client().is_ok());
    }
}

// Metadata resolver: page fetch, payload extraction, defaults

use regex::Regex;
use std::collections::HashMap;

use super::item::{self, ItemFields};
use super::strategies;
use crate::downloader::config::EngineConfig;
use crate::downloader::models::{VideoMetadata, BEST_QUALITY};

lazy_static::lazy_static! {
    static ref NUMERIC_ID_RE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref URL_VIDEO_ID_RE: Regex = Regex::new(r"/video/(\d+)").unwrap();
    static ref URL_HANDLE_RE: Regex = Regex::new(r"tiktok\.com/@([\w.-]+)").unwrap();
}

/// Resolves a TikTok URL (or bare numeric id) into a [`VideoMetadata`]
pub struct MetadataResolver {
    client: reqwest::Client,
}

impl MetadataResolver {
    pub fn new(config: &EngineConfig) -> Self {
        let client = config.page_client().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to build configured client, using defaults");
            reqwest::Client::new()
        });
        Self { client }
    }

    /// `None` when the page cannot be fetched or carries no usable record
    pub async fn resolve(&self, url_or_id: &str) -> Option<VideoMetadata> {
        let url = page_url(url_or_id.trim());
        let html = self.fetch_page(&url).await?;
        let metadata = extract_from_page(&html, &url);
        match &metadata {
            Some(m) => tracing::info!(id = %m.id, "metadata resolved"),
            None => tracing::info!(url = %url, "no usable metadata in page"),
        }
        metadata
    }

    async fn fetch_page(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url, error = %e, "page fetch failed");
                return None;
            }
        };
        match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(url, error = %e, "page body read failed");
                None
            }
        }
    }
}

/// Canonical URL guess for a bare numeric id. The account segment is left
/// empty, so such a URL rarely resolves.
pub fn page_url(url_or_id: &str) -> String {
    if NUMERIC_ID_RE.is_match(url_or_id) {
        format!("https://www.tiktok.com/@/video/{}", url_or_id)
    } else {
        url_or_id.to_string()
    }
}

/// Build a record from fetched page text; `url` supplies id/handle defaults
pub fn extract_from_page(html: &str, url: &str) -> Option<VideoMetadata> {
    let mut fields = strategies::first_payload(html)
        .map(|payload| item::fields_from_payload(&payload))
        .unwrap_or_default();

    if fields.media_url.is_none() {
        fields.media_url = item::find_mp4_url(html).map(|u| {
            tracing::debug!("media URL recovered by pattern search in page");
            u.to_string()
        });
    }

    finalize(fields, url)
}

fn finalize(fields: ItemFields, url: &str) -> Option<VideoMetadata> {
    let ItemFields {
        id,
        title,
        uploader,
        channel,
        media_url,
    } = fields;

    let media_url = media_url.map(|u| percent_decode(&u)).filter(|u| !u.is_empty())?;

    let id = id.or_else(|| {
        URL_VIDEO_ID_RE
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })?;

    let uploader = uploader.or_else(|| {
        URL_HANDLE_RE
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    });
    let title = title.unwrap_or_else(|| format!("TikTok_Video_{}", id));
    let channel = channel.or_else(|| uploader.as_deref().map(humanize));

    let mut download_urls = HashMap::new();
    download_urls.insert(BEST_QUALITY.to_string(), media_url);

    Some(VideoMetadata {
        id,
        title,
        uploader,
        channel,
        download_urls,
    })
}

fn percent_decode(url: &str) -> String {
    urlencoding::decode(url)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| url.to_string())
}

/// `beefy_dan` -> `Beefy Dan`
pub fn humanize(handle: &str) -> String {
    let spaced = handle.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut prev_alpha = false;
    for c in spaced.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

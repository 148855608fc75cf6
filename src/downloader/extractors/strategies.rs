// Page-text extraction strategies
//
// Each strategy looks for one known way TikTok embeds its state in the HTML
// and returns the parsed JSON, nothing else. They are tried in order and
// the first one that parses wins.

use regex::Regex;
use serde_json::Value;

/// Which embedding a payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// `<script id="__NEXT_DATA__">` style page-state blob
    PageState,
    /// `"ItemModule": { "<id>": {...} }` map
    ItemModule,
    /// Legacy `window.__INIT_PROPS__ = {...};`
    InitProps,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub kind: PayloadKind,
    pub value: Value,
}

pub type Strategy = fn(&str) -> Option<RawPayload>;

/// Strategies in the order they are tried
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("page-state", page_state),
    ("item-module", item_module),
    ("init-props", init_props),
];

lazy_static::lazy_static! {
    static ref PAGE_STATE_RE: Regex = Regex::new(
        r#"(?s)<script[^>]*\bid="(?:__NEXT_DATA__|__UNIVERSAL_DATA_FOR_REHYDRATION__)"[^>]*>(.*?)</script>"#
    ).unwrap();
    // The blob's closing delimiter depends on which section follows it
    static ref ITEM_MODULE_RES: [Regex; 2] = [
        Regex::new(r#"(?s)"ItemModule":\s*(\{.+?\})\s*,\s*"UserModule""#).unwrap(),
        Regex::new(r#"(?s)"ItemModule":\s*(\{.+?\})\s*\}\s*,\s*"VideoModule""#).unwrap(),
    ];
    static ref INIT_PROPS_RE: Regex = Regex::new(
        r#"(?s)window\.__INIT_PROPS__\s*=\s*(\{.+?\});\s*</script>"#
    ).unwrap();
}

/// First strategy that yields a payload
pub fn first_payload(html: &str) -> Option<RawPayload> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let payload = strategy(html);
        match &payload {
            Some(_) => tracing::debug!(strategy = name, "strategy matched"),
            None => tracing::debug!(strategy = name, "strategy found nothing"),
        }
        payload
    })
}

pub fn page_state(html: &str) -> Option<RawPayload> {
    let raw = PAGE_STATE_RE.captures(html)?.get(1)?.as_str().trim();
    lenient_json(raw).map(|value| RawPayload {
        kind: PayloadKind::PageState,
        value,
    })
}

/// Tries the `UserModule` boundary, then `VideoModule`. The second form is
/// also tried when the first one matches but its capture does not parse.
pub fn item_module(html: &str) -> Option<RawPayload> {
    ITEM_MODULE_RES
        .iter()
        .filter_map(|re| re.captures(html))
        .filter_map(|caps| caps.get(1))
        .find_map(|m| lenient_json(m.as_str()))
        .filter(Value::is_object)
        .map(|value| RawPayload {
            kind: PayloadKind::ItemModule,
            value,
        })
}

pub fn init_props(html: &str) -> Option<RawPayload> {
    let raw = INIT_PROPS_RE.captures(html)?.get(1)?.as_str();
    lenient_json(raw).map(|value| RawPayload {
        kind: PayloadKind::InitProps,
        value,
    })
}

/// Parse JSON, retrying once with HTML entities decoded
pub fn lenient_json(raw: &str) -> Option<Value> {
    serde_json::from_str(raw).ok().or_else(|| {
        let decoded = html_escape::decode_html_entities(raw);
        serde_json::from_str(&decoded).ok()
    })
}

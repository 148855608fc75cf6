// Locating the video item inside a parsed payload and pulling its fields

use regex::Regex;
use serde_json::Value;

use super::strategies::{PayloadKind, RawPayload};

/// Conventional locations of the item record, checked before searching
const ITEM_PATHS: &[&[&str]] = &[
    &["props", "pageProps", "itemInfo", "itemStruct"],
    &["initialProps", "pageProps", "itemInfo", "itemStruct"],
    &["pageProps", "itemInfo", "itemStruct"],
    &["__DEFAULT_SCOPE__", "webapp.video-detail", "itemInfo", "itemStruct"],
    &["itemInfo", "itemStruct"],
];

/// Where page-level user info lives when the item carries no author
const USER_PATHS: &[&[&str]] = &[
    &["props", "pageProps", "userInfo", "user"],
    &["props", "pageProps", "userInfo"],
    &["props", "pageProps", "user"],
    &["initialProps", "pageProps", "userInfo"],
    &["initialProps", "pageProps", "user"],
];

const AUTHOR_KEYS: &[&str] = &["author", "authorMeta", "authorName", "authorNickname"];
const HANDLE_KEYS: &[&str] = &["uniqueId", "name", "secUid", "id"];
const NICKNAME_KEYS: &[&str] = &["nickname", "nickName"];
const TITLE_KEYS: &[&str] = &["desc", "description", "title"];
const DOWNLOAD_KEYS: &[&str] = &["downloadAddr", "downloadUrl"];
const PLAY_KEYS: &[&str] = &["playAddr", "playAddrLow", "playAddrCulture"];

lazy_static::lazy_static! {
    static ref MP4_URL_RE: Regex = Regex::new(r#"https?://[^\s"']+\.mp4[^\s"']*"#).unwrap();
}

/// Fields recovered from a payload, each possibly missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFields {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub media_url: Option<String>,
}

/// Pull whatever fields the payload offers
pub fn fields_from_payload(payload: &RawPayload) -> ItemFields {
    match payload.kind {
        PayloadKind::ItemModule => fields_from_item_module(&payload.value),
        PayloadKind::PageState | PayloadKind::InitProps => {
            let Some(item) = locate_item(&payload.value) else {
                tracing::debug!("no item record in payload");
                return ItemFields::default();
            };
            let mut fields = fields_from_item(item);
            if fields.uploader.is_none() {
                if let Some(user) = USER_PATHS.iter().find_map(|path| value_at(&payload.value, path)) {
                    fields.uploader = first_string(user, HANDLE_KEYS);
                    fields.channel = fields.channel.or_else(|| first_string(user, NICKNAME_KEYS));
                }
            }
            fields
        }
    }
}

/// `ItemModule` maps video ids to items; the first entry is taken
fn fields_from_item_module(module: &Value) -> ItemFields {
    let Some((key, item)) = module.as_object().and_then(|map| map.iter().next()) else {
        return ItemFields::default();
    };
    let mut fields = fields_from_item(item);
    fields.id = fields.id.or_else(|| Some(key.clone()).filter(|k| !k.is_empty()));
    fields
}

/// Known key paths first, then a depth-first search
pub fn locate_item(root: &Value) -> Option<&Value> {
    ITEM_PATHS
        .iter()
        .find_map(|path| value_at(root, path).filter(|v| v.is_object()))
        .or_else(|| find_item_object(root))
}

/// First object (depth-first) carrying both an `id` and a `video` key
pub fn find_item_object(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if map.contains_key("id") && map.contains_key("video") {
                return Some(value);
            }
            map.values().find_map(find_item_object)
        }
        Value::Array(items) => items.iter().find_map(find_item_object),
        _ => None,
    }
}

pub fn fields_from_item(item: &Value) -> ItemFields {
    let video = item.get("video").filter(|v| v.is_object());

    let id = scalar_string(item.get("id")).or_else(|| video.and_then(|v| scalar_string(v.get("id"))));
    let title = first_string(item, TITLE_KEYS);

    let mut uploader = None;
    let mut channel = None;
    for key in AUTHOR_KEYS {
        match item.get(*key) {
            Some(author @ Value::Object(_)) => {
                uploader = uploader.or_else(|| first_string(author, HANDLE_KEYS));
                channel = channel.or_else(|| first_string(author, NICKNAME_KEYS));
            }
            Some(Value::String(name)) if !name.trim().is_empty() => {
                uploader = uploader.or_else(|| Some(name.clone()));
            }
            _ => {}
        }
    }

    let media_url = video
        .and_then(|v| {
            DOWNLOAD_KEYS
                .iter()
                .chain(PLAY_KEYS)
                .find_map(|key| v.get(*key).and_then(url_value))
        })
        .or_else(|| {
            let serialized = serde_json::to_string(item).ok()?;
            let found = MP4_URL_RE.find(&serialized)?;
            tracing::debug!("media URL recovered by pattern search in item");
            Some(html_escape::decode_html_entities(found.as_str()).into_owned())
        });

    ItemFields {
        id,
        title,
        uploader: uploader
            .map(|u| u.trim_start_matches('@').to_string())
            .filter(|u| !u.is_empty()),
        channel,
        media_url,
    }
}

/// First `.mp4` URL anywhere in `text`
pub fn find_mp4_url(text: &str) -> Option<&str> {
    MP4_URL_RE.find(text).map(|m| m.as_str())
}

fn value_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(*key))
}

fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| scalar_string(value.get(*key)))
}

/// Non-empty string, or a number rendered as a string
fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// URL held as a string, a list of strings, or an object with a URL list
fn url_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(url_value),
        Value::Object(map) => ["urlList", "UrlList", "url_list"]
            .iter()
            .find_map(|key| map.get(*key).and_then(url_value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_state(value: Value) -> RawPayload {
        RawPayload {
            kind: PayloadKind::PageState,
            value,
        }
    }

    #[test]
    fn test_conventional_path() {
        let payload = page_state(json!({
            "props": {"pageProps": {"itemInfo": {"itemStruct": {
                "id": "7557",
                "desc": "The one and only",
                "author": {"uniqueId": "beefy_dan", "nickname": "BeefyDan"},
                "video": {"playAddr": "https://v16.example.com/a.mp4?x=1", "downloadAddr": "https://v16.example.com/dl.mp4"}
            }}}}
        }));
        let fields = fields_from_payload(&payload);
        assert_eq!(fields.id.as_deref(), Some("7557"));
        assert_eq!(fields.title.as_deref(), Some("The one and only"));
        assert_eq!(fields.uploader.as_deref(), Some("beefy_dan"));
        assert_eq!(fields.channel.as_deref(), Some("BeefyDan"));
        assert_eq!(fields.media_url.as_deref(), Some("https://v16.example.com/dl.mp4"));
    }

    #[test]
    fn test_recursive_search_first_match() {
        let root = json!({
            "a": [{"noise": 1}, {"deep": {"id": 1, "video": {"playAddr": ["https://x/1.mp4"]}}}],
            "b": {"id": 2, "video": {}}
        });
        let item = find_item_object(&root).unwrap();
        assert_eq!(item["id"], json!(1));
        let fields = fields_from_item(item);
        assert_eq!(fields.id.as_deref(), Some("1"));
        assert_eq!(fields.media_url.as_deref(), Some("https://x/1.mp4"));
    }

    #[test]
    fn test_item_without_video_is_not_matched() {
        assert!(find_item_object(&json!({"id": 1, "desc": "x"})).is_none());
        assert!(locate_item(&json!([1, "two", null])).is_none());
    }

    #[test]
    fn test_item_module_takes_first_entry() {
        let payload = RawPayload {
            kind: PayloadKind::ItemModule,
            value: json!({
                "111": {"desc": "first", "author": "someone", "video": {"downloadAddr": "https://cdn/first.mp4"}},
                "222": {"desc": "second"}
            }),
        };
        let fields = fields_from_payload(&payload);
        assert_eq!(fields.id.as_deref(), Some("111"));
        assert_eq!(fields.title.as_deref(), Some("first"));
        assert_eq!(fields.uploader.as_deref(), Some("someone"));
        assert_eq!(fields.media_url.as_deref(), Some("https://cdn/first.mp4"));
    }

    #[test]
    fn test_author_meta_and_at_prefix() {
        let item = json!({
            "id": "9",
            "video": {},
            "authorMeta": {"name": "@handle", "nickName": "Display"}
        });
        let fields = fields_from_item(&item);
        assert_eq!(fields.uploader.as_deref(), Some("handle"));
        assert_eq!(fields.channel.as_deref(), Some("Display"));
        assert_eq!(fields.media_url, None);
    }

    #[test]
    fn test_play_addr_before_pattern_search() {
        let item = json!({
            "id": "6",
            "video": {"playAddr": "https://cdn.example/play?vid=6", "cover": "https://cdn.example/preview.mp4"}
        });
        assert_eq!(fields_from_item(&item).media_url.as_deref(), Some("https://cdn.example/play?vid=6"));
    }

    #[test]
    fn test_mp4_pattern_fallback_in_item() {
        let item = json!({
            "id": "5",
            "video": {"bitrateInfo": [{"PlayAddr": {"UrlList": ["https://cdn.example/v.mp4?a=1&amp;b=2"]}}]}
        });
        let fields = fields_from_item(&item);
        assert_eq!(fields.media_url.as_deref(), Some("https://cdn.example/v.mp4?a=1&b=2"));
    }

    #[test]
    fn test_user_fallback_from_page() {
        let payload = page_state(json!({
            "props": {"pageProps": {
                "userInfo": {"uniqueId": "pageuser", "nickname": "Page User"},
                "items": [{"id": "3", "video": {"playAddr": "https://a/b.mp4"}}]
            }}
        }));
        let fields = fields_from_payload(&payload);
        assert_eq!(fields.id.as_deref(), Some("3"));
        assert_eq!(fields.uploader.as_deref(), Some("pageuser"));
        assert_eq!(fields.channel.as_deref(), Some("Page User"));
    }

    #[test]
    fn test_find_mp4_url() {
        assert_eq!(
            find_mp4_url(r#"<video src="https://cdn/x.mp4?t=1"></video>"#),
            Some("https://cdn/x.mp4?t=1")
        );
        assert_eq!(find_mp4_url("no video"), None);
    }
}

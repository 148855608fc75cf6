// File name synthesis: 【{channel}｜tt@{uploader}】{title}.mp4

use regex::Regex;

use super::models::VideoMetadata;

const UNKNOWN_CHANNEL: &str = "UnknownUser";
const UNKNOWN_UPLOADER: &str = "unknown_id";
const UNKNOWN_TITLE: &str = "TikTok_Video";

lazy_static::lazy_static! {
    static ref ILLEGAL_FIELD_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*]"#).unwrap();
    static ref ILLEGAL_CUSTOM_CHARS: Regex = Regex::new(r#"[\\/*?:"<>]"#).unwrap();
}

/// Display file name for a resolved video.
///
/// Each field is sanitized on its own before interpolation so the
/// decorations themselves survive.
pub fn synthesize(metadata: &VideoMetadata) -> String {
    let uploader = non_blank(metadata.uploader.as_deref());
    let channel = non_blank(metadata.channel.as_deref())
        .or(uploader)
        .unwrap_or(UNKNOWN_CHANNEL);
    let uploader = uploader.unwrap_or(UNKNOWN_UPLOADER);
    let title = non_blank(Some(metadata.title.as_str())).unwrap_or(UNKNOWN_TITLE);

    format!(
        "【{}｜tt@{}】{}.mp4",
        sanitize_field(channel),
        sanitize_field(uploader),
        sanitize_field(title)
    )
}

/// Replace `< > : " / \ | ? *` with `_`
pub fn sanitize_field(text: &str) -> String {
    ILLEGAL_FIELD_CHARS.replace_all(text, "_").into_owned()
}

/// Caller-supplied name with `\ / * ? : " < >` removed; `None` when blank
pub fn sanitize_custom(name: Option<&str>) -> Option<String> {
    let name = name?.trim();
    if name.is_empty() {
        return None;
    }
    let cleaned = ILLEGAL_CUSTOM_CHARS.replace_all(name, "").trim().to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

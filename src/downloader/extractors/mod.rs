// Metadata extraction from TikTok pages
//
// A page is fetched once, then a fixed list of strategies looks for the
// JSON state TikTok embeds in it. The first payload that parses is searched
// for the video item; if that yields no media URL the raw page text is
// scanned for one. Nothing in here returns an error: every failure means
// "no record".

mod item;
mod resolver;
mod strategies;

pub use item::{fields_from_item, find_item_object, locate_item, ItemFields};
pub use resolver::{extract_from_page, humanize, page_url, MetadataResolver};
pub use strategies::{first_payload, PayloadKind, RawPayload, STRATEGIES};

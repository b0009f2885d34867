//! The Pocket v3 wire shapes and the derivations every backend shares.
//!
//! Each backend translator lives in its own sub-module and converts the
//! backend's native bookmark into these types. The HTTP layer serializes them
//! unchanged, so field names and encodings here are the protocol: booleans
//! travel as `"0"`/`"1"` strings, timestamps as whole Unix seconds.

mod hoarder;
mod wallabag;

pub use self::hoarder::{hoarder_article, hoarder_list};
pub use self::wallabag::{wallabag_article, wallabag_list};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;

use crate::error::{BackendError, BackendResult};

/// Reading speed used wherever a backend has no estimate of its own.
pub const WORDS_PER_MINUTE: u64 = 200;

/// Base URL for items that have no web address (notes). It never resolves;
/// it only exists to carry the `#id` fragment back to us.
pub const PLACEHOLDER_URL: &str = "https://website.notexist/";

/// One entry of a `/v3/get` listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PocketItem {
    pub item_id: String,
    pub resolved_id: String,
    pub given_title: String,
    pub given_url: String,
    pub resolved_title: String,
    pub resolved_url: String,
    pub has_image: String,
    pub word_count: String,
    pub image: PocketImage,
    pub favorite: String,
    pub time_added: String,
    pub time_to_read: u64,
    pub time_updated: String,
    pub time_read: String,
    pub status: String,
    pub time_favorited: String,
    pub sort_id: u32,
    pub is_article: String,
    pub is_index: String,
    pub lang: String,
    pub top_image_url: String,
    pub has_video: String,
    pub listen_duration_estimate: u32,
    pub authors: BTreeMap<String, PocketAuthor>,
    pub excerpt: String,
    pub images: BTreeMap<String, PocketImage>,
    pub domain_metadata: DomainMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PocketImage {
    pub image_id: String,
    pub src: String,
    pub width: String,
    pub height: String,
    pub item_id: String,
    pub caption: String,
    pub credit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PocketAuthor {
    pub item_id: String,
    pub author_id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainMetadata {
    pub name: String,
    pub logo: String,
    pub greyscale_logo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMeta {
    pub search_type: String,
}

/// The `/v3/get` response envelope.
///
/// Callers persist `since` and send it back on their next incremental call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PocketList {
    pub status: u8,
    pub complete: u8,
    pub list: BTreeMap<String, PocketItem>,
    pub search_meta: SearchMeta,
    pub error: Option<String>,
    pub since: i64,
}

impl PocketList {
    /// Key items by id. A repeated id keeps the last occurrence.
    pub fn new(status: u8, items: impl IntoIterator<Item = PocketItem>, since: i64) -> Self {
        let list = items
            .into_iter()
            .map(|item| (item.item_id.clone(), item))
            .collect();
        Self {
            status,
            complete: 1,
            list,
            search_meta: SearchMeta {
                search_type: "normal".to_string(),
            },
            error: None,
            since,
        }
    }
}

/// The `/v3beta/text` response: one article with its full body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PocketArticle {
    #[serde(rename = "resolved_id")]
    pub resolved_id: String,
    pub resolved_url: String,
    pub host: String,
    pub title: String,
    pub date_published: DateTime<Utc>,
    pub time_published: i64,
    pub response_code: u16,
    pub excerpt: String,
    pub authors: String,
    pub images: String,
    pub videos: String,
    pub word_count: u64,
    pub is_article: u8,
    pub is_video: u8,
    pub is_index: u8,
    pub used_fallback: u8,
    pub requires_login: u8,
    pub lang: String,
    pub top_image_url: String,
    pub article: String,
}

/// Encode a boolean the way Pocket clients parse it.
pub fn flag(value: bool) -> String {
    let encoded = if value { "1" } else { "0" };
    encoded.to_string()
}

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Minutes needed to read `words`, rounded up.
pub fn reading_time(words: u64) -> u64 {
    words.div_ceil(WORDS_PER_MINUTE)
}

/// Embed a backend id into a URL fragment so that a later URL-only call
/// (`/v3beta/text`) can recover the id.
pub fn slug_url(url: &str, id: &str) -> String {
    format!("{url}#{id}")
}

/// Recover the backend id from a slug URL: the last `#`-delimited segment,
/// or the whole string when there is no fragment.
pub fn item_id_from_url(url: &str) -> &str {
    url.rsplit('#').next().unwrap_or(url)
}

/// Authority (`host[:port]`) of `url`.
pub fn host_of(url: &str) -> BackendResult<String> {
    let parsed = Url::parse(url).map_err(|err| BackendError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    let host = parsed.host_str().ok_or_else(|| BackendError::InvalidUrl {
        url: url.to_string(),
        reason: "no host".to_string(),
    })?;
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Whole Unix seconds, as Pocket lists them.
pub fn unix_seconds(at: &DateTime<Utc>) -> String {
    at.timestamp().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_strings() {
        assert_eq!(flag(true), "1");
        assert_eq!(flag(false), "0");
    }

    #[test]
    fn counts_words_across_any_whitespace() {
        assert_eq!(word_count("Test content"), 2);
        assert_eq!(word_count("  one\ttwo\n\nthree  "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn reading_time_rounds_up() {
        assert_eq!(reading_time(0), 0);
        assert_eq!(reading_time(1), 1);
        assert_eq!(reading_time(200), 1);
        assert_eq!(reading_time(201), 2);
    }

    #[test]
    fn slug_round_trips_through_text_lookup() {
        let url = slug_url("https://a.example", "X");
        assert!(url.ends_with("#X"));
        assert_eq!(item_id_from_url(&url), "X");
    }

    #[test]
    fn extracts_trailing_fragment() {
        assert_eq!(item_id_from_url("https://site.test#abc123"), "abc123");
        assert_eq!(item_id_from_url("https://site.test/#a#b"), "b");
        assert_eq!(item_id_from_url("abc123"), "abc123");
    }

    #[test]
    fn host_keeps_port() {
        assert_eq!(host_of("https://a.example/x#1").unwrap(), "a.example");
        assert_eq!(host_of("http://localhost:8080/#1").unwrap(), "localhost:8080");
        assert_eq!(host_of(&slug_url(PLACEHOLDER_URL, "n1")).unwrap(), "website.notexist");
    }

    #[test]
    fn host_rejects_garbage() {
        assert!(matches!(
            host_of("not a url#1"),
            Err(BackendError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn list_keys_by_item_id() {
        let list = PocketList::new(1, Vec::new(), 42);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["status"], 1);
        assert_eq!(json["complete"], 1);
        assert_eq!(json["since"], 42);
        assert_eq!(json["search_meta"]["search_type"], "normal");
        assert!(json["error"].is_null());
        assert!(json["list"].as_object().unwrap().is_empty());
    }
}

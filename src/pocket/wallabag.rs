//! Wallabag entry -> Pocket shapes.
//!
//! Wallabag already estimates reading time, so the word count is derived
//! backwards from it rather than recounted.

use std::collections::BTreeMap;

use super::{
    flag, host_of, slug_url, unix_seconds, DomainMetadata, PocketArticle, PocketAuthor,
    PocketImage, PocketItem, PocketList, WORDS_PER_MINUTE,
};
use crate::backend::WallabagEntry;
use crate::error::BackendResult;

fn first_author(entry: &WallabagEntry) -> String {
    entry
        .published_by
        .as_ref()
        .and_then(|authors| authors.first())
        .cloned()
        .unwrap_or_default()
}

/// Word count implied by Wallabag's reading-time estimate.
fn estimated_words(entry: &WallabagEntry) -> u64 {
    entry.reading_time.saturating_mul(WORDS_PER_MINUTE)
}

pub fn wallabag_item(entry: &WallabagEntry) -> PocketItem {
    let id = entry.id.to_string();
    let url = slug_url(&entry.url, &id);
    let title = entry.title.clone().unwrap_or_default();
    let picture = entry.preview_picture.clone().unwrap_or_default();
    let updated = entry.updated_at.unwrap_or(entry.created_at);

    let mut authors = BTreeMap::new();
    authors.insert(
        "1".to_string(),
        PocketAuthor {
            item_id: "1".to_string(),
            author_id: "1".to_string(),
            name: first_author(entry),
            url: String::new(),
        },
    );

    PocketItem {
        resolved_id: entry.hashed_url.clone().unwrap_or_else(|| id.clone()),
        given_title: title.clone(),
        given_url: url.clone(),
        resolved_title: title,
        resolved_url: url,
        has_image: flag(!picture.is_empty()),
        word_count: estimated_words(entry).to_string(),
        image: PocketImage {
            image_id: id.clone(),
            src: picture.clone(),
            item_id: id.clone(),
            ..PocketImage::default()
        },
        favorite: flag(entry.is_starred),
        time_added: unix_seconds(&entry.created_at),
        time_to_read: entry.reading_time,
        time_updated: unix_seconds(&updated),
        time_read: String::new(),
        status: flag(entry.is_archived),
        time_favorited: entry
            .starred_at
            .as_ref()
            .map(unix_seconds)
            .unwrap_or_else(|| "0".to_string()),
        sort_id: 1,
        is_article: "1".to_string(),
        is_index: "0".to_string(),
        lang: entry.language.clone().unwrap_or_else(|| "en".to_string()),
        top_image_url: picture,
        has_video: "0".to_string(),
        listen_duration_estimate: 0,
        authors,
        excerpt: String::new(),
        images: BTreeMap::new(),
        domain_metadata: DomainMetadata::default(),
        item_id: id,
    }
}

/// The `/v3/get` envelope. An empty batch reports `status: 0` and echoes the
/// caller's `since`; otherwise `since` advances to the last entry's update.
pub fn wallabag_list(entries: &[WallabagEntry], since: i64) -> PocketList {
    let Some(last) = entries.last() else {
        return PocketList::new(0, Vec::new(), since);
    };
    let next_since = last.updated_at.unwrap_or(last.created_at).timestamp();
    PocketList::new(1, entries.iter().map(wallabag_item), next_since)
}

pub fn wallabag_article(entry: &WallabagEntry) -> BackendResult<PocketArticle> {
    let id = entry.id.to_string();
    let url = slug_url(&entry.url, &id);
    let picture = entry.preview_picture.clone().unwrap_or_default();

    Ok(PocketArticle {
        host: host_of(&url)?,
        resolved_id: id,
        resolved_url: url,
        title: entry.title.clone().unwrap_or_default(),
        date_published: entry.created_at,
        time_published: entry.created_at.timestamp(),
        response_code: 200,
        excerpt: String::new(),
        authors: first_author(entry),
        images: picture.clone(),
        videos: String::new(),
        word_count: estimated_words(entry),
        is_article: 1,
        is_video: 0,
        is_index: 0,
        used_fallback: 0,
        requires_login: 0,
        lang: entry.language.clone().unwrap_or_else(|| "en".to_string()),
        top_image_url: picture,
        article: entry.content.clone().unwrap_or_default(),
    })
}

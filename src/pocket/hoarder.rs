//! Hoarder bookmark -> Pocket shapes.

use std::collections::BTreeMap;

use super::{
    flag, host_of, reading_time, slug_url, unix_seconds, word_count, DomainMetadata,
    PocketArticle, PocketImage, PocketItem, PocketList, PLACEHOLDER_URL,
};
use crate::backend::{HoarderBookmark, HoarderContent};
use crate::error::{BackendError, BackendResult};
use crate::render::render;

/// Listing entry for one bookmark, or `None` when the bookmark has nothing a
/// Pocket client could read (a link that was never crawled, an asset).
pub fn hoarder_item(bookmark: &HoarderBookmark) -> Option<PocketItem> {
    let id = bookmark.id.as_str();
    let (url, text, image_url, favicon, fallback_title, description) = match &bookmark.content {
        HoarderContent::Link(link) => (
            slug_url(&link.url, id),
            link.html_content.as_deref()?,
            link.image_url.clone().unwrap_or_default(),
            link.favicon.clone().unwrap_or_default(),
            link.title.clone(),
            link.description.clone(),
        ),
        HoarderContent::Text(note) => (
            slug_url(PLACEHOLDER_URL, id),
            note.text.as_str(),
            String::new(),
            String::new(),
            None,
            None,
        ),
        HoarderContent::Unsupported => return None,
    };

    let words = word_count(text);
    let title = bookmark.title.clone().or(fallback_title).unwrap_or_default();
    let updated = bookmark.modified_at.unwrap_or(bookmark.created_at);

    Some(PocketItem {
        item_id: id.to_string(),
        resolved_id: id.to_string(),
        given_title: title.clone(),
        given_url: url.clone(),
        resolved_title: title,
        resolved_url: url,
        has_image: flag(!image_url.is_empty()),
        word_count: words.to_string(),
        image: PocketImage {
            image_id: if image_url.is_empty() {
                String::new()
            } else {
                id.to_string()
            },
            src: image_url.clone(),
            item_id: id.to_string(),
            ..PocketImage::default()
        },
        favorite: flag(bookmark.favourited),
        time_added: unix_seconds(&bookmark.created_at),
        time_to_read: reading_time(words),
        time_updated: unix_seconds(&updated),
        time_read: String::new(),
        status: flag(bookmark.archived),
        time_favorited: String::new(),
        sort_id: 1,
        is_article: "1".to_string(),
        is_index: "0".to_string(),
        lang: "en".to_string(),
        top_image_url: image_url,
        has_video: "0".to_string(),
        listen_duration_estimate: 0,
        authors: BTreeMap::new(),
        excerpt: bookmark.summary.clone().or(description).unwrap_or_default(),
        images: BTreeMap::new(),
        domain_metadata: DomainMetadata {
            logo: favicon,
            ..DomainMetadata::default()
        },
    })
}

/// The `/v3/get` envelope. Hoarder always reports success and echoes the
/// caller's `since` back.
pub fn hoarder_list(bookmarks: &[HoarderBookmark], since: i64) -> PocketList {
    PocketList::new(1, bookmarks.iter().filter_map(hoarder_item), since)
}

/// Full article for `/v3beta/text`. Notes are rendered from markdown.
pub fn hoarder_article(bookmark: &HoarderBookmark) -> BackendResult<PocketArticle> {
    let id = bookmark.id.as_str();
    let (url, article, words, image_url, fallback_title, description) = match &bookmark.content {
        HoarderContent::Link(link) => {
            let html = link.html_content.clone().unwrap_or_default();
            let words = word_count(&html);
            (
                slug_url(&link.url, id),
                html,
                words,
                link.image_url.clone().unwrap_or_default(),
                link.title.clone(),
                link.description.clone(),
            )
        }
        HoarderContent::Text(note) => (
            slug_url(PLACEHOLDER_URL, id),
            render(&note.text),
            word_count(&note.text),
            String::new(),
            None,
            None,
        ),
        HoarderContent::Unsupported => return Err(BackendError::UnsupportedContent(id.to_string())),
    };

    Ok(PocketArticle {
        resolved_id: id.to_string(),
        host: host_of(&url)?,
        resolved_url: url,
        title: bookmark.title.clone().or(fallback_title).unwrap_or_default(),
        date_published: bookmark.created_at,
        time_published: bookmark.created_at.timestamp(),
        response_code: 200,
        excerpt: bookmark.summary.clone().or(description).unwrap_or_default(),
        authors: String::new(),
        images: String::new(),
        videos: String::new(),
        word_count: words,
        is_article: 1,
        is_video: 0,
        is_index: 0,
        used_fallback: 0,
        requires_login: 0,
        lang: "en".to_string(),
        top_image_url: image_url,
        article,
    })
}

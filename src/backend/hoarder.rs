//! Hoarder backend.
//!
//! Hoarder speaks a bearer-token REST API over `/api/v1/bookmarks`, pages its
//! listing with an opaque `nextCursor`, and has no server-side "since"
//! filter. [`HoarderClient::fetch_since`] walks the cursor chain newest-first
//! and stops once a page's tail is older than the threshold.
//!
//! Hoarder's 404 answers are tolerated: the status is not raised as an HTTP
//! error and the body is decoded as if the call had succeeded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{BookmarkBackend, Verb};
use crate::error::{BackendError, BackendResult};
use crate::pocket::{self, PocketArticle, PocketList};

/// Connection settings for a Hoarder instance.
#[derive(Clone)]
pub struct HoarderConfig {
    /// Instance root, without a trailing slash.
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HoarderTag {
    pub id: String,
    pub name: String,
}

/// A bookmark as Hoarder returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoarderBookmark {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub favourited: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<HoarderTag>,
    pub content: HoarderContent,
}

/// What a bookmark points at. Hoarder tags the union with `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HoarderContent {
    Link(HoarderLink),
    Text(HoarderText),
    /// Assets and anything newer than this client knows about.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoarderLink {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub html_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HoarderText {
    pub text: String,
}

/// One page of the bookmark listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoarderPage {
    pub bookmarks: Vec<HoarderBookmark>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// The partial update Hoarder expects for `verb`.
pub fn patch_body(verb: Verb) -> Value {
    match verb {
        Verb::Archive => json!({ "archived": true }),
        Verb::Readd => json!({ "archived": false }),
        Verb::Favorite => json!({ "favourited": true }),
        Verb::Unfavorite => json!({ "favourited": false }),
    }
}

pub struct HoarderClient {
    http: reqwest::Client,
    config: HoarderConfig,
}

impl HoarderClient {
    pub fn new(http: reqwest::Client, config: HoarderConfig) -> Self {
        Self { http, config }
    }

    /// `{base}/api/v1/bookmarks`, plus `id` as one escaped path segment.
    ///
    /// Ids come straight from Pocket clients, so `/`, `?` and `#` inside
    /// them must never reach the path as separators.
    fn bookmarks_url(&self, id: Option<&str>) -> BackendResult<Url> {
        let invalid = |reason: String| BackendError::InvalidUrl {
            url: self.config.base_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.config.base_url)
            .map_err(|err| invalid(err.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid("not a base url".to_string()))?;
            segments.pop_if_empty().extend(["api", "v1", "bookmarks"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "hoarder request");
        self.http
            .request(method, url)
            .bearer_auth(&self.config.api_key)
    }

    /// Fetch one listing page, starting at `cursor` when given.
    pub async fn fetch_page(&self, cursor: Option<&str>) -> BackendResult<HoarderPage> {
        let mut request = self.request(Method::GET, self.bookmarks_url(None)?);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        let response = check(request.send().await?).await?;
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }
}

/// Pass 2xx and 404 through; turn every other status into an error carrying
/// the backend's `message`.
async fn check(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        tracing::debug!(url = %response.url(), "hoarder returned 404, passing body through");
        return Ok(response);
    }
    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl BookmarkBackend for HoarderClient {
    type Bookmark = HoarderBookmark;

    fn name(&self) -> &str {
        "hoarder"
    }

    async fn fetch_since(&self, since: i64) -> BackendResult<Vec<HoarderBookmark>> {
        let threshold_ms = since.saturating_mul(1000);
        let mut bookmarks = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(cursor.as_deref()).await?;
            pages += 1;
            if page.bookmarks.is_empty() {
                break;
            }

            // Pages are ordered newest first, so the tail tells us whether
            // anything past this page can still be newer than `since`.
            let next = match (page.next_cursor, page.bookmarks.last()) {
                (Some(next), Some(oldest))
                    if oldest.created_at.timestamp_millis() > threshold_ms =>
                {
                    Some(next)
                }
                _ => None,
            };
            bookmarks.extend(page.bookmarks);

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(pages, count = bookmarks.len(), since, "hoarder walk finished");
        Ok(bookmarks)
    }

    async fn fetch_one(&self, id: &str) -> BackendResult<HoarderBookmark> {
        let request = self.request(Method::GET, self.bookmarks_url(Some(id))?);
        let response = check(request.send().await?).await?;
        let missing = response.status() == StatusCode::NOT_FOUND;
        let body = response.bytes().await?;
        match serde_json::from_slice(&body) {
            Ok(bookmark) => Ok(bookmark),
            Err(_) if missing => Err(BackendError::NotFound(id.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_action(&self, item_id: &str, verb: Verb) -> BackendResult<()> {
        let response = self
            .request(Method::PATCH, self.bookmarks_url(Some(item_id))?)
            .json(&patch_body(verb))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn create(&self, url: &str) -> BackendResult<Option<HoarderBookmark>> {
        let response = self
            .request(Method::POST, self.bookmarks_url(None)?)
            .json(&json!({ "url": url, "type": "link" }))
            .send()
            .await?;
        let response = check(response).await?;
        Ok(Some(serde_json::from_slice(&response.bytes().await?)?))
    }

    async fn remove(&self, id: &str) -> BackendResult<()> {
        let request = self.request(Method::DELETE, self.bookmarks_url(Some(id))?);
        check(request.send().await?).await?;
        Ok(())
    }

    fn to_list(bookmarks: Vec<HoarderBookmark>, since: i64) -> PocketList {
        pocket::hoarder_list(&bookmarks, since)
    }

    fn to_article(bookmark: &HoarderBookmark) -> BackendResult<PocketArticle> {
        pocket::hoarder_article(bookmark)
    }
}

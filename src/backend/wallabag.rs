//! Wallabag backend.
//!
//! Wallabag uses OAuth2 password grants. Every operation first trades the
//! configured credentials for a fresh bearer token; nothing is cached between
//! calls. Entries are addressed by integer id.
//!
//! The listing is a single page of up to 100 entries, oldest update first.
//! Histories with more changes than that since the last sync are cut at the
//! first page.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use super::{BookmarkBackend, Verb};
use crate::error::{BackendError, BackendResult};
use crate::pocket::{self, PocketArticle, PocketList};

const PAGE_SIZE: &str = "100";

/// Connection settings for a Wallabag instance.
#[derive(Clone)]
pub struct WallabagConfig {
    /// Instance root, without a trailing slash.
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WallabagTag {
    pub id: i64,
    pub label: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// An entry as Wallabag returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WallabagEntry {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub hashed_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Extracted article HTML.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub starred_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "int_or_bool")]
    pub is_archived: bool,
    #[serde(default, deserialize_with = "int_or_bool")]
    pub is_starred: bool,
    /// Wallabag's own estimate, in minutes.
    #[serde(default)]
    pub reading_time: u64,
    #[serde(default)]
    pub preview_picture: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub published_by: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Vec<WallabagTag>,
}

#[derive(Deserialize)]
struct EntriesPage {
    #[serde(rename = "_embedded")]
    embedded: Embedded,
}

#[derive(Deserialize)]
struct Embedded {
    items: Vec<WallabagEntry>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Wallabag writes offsets without a colon (`+0200`); accept both forms.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn int_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
    })
}

/// The partial update Wallabag expects for `verb`.
pub fn patch_body(verb: Verb) -> Value {
    match verb {
        Verb::Archive => json!({ "archive": 1 }),
        Verb::Readd => json!({ "archive": 0 }),
        Verb::Favorite => json!({ "starred": 1 }),
        Verb::Unfavorite => json!({ "starred": 0 }),
    }
}

/// Entry ids are integers; reject anything else before it reaches a URL.
fn entry_id(id: &str) -> BackendResult<i64> {
    id.trim()
        .parse()
        .map_err(|_| BackendError::InvalidId(id.to_string()))
}

pub struct WallabagClient {
    http: reqwest::Client,
    config: WallabagConfig,
}

impl WallabagClient {
    pub fn new(http: reqwest::Client, config: WallabagConfig) -> Self {
        Self { http, config }
    }

    fn entries_url(&self) -> String {
        format!("{}/api/entries", self.config.base_url)
    }

    fn entry_url(&self, id: i64) -> String {
        format!("{}/{id}", self.entries_url())
    }

    /// Exchange the configured credentials for a bearer token.
    pub async fn login(&self) -> BackendResult<String> {
        let form = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];
        let response = self
            .http
            .post(format!("{}/oauth/v2/token", self.config.base_url))
            .form(&form)
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;
        Ok(token.access_token)
    }

    /// Log in, then start a request carrying the fresh token.
    async fn authorized(&self, method: Method, url: String) -> BackendResult<RequestBuilder> {
        let token = self.login().await?;
        tracing::debug!(%method, %url, "wallabag request");
        Ok(self.http.request(method, url).bearer_auth(token))
    }
}

async fn check(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(BackendError::Status {
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or_default().to_string(),
    })
}

#[async_trait]
impl BookmarkBackend for WallabagClient {
    type Bookmark = WallabagEntry;

    fn name(&self) -> &str {
        "wallabag"
    }

    async fn fetch_since(&self, since: i64) -> BackendResult<Vec<WallabagEntry>> {
        let since = since.to_string();
        let response = self
            .authorized(Method::GET, self.entries_url())
            .await?
            .query(&[
                ("perPage", PAGE_SIZE),
                ("order", "asc"),
                ("detail", "metadata"),
                ("sort", "updated"),
                ("since", since.as_str()),
            ])
            .send()
            .await?;
        let page: EntriesPage = serde_json::from_slice(&check(response).await?.bytes().await?)?;
        Ok(page.embedded.items)
    }

    async fn fetch_one(&self, id: &str) -> BackendResult<WallabagEntry> {
        let id = entry_id(id)?;
        let response = self
            .authorized(Method::GET, self.entry_url(id))
            .await?
            .send()
            .await?;
        Ok(serde_json::from_slice(&check(response).await?.bytes().await?)?)
    }

    async fn apply_action(&self, item_id: &str, verb: Verb) -> BackendResult<()> {
        let id = entry_id(item_id)?;
        let response = self
            .authorized(Method::PATCH, self.entry_url(id))
            .await?
            .json(&patch_body(verb))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn create(&self, url: &str) -> BackendResult<Option<WallabagEntry>> {
        let response = self
            .authorized(Method::POST, self.entries_url())
            .await?
            .json(&json!({ "url": url }))
            .send()
            .await?;
        let body = check(response).await?.bytes().await?;
        // A success status means the entry exists; the body is informational.
        match serde_json::from_slice(&body) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                tracing::warn!(error = %err, %url, "wallabag created entry with unreadable body");
                Ok(None)
            }
        }
    }

    async fn remove(&self, id: &str) -> BackendResult<()> {
        let id = entry_id(id)?;
        let response = self
            .authorized(Method::DELETE, self.entry_url(id))
            .await?
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn to_list(entries: Vec<WallabagEntry>, since: i64) -> PocketList {
        pocket::wallabag_list(&entries, since)
    }

    fn to_article(entry: &WallabagEntry) -> BackendResult<PocketArticle> {
        pocket::wallabag_article(entry)
    }
}

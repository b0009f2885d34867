//! Backend abstraction layer.
//!
//! This module defines the [`BookmarkBackend`] trait every bookmark service
//! implements, and the object-safe [`PocketBackend`] view the HTTP layer and
//! the dispatcher work against. Concrete clients live in sub-modules.
//!
//! ## Adding a backend
//!
//! 1. Create a new file in this directory with a client struct and its
//!    native bookmark type.
//! 2. Implement [`BookmarkBackend`] for the client, pointing `to_list` and
//!    `to_article` at a translator in `crate::pocket`.
//! 3. Add a variant to [`BackendConfig`] and construct the client in
//!    [`BackendConfig::connect`].
//!
//! The dispatcher, routes and gate are backend-agnostic.

pub(crate) mod hoarder;
pub(crate) mod wallabag;

pub use hoarder::{HoarderBookmark, HoarderClient, HoarderConfig, HoarderContent};
pub use wallabag::{WallabagClient, WallabagConfig, WallabagEntry};

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{BackendError, BackendResult};
use crate::pocket::{PocketArticle, PocketList};

/// An in-place mutation a Pocket client can request on an existing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Archive,
    Readd,
    Favorite,
    Unfavorite,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Archive => "archive",
            Verb::Readd => "readd",
            Verb::Favorite => "favorite",
            Verb::Unfavorite => "unfavorite",
        }
    }
}

impl FromStr for Verb {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "archive" => Ok(Verb::Archive),
            "readd" => Ok(Verb::Readd),
            "favorite" => Ok(Verb::Favorite),
            "unfavorite" => Ok(Verb::Unfavorite),
            other => Err(BackendError::UnsupportedAction(other.to_string())),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The capability set every bookmark service provides.
///
/// Each implementation owns its transport, authentication and pagination,
/// and names the translator that turns its native records into Pocket
/// shapes.
#[async_trait]
pub trait BookmarkBackend: Send + Sync {
    /// The backend's native record.
    type Bookmark: Send + 'static;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Every bookmark at or after `since` (Unix seconds).
    async fn fetch_since(&self, since: i64) -> BackendResult<Vec<Self::Bookmark>>;

    async fn fetch_one(&self, id: &str) -> BackendResult<Self::Bookmark>;

    async fn apply_action(&self, item_id: &str, verb: Verb) -> BackendResult<()>;

    /// Add `url`. `None` when the backend acknowledged the add but sent back
    /// nothing decodable.
    async fn create(&self, url: &str) -> BackendResult<Option<Self::Bookmark>>;

    async fn remove(&self, id: &str) -> BackendResult<()>;

    /// Build the `/v3/get` envelope for a fetched batch.
    fn to_list(bookmarks: Vec<Self::Bookmark>, since: i64) -> PocketList;

    fn to_article(bookmark: &Self::Bookmark) -> BackendResult<PocketArticle>;
}

/// A backend seen through the Pocket protocol.
///
/// Blanket-implemented for every [`BookmarkBackend`], so callers can hold a
/// `Box<dyn PocketBackend>` without knowing the native record type.
#[async_trait]
pub trait PocketBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn list_since(&self, since: i64) -> BackendResult<PocketList>;

    async fn article(&self, item_id: &str) -> BackendResult<PocketArticle>;

    async fn modify(&self, item_id: &str, verb: Verb) -> BackendResult<()>;

    async fn add(&self, url: &str) -> BackendResult<()>;

    async fn delete(&self, item_id: &str) -> BackendResult<()>;
}

#[async_trait]
impl<B> PocketBackend for B
where
    B: BookmarkBackend,
{
    fn name(&self) -> &str {
        BookmarkBackend::name(self)
    }

    async fn list_since(&self, since: i64) -> BackendResult<PocketList> {
        let bookmarks = self.fetch_since(since).await?;
        tracing::debug!(
            backend = BookmarkBackend::name(self),
            count = bookmarks.len(),
            since,
            "fetched bookmarks"
        );
        Ok(B::to_list(bookmarks, since))
    }

    async fn article(&self, item_id: &str) -> BackendResult<PocketArticle> {
        let bookmark = self.fetch_one(item_id).await?;
        B::to_article(&bookmark)
    }

    async fn modify(&self, item_id: &str, verb: Verb) -> BackendResult<()> {
        self.apply_action(item_id, verb).await
    }

    async fn add(&self, url: &str) -> BackendResult<()> {
        self.create(url).await.map(|_| ())
    }

    async fn delete(&self, item_id: &str) -> BackendResult<()> {
        self.remove(item_id).await
    }
}

/// Which backend to talk to, and how to reach it.
#[derive(Clone)]
pub enum BackendConfig {
    Hoarder(HoarderConfig),
    Wallabag(WallabagConfig),
}

impl BackendConfig {
    /// Build a fresh client for one request. Clients hold only configuration
    /// and a handle to the shared connection pool.
    pub fn connect(&self, http: &reqwest::Client) -> Box<dyn PocketBackend> {
        match self {
            BackendConfig::Hoarder(config) => {
                Box::new(HoarderClient::new(http.clone(), config.clone()))
            }
            BackendConfig::Wallabag(config) => {
                Box::new(WallabagClient::new(http.clone(), config.clone()))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Hoarder(_) => "hoarder",
            BackendConfig::Wallabag(_) => "wallabag",
        }
    }
}

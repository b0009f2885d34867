//! Error types shared by the backend clients and translators.

use thiserror::Error;

/// Everything that can go wrong between receiving a Pocket call and handing
/// back a translated response.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced a response (DNS, connect, TLS, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a status we do not tolerate.
    #[error("HTTP error! status: {status}, message: {message}")]
    Status { status: u16, message: String },

    /// The backend reported the item missing and gave us nothing usable.
    #[error("bookmark not found: {0}")]
    NotFound(String),

    /// The action verb is not one the Pocket protocol maps onto a backend.
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    /// The item id cannot address anything on this backend.
    #[error("invalid item id: {0}")]
    InvalidId(String),

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The bookmark holds content the Pocket shapes cannot express.
    #[error("unsupported content on bookmark {0}")]
    UnsupportedContent(String),

    #[error("could not decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

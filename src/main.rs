//! pocket-bridge: a Pocket v3 API front for self-hosted bookmark services.
//!
//! ## Architecture overview
//!
//! ```text
//! Pocket client ─► server.rs ─► dispatch.rs ─► backend/ ─► Hoarder / Wallabag
//!                  (gate,       (/v3/send      (HTTP clients,
//!                   routes)      batches)       pagination)
//!                     ▲                            │
//!                     └─────── pocket/ ◄───────────┘
//!                          (native -> Pocket shapes)
//! ```
//!
//! * **`backend/`**: the `BookmarkBackend` trait and one client per service.
//! * **`pocket/`**: Pocket wire types and the per-backend translators.
//! * **`dispatch`**: splits a `/v3/send` batch and runs it concurrently.
//! * **`server`**: axum router, access-token gate and error mapping.
//! * **`render`**: markdown to HTML for note bookmarks.
//! * **`config`** / **`logging`**: environment and tracing setup.
//! * **`main`**: wires everything together and serves until ctrl-c.

mod backend;
mod config;
mod dispatch;
mod error;
mod logging;
mod pocket;
mod render;
mod server;

use anyhow::{Context, Result};

use config::Config;
use server::AppState;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    logging::init(env!("CARGO_PKG_NAME"));

    // -- configuration -------------------------------------------------------
    let config = Config::from_env()?;

    // -- shared connection pool ----------------------------------------------
    // Backend clients are rebuilt per request; only this pool is shared.
    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build http client")?;

    tracing::info!(backend = config.backend.kind(), addr = %config.addr, "starting");

    // -- serve -----------------------------------------------------------------
    let state = AppState::new(config.backend, http, &config.access_token);
    server::serve(config.addr, server::router(state)).await
}

//! Environment configuration, read once at startup.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

use crate::backend::{BackendConfig, HoarderConfig, WallabagConfig};

const DEFAULT_ADDR: &str = "0.0.0.0:8787";

pub struct Config {
    pub addr: SocketAddr,
    /// Shared secret every Pocket client passes as `?access_token=`.
    pub access_token: String,
    pub backend: BackendConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).with_context(|| format!("missing env: {name}"))
        };
        let base_url = |name: &str| {
            required(name).map(|url| url.trim_end_matches('/').to_string())
        };

        let addr_value = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = SocketAddr::from_str(&addr_value)
            .map_err(|err| anyhow!("invalid socket addr for LISTEN_ADDR: {err}"))?;

        let backend = match lookup("BACKEND").as_deref().unwrap_or("hoarder") {
            "hoarder" => BackendConfig::Hoarder(HoarderConfig {
                base_url: base_url("HOARDER_URL")?,
                api_key: required("HOARDER_API_KEY")?,
            }),
            "wallabag" => BackendConfig::Wallabag(WallabagConfig {
                base_url: base_url("WALLABAG_URL")?,
                username: required("WALLABAG_USERNAME")?,
                password: required("WALLABAG_PASSWORD")?,
                client_id: required("WALLABAG_CLIENT_ID")?,
                client_secret: required("WALLABAG_CLIENT_SECRET")?,
            }),
            other => bail!("unknown BACKEND {other:?}, expected \"hoarder\" or \"wallabag\""),
        };

        Ok(Self {
            addr,
            access_token: required("ACCESS_TOKEN")?,
            backend,
        })
    }
}

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::util::parse_positive_millis;

const BACKEND_URL_ENV: &str = "ATTACHE_BACKEND_URL";
const REQUEST_TIMEOUT_ENV: &str = "ATTACHE_REQUEST_TIMEOUT_MS";
const POLL_INTERVAL_ENV: &str = "ATTACHE_POLL_INTERVAL_MS";

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        let backend_url = std::env::var(BACKEND_URL_ENV)
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        Ok(Self {
            backend_url,
            request_timeout: resolve_millis(REQUEST_TIMEOUT_ENV, DEFAULT_REQUEST_TIMEOUT_MS),
            poll_interval: resolve_millis(POLL_INTERVAL_ENV, DEFAULT_POLL_INTERVAL_MS),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            bail!(
                "Invalid {} '{}': expected http:// or https:// URL",
                BACKEND_URL_ENV,
                self.backend_url
            );
        }

        Ok(())
    }
}

/// Non-numeric and non-positive values fall back to the default.
fn resolve_millis(var: &str, default_ms: u64) -> Duration {
    let configured = std::env::var(var)
        .ok()
        .and_then(|v| parse_positive_millis(&v));
    Duration::from_millis(configured.unwrap_or(default_ms))
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Connection settings for the REST record and object storage API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfiguration {
    /// API root, e.g. `https://project.example.co`.
    pub base_url: String,

    /// Sent both as the `apikey` header and as the bearer token.
    pub api_key: String,

    /// Per-request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl RestConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        parse_http_url(&self.base_url)?;
        if self.timeout_secs == 0 {
            return Err("timeout must be positive".into());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RestConfiguration {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".into(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Settings for the HLS decoder backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HlsConfiguration {
    /// Origin the viewer page is served from. Proxied stream addresses
    /// such as `/proxy-a/cam.m3u8` are resolved against it.
    pub page_origin: String,

    /// Failed fetches retried before the stream is declared dead (default: 3).
    pub max_fetch_retries: u32,

    /// Pause between retries in milliseconds (default: 1000).
    pub retry_delay_ms: u64,

    /// Lower bound for the live playlist poll interval (default: 500).
    pub min_poll_ms: u64,
}

impl HlsConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        parse_http_url(&self.page_origin)?;
        if self.min_poll_ms == 0 {
            return Err("poll interval must be positive".into());
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn min_poll(&self) -> Duration {
        Duration::from_millis(self.min_poll_ms)
    }
}

impl Default for HlsConfiguration {
    fn default() -> Self {
        Self {
            page_origin: "http://localhost:8080".into(),
            max_fetch_retries: 3,
            retry_delay_ms: 1000,
            min_poll_ms: 500,
        }
    }
}

pub(crate) fn parse_http_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|e| format!("invalid url {:?}: {}", value, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme {:?} in {:?}", other, value)),
    }
}

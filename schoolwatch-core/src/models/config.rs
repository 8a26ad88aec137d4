use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// One gateway → same-origin proxy mapping used by the address translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRoute {
    /// Plain-transport origin including port, e.g. `http://GATEWAY_A:8001`.
    pub gateway_origin: String,
    /// Same-origin path prefix that proxies the gateway, e.g. `/proxy-a`.
    pub proxy_prefix: String,
}

impl ProxyRoute {
    pub fn new(gateway_origin: impl Into<String>, proxy_prefix: impl Into<String>) -> Self {
        Self {
            gateway_origin: gateway_origin.into(),
            proxy_prefix: proxy_prefix.into(),
        }
    }
}

/// Gateways proxied by the portal.
pub const DEFAULT_PROXY_ROUTES: [(&str, &str); 2] = [
    ("http://GATEWAY_A:8001", "/proxy-a"),
    ("http://GATEWAY_B:8002", "/proxy-b"),
];

/// What to do with a plain `http://` source that no proxy route covers
/// when the page itself is served over https.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOriginPolicy {
    /// Hand the address to the decoder unchanged; playback fails later.
    #[default]
    PassThrough,
    /// Fail the attach immediately with `StreamError::MixedContent`.
    Reject,
}

/// Configuration for the stream session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfiguration {
    /// Whether the hosting page is served over a secure transport.
    pub page_is_secure: bool,

    pub proxy_routes: Vec<ProxyRoute>,

    pub unknown_origin_policy: UnknownOriginPolicy,

    /// Seconds between decoder refreshes (default: 30).
    pub refresh_interval_secs: u64,
}

impl StreamConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.refresh_interval_secs == 0 {
            return Err("refresh interval must be positive".into());
        }
        for route in &self.proxy_routes {
            if !route.gateway_origin.starts_with("http://") {
                return Err(format!(
                    "gateway origin must use plain http: {}",
                    route.gateway_origin
                ));
            }
            if !route.proxy_prefix.starts_with('/') {
                return Err(format!(
                    "proxy prefix must be an absolute path: {}",
                    route.proxy_prefix
                ));
            }
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for StreamConfiguration {
    fn default() -> Self {
        Self {
            page_is_secure: false,
            proxy_routes: DEFAULT_PROXY_ROUTES
                .iter()
                .map(|(origin, prefix)| ProxyRoute::new(*origin, *prefix))
                .collect(),
            unknown_origin_policy: UnknownOriginPolicy::PassThrough,
            refresh_interval_secs: 30,
        }
    }
}

/// Configuration for the media capture controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Chunk collection cadence in milliseconds (default: 1000).
    /// The elapsed-seconds counter advances with these ticks.
    pub chunk_interval_ms: u64,

    /// Recording content types in descending preference. The last entry is
    /// used when the device supports none of them.
    pub preferred_content_types: Vec<String>,

    /// Stop automatically after this many seconds (None = unlimited).
    pub max_duration_secs: Option<u64>,

    pub capture_audio: bool,

    pub capture_video: bool,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_interval_ms == 0 {
            return Err("chunk interval must be positive".into());
        }
        if self.preferred_content_types.is_empty() {
            return Err("at least one content type is required".into());
        }
        if !self.capture_audio && !self.capture_video {
            return Err("nothing to capture: audio and video are both disabled".into());
        }
        if self.max_duration_secs == Some(0) {
            return Err("max duration must be positive".into());
        }
        Ok(())
    }

    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_interval_ms)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            chunk_interval_ms: 1000,
            preferred_content_types: vec!["video/mp4".into(), "video/webm".into()],
            max_duration_secs: None,
            capture_audio: true,
            capture_video: true,
        }
    }
}

/// Storage locations used by the secure pickup pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupConfiguration {
    pub photo_bucket: String,
    pub video_bucket: String,
    pub photo_prefix: String,
    pub video_prefix: String,
    pub requests_collection: String,
}

impl PickupConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("photo_bucket", &self.photo_bucket),
            ("video_bucket", &self.video_bucket),
            ("requests_collection", &self.requests_collection),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }
        Ok(())
    }
}

impl Default for PickupConfiguration {
    fn default() -> Self {
        Self {
            photo_bucket: "secure-pickup".into(),
            video_bucket: "secure-pickup".into(),
            photo_prefix: "photos".into(),
            video_prefix: "videos".into(),
            requests_collection: "pickup_requests".into(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfiguration {
    pub stream: StreamConfiguration,
    pub capture: CaptureConfiguration,
    pub pickup: PickupConfiguration,
}

impl PortalConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        self.stream.validate()?;
        self.capture.validate()?;
        self.pickup.validate()?;
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

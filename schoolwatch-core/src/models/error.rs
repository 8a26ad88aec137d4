use thiserror::Error;

use super::camera::CameraId;

/// Errors raised by the media capture controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device access denied")]
    DeviceAccessDenied,

    #[error("device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("a finished recording is awaiting review; discard it first")]
    PreviewPending,

    #[error("recorder failed: {0}")]
    RecorderFailed(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

/// Errors raised while attaching or playing a camera stream.
///
/// `Network` and `Decode` carry a `fatal` flag. Non-fatal errors are
/// recovered inside the decoder; fatal ones tear the camera's session down.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("network error ({}): {detail}", severity(.fatal))]
    Network { fatal: bool, detail: String },

    #[error("decode error ({}): {detail}", severity(.fatal))]
    Decode { fatal: bool, detail: String },

    #[error("blocked mixed-content source: {0}")]
    MixedContent(String),

    #[error("camera registry error: {0}")]
    Registry(String),

    #[error("no session for camera {0}")]
    SessionNotFound(CameraId),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

fn severity(fatal: &bool) -> &'static str {
    if *fatal {
        "fatal"
    } else {
        "recoverable"
    }
}

impl StreamError {
    pub fn network(fatal: bool, detail: impl Into<String>) -> Self {
        Self::Network {
            fatal,
            detail: detail.into(),
        }
    }

    pub fn decode(fatal: bool, detail: impl Into<String>) -> Self {
        Self::Decode {
            fatal,
            detail: detail.into(),
        }
    }

    /// Whether this error ends the session it was reported on.
    ///
    /// Everything other than a recoverable network/decode fault is fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Network { fatal, .. } | Self::Decode { fatal, .. } => *fatal,
            _ => true,
        }
    }
}

/// Errors returned by the asset and record stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("store responded with status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("malformed store response: {0}")]
    Decode(String),
}

/// Which step of a pickup submission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Photo,
    Video,
    Record,
}

impl std::fmt::Display for UploadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Photo => "photo upload",
            Self::Video => "video upload",
            Self::Record => "record creation",
        };
        f.write_str(name)
    }
}

/// Errors returned by the secure pickup upload pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PickupError {
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// A store call failed. Assets uploaded by earlier steps are listed in
    /// `orphaned`; they are not removed.
    #[error("{stage} failed: {source}")]
    Upload {
        stage: UploadStage,
        orphaned: Vec<super::pickup::AssetReference>,
        #[source]
        source: StoreError,
    },

    #[error("failed to encode pickup record: {0}")]
    Encoding(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

/// Errors raised while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

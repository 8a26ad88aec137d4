use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A binary asset ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub data: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl MediaAsset {
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            data,
            content_type: content_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension derived from the content type, ignoring codec parameters.
    pub fn extension(&self) -> &'static str {
        let essence = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            "video/mp4" => "mp4",
            "video/webm" => "webm",
            "video/quicktime" => "mov",
            _ => "bin",
        }
    }
}

/// A finished recording produced by the capture controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAsset {
    pub data: Vec<u8>,
    /// The content type negotiated when recording started.
    pub content_type: String,
    pub duration_secs: u64,
    /// SHA-256 hex digest of `data`.
    pub checksum: String,
}

impl RecordedAsset {
    pub fn to_media_asset(&self) -> MediaAsset {
        MediaAsset::new(self.data.clone(), self.content_type.clone())
    }
}

/// Where an uploaded asset lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    pub bucket: String,
    pub path: String,
    pub public_url: String,
}

/// Review status of a pickup request. This crate only ever writes `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickupStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

/// A durable consent record authorizing someone to collect a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupRequest {
    pub id: String,
    pub requester_name: String,
    pub requester_document: String,
    pub photo_url: String,
    pub video_url: String,
    pub student_id: String,
    pub status: PickupStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_sha256: Option<String>,
}

/// Form input for a pickup submission.
///
/// Fields are optional so a half-filled form can be represented; the
/// pipeline reports everything that is missing in one error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickupSubmission {
    pub requester_name: Option<String>,
    pub requester_document: Option<String>,
    pub photo: Option<MediaAsset>,
    pub video: Option<RecordedAsset>,
    pub student_id: Option<String>,
}

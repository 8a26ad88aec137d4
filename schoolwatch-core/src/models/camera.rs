use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StreamError;

/// Stable identifier of one camera feed within a school.
pub type CameraId = String;

/// A camera as listed by the camera registry.
///
/// Descriptors are never edited in place; the registry is re-queried to
/// pick up changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    pub id: CameraId,
    pub name: String,
    pub school_id: String,
    #[serde(rename = "stream_url")]
    pub stream_address: String,
}

/// Lifecycle of a decoder session.
///
/// ```text
/// attaching → playing → failed / destroyed
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderState {
    Attaching,
    Playing,
    Failed(StreamError),
    Destroyed,
}

impl DecoderState {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Attaching | Self::Playing)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Point-in-time view of one registered session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub camera_id: CameraId,
    pub state: DecoderState,
    pub effective_address: String,
    pub attached_at: Option<DateTime<Utc>>,
    pub generation: u64,
}

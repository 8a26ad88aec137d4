use async_trait::async_trait;

use crate::models::error::CaptureError;

/// Which tracks to request from the capture hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

/// An open camera/microphone stream with an attached recorder.
///
/// Held exclusively by the capture controller between `start()` and
/// `stop()`.
pub trait RecordingStream: Send {
    /// Begin recording in `content_type`.
    fn begin(&mut self, content_type: &str) -> Result<(), CaptureError>;

    /// Data recorded since the previous call, if any.
    fn take_chunk(&mut self) -> Option<Vec<u8>>;

    /// Stop the recorder and return whatever it still buffers.
    fn finish(&mut self) -> Option<Vec<u8>>;

    /// Stop every hardware track. Idempotent.
    fn release_tracks(&mut self);
}

/// Platform access to cameras and microphones.
#[async_trait]
pub trait MediaCaptureDevice: Send + Sync {
    /// Ask for hardware access. Returns `CaptureError::DeviceAccessDenied`
    /// when the user or platform refuses.
    async fn request_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn RecordingStream>, CaptureError>;

    /// Whether the platform recorder can produce `content_type`.
    fn is_type_supported(&self, content_type: &str) -> bool;
}

use crate::models::camera::{CameraId, DecoderState};
use crate::models::error::StreamError;

/// Receives per-camera session notifications from the stream session manager.
pub trait StreamDelegate: Send + Sync {
    fn on_session_state_changed(&self, camera_id: &CameraId, state: &DecoderState);

    /// A session failed fatally and has been torn down. Only this camera
    /// is affected.
    fn on_session_failed(&self, camera_id: &CameraId, error: &StreamError);
}

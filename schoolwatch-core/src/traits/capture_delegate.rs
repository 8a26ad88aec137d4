use crate::models::error::CaptureError;
use crate::models::pickup::RecordedAsset;
use crate::models::state::CaptureState;

/// Event delegate for media capture notifications.
///
/// Methods are called from the controller's timer task as well as from the
/// caller's task. Implementations should hand off to the UI thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the controller state changes, including once per
    /// elapsed second while recording.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called when starting or finishing a recording fails.
    fn on_error(&self, error: &CaptureError);

    /// Called when a recording is finalized.
    fn on_capture_finished(&self, asset: &RecordedAsset);
}

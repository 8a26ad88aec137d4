use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::camera::CameraDescriptor;
use crate::models::error::StreamError;

/// Events a decoder handle reports back to its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// The playlist was loaded and parsed; playback can begin.
    ManifestParsed,
    /// A network or decode fault. Check `StreamError::is_fatal`.
    Error(StreamError),
}

pub type DecoderEventSender = mpsc::UnboundedSender<DecoderEvent>;
pub type DecoderEventReceiver = mpsc::UnboundedReceiver<DecoderEvent>;

/// The sink a decoder renders into.
///
/// A surface outlives the decoder handles feeding it: refreshing a session
/// replaces the handle but keeps the surface.
pub trait PlaybackSurface: Send + Sync {
    /// Stable identifier, used for logging.
    fn surface_id(&self) -> &str;

    /// Drop any buffered media and prepare a fresh media source.
    fn reset_source(&self);

    /// Append one media segment to the current source.
    fn append_segment(&self, segment: &[u8]);

    /// Start playback with audio muted.
    fn play_muted(&self);

    /// Detach the media source; the surface goes blank.
    fn release_source(&self);

    /// Show an error affordance instead of video.
    fn show_error(&self, error: &StreamError);
}

/// Supplies the playback surface for a camera, if one is currently rendered.
pub trait SurfaceProvider: Send + Sync {
    fn surface_for(&self, camera: &CameraDescriptor) -> Option<Arc<dyn PlaybackSurface>>;
}

/// A live decoder/transport pipeline bound to one surface.
#[async_trait]
pub trait DecoderHandle: Send + Sync {
    /// Stop loading and release every resource held by this handle.
    ///
    /// Must have completed when it returns; the surface may be handed to a
    /// new handle immediately afterwards.
    async fn destroy(&mut self);
}

/// Creates decoder handles for adaptive-bitrate playlists.
#[async_trait]
pub trait DecoderBackend: Send + Sync {
    /// Create a handle for `address`, start loading its manifest and feed
    /// `surface`. Progress and faults are reported through `events`.
    async fn attach(
        &self,
        address: &str,
        surface: Arc<dyn PlaybackSurface>,
        events: DecoderEventSender,
    ) -> Result<Box<dyn DecoderHandle>, StreamError>;
}

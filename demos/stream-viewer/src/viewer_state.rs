use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use schoolwatch_core::{
    CameraDescriptor, CameraId, DecoderState, PlaybackSurface, StreamDelegate, StreamError,
    SurfaceProvider,
};

/// Stands in for a video tile: logs what a real surface would render.
pub struct LoggingSurface {
    id: String,
    bytes_received: Mutex<u64>,
}

impl LoggingSurface {
    fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            bytes_received: Mutex::new(0),
        })
    }

    pub fn bytes_received(&self) -> u64 {
        *self.bytes_received.lock()
    }
}

impl PlaybackSurface for LoggingSurface {
    fn surface_id(&self) -> &str {
        &self.id
    }

    fn reset_source(&self) {
        log::debug!("[{}] new media source", self.id);
    }

    fn append_segment(&self, segment: &[u8]) {
        *self.bytes_received.lock() += segment.len() as u64;
        log::trace!("[{}] +{} bytes", self.id, segment.len());
    }

    fn play_muted(&self) {
        log::info!("[{}] playing (muted)", self.id);
    }

    fn release_source(&self) {
        log::debug!("[{}] source released", self.id);
    }

    fn show_error(&self, error: &StreamError) {
        log::warn!("[{}] feed unavailable: {}", self.id, error);
    }
}

/// One tile per camera, kept for the lifetime of the viewer.
#[derive(Default)]
pub struct ViewerSurfaces {
    tiles: Mutex<HashMap<CameraId, Arc<LoggingSurface>>>,
}

impl ViewerSurfaces {
    /// Bytes received per camera, sorted by camera id.
    pub fn totals(&self) -> Vec<(CameraId, u64)> {
        let mut totals: Vec<_> = self
            .tiles
            .lock()
            .iter()
            .map(|(id, tile)| (id.clone(), tile.bytes_received()))
            .collect();
        totals.sort();
        totals
    }
}

impl SurfaceProvider for ViewerSurfaces {
    fn surface_for(&self, camera: &CameraDescriptor) -> Option<Arc<dyn PlaybackSurface>> {
        let tile = Arc::clone(
            self.tiles
                .lock()
                .entry(camera.id.clone())
                .or_insert_with(|| LoggingSurface::new(&camera.id)),
        );
        Some(tile)
    }
}

/// StreamDelegate that forwards session events to the log.
pub struct LoggingDelegate;

impl StreamDelegate for LoggingDelegate {
    fn on_session_state_changed(&self, camera_id: &CameraId, state: &DecoderState) {
        log::info!("camera {} → {:?}", camera_id, state);
    }

    fn on_session_failed(&self, camera_id: &CameraId, error: &StreamError) {
        log::error!("camera {} failed: {}", camera_id, error);
    }
}

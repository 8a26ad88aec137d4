use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::models::camera::{CameraId, DecoderState, SessionStatus};
use crate::models::error::StreamError;
use crate::traits::decoder_backend::{
    DecoderBackend, DecoderEvent, DecoderEventReceiver, DecoderHandle, PlaybackSurface,
};

/// What the owner of a session must do after an event was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Nothing to do. Also returned for events from a replaced handle.
    Continue,
    /// The manifest was parsed and playback started.
    Started,
    /// The session failed and must be torn down.
    Fatal(StreamError),
}

/// One adaptive-bitrate playlist bound to one playback surface.
///
/// Owns at most one decoder handle at a time. The surface is kept across
/// reattaches; only the pipeline feeding it is replaced.
pub struct DecoderSession {
    camera_id: CameraId,
    address: String,
    surface: Arc<dyn PlaybackSurface>,
    handle: Option<Box<dyn DecoderHandle>>,
    state: DecoderState,
    attached_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl DecoderSession {
    pub fn new(camera_id: CameraId, address: String, surface: Arc<dyn PlaybackSurface>) -> Self {
        Self {
            camera_id,
            address,
            surface,
            handle: None,
            state: DecoderState::Attaching,
            attached_at: None,
            generation: 0,
        }
    }

    pub fn camera_id(&self) -> &CameraId {
        &self.camera_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn surface(&self) -> &Arc<dyn PlaybackSurface> {
        &self.surface
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    /// Incremented on every attach; events carry the generation they were
    /// produced for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn attached_at(&self) -> Option<DateTime<Utc>> {
        self.attached_at
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            camera_id: self.camera_id.clone(),
            state: self.state.clone(),
            effective_address: self.address.clone(),
            attached_at: self.attached_at,
            generation: self.generation,
        }
    }

    /// Create a decoder handle for the session's address and bind it to the
    /// surface. Returns the receiver for the new handle's events.
    ///
    /// Any existing handle is destroyed first.
    pub async fn attach(
        &mut self,
        backend: &dyn DecoderBackend,
    ) -> Result<DecoderEventReceiver, StreamError> {
        self.release_handle().await;

        let (tx, rx) = mpsc::unbounded_channel();
        self.generation += 1;
        self.state = DecoderState::Attaching;
        self.surface.reset_source();

        match backend.attach(&self.address, Arc::clone(&self.surface), tx).await {
            Ok(handle) => {
                self.handle = Some(handle);
                self.attached_at = Some(Utc::now());
                log::debug!(
                    "camera {} attached to surface {} (generation {})",
                    self.camera_id,
                    self.surface.surface_id(),
                    self.generation
                );
                Ok(rx)
            }
            Err(e) => {
                self.surface.release_source();
                self.state = DecoderState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Destroy the current handle and attach a new one to the same surface.
    pub async fn reattach(
        &mut self,
        backend: &dyn DecoderBackend,
    ) -> Result<DecoderEventReceiver, StreamError> {
        self.attach(backend).await
    }

    /// Apply an event reported by the handle of `generation`.
    pub fn handle_event(&mut self, generation: u64, event: DecoderEvent) -> EventOutcome {
        if generation != self.generation || !self.state.is_live() {
            return EventOutcome::Continue;
        }
        match event {
            DecoderEvent::ManifestParsed => {
                if self.state == DecoderState::Attaching {
                    self.state = DecoderState::Playing;
                    self.surface.play_muted();
                    return EventOutcome::Started;
                }
                EventOutcome::Continue
            }
            DecoderEvent::Error(e) if e.is_fatal() => {
                self.state = DecoderState::Failed(e.clone());
                EventOutcome::Fatal(e)
            }
            DecoderEvent::Error(e) => {
                log::debug!("camera {}: recovering from {}", self.camera_id, e);
                EventOutcome::Continue
            }
        }
    }

    /// Release the handle and the surface's media source. Safe to call on
    /// an already destroyed session.
    pub async fn destroy(&mut self) {
        if self.is_destroyed() {
            return;
        }
        self.release_handle().await;
        self.surface.release_source();
        if !matches!(self.state, DecoderState::Failed(_)) {
            self.state = DecoderState::Destroyed;
        }
    }

    /// No handle and no way back to playing without a new attach.
    pub fn is_destroyed(&self) -> bool {
        self.handle.is_none() && !self.state.is_live()
    }

    async fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.destroy().await;
        }
    }
}

impl std::fmt::Debug for DecoderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderSession")
            .field("camera_id", &self.camera_id)
            .field("address", &self.address)
            .field("surface", &self.surface.surface_id())
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}

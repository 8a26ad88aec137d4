use std::collections::HashMap;
use std::sync::{Arc, Weak};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::camera::{CameraDescriptor, CameraId, DecoderState, SessionStatus};
use crate::models::config::StreamConfiguration;
use crate::models::error::StreamError;
use crate::stream::address::AddressTranslator;
use crate::stream::decoder_session::{DecoderSession, EventOutcome};
use crate::stream::schedule::RefreshSchedule;
use crate::traits::camera_registry::CameraRegistry;
use crate::traits::decoder_backend::{
    DecoderBackend, DecoderEventReceiver, PlaybackSurface, SurfaceProvider,
};
use crate::traits::stream_delegate::StreamDelegate;

/// Each registered camera gets its own async lock, so operations on one
/// camera are serialized while different cameras proceed concurrently.
type SessionSlot = Arc<AsyncMutex<DecoderSession>>;

/// Outcome of `StreamSessionManager::attach_all`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachSummary {
    pub attached: Vec<CameraId>,
    /// Already registered, listed twice, or without a rendered surface.
    pub skipped: Vec<CameraId>,
    pub failed: Vec<(CameraId, StreamError)>,
}

struct ManagerInner {
    backend: Arc<dyn DecoderBackend>,
    translator: AddressTranslator,
    config: StreamConfiguration,
    registry: Mutex<HashMap<CameraId, SessionSlot>>,
    errored: Mutex<HashMap<CameraId, StreamError>>,
    delegate: Mutex<Option<Arc<dyn StreamDelegate>>>,
    schedule: Mutex<Option<RefreshSchedule>>,
}

/// Owns every live decoder session of a camera view.
///
/// At most one session exists per camera identifier. Sessions are refreshed
/// on a fixed schedule, torn down individually on fatal errors, and torn
/// down together when the view closes.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct StreamSessionManager {
    inner: Arc<ManagerInner>,
}

impl StreamSessionManager {
    pub fn new(
        backend: Arc<dyn DecoderBackend>,
        config: StreamConfiguration,
    ) -> Result<Self, StreamError> {
        config.validate().map_err(StreamError::ConfigurationFailed)?;
        Ok(Self {
            inner: Arc::new(ManagerInner {
                backend,
                translator: AddressTranslator::from_config(&config),
                config,
                registry: Mutex::new(HashMap::new()),
                errored: Mutex::new(HashMap::new()),
                delegate: Mutex::new(None),
                schedule: Mutex::new(None),
            }),
        })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn StreamDelegate>) {
        *self.inner.delegate.lock() = Some(delegate);
    }

    pub fn config(&self) -> &StreamConfiguration {
        &self.inner.config
    }

    pub fn translator(&self) -> &AddressTranslator {
        &self.inner.translator
    }

    /// List the school's cameras and attach every one of them.
    pub async fn attach_school(
        &self,
        registry: &dyn CameraRegistry,
        school_id: &str,
        surfaces: &dyn SurfaceProvider,
    ) -> Result<AttachSummary, StreamError> {
        let descriptors = registry.list(school_id).await?;
        log::info!("school {} has {} cameras", school_id, descriptors.len());
        Ok(self.attach_all(&descriptors, surfaces).await)
    }

    /// Attach a decoder session for every descriptor that has none yet.
    ///
    /// Cameras that are already registered are left untouched. A failure
    /// only affects its own camera.
    pub async fn attach_all(
        &self,
        descriptors: &[CameraDescriptor],
        surfaces: &dyn SurfaceProvider,
    ) -> AttachSummary {
        let mut summary = AttachSummary::default();
        let mut reserved = Vec::new();

        for descriptor in descriptors {
            let camera_id = descriptor.id.clone();
            if self.contains(&camera_id) {
                summary.skipped.push(camera_id);
                continue;
            }

            let Some(surface) = surfaces.surface_for(descriptor) else {
                log::debug!("camera {} has no surface yet, skipping", camera_id);
                summary.skipped.push(camera_id);
                continue;
            };

            let address = match self
                .inner
                .translator
                .translate(&descriptor.stream_address, self.inner.config.page_is_secure)
            {
                Ok(address) => address,
                Err(e) => {
                    self.mark_failed(&camera_id, surface.as_ref(), &e);
                    summary.failed.push((camera_id, e));
                    continue;
                }
            };

            let slot: SessionSlot = Arc::new(AsyncMutex::new(DecoderSession::new(
                camera_id.clone(),
                address,
                surface,
            )));
            let Ok(guard) = Arc::clone(&slot).try_lock_owned() else {
                continue;
            };

            {
                let mut registry = self.inner.registry.lock();
                if registry.contains_key(&camera_id) {
                    summary.skipped.push(camera_id);
                    continue;
                }
                registry.insert(camera_id.clone(), Arc::clone(&slot));
            }
            self.inner.errored.lock().remove(&camera_id);
            reserved.push(self.attach_reserved(slot, guard));
        }

        for result in join_all(reserved).await {
            match result {
                Ok(camera_id) => summary.attached.push(camera_id),
                Err(failure) => summary.failed.push(failure),
            }
        }

        log::info!(
            "attached {} cameras ({} skipped, {} failed)",
            summary.attached.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
        summary
    }

    /// Replace every session's decoder handle, keeping its surface.
    ///
    /// Returns the number of sessions that were reattached.
    pub async fn refresh_all(&self) -> usize {
        let slots: Vec<SessionSlot> = self.inner.registry.lock().values().cloned().collect();
        let results = join_all(slots.into_iter().map(|slot| self.refresh_slot(slot))).await;
        let refreshed = results.into_iter().filter(|ok| *ok).count();
        log::debug!("refreshed {} sessions", refreshed);
        refreshed
    }

    /// Destroy and unregister one camera's session.
    pub async fn teardown(&self, camera_id: &str) -> Result<(), StreamError> {
        let slot = self
            .inner
            .registry
            .lock()
            .get(camera_id)
            .cloned()
            .ok_or_else(|| StreamError::SessionNotFound(camera_id.to_string()))?;

        slot.lock().await.destroy().await;
        self.remove_slot(camera_id, &slot);
        self.notify_state(camera_id, &DecoderState::Destroyed);
        log::debug!("camera {} torn down", camera_id);
        Ok(())
    }

    /// Cancel the refresh schedule, then destroy and unregister every
    /// session. Call when the camera view closes.
    pub async fn teardown_all(&self) {
        self.stop_refresh().await;

        let slots: Vec<(CameraId, SessionSlot)> = self
            .inner
            .registry
            .lock()
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect();

        join_all(slots.iter().map(|(_, slot)| async move {
            slot.lock().await.destroy().await;
        }))
        .await;

        for (camera_id, slot) in &slots {
            self.remove_slot(camera_id, slot);
            self.notify_state(camera_id, &DecoderState::Destroyed);
        }
        self.inner.errored.lock().clear();
        log::info!("camera view closed, {} sessions torn down", slots.len());
    }

    /// Start refreshing every session on the configured interval.
    ///
    /// Replaces a schedule that is already running.
    pub fn start_refresh(&self) {
        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        let schedule = RefreshSchedule::spawn(self.inner.config.refresh_interval(), move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return false;
                };
                StreamSessionManager { inner }.refresh_all().await;
                true
            }
        });

        if let Some(previous) = self.inner.schedule.lock().replace(schedule) {
            previous.cancel();
        }
    }

    /// Cancel the refresh schedule and wait for an in-flight refresh.
    pub async fn stop_refresh(&self) {
        let schedule = self.inner.schedule.lock().take();
        if let Some(schedule) = schedule {
            schedule.stop().await;
        }
    }

    pub fn is_refresh_scheduled(&self) -> bool {
        self.inner
            .schedule
            .lock()
            .as_ref()
            .is_some_and(RefreshSchedule::is_active)
    }

    pub fn contains(&self, camera_id: &str) -> bool {
        self.inner.registry.lock().contains_key(camera_id)
    }

    pub fn len(&self) -> usize {
        self.inner.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.lock().is_empty()
    }

    /// Registered camera identifiers, sorted.
    pub fn camera_ids(&self) -> Vec<CameraId> {
        let mut ids: Vec<CameraId> = self.inner.registry.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn session_state(&self, camera_id: &str) -> Option<DecoderState> {
        let slot = self.inner.registry.lock().get(camera_id).cloned()?;
        let state = slot.lock().await.state().clone();
        Some(state)
    }

    /// Status of every registered session, sorted by camera identifier.
    pub async fn snapshot(&self) -> Vec<SessionStatus> {
        let slots: Vec<SessionSlot> = self.inner.registry.lock().values().cloned().collect();
        let mut statuses = Vec::with_capacity(slots.len());
        for slot in slots {
            statuses.push(slot.lock().await.status());
        }
        statuses.sort_by(|a, b| a.camera_id.cmp(&b.camera_id));
        statuses
    }

    /// Cameras whose session failed fatally, with the error shown to the viewer.
    pub fn errored(&self) -> HashMap<CameraId, StreamError> {
        self.inner.errored.lock().clone()
    }

    pub fn error_for(&self, camera_id: &str) -> Option<StreamError> {
        self.inner.errored.lock().get(camera_id).cloned()
    }

    // --- Internal helpers ---

    async fn attach_reserved(
        &self,
        slot: SessionSlot,
        mut session: OwnedMutexGuard<DecoderSession>,
    ) -> Result<CameraId, (CameraId, StreamError)> {
        let camera_id = session.camera_id().clone();
        match session.attach(self.inner.backend.as_ref()).await {
            Ok(events) => {
                self.spawn_watcher(Arc::clone(&slot), session.generation(), events);
                self.notify_state(&camera_id, session.state());
                Ok(camera_id)
            }
            Err(e) => {
                let surface = Arc::clone(session.surface());
                drop(session);
                self.remove_slot(&camera_id, &slot);
                self.mark_failed(&camera_id, surface.as_ref(), &e);
                Err((camera_id, e))
            }
        }
    }

    async fn refresh_slot(&self, slot: SessionSlot) -> bool {
        let mut session = slot.lock().await;
        let camera_id = session.camera_id().clone();
        if session.is_destroyed() || !self.is_registered(&camera_id, &slot) {
            return false;
        }

        match session.reattach(self.inner.backend.as_ref()).await {
            Ok(events) => {
                self.spawn_watcher(Arc::clone(&slot), session.generation(), events);
                self.notify_state(&camera_id, session.state());
                true
            }
            Err(e) => {
                session.destroy().await;
                let surface = Arc::clone(session.surface());
                drop(session);
                self.remove_slot(&camera_id, &slot);
                self.mark_failed(&camera_id, surface.as_ref(), &e);
                false
            }
        }
    }

    /// Forward one handle's events to its session until the handle goes away.
    fn spawn_watcher(&self, slot: SessionSlot, generation: u64, mut events: DecoderEventReceiver) {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let manager = StreamSessionManager { inner };

                let mut session = slot.lock().await;
                if session.generation() != generation {
                    break;
                }
                match session.handle_event(generation, event) {
                    EventOutcome::Continue => {}
                    EventOutcome::Started => {
                        manager.notify_state(session.camera_id(), session.state());
                    }
                    EventOutcome::Fatal(e) => {
                        let camera_id = session.camera_id().clone();
                        let surface = Arc::clone(session.surface());
                        session.destroy().await;
                        drop(session);
                        manager.remove_slot(&camera_id, &slot);
                        manager.mark_failed(&camera_id, surface.as_ref(), &e);
                        break;
                    }
                }
            }
        });
    }

    fn is_registered(&self, camera_id: &str, slot: &SessionSlot) -> bool {
        self.inner
            .registry
            .lock()
            .get(camera_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Unregister `slot`, unless the camera has meanwhile been re-registered
    /// with a different session.
    fn remove_slot(&self, camera_id: &str, slot: &SessionSlot) {
        let mut registry = self.inner.registry.lock();
        if registry
            .get(camera_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            registry.remove(camera_id);
        }
    }

    fn mark_failed(&self, camera_id: &str, surface: &dyn PlaybackSurface, error: &StreamError) {
        log::warn!("camera {} failed: {}", camera_id, error);
        surface.show_error(error);
        self.inner
            .errored
            .lock()
            .insert(camera_id.to_string(), error.clone());

        let delegate = self.inner.delegate.lock().clone();
        if let Some(delegate) = delegate {
            delegate.on_session_failed(&camera_id.to_string(), error);
        }
    }

    fn notify_state(&self, camera_id: &str, state: &DecoderState) {
        let delegate = self.inner.delegate.lock().clone();
        if let Some(delegate) = delegate {
            delegate.on_session_state_changed(&camera_id.to_string(), state);
        }
    }
}

//! Hand-written fakes for the collaborator traits, shared by unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::WeakUnboundedSender;

use crate::models::camera::{CameraDescriptor, CameraId, DecoderState};
use crate::models::error::{CaptureError, StoreError, StreamError};
use crate::models::pickup::{AssetReference, MediaAsset};
use crate::traits::asset_store::AssetStore;
use crate::traits::camera_registry::CameraRegistry;
use crate::traits::capture_device::{MediaCaptureDevice, MediaConstraints, RecordingStream};
use crate::traits::decoder_backend::{
    DecoderBackend, DecoderEvent, DecoderEventSender, DecoderHandle, PlaybackSurface,
    SurfaceProvider,
};
use crate::traits::record_store::{RecordQuery, RecordStore};
use crate::traits::stream_delegate::StreamDelegate;

pub fn camera(id: &str, url: &str) -> CameraDescriptor {
    CameraDescriptor {
        id: id.to_string(),
        name: format!("Camera {}", id),
        school_id: "school-1".into(),
        stream_address: url.to_string(),
    }
}

/// Let spawned tasks run until they are idle. With a paused clock this
/// never waits in real time.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// --- Decoder backend ---

#[derive(Default)]
struct BackendState {
    attaches: Vec<(String, String)>,
    destroys: usize,
    live: usize,
    max_live: usize,
    senders: Vec<(String, WeakUnboundedSender<DecoderEvent>)>,
    fail_next: Option<StreamError>,
    failing: HashMap<String, StreamError>,
}

pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(BackendState::default())),
        })
    }

    pub fn attach_count(&self) -> usize {
        self.state.lock().attaches.len()
    }

    pub fn attach_count_for(&self, address: &str) -> usize {
        self.state
            .lock()
            .attaches
            .iter()
            .filter(|(a, _)| a == address)
            .count()
    }

    pub fn attached_addresses(&self) -> Vec<String> {
        self.state.lock().attaches.iter().map(|(a, _)| a.clone()).collect()
    }

    /// Surface ids bound by each attach of `address`, in order.
    pub fn surface_ids_for(&self, address: &str) -> Vec<String> {
        self.state
            .lock()
            .attaches
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn destroy_count(&self) -> usize {
        self.state.lock().destroys
    }

    pub fn live_handles(&self) -> usize {
        self.state.lock().live
    }

    pub fn max_live_handles(&self) -> usize {
        self.state.lock().max_live
    }

    pub fn fail_next_attach(&self, error: StreamError) {
        self.state.lock().fail_next = Some(error);
    }

    pub fn fail_address(&self, address: &str, error: StreamError) {
        self.state.lock().failing.insert(address.to_string(), error);
    }

    /// Send `event` from every live handle.
    pub fn emit_all(&self, event: DecoderEvent) {
        for (_, sender) in &self.state.lock().senders {
            if let Some(tx) = sender.upgrade() {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Send `event` from the live handle(s) of `address`.
    pub fn emit_to(&self, address: &str, event: DecoderEvent) {
        for (a, sender) in &self.state.lock().senders {
            if a != address {
                continue;
            }
            if let Some(tx) = sender.upgrade() {
                let _ = tx.send(event.clone());
            }
        }
    }
}

struct FakeHandle {
    state: Arc<Mutex<BackendState>>,
    events: Option<DecoderEventSender>,
}

#[async_trait]
impl DecoderHandle for FakeHandle {
    async fn destroy(&mut self) {
        if self.events.take().is_some() {
            let mut state = self.state.lock();
            state.destroys += 1;
            state.live -= 1;
        }
    }
}

#[async_trait]
impl DecoderBackend for FakeBackend {
    async fn attach(
        &self,
        address: &str,
        surface: Arc<dyn PlaybackSurface>,
        events: DecoderEventSender,
    ) -> Result<Box<dyn DecoderHandle>, StreamError> {
        let mut state = self.state.lock();
        if let Some(e) = state.fail_next.take() {
            return Err(e);
        }
        if let Some(e) = state.failing.get(address) {
            return Err(e.clone());
        }
        state
            .attaches
            .push((address.to_string(), surface.surface_id().to_string()));
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        state.senders.retain(|(_, s)| s.upgrade().is_some());
        state.senders.push((address.to_string(), events.downgrade()));
        Ok(Box::new(FakeHandle {
            state: Arc::clone(&self.state),
            events: Some(events),
        }))
    }
}

// --- Playback surfaces ---

#[derive(Default)]
struct SurfaceCounters {
    resets: usize,
    plays: usize,
    releases: usize,
    errors: Vec<StreamError>,
    segments: usize,
}

pub struct FakeSurface {
    id: String,
    counters: Mutex<SurfaceCounters>,
}

impl FakeSurface {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            counters: Mutex::new(SurfaceCounters::default()),
        })
    }

    pub fn reset_count(&self) -> usize {
        self.counters.lock().resets
    }

    pub fn play_count(&self) -> usize {
        self.counters.lock().plays
    }

    pub fn release_count(&self) -> usize {
        self.counters.lock().releases
    }

    pub fn error_count(&self) -> usize {
        self.counters.lock().errors.len()
    }
}

impl PlaybackSurface for FakeSurface {
    fn surface_id(&self) -> &str {
        &self.id
    }

    fn reset_source(&self) {
        self.counters.lock().resets += 1;
    }

    fn append_segment(&self, _segment: &[u8]) {
        self.counters.lock().segments += 1;
    }

    fn play_muted(&self) {
        self.counters.lock().plays += 1;
    }

    fn release_source(&self) {
        self.counters.lock().releases += 1;
    }

    fn show_error(&self, error: &StreamError) {
        self.counters.lock().errors.push(error.clone());
    }
}

/// Hands out one surface per camera id, reusing it across calls.
pub struct FakeSurfaces {
    surfaces: Mutex<HashMap<CameraId, Arc<FakeSurface>>>,
    hidden: Mutex<HashSet<CameraId>>,
}

impl FakeSurfaces {
    pub fn new() -> Self {
        Self {
            surfaces: Mutex::new(HashMap::new()),
            hidden: Mutex::new(HashSet::new()),
        }
    }

    pub fn hide(&self, camera_id: &str) {
        self.hidden.lock().insert(camera_id.to_string());
    }

    pub fn get(&self, camera_id: &str) -> Arc<FakeSurface> {
        Arc::clone(
            self.surfaces
                .lock()
                .entry(camera_id.to_string())
                .or_insert_with(|| FakeSurface::new(camera_id)),
        )
    }

    pub fn created(&self) -> usize {
        self.surfaces.lock().len()
    }
}

impl SurfaceProvider for FakeSurfaces {
    fn surface_for(&self, camera: &CameraDescriptor) -> Option<Arc<dyn PlaybackSurface>> {
        if self.hidden.lock().contains(&camera.id) {
            return None;
        }
        Some(self.get(&camera.id))
    }
}

// --- Delegates and registry ---

#[derive(Default)]
pub struct RecordingStreamDelegate {
    states: Mutex<Vec<(CameraId, DecoderState)>>,
    failures: Mutex<Vec<(CameraId, StreamError)>>,
}

impl RecordingStreamDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn states_for(&self, camera_id: &str) -> Vec<DecoderState> {
        self.states
            .lock()
            .iter()
            .filter(|(id, _)| id == camera_id)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn failures(&self) -> Vec<(CameraId, StreamError)> {
        self.failures.lock().clone()
    }
}

impl StreamDelegate for RecordingStreamDelegate {
    fn on_session_state_changed(&self, camera_id: &CameraId, state: &DecoderState) {
        self.states.lock().push((camera_id.clone(), state.clone()));
    }

    fn on_session_failed(&self, camera_id: &CameraId, error: &StreamError) {
        self.failures.lock().push((camera_id.clone(), error.clone()));
    }
}

pub struct FakeRegistry {
    cameras: HashMap<String, Vec<CameraDescriptor>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn with(school_id: &str, cameras: Vec<CameraDescriptor>) -> Self {
        Self {
            cameras: HashMap::from([(school_id.to_string(), cameras)]),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CameraRegistry for FakeRegistry {
    async fn list(&self, school_id: &str) -> Result<Vec<CameraDescriptor>, StreamError> {
        self.calls.lock().push(school_id.to_string());
        Ok(self.cameras.get(school_id).cloned().unwrap_or_default())
    }
}

// --- Capture device ---

#[derive(Default)]
pub struct DeviceLog {
    pub requests: usize,
    pub begun_with: Vec<String>,
    pub chunks_taken: usize,
    pub finished: usize,
    pub releases: usize,
}

/// Capture device whose recorder yields `chunk_size` bytes per chunk.
pub struct FakeDevice {
    deny: bool,
    supported: Vec<String>,
    chunk_size: usize,
    log: Arc<Mutex<DeviceLog>>,
}

impl FakeDevice {
    pub fn new(supported: &[&str]) -> Self {
        Self {
            deny: false,
            supported: supported.iter().map(|s| s.to_string()).collect(),
            chunk_size: 4,
            log: Arc::new(Mutex::new(DeviceLog::default())),
        }
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::new(&["video/mp4"])
        }
    }

    pub fn log(&self) -> Arc<Mutex<DeviceLog>> {
        Arc::clone(&self.log)
    }
}

struct FakeStream {
    chunk_size: usize,
    recording: bool,
    released: bool,
    log: Arc<Mutex<DeviceLog>>,
}

impl RecordingStream for FakeStream {
    fn begin(&mut self, content_type: &str) -> Result<(), CaptureError> {
        self.recording = true;
        self.log.lock().begun_with.push(content_type.to_string());
        Ok(())
    }

    fn take_chunk(&mut self) -> Option<Vec<u8>> {
        if !self.recording {
            return None;
        }
        let mut log = self.log.lock();
        log.chunks_taken += 1;
        Some(vec![log.chunks_taken as u8; self.chunk_size])
    }

    fn finish(&mut self) -> Option<Vec<u8>> {
        self.recording = false;
        self.log.lock().finished += 1;
        Some(vec![0xFF])
    }

    fn release_tracks(&mut self) {
        if !self.released {
            self.released = true;
            self.log.lock().releases += 1;
        }
    }
}

#[async_trait]
impl MediaCaptureDevice for FakeDevice {
    async fn request_media(
        &self,
        _constraints: MediaConstraints,
    ) -> Result<Box<dyn RecordingStream>, CaptureError> {
        self.log.lock().requests += 1;
        if self.deny {
            return Err(CaptureError::DeviceAccessDenied);
        }
        Ok(Box::new(FakeStream {
            chunk_size: self.chunk_size,
            recording: false,
            released: false,
            log: Arc::clone(&self.log),
        }))
    }

    fn is_type_supported(&self, content_type: &str) -> bool {
        self.supported.iter().any(|t| t == content_type)
    }
}

// --- Stores ---

/// Ordered log of every store call, shared by the fake stores.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct FakeAssetStore {
    calls: CallLog,
    uploads: Mutex<Vec<(String, String, MediaAsset)>>,
    fail_prefixes: Mutex<VecDeque<String>>,
}

impl FakeAssetStore {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            uploads: Mutex::new(Vec::new()),
            fail_prefixes: Mutex::new(VecDeque::new()),
        }
    }

    /// Fail uploads whose path starts with `prefix`.
    pub fn fail_paths_starting_with(&self, prefix: &str) {
        self.fail_prefixes.lock().push_back(prefix.to_string());
    }

    pub fn uploads(&self) -> Vec<(String, String, MediaAsset)> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl AssetStore for FakeAssetStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        asset: &MediaAsset,
    ) -> Result<AssetReference, StoreError> {
        self.calls.lock().push(format!("upload {}/{}", bucket, path));
        if self
            .fail_prefixes
            .lock()
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Err(StoreError::Status {
                code: 500,
                body: "storage unavailable".into(),
            });
        }
        self.uploads
            .lock()
            .push((bucket.to_string(), path.to_string(), asset.clone()));
        Ok(AssetReference {
            bucket: bucket.to_string(),
            path: path.to_string(),
            public_url: format!("https://storage.test/{}/{}", bucket, path),
        })
    }
}

pub struct FakeRecordStore {
    calls: CallLog,
    rows: Mutex<Vec<(String, Value)>>,
    fail: Mutex<bool>,
    partial: Mutex<bool>,
}

impl FakeRecordStore {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            rows: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
            partial: Mutex::new(false),
        }
    }

    /// Inserts echo back only the row's `id`.
    pub fn return_partial_rows(&self) {
        *self.partial.lock() = true;
    }

    pub fn fail_inserts(&self) {
        *self.fail.lock() = true;
    }

    pub fn rows(&self, collection: &str) -> Vec<Value> {
        self.rows
            .lock()
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn seed(&self, collection: &str, row: Value) {
        self.rows.lock().push((collection.to_string(), row));
    }

    fn matches(row: &Value, query: &RecordQuery) -> bool {
        query.filters.iter().all(|(column, value)| {
            row.get(column)
                .and_then(Value::as_str)
                .is_some_and(|v| v == value)
        })
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn insert(&self, collection: &str, record: Value) -> Result<Value, StoreError> {
        self.calls.lock().push(format!("insert {}", collection));
        if *self.fail.lock() {
            return Err(StoreError::Transport("connection reset".into()));
        }
        self.rows.lock().push((collection.to_string(), record.clone()));
        if *self.partial.lock() {
            return Ok(serde_json::json!({ "id": record.get("id") }));
        }
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        query: &RecordQuery,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.calls.lock().push(format!("update {}", collection));
        let mut updated = Vec::new();
        for (c, row) in self.rows.lock().iter_mut() {
            if c == collection && Self::matches(row, query) {
                if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                    for (k, v) in fields {
                        target.insert(k.clone(), v.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn select(
        &self,
        collection: &str,
        query: &RecordQuery,
    ) -> Result<Vec<Value>, StoreError> {
        self.calls.lock().push(format!("select {}", collection));
        let mut rows: Vec<Value> = self
            .rows
            .lock()
            .iter()
            .filter(|(c, row)| c == collection && Self::matches(row, query))
            .map(|(_, row)| row.clone())
            .collect();
        if let Some((column, descending)) = &query.order_by {
            rows.sort_by(|a, b| {
                let a = a.get(column).and_then(Value::as_str).unwrap_or_default();
                let b = b.get(column).and_then(Value::as_str).unwrap_or_default();
                if *descending {
                    b.cmp(a)
                } else {
                    a.cmp(b)
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::capture::mime::negotiate_content_type;
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::pickup::RecordedAsset;
use crate::models::state::CaptureState;
use crate::storage::chunk_writer::ChunkWriter;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_device::{MediaCaptureDevice, MediaConstraints, RecordingStream};

/// Mutable recording state, shared with the chunk timer task.
struct RecorderState {
    state: CaptureState,
    stream: Option<Box<dyn RecordingStream>>,
    writer: ChunkWriter,
    content_type: Option<String>,
    asset: Option<RecordedAsset>,
    elapsed_ms: u64,
    /// Bumped on every start, so a timer task from an earlier recording
    /// never touches a later one.
    recording_id: u64,
}

impl RecorderState {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            stream: None,
            writer: ChunkWriter::new(),
            content_type: None,
            asset: None,
            elapsed_ms: 0,
            recording_id: 0,
        }
    }

    fn elapsed_secs(&self) -> u64 {
        self.elapsed_ms / 1000
    }

    fn collect_chunk(&mut self) {
        if let Some(chunk) = self.stream.as_mut().and_then(|s| s.take_chunk()) {
            self.writer.write(chunk);
        }
    }

    /// Flush the recorder, assemble the asset, release the tracks.
    fn finalize(&mut self) -> RecordedAsset {
        self.collect_chunk();
        if let Some(mut stream) = self.stream.take() {
            if let Some(tail) = stream.finish() {
                self.writer.write(tail);
            }
            stream.release_tracks();
        }

        let (data, checksum) = self.writer.close();
        let asset = RecordedAsset {
            data,
            content_type: self.content_type.clone().unwrap_or_default(),
            duration_secs: self.elapsed_secs(),
            checksum,
        };
        self.state = CaptureState::Stopped {
            elapsed_secs: self.elapsed_secs(),
        };
        self.asset = Some(asset.clone());
        asset
    }

    /// Drop every trace of the current or finished recording.
    fn reset(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.finish();
            stream.release_tracks();
        }
        self.writer.clear();
        self.content_type = None;
        self.asset = None;
        self.elapsed_ms = 0;
        self.state = CaptureState::Idle;
    }
}

/// Records one short audio/video clip from the local capture device.
///
/// ```text
/// [MediaCaptureDevice] → [RecordingStream] → chunk timer → [ChunkWriter] → RecordedAsset
/// ```
///
/// Only one recording exists at a time. A finished recording stays
/// available for review until `discard()` is called.
pub struct MediaCaptureController<D: MediaCaptureDevice> {
    device: D,
    config: CaptureConfiguration,
    recorder: Arc<Mutex<RecorderState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    timer: Option<CancellationToken>,
}

impl<D: MediaCaptureDevice> MediaCaptureController<D> {
    pub fn new(device: D, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            device,
            config,
            recorder: Arc::new(Mutex::new(RecorderState::new())),
            delegate: None,
            timer: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.recorder.lock().state.clone()
    }

    /// The finished recording awaiting review, if any.
    pub fn asset(&self) -> Option<RecordedAsset> {
        self.recorder.lock().asset.clone()
    }

    /// Content type negotiated for the current or last recording.
    pub fn content_type(&self) -> Option<String> {
        self.recorder.lock().content_type.clone()
    }

    /// Request the device and begin recording.
    /// Transitions: idle → requesting_device → recording.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        {
            let mut recorder = self.recorder.lock();
            match recorder.state {
                CaptureState::RequestingDevice | CaptureState::Recording { .. } => {
                    return Err(CaptureError::AlreadyRecording);
                }
                CaptureState::Stopped { .. } => return Err(CaptureError::PreviewPending),
                CaptureState::Idle => {}
            }
            recorder.state = CaptureState::RequestingDevice;
        }
        self.notify_state(&CaptureState::RequestingDevice);

        let constraints = MediaConstraints {
            audio: self.config.capture_audio,
            video: self.config.capture_video,
        };
        let mut stream = match self.device.request_media(constraints).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail_start(None, e)),
        };

        let Some(content_type) =
            negotiate_content_type(&self.config.preferred_content_types, |t| {
                self.device.is_type_supported(t)
            })
            .map(str::to_string)
        else {
            let e = CaptureError::ConfigurationFailed("no content type configured".into());
            return Err(self.fail_start(Some(stream), e));
        };

        if let Err(e) = stream.begin(&content_type) {
            return Err(self.fail_start(Some(stream), e));
        }
        log::info!("recording started ({})", content_type);

        let recording_id = {
            let mut recorder = self.recorder.lock();
            recorder.writer.clear();
            recorder.asset = None;
            recorder.elapsed_ms = 0;
            recorder.content_type = Some(content_type);
            recorder.stream = Some(stream);
            recorder.recording_id += 1;
            recorder.state = CaptureState::Recording { elapsed_secs: 0 };
            recorder.recording_id
        };
        self.notify_state(&CaptureState::Recording { elapsed_secs: 0 });
        self.start_timer(recording_id);
        Ok(())
    }

    /// Finish the recording and return the assembled asset.
    /// Transitions: recording → stopped. Returns `None` in any other state.
    pub fn stop(&mut self) -> Option<RecordedAsset> {
        self.stop_timer();
        let (asset, state) = {
            let mut recorder = self.recorder.lock();
            if !recorder.state.is_recording() {
                return None;
            }
            let asset = recorder.finalize();
            (asset, recorder.state.clone())
        };
        log::info!(
            "recording stopped: {} bytes, {}s",
            asset.data.len(),
            asset.duration_secs
        );
        self.notify_state(&state);
        if let Some(delegate) = &self.delegate {
            delegate.on_capture_finished(&asset);
        }
        Some(asset)
    }

    /// Drop the recording and return to idle. A recording in progress is
    /// stopped and its output thrown away.
    pub fn discard(&mut self) {
        self.stop_timer();
        let was_idle = {
            let mut recorder = self.recorder.lock();
            let was_idle = recorder.state.is_idle();
            recorder.reset();
            was_idle
        };
        if !was_idle {
            log::debug!("recording discarded");
            self.notify_state(&CaptureState::Idle);
        }
    }

    // --- Internal helpers ---

    fn fail_start(
        &self,
        stream: Option<Box<dyn RecordingStream>>,
        error: CaptureError,
    ) -> CaptureError {
        if let Some(mut stream) = stream {
            stream.release_tracks();
        }
        self.recorder.lock().state = CaptureState::Idle;
        log::warn!("recording could not start: {}", error);
        self.notify_state(&CaptureState::Idle);
        if let Some(delegate) = &self.delegate {
            delegate.on_error(&error);
        }
        error
    }

    fn start_timer(&mut self, recording_id: u64) {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let recorder = Arc::clone(&self.recorder);
        let delegate = self.delegate.clone();
        let interval = self.config.chunk_interval();
        let interval_ms = self.config.chunk_interval_ms;
        let max_duration_secs = self.config.max_duration_secs;

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let (state, finished) = {
                    let mut r = recorder.lock();
                    if r.recording_id != recording_id || !r.state.is_recording() {
                        break;
                    }
                    r.collect_chunk();
                    r.elapsed_ms += interval_ms;
                    let elapsed_secs = r.elapsed_secs();
                    r.state = CaptureState::Recording { elapsed_secs };

                    let finished = match max_duration_secs {
                        Some(max) if elapsed_secs >= max => Some(r.finalize()),
                        _ => None,
                    };
                    (r.state.clone(), finished)
                };

                if let Some(delegate) = &delegate {
                    delegate.on_state_changed(&state);
                }
                if let Some(asset) = finished {
                    log::info!("recording reached its {}s limit", asset.duration_secs);
                    if let Some(delegate) = &delegate {
                        delegate.on_capture_finished(&asset);
                    }
                    break;
                }
            }
        });

        self.timer = Some(token);
    }

    fn stop_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }

    fn notify_state(&self, state: &CaptureState) {
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(state);
        }
    }
}

impl<D: MediaCaptureDevice> Drop for MediaCaptureController<D> {
    fn drop(&mut self) {
        self.stop_timer();
        if let Some(mut stream) = self.recorder.lock().stream.take() {
            stream.release_tracks();
        }
    }
}

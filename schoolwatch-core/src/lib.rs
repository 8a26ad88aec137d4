//! # schoolwatch-core
//!
//! Platform-agnostic core of the school camera portal.
//!
//! Provides live stream session management for a school's cameras, local
//! consent video capture, and the secure pickup upload pipeline. Concrete
//! backends (HTTP registry and storage, HLS decoding) implement the traits
//! in `traits/` and plug into the generic components here.
//!
//! ## Architecture
//!
//! ```text
//! schoolwatch-core (this crate)
//! ├── traits/    ← DecoderBackend, PlaybackSurface, CameraRegistry, AssetStore,
//! │                RecordStore, MediaCaptureDevice, delegates
//! ├── models/    ← errors, CameraDescriptor, CaptureState, pickup records, configuration
//! ├── stream/    ← AddressTranslator, DecoderSession, StreamSessionManager,
//! │                RefreshSchedule
//! ├── capture/   ← MediaCaptureController, content type negotiation
//! ├── pickup/    ← UploadPipeline
//! └── storage/   ← ChunkWriter, checksums
//! ```

pub mod capture;
pub mod models;
pub mod pickup;
pub mod storage;
pub mod stream;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for convenience.
pub use capture::controller::MediaCaptureController;
pub use models::camera::{CameraDescriptor, CameraId, DecoderState, SessionStatus};
pub use models::config::{
    CaptureConfiguration, PickupConfiguration, PortalConfiguration, ProxyRoute,
    StreamConfiguration, UnknownOriginPolicy,
};
pub use models::error::{
    CaptureError, ConfigError, PickupError, StoreError, StreamError, UploadStage,
};
pub use models::pickup::{
    AssetReference, MediaAsset, PickupRequest, PickupStatus, PickupSubmission, RecordedAsset,
};
pub use models::state::CaptureState;
pub use pickup::pipeline::UploadPipeline;
pub use stream::address::AddressTranslator;
pub use stream::decoder_session::{DecoderSession, EventOutcome};
pub use stream::manager::{AttachSummary, StreamSessionManager};
pub use stream::schedule::RefreshSchedule;
pub use traits::asset_store::AssetStore;
pub use traits::camera_registry::CameraRegistry;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_device::{MediaCaptureDevice, MediaConstraints, RecordingStream};
pub use traits::decoder_backend::{
    DecoderBackend, DecoderEvent, DecoderEventReceiver, DecoderEventSender, DecoderHandle,
    PlaybackSurface, SurfaceProvider,
};
pub use traits::record_store::{RecordQuery, RecordStore};
pub use traits::stream_delegate::StreamDelegate;

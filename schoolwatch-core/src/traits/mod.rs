pub mod asset_store;
pub mod camera_registry;
pub mod capture_delegate;
pub mod capture_device;
pub mod decoder_backend;
pub mod record_store;
pub mod stream_delegate;

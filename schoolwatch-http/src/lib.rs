//! # schoolwatch-http
//!
//! HTTP backends for schoolwatch-core.
//!
//! Provides:
//! - `RestClient`: camera registry, asset store and record store over a
//!   PostgREST-style API with object storage
//! - `HlsBackend`: decoder backend that loads HLS playlists and feeds
//!   segments to a `PlaybackSurface`
//! - `playlist`: minimal M3U8 parsing
//!
//! ## Usage
//! ```ignore
//! use schoolwatch_core::{StreamConfiguration, StreamSessionManager};
//! use schoolwatch_http::{HlsBackend, HlsConfiguration, RestClient, RestConfiguration};
//!
//! let rest = RestClient::new(&RestConfiguration::default())?;
//! let hls = HlsBackend::new(HlsConfiguration::default())?;
//! let manager = StreamSessionManager::new(Arc::new(hls), StreamConfiguration::default())?;
//! manager.attach_school(&rest, "school-1", &surfaces).await?;
//! ```

pub mod config;
pub mod error;
pub mod hls;
pub mod playlist;
pub mod rest;

pub use config::{HlsConfiguration, RestConfiguration};
pub use error::BackendError;
pub use hls::{HlsBackend, HlsHandle};
pub use rest::RestClient;

//! HLS decoder backend.
//!
//! Each attached handle runs one loader task:
//! ```text
//! load playlist ─(master)→ first variant ─→ ManifestParsed
//!      └─(media)──────────────────────────────┘
//!                  poll media playlist → fetch new segments → append_segment
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use schoolwatch_core::models::error::StreamError;
use schoolwatch_core::traits::decoder_backend::{
    DecoderBackend, DecoderEvent, DecoderEventSender, DecoderHandle, PlaybackSurface,
};

use crate::config::{parse_http_url, HlsConfiguration};
use crate::error::BackendError;
use crate::playlist::{self, MediaPlaylist, Playlist};

/// Segments fetched when joining a live playlist, counted from its end.
const LIVE_EDGE_SEGMENTS: usize = 3;

/// Upper bound on the media playlist poll interval.
const MAX_POLL: Duration = Duration::from_secs(10);

/// `DecoderBackend` that plays HLS playlists over HTTP.
#[derive(Debug, Clone)]
pub struct HlsBackend {
    http: Client,
    page_origin: Url,
    config: HlsConfiguration,
}

impl HlsBackend {
    pub fn new(config: HlsConfiguration) -> Result<Self, BackendError> {
        config.validate().map_err(BackendError::InvalidConfiguration)?;
        let page_origin =
            parse_http_url(&config.page_origin).map_err(BackendError::InvalidConfiguration)?;
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            page_origin,
            config,
        })
    }

    /// Absolute playlist URL for a stream address. Same-origin proxy paths
    /// are resolved against the page origin.
    pub fn resolve(&self, address: &str) -> Result<Url, StreamError> {
        self.page_origin.join(address).map_err(|e| {
            StreamError::network(true, format!("invalid stream address {}: {}", address, e))
        })
    }
}

#[async_trait]
impl DecoderBackend for HlsBackend {
    async fn attach(
        &self,
        address: &str,
        surface: Arc<dyn PlaybackSurface>,
        events: DecoderEventSender,
    ) -> Result<Box<dyn DecoderHandle>, StreamError> {
        let url = self.resolve(address)?;
        log::debug!("loading {} into surface {}", url, surface.surface_id());

        let token = CancellationToken::new();
        let loader = Loader {
            http: self.http.clone(),
            config: self.config.clone(),
            surface,
            events,
        };
        let cancelled = token.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {}
                _ = loader.run(url) => {}
            }
        });

        Ok(Box::new(HlsHandle {
            token,
            task: Some(task),
        }))
    }
}

/// Handle for one loader task.
pub struct HlsHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl DecoderHandle for HlsHandle {
    async fn destroy(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("hls loader task failed: {}", e);
            }
        }
    }
}

impl Drop for HlsHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct Loader {
    http: Client,
    config: HlsConfiguration,
    surface: Arc<dyn PlaybackSurface>,
    events: DecoderEventSender,
}

impl Loader {
    async fn run(self, url: Url) {
        if let Err(e) = self.play(url).await {
            let _ = self.events.send(DecoderEvent::Error(e));
        }
    }

    async fn play(&self, url: Url) -> Result<(), StreamError> {
        let (media_url, mut playlist) = self.load_manifest(url).await?;
        let _ = self.events.send(DecoderEvent::ManifestParsed);

        let mut next_sequence = playlist.live_edge(LIVE_EDGE_SEGMENTS);

        loop {
            for segment in playlist.segments_from(next_sequence) {
                let segment_url = join(&media_url, &segment.uri)?;
                let data = self.fetch(&segment_url).await?;
                self.surface.append_segment(&data);
                next_sequence = segment.sequence.saturating_add(1);
            }
            if playlist.ended {
                log::debug!("{} ended", media_url);
                return Ok(());
            }

            tokio::time::sleep(poll_interval(&playlist, self.config.min_poll())).await;
            playlist = self.load_media(&media_url).await?;

            // the gateway restarted its sequence numbering
            if playlist.end_sequence() < next_sequence {
                log::info!(
                    "{} restarted at sequence {}, rejoining the live edge",
                    media_url,
                    playlist.media_sequence
                );
                next_sequence = playlist.live_edge(LIVE_EDGE_SEGMENTS);
            }
        }
    }

    /// Load the playlist at `url`, following a master playlist to its
    /// first variant.
    async fn load_manifest(&self, url: Url) -> Result<(Url, MediaPlaylist), StreamError> {
        match self.load(&url).await? {
            Playlist::Media(media) => Ok((url, media)),
            Playlist::Master(master) => {
                let variant = master
                    .variants
                    .first()
                    .ok_or_else(|| StreamError::decode(true, "master playlist has no variants"))?;
                let media_url = join(&url, &variant.uri)?;
                let media = self.load_media(&media_url).await?;
                Ok((media_url, media))
            }
        }
    }

    async fn load_media(&self, url: &Url) -> Result<MediaPlaylist, StreamError> {
        match self.load(url).await? {
            Playlist::Media(media) => Ok(media),
            Playlist::Master(_) => Err(StreamError::decode(
                true,
                format!("{} is a master playlist, expected media", url),
            )),
        }
    }

    async fn load(&self, url: &Url) -> Result<Playlist, StreamError> {
        let body = self.fetch(url).await?;
        let text = String::from_utf8_lossy(&body);
        playlist::parse(&text).map_err(|e| StreamError::decode(true, format!("{}: {}", url, e)))
    }

    /// GET with retries. Each failed attempt is reported as a non-fatal
    /// error; running out of retries is fatal.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, StreamError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(data) => return Ok(data),
                Err(detail) if attempt < self.config.max_fetch_retries => {
                    attempt += 1;
                    let _ = self
                        .events
                        .send(DecoderEvent::Error(StreamError::network(false, detail)));
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(detail) => {
                    return Err(StreamError::network(
                        true,
                        format!("{} (gave up after {} retries)", detail, attempt),
                    ));
                }
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<Vec<u8>, String> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| format!("{}: {}", url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("{}: status {}", url, status));
        }
        let bytes = response.bytes().await.map_err(|e| format!("{}: {}", url, e))?;
        Ok(bytes.to_vec())
    }
}

/// Half the target duration, capped at `MAX_POLL` and never below `min_poll`.
fn poll_interval(playlist: &MediaPlaylist, min_poll: Duration) -> Duration {
    Duration::from_millis(playlist.target_duration_secs.saturating_mul(500))
        .min(MAX_POLL)
        .max(min_poll)
}

fn join(base: &Url, reference: &str) -> Result<Url, StreamError> {
    base.join(reference).map_err(|e| {
        StreamError::decode(true, format!("bad uri {:?} in {}: {}", reference, base, e))
    })
}

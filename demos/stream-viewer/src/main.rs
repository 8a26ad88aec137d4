mod viewer_state;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use schoolwatch_core::{PortalConfiguration, StreamSessionManager};
use schoolwatch_http::{HlsBackend, HlsConfiguration, RestClient, RestConfiguration};

use viewer_state::{LoggingDelegate, ViewerSurfaces};

/// Viewer settings, read from the JSON file given as the first argument.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewerConfig {
    school_id: String,
    portal: PortalConfiguration,
    rest: RestConfiguration,
    hls: HlsConfiguration,
}

impl ViewerConfig {
    fn load(path: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            return Err("usage: stream-viewer <config.json>".into());
        };
        let json = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.portal.validate()?;
        if config.school_id.trim().is_empty() {
            return Err("school_id is required".into());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = ViewerConfig::load(std::env::args_os().nth(1).map(PathBuf::from))?;
    let registry = RestClient::new(&config.rest)?;
    let backend = HlsBackend::new(config.hls.clone())?;

    let manager = StreamSessionManager::new(Arc::new(backend), config.portal.stream.clone())?;
    manager.set_delegate(Arc::new(LoggingDelegate));

    let surfaces = ViewerSurfaces::default();
    let summary = manager
        .attach_school(&registry, &config.school_id, &surfaces)
        .await?;
    for (camera_id, error) in &summary.failed {
        log::warn!("camera {} not attached: {}", camera_id, error);
    }

    manager.start_refresh();
    log::info!(
        "watching {} cameras, refreshing every {}s; Ctrl-C to stop",
        manager.len(),
        config.portal.stream.refresh_interval_secs
    );

    tokio::signal::ctrl_c().await?;

    manager.teardown_all().await;
    for (camera_id, bytes) in surfaces.totals() {
        log::info!("camera {}: {} bytes received", camera_id, bytes);
    }
    Ok(())
}

//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, media backend)
//! and the Supabase storage provider into a ready-to-use playback session.
//! Desktop hosts typically enable `desktop-shims` (reqwest HTTP client from
//! `bridge-desktop`) and `headless-backend` (device-less media backend);
//! embedders with their own audio output inject a `MediaBackend` through
//! [`PlayerConfig`].
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_runtime::PlayerConfig;
//! use core_service::CoreService;
//!
//! let config = PlayerConfig::builder()
//!     .base_url("https://project.supabase.co")
//!     .api_key("anon-key")
//!     .build()?;
//!
//! let core = CoreService::bootstrap(config)?;
//! core.start().await?;
//! println!("{:?}", core.presentation().view().await.status_message);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod presentation;

pub use error::{CoreError, Result};
pub use presentation::{PlayerView, PresentationAdapter, TrackRow, UserIntent, VolumeLevel};

use std::sync::Arc;

use bridge_traits::{http::HttpClient, playback::MediaBackend, storage::RemoteObjectStore};
use core_playback::{LoadOutcome, PlaybackConfig, PlaybackController, RemotePlaylistSource};
use core_runtime::events::{EventBus, EventStream};
use core_runtime::PlayerConfig;
use provider_supabase::SupabaseStorageConnector;
use tracing::info;

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub object_store: Arc<dyn RemoteObjectStore>,
    pub media_backend: Arc<dyn MediaBackend>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        object_store: Arc<dyn RemoteObjectStore>,
        media_backend: Arc<dyn MediaBackend>,
    ) -> Self {
        Self {
            http_client,
            object_store,
            media_backend,
        }
    }

    /// Build the storage connector from `config` and resolve the media backend.
    pub fn from_config(config: &PlayerConfig) -> Result<Self> {
        let storage = &config.storage;
        let connector = SupabaseStorageConnector::new(
            Arc::clone(&config.http_client),
            storage.base_url.clone(),
            storage.api_key.clone(),
            storage.bucket.clone(),
        )
        .with_page_size(storage.list_limit);

        Ok(Self {
            http_client: Arc::clone(&config.http_client),
            object_store: Arc::new(connector),
            media_backend: resolve_media_backend(config)?,
        })
    }
}

#[cfg(feature = "headless-backend")]
fn resolve_media_backend(config: &PlayerConfig) -> Result<Arc<dyn MediaBackend>> {
    Ok(config.media_backend.clone().unwrap_or_else(|| {
        info!("No media backend injected, using headless backend");
        Arc::new(core_playback::HeadlessMediaBackend::new())
    }))
}

#[cfg(not(feature = "headless-backend"))]
fn resolve_media_backend(config: &PlayerConfig) -> Result<Arc<dyn MediaBackend>> {
    config
        .media_backend
        .clone()
        .ok_or_else(|| CoreError::CapabilityMissing {
            capability: "MediaBackend".to_string(),
            message: "No media backend was injected. Pass one with \
                      PlayerConfigBuilder::media_backend() or enable the \
                      'headless-backend' feature."
                .to_string(),
        })
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    deps: Arc<CoreDependencies>,
    controller: PlaybackController,
}

impl CoreService {
    /// Create a service over explicit dependencies. Must run inside a Tokio
    /// runtime.
    pub fn new(deps: CoreDependencies, config: &PlayerConfig) -> Result<Self> {
        let playback = PlaybackConfig::from(&config.playback);
        playback.validate()?;

        let source = RemotePlaylistSource::new(
            Arc::clone(&deps.object_store),
            config.storage.folder.clone(),
            config.playback.audio_extensions.iter(),
        );
        let events = EventBus::new(config.event_buffer_size);
        let controller = PlaybackController::new(
            Arc::new(source),
            Arc::clone(&deps.media_backend),
            playback,
            events,
        );

        info!(
            bucket = %config.storage.bucket,
            folder = %config.storage.folder,
            "Core service created"
        );

        Ok(Self {
            deps: Arc::new(deps),
            controller,
        })
    }

    /// Wire the default dependencies described by `config`.
    pub fn bootstrap(config: PlayerConfig) -> Result<Self> {
        let deps = CoreDependencies::from_config(&config)?;
        Self::new(deps, &config)
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn subscribe(&self) -> EventStream {
        self.controller.subscribe()
    }

    pub fn presentation(&self) -> PresentationAdapter {
        PresentationAdapter::new(self.controller.clone())
    }

    /// List the folder and start the first track.
    pub async fn start(&self) -> Result<Option<LoadOutcome>> {
        Ok(self.controller.initialize().await?)
    }

    /// Release the bound track and invalidate in-flight loads.
    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
    }
}

//! # Player Configuration
//!
//! Builder-based configuration for the player core: where the tracks live
//! (storage settings), how playback behaves (playback settings) and which host
//! capabilities are injected.
//!
//! ## Capability resolution
//!
//! | Capability | Injected | Fallback |
//! |------------|----------|----------|
//! | `HttpClient` | `.http_client()` | `ReqwestHttpClient` with the `desktop-shims` feature, otherwise `CapabilityMissing` |
//! | `MediaBackend` | `.media_backend()` | resolved by `core-service` (headless backend feature) |
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::PlayerConfig;
//!
//! let config = PlayerConfig::builder()
//!     .base_url("https://project.supabase.co")
//!     .api_key(std::env::var("SUPABASE_ANON_KEY")?)
//!     .bucket("audio")
//!     .folder("files")
//!     .initial_volume(0.8)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{HttpClient, MediaBackend};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default bucket name used when none is configured
pub const DEFAULT_BUCKET: &str = "audio";
/// Default folder inside the bucket
pub const DEFAULT_FOLDER: &str = "files";
/// Default page size for folder listings
pub const DEFAULT_LIST_LIMIT: u32 = 100;
/// Default wait for a media handle's metadata
pub const DEFAULT_METADATA_TIMEOUT_MS: u64 = 15_000;

/// Remote storage location and credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Project base URL, e.g. `https://project.supabase.co`
    pub base_url: String,
    /// Anon or service key sent as `apikey` and bearer token
    pub api_key: String,
    pub bucket: String,
    pub folder: String,
    /// Maximum entries requested per listing
    pub list_limit: u32,
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .field("folder", &self.folder)
            .field("list_limit", &self.list_limit)
            .finish()
    }
}

impl StorageSettings {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config(
                "Storage base URL is required. Use .base_url() to set it.".to_string(),
            ));
        }

        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(Error::Config(format!(
                "Storage base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if self.api_key.trim().is_empty() {
            return Err(Error::Config(
                "Storage API key is required. Use .api_key() to set it.".to_string(),
            ));
        }

        if self.bucket.trim().is_empty() {
            return Err(Error::Config("Storage bucket cannot be empty".to_string()));
        }

        if self.list_limit == 0 {
            return Err(Error::Config(
                "Listing limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Playback behaviour knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// File name suffixes treated as playable, matched case-insensitively
    pub audio_extensions: Vec<String>,
    /// Session volume before any user change, `0.0..=1.0`
    pub initial_volume: f32,
    /// How long a freshly opened handle may take to report its metadata
    pub metadata_timeout_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            audio_extensions: vec![".mp3".to_string()],
            initial_volume: 1.0,
            metadata_timeout_ms: DEFAULT_METADATA_TIMEOUT_MS,
        }
    }
}

impl PlaybackSettings {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio_extensions.is_empty() {
            return Err(Error::Config(
                "At least one audio extension is required (e.g. \".mp3\")".to_string(),
            ));
        }

        if let Some(bad) = self
            .audio_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(Error::Config(format!(
                "Audio extension '{}' must start with '.' and name a suffix",
                bad
            )));
        }

        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(Error::Config(format!(
                "Initial volume must be within 0.0..=1.0, got {}",
                self.initial_volume
            )));
        }

        if self.metadata_timeout_ms == 0 {
            return Err(Error::Config(
                "Metadata timeout must be greater than 0ms".to_string(),
            ));
        }

        Ok(())
    }
}

/// Complete player configuration.
#[derive(Clone)]
pub struct PlayerConfig {
    pub storage: StorageSettings,
    pub playback: PlaybackSettings,
    /// Capacity of the event bus broadcast channel
    pub event_buffer_size: usize,
    pub http_client: Arc<dyn HttpClient>,
    /// Host media engine; `None` lets the service pick its default
    pub media_backend: Option<Arc<dyn MediaBackend>>,
}

impl std::fmt::Debug for PlayerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerConfig")
            .field("storage", &self.storage)
            .field("playback", &self.playback)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field(
                "media_backend",
                &self.media_backend.as_ref().map(|_| "MediaBackend { ... }"),
            )
            .finish()
    }
}

impl PlayerConfig {
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.playback.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::capability_missing(
            "HttpClient",
            format!("Default desktop HTTP client could not be created: {}", e),
        )
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::capability_missing(
        "HttpClient",
        "HttpClient implementation is required to reach remote storage. \
         Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
         Other hosts: inject a platform HTTP client with .http_client().",
    ))
}

#[derive(Default)]
pub struct PlayerConfigBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    bucket: Option<String>,
    folder: Option<String>,
    list_limit: Option<u32>,
    playback: PlaybackSettings,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    media_backend: Option<Arc<dyn MediaBackend>>,
}

impl PlayerConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn list_limit(mut self, limit: u32) -> Self {
        self.list_limit = Some(limit);
        self
    }

    /// Replace the playable extension list (e.g. `[".mp3", ".ogg"]`).
    pub fn audio_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.playback.audio_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn initial_volume(mut self, volume: f32) -> Self {
        self.playback.initial_volume = volume;
        self
    }

    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.playback.metadata_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn playback_settings(mut self, settings: PlaybackSettings) -> Self {
        self.playback = settings;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn media_backend(mut self, backend: Arc<dyn MediaBackend>) -> Self {
        self.media_backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<PlayerConfig> {
        let base_url = self.base_url.ok_or_else(|| {
            Error::Config("Storage base URL is required. Use .base_url() to set it.".to_string())
        })?;

        let api_key = self.api_key.ok_or_else(|| {
            Error::Config("Storage API key is required. Use .api_key() to set it.".to_string())
        })?;

        let storage = StorageSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            bucket: self.bucket.unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            folder: self
                .folder
                .unwrap_or_else(|| DEFAULT_FOLDER.to_string())
                .trim_matches('/')
                .to_string(),
            list_limit: self.list_limit.unwrap_or(DEFAULT_LIST_LIMIT),
        };

        // Fail on bad settings before touching any default capability.
        storage.validate()?;
        self.playback.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = PlayerConfig {
            storage,
            playback: self.playback,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            media_backend: self.media_backend,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse};

    struct NoopHttpClient;

    #[async_trait]
    impl HttpClient for NoopHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable("offline".into()))
        }
    }

    fn builder() -> PlayerConfigBuilder {
        PlayerConfig::builder()
            .base_url("https://project.supabase.co/")
            .api_key("anon-key")
            .http_client(Arc::new(NoopHttpClient))
    }

    #[test]
    fn test_build_applies_defaults() {
        let config = builder().build().unwrap();

        assert_eq!(config.storage.base_url, "https://project.supabase.co");
        assert_eq!(config.storage.bucket, DEFAULT_BUCKET);
        assert_eq!(config.storage.folder, DEFAULT_FOLDER);
        assert_eq!(config.storage.list_limit, DEFAULT_LIST_LIMIT);
        assert_eq!(config.playback.audio_extensions, vec![".mp3".to_string()]);
        assert_eq!(config.playback.initial_volume, 1.0);
        assert_eq!(
            config.playback.metadata_timeout(),
            Duration::from_millis(DEFAULT_METADATA_TIMEOUT_MS)
        );
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.media_backend.is_none());
    }

    #[test]
    fn test_build_with_overrides() {
        let config = builder()
            .bucket("podcasts")
            .folder("/episodes/")
            .list_limit(25)
            .audio_extensions([".mp3", ".ogg"])
            .initial_volume(0.4)
            .metadata_timeout(Duration::from_secs(2))
            .event_buffer_size(8)
            .build()
            .unwrap();

        assert_eq!(config.storage.bucket, "podcasts");
        assert_eq!(config.storage.folder, "episodes");
        assert_eq!(config.storage.list_limit, 25);
        assert_eq!(config.playback.audio_extensions.len(), 2);
        assert_eq!(config.playback.initial_volume, 0.4);
        assert_eq!(config.playback.metadata_timeout_ms, 2_000);
        assert_eq!(config.event_buffer_size, 8);
    }

    #[test]
    fn test_missing_base_url() {
        let err = PlayerConfig::builder()
            .api_key("anon-key")
            .http_client(Arc::new(NoopHttpClient))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains(".base_url()"));
    }

    #[test]
    fn test_missing_api_key() {
        let err = PlayerConfig::builder()
            .base_url("https://project.supabase.co")
            .http_client(Arc::new(NoopHttpClient))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains(".api_key()"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(builder().base_url("ftp://nope").build().is_err());
        assert!(builder().initial_volume(1.5).build().is_err());
        assert!(builder().audio_extensions(["mp3"]).build().is_err());
        assert!(builder()
            .audio_extensions(Vec::<String>::new())
            .build()
            .is_err());
        assert!(builder()
            .metadata_timeout(Duration::from_millis(0))
            .build()
            .is_err());
        assert!(builder().event_buffer_size(0).build().is_err());
        assert!(builder().list_limit(0).build().is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("anon-key"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_settings_serde() {
        let settings = PlaybackSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: PlaybackSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_http_client_required_without_desktop_shims() {
        let err = PlayerConfig::builder()
            .base_url("https://project.supabase.co")
            .api_key("anon-key")
            .build()
            .unwrap_err();
        match err {
            Error::CapabilityMissing { capability, message } => {
                assert_eq!(capability, "HttpClient");
                assert!(message.contains("desktop-shims"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = PlayerConfig::builder()
            .base_url("https://project.supabase.co")
            .api_key("anon-key")
            .build()
            .expect("desktop defaults should succeed");
        assert_eq!(config.storage.bucket, DEFAULT_BUCKET);
    }
}

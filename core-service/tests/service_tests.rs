//! Integration tests for the core service
//!
//! Wires the real storage connector over a mocked `HttpClient` and drives the
//! player through the presentation adapter.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::playback::{
    ContentRefId, MediaBackend, MediaEvent, MediaEventReceiver, MediaEventSender, MediaHandleId,
    MediaSignal,
};
use bytes::Bytes;
use core_playback::{LoadOutcome, PlaybackError};
use core_runtime::PlayerConfig;
use core_service::{CoreError, CoreService, UserIntent, VolumeLevel};
use mockall::mock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Mock Implementations
// ============================================================================

mock! {
    Http {}

    #[async_trait]
    impl HttpClient for Http {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

fn response(status: u16, body: impl Into<Bytes>) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: body.into(),
    }
}

const LISTING: &str = r#"[
    {"name": "b.mp3", "id": "2", "metadata": {"size": 2097152, "mimetype": "audio/mpeg"}},
    {"name": "a.mp3", "id": "1", "metadata": {"size": 1048576, "mimetype": "audio/mpeg"}},
    {"name": "cover.jpg", "id": "3", "metadata": {"size": 512, "mimetype": "image/jpeg"}},
    {"name": "archive", "id": null, "metadata": null}
]"#;

/// Storage that lists `LISTING` and serves every object as its URL
fn storage_http() -> MockHttp {
    let mut http = MockHttp::new();
    http.expect_execute().returning(|request| match request.method {
        HttpMethod::Post => Ok(response(200, LISTING)),
        HttpMethod::Get => Ok(response(200, request.url)),
        _ => Ok(response(405, "")),
    });
    http
}

/// Backend that reports a two-minute duration as soon as a handle opens
#[derive(Default)]
struct InstantBackend {
    contents: Mutex<HashSet<ContentRefId>>,
    handles: Mutex<HashMap<MediaHandleId, (bool, f32)>>,
    subscribers: Mutex<Vec<MediaEventSender>>,
}

impl InstantBackend {
    fn emit(&self, handle: MediaHandleId, signal: MediaSignal) {
        let event = MediaEvent::new(handle, signal);
        self.subscribers
            .lock()
            .unwrap()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn live(&self) -> (usize, usize) {
        (
            self.handles.lock().unwrap().len(),
            self.contents.lock().unwrap().len(),
        )
    }

    fn with_handle<T>(&self, handle: MediaHandleId, f: impl FnOnce(&mut (bool, f32)) -> T) -> BridgeResult<T> {
        self.handles
            .lock()
            .unwrap()
            .get_mut(&handle)
            .map(f)
            .ok_or_else(|| BridgeError::UnknownResource(handle.to_string()))
    }
}

#[async_trait]
impl MediaBackend for InstantBackend {
    async fn create_content_ref(&self, _data: Bytes, _hint: Option<&str>) -> BridgeResult<ContentRefId> {
        let content = ContentRefId::new();
        self.contents.lock().unwrap().insert(content);
        Ok(content)
    }

    async fn revoke_content_ref(&self, content: ContentRefId) -> BridgeResult<()> {
        if self.contents.lock().unwrap().remove(&content) {
            Ok(())
        } else {
            Err(BridgeError::UnknownResource(content.to_string()))
        }
    }

    async fn open(&self, _content: ContentRefId) -> BridgeResult<MediaHandleId> {
        let handle = MediaHandleId::new();
        self.handles.lock().unwrap().insert(handle, (false, 1.0));
        self.emit(
            handle,
            MediaSignal::MetadataReady {
                duration: Duration::from_secs(120),
            },
        );
        Ok(handle)
    }

    async fn play(&self, handle: MediaHandleId) -> BridgeResult<()> {
        self.with_handle(handle, |state| state.0 = true)
    }

    async fn pause(&self, handle: MediaHandleId) -> BridgeResult<()> {
        self.with_handle(handle, |state| state.0 = false)
    }

    async fn seek(&self, handle: MediaHandleId, _position: Duration) -> BridgeResult<()> {
        self.with_handle(handle, |_| ())
    }

    async fn set_volume(&self, handle: MediaHandleId, volume: f32) -> BridgeResult<()> {
        self.with_handle(handle, |state| state.1 = volume)
    }

    async fn is_playing(&self, handle: MediaHandleId) -> BridgeResult<bool> {
        self.with_handle(handle, |state| state.0)
    }

    async fn release(&self, handle: MediaHandleId) -> BridgeResult<()> {
        self.handles
            .lock()
            .unwrap()
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| BridgeError::UnknownResource(handle.to_string()))
    }

    fn subscribe(&self) -> MediaEventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(sender);
        receiver
    }
}

fn config(http: MockHttp, backend: Arc<InstantBackend>) -> PlayerConfig {
    PlayerConfig::builder()
        .base_url("https://project.supabase.co")
        .api_key("anon-key")
        .http_client(Arc::new(http))
        .media_backend(backend)
        .initial_volume(0.8)
        .build()
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn bootstrap_and_play_through_presentation() {
    let backend = Arc::new(InstantBackend::default());
    let core = CoreService::bootstrap(config(storage_http(), backend.clone())).unwrap();
    let ui = core.presentation();

    assert_eq!(
        ui.view().await.status_message.as_deref(),
        Some("Loading audio files...")
    );

    assert_eq!(core.start().await.unwrap(), Some(LoadOutcome::Loaded));

    let view = ui.view().await;
    assert_eq!(view.status_message, None);
    assert_eq!(view.now_playing.as_deref(), Some("a.mp3"));
    assert!(view.is_playing);
    assert_eq!(view.duration_label, "2:00");
    assert_eq!(view.volume_level, VolumeLevel::High);
    let names: Vec<_> = view.tracks.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["a.mp3", "b.mp3"]);
    assert_eq!(view.tracks[0].size_label.as_deref(), Some("1.00 MB"));
    assert!(view.tracks[0].is_current);

    ui.dispatch(UserIntent::Next).await.unwrap();
    assert_eq!(ui.view().await.now_playing.as_deref(), Some("b.mp3"));

    ui.dispatch(UserIntent::SetVolume(0.2)).await.unwrap();
    ui.dispatch(UserIntent::ToggleVolumeSlider).await.unwrap();
    let view = ui.view().await;
    assert_eq!(view.volume_level, VolumeLevel::Low);
    assert!(view.show_volume_slider);

    ui.dispatch(UserIntent::ToggleMute).await.unwrap();
    assert_eq!(ui.view().await.volume_level, VolumeLevel::Muted);
    ui.dispatch(UserIntent::ToggleMute).await.unwrap();
    assert_eq!(ui.view().await.volume, 0.2);

    ui.dispatch(UserIntent::Seek(75.0)).await.unwrap();
    assert_eq!(ui.view().await.elapsed_label, "1:15");

    ui.dispatch(UserIntent::ToggleRepeat).await.unwrap();
    assert_eq!(ui.view().await.repeat_label, "Repeat is on");

    ui.dispatch(UserIntent::TogglePlayPause).await.unwrap();
    assert!(!ui.view().await.is_playing);

    assert_eq!(backend.live(), (1, 1));
    core.shutdown().await;
    assert_eq!(backend.live(), (0, 0));
}

#[tokio::test]
async fn invalid_selection_shows_error_until_cleared() {
    let backend = Arc::new(InstantBackend::default());
    let core = CoreService::bootstrap(config(storage_http(), backend)).unwrap();
    let ui = core.presentation();
    core.start().await.unwrap();

    let err = ui.dispatch(UserIntent::SelectTrack(9)).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Playback(PlaybackError::Index { index: 9, len: 2 })
    ));

    let view = ui.view().await;
    assert_eq!(
        view.status_message.as_deref(),
        Some("Error: Track index 9 is out of range (playlist has 2 tracks)")
    );
    assert!(view.can_clear_error);
    assert!(view.is_playing);

    ui.dispatch(UserIntent::ClearError).await.unwrap();
    assert_eq!(ui.view().await.status_message, None);
}

#[tokio::test]
async fn storage_failure_surfaces_as_error_view() {
    let mut http = MockHttp::new();
    http.expect_execute()
        .returning(|_| Ok(response(401, r#"{"statusCode":"401","error":"Unauthorized","message":"Invalid JWT"}"#)));
    let core = CoreService::bootstrap(config(http, Arc::new(InstantBackend::default()))).unwrap();

    let err = core.start().await.unwrap_err();
    assert!(matches!(err, CoreError::Playback(PlaybackError::Fetch { .. })));

    let view = core.presentation().view().await;
    let message = view.status_message.unwrap();
    assert!(message.starts_with("Error: "));
    assert!(message.contains("Invalid JWT"));
}

#[tokio::test]
async fn empty_folder_view() {
    let mut http = MockHttp::new();
    http.expect_execute()
        .returning(|_| Ok(response(200, r#"[{"name": "notes.txt", "id": "1", "metadata": {"size": 3}}]"#)));
    let core = CoreService::bootstrap(config(http, Arc::new(InstantBackend::default()))).unwrap();

    assert_eq!(core.start().await.unwrap(), None);
    let view = core.presentation().view().await;
    assert_eq!(view.status_message.as_deref(), Some("No audio files found"));
    assert!(view.tracks.is_empty());
}

#[tokio::test]
async fn events_reach_subscribers() {
    let core = CoreService::bootstrap(config(
        storage_http(),
        Arc::new(InstantBackend::default()),
    ))
    .unwrap();
    let mut events = core.subscribe();

    core.start().await.unwrap();

    let first = events.try_recv().unwrap().unwrap();
    assert_eq!(first.description(), "Playlist loaded");
}

#[cfg(feature = "headless-backend")]
#[tokio::test]
async fn headless_backend_is_the_default() {
    let config = PlayerConfig::builder()
        .base_url("https://project.supabase.co")
        .api_key("anon-key")
        .http_client(Arc::new(MockHttp::new()))
        .build()
        .unwrap();
    assert!(config.media_backend.is_none());
    assert!(CoreService::bootstrap(config).is_ok());
}

#[cfg(not(feature = "headless-backend"))]
#[tokio::test]
async fn missing_backend_is_reported() {
    let config = PlayerConfig::builder()
        .base_url("https://project.supabase.co")
        .api_key("anon-key")
        .http_client(Arc::new(MockHttp::new()))
        .build()
        .unwrap();
    let err = CoreService::bootstrap(config).err().unwrap();
    assert!(err.is_capability_missing());
}

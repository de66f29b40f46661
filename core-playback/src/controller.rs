//! # Playback Controller
//!
//! Owns the playlist, the single bound media handle and the transport state,
//! and turns user commands and media signals into state changes and
//! [`CoreEvent`]s.
//!
//! ## Loads and supersession
//!
//! Every [`load_track`](PlaybackController::load_track) takes a new generation
//! number. The download and the metadata wait are the only suspension points;
//! after each one the load checks that its generation is still the latest and
//! otherwise returns [`LoadOutcome::Superseded`] without touching the session.
//! The handle/content pair lives in one slot that is emptied only when a newer
//! load starts, when a load fails, or at [`shutdown`](PlaybackController::shutdown).
//!
//! ## Signals
//!
//! The controller subscribes to its backend once, at construction, and pumps
//! signals through [`handle_signal`](PlaybackController::handle_signal). Signals
//! from handles other than the bound one are dropped, as are position and
//! end-of-stream reports that arrive while the session is not playing.
//!
//! Dropping the last clone without [`shutdown`](PlaybackController::shutdown)
//! still releases the bound track, on the current Tokio runtime.

use bridge_traits::playback::{MediaBackend, MediaEvent, MediaEventReceiver, MediaHandleId, MediaSignal};
use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent, PlaylistEvent};
use parking_lot::Mutex as SyncMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::playlist::{Playlist, PlaylistSource};
use crate::session::{secs_to_millis, BoundTrack, PlaybackSnapshot, SessionState, SessionStatus};

/// Result of a load that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The requested track is bound and playing.
    Loaded,
    /// A newer load (or shutdown) took over; this one changed nothing.
    Superseded,
}

/// Cloneable handle to one playback session.
///
/// Must be created inside a Tokio runtime; construction spawns the signal pump.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    source: Arc<dyn PlaylistSource>,
    backend: Arc<dyn MediaBackend>,
    config: PlaybackConfig,
    events: EventBus,
    generation: AtomicU64,
    state: Mutex<SessionState>,
    pump: SyncMutex<Option<JoinHandle<()>>>,
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.get_mut().take() {
            pump.abort();
        }
        let Some(track) = self.state.get_mut().track.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(handle = %track.handle, "Releasing bound track of dropped controller");
                let backend = Arc::clone(&self.backend);
                runtime.spawn(async move { release_bound(backend.as_ref(), track).await });
            }
            Err(_) => warn!(
                handle = %track.handle,
                "Playback controller dropped outside a runtime; media handle not released"
            ),
        }
    }
}

impl PlaybackController {
    pub fn new(
        source: Arc<dyn PlaylistSource>,
        backend: Arc<dyn MediaBackend>,
        config: PlaybackConfig,
        events: EventBus,
    ) -> Self {
        let receiver = backend.subscribe();
        let inner = Arc::new(ControllerInner {
            source,
            backend,
            state: Mutex::new(SessionState::new(config.initial_volume)),
            config,
            events,
            generation: AtomicU64::new(0),
            pump: SyncMutex::new(None),
        });

        let pump = tokio::spawn(run_signal_pump(Arc::downgrade(&inner), receiver));
        *inner.pump.lock() = Some(pump);

        Self { inner }
    }

    /// Subscribe to the events this session publishes.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.events
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    pub async fn playlist(&self) -> Playlist {
        self.inner.state.lock().await.playlist.clone()
    }

    // ========================================================================
    // Playlist
    // ========================================================================

    /// List the folder and start the first track.
    ///
    /// Returns `Ok(None)` when the folder has no playable tracks.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<Option<LoadOutcome>> {
        {
            let mut state = self.inner.state.lock().await;
            if state.track.is_none() {
                state.status = SessionStatus::Loading;
            }
        }

        let listing = self.inner.source.list().await;
        let mut state = self.inner.state.lock().await;

        match listing {
            Err(err) => {
                warn!(error = %err, "Playlist listing failed");
                if state.track.is_none() {
                    state.status = SessionStatus::Error;
                }
                state.last_error = Some(err.clone());
                drop(state);
                self.emit_playlist(PlaylistEvent::FetchFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
            Ok(tracks) if tracks.is_empty() => {
                self.inner.generation.fetch_add(1, Ordering::SeqCst);
                self.release_track(&mut state).await;
                state.playlist = Playlist::default();
                state.current_index = None;
                state.cursor = None;
                state.is_playing = false;
                state.progress = 0.0;
                state.duration = 0.0;
                state.last_error = None;
                state.status = SessionStatus::Empty;
                drop(state);

                info!("No playable tracks in folder");
                self.emit_playlist(PlaylistEvent::Empty);
                Ok(None)
            }
            Ok(tracks) => {
                let track_count = tracks.len();
                state.playlist = Playlist::new(tracks);
                state.cursor = None;
                drop(state);

                info!(track_count, "Playlist loaded");
                self.emit_playlist(PlaylistEvent::Loaded { track_count });
                self.load_track(0).await.map(Some)
            }
        }
    }

    // ========================================================================
    // Track loading
    // ========================================================================

    /// Release the bound track, download `index`, bind it and start playing.
    #[instrument(skip(self))]
    pub async fn load_track(&self, index: usize) -> Result<LoadOutcome> {
        let (generation, entry) = {
            let mut state = self.inner.state.lock().await;
            let len = state.playlist.len();
            let Some(entry) = state.playlist.get(index).cloned() else {
                let err = PlaybackError::Index { index, len };
                debug!(error = %err, "Rejected track load");
                state.last_error = Some(err.clone());
                drop(state);
                self.emit_error(None, &err);
                return Err(err);
            };

            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.release_track(&mut state).await;
            state.cursor = Some(index);
            state.current_index = None;
            state.is_playing = false;
            state.progress = 0.0;
            state.duration = 0.0;
            state.status = SessionStatus::Loading;
            (generation, entry)
        };
        debug!(generation, track = %entry.name, "Loading track");

        let data = match self.inner.source.fetch(&entry).await {
            Ok(data) => data,
            Err(err) => return self.fail_if_current(generation, err).await,
        };

        let waiter = {
            let mut state = self.inner.state.lock().await;
            if !self.is_current(generation) {
                debug!(generation, "Discarding download of superseded load");
                return Ok(LoadOutcome::Superseded);
            }

            let backend = &self.inner.backend;
            let extension = entry.extension();
            let content = match backend.create_content_ref(data, extension.as_deref()).await {
                Ok(content) => content,
                Err(err) => {
                    return self
                        .fail_locked(&mut state, PlaybackError::Decode(err.to_string()))
                        .await
                }
            };
            let handle = match backend.open(content).await {
                Ok(handle) => handle,
                Err(err) => {
                    if let Err(revoke_err) = backend.revoke_content_ref(content).await {
                        warn!(%content, error = %revoke_err, "Failed to revoke content reference");
                    }
                    return self
                        .fail_locked(&mut state, PlaybackError::Decode(err.to_string()))
                        .await;
                }
            };

            let (sender, receiver) = oneshot::channel();
            state.track = Some(BoundTrack {
                generation,
                index,
                handle,
                content,
                waiter: Some(sender),
            });
            trace!(generation, %handle, "Bound media handle");
            receiver
        };

        let timeout = self.inner.config.metadata_timeout;
        let metadata = tokio::time::timeout(timeout, waiter).await;

        let mut state = self.inner.state.lock().await;
        if !self.is_current(generation) {
            debug!(generation, "Load superseded while waiting for metadata");
            return Ok(LoadOutcome::Superseded);
        }

        let duration = match metadata {
            Ok(Ok(Ok(duration))) => duration,
            Ok(Ok(Err(message))) => {
                return self
                    .fail_locked(&mut state, PlaybackError::Decode(message))
                    .await
            }
            Ok(Err(_)) => {
                debug!(generation, "Metadata waiter dropped");
                return Ok(LoadOutcome::Superseded);
            }
            Err(_) => {
                let err = PlaybackError::Decode(format!(
                    "no metadata reported within {} ms",
                    timeout.as_millis()
                ));
                return self.fail_locked(&mut state, err).await;
            }
        };

        let Some(handle) = state
            .track
            .as_ref()
            .filter(|track| track.generation == generation)
            .map(|track| track.handle)
        else {
            return Ok(LoadOutcome::Superseded);
        };

        state.duration = duration.as_secs_f64();
        state.progress = 0.0;
        state.current_index = Some(index);
        state.status = SessionStatus::Ready;

        if let Err(err) = self.start_handle(handle, state.volume).await {
            return self.fail_locked(&mut state, err).await;
        }

        state.is_playing = true;
        state.status = SessionStatus::Playing;
        state.last_error = None;
        let duration_ms = secs_to_millis(state.duration);
        drop(state);

        info!(track = %entry.name, index, duration_ms, "Track started");
        self.emit(PlaybackEvent::Started {
            track: entry.name,
            index,
            duration_ms,
        });
        Ok(LoadOutcome::Loaded)
    }

    /// Same as [`load_track`](Self::load_track); the user-facing name.
    pub async fn select_track(&self, index: usize) -> Result<LoadOutcome> {
        self.load_track(index).await
    }

    /// Load the track after the current one, wrapping to the first.
    ///
    /// Returns `Ok(None)` on an empty playlist. After a failed load the
    /// failed index counts as current.
    pub async fn next(&self) -> Result<Option<LoadOutcome>> {
        let target = {
            let state = self.inner.state.lock().await;
            let len = state.playlist.len();
            if len == 0 {
                return Ok(None);
            }
            state
                .current_index
                .or(state.cursor)
                .map_or(0, |index| (index + 1) % len)
        };

        self.load_track(target).await.map(Some)
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Flip play/pause on the bound track. Returns the resulting `is_playing`.
    pub async fn toggle_play_pause(&self) -> Result<bool> {
        let mut state = self.inner.state.lock().await;
        let Some(handle) = state.ready_handle() else {
            debug!("No ready track to toggle");
            return Ok(state.is_playing);
        };

        let backend = &self.inner.backend;
        let was_playing = backend
            .is_playing(handle)
            .await
            .map_err(|err| self.record_error(&mut state, err.into()))?;
        let command = if was_playing {
            backend.pause(handle).await
        } else {
            backend.play(handle).await
        };
        command.map_err(|err| self.record_error(&mut state, err.into()))?;

        let is_playing = backend
            .is_playing(handle)
            .await
            .map_err(|err| self.record_error(&mut state, err.into()))?;
        state.is_playing = is_playing;
        state.status = if is_playing {
            SessionStatus::Playing
        } else {
            SessionStatus::Ready
        };

        let track = state.track_name().unwrap_or_default();
        let position_ms = secs_to_millis(state.progress);
        drop(state);

        self.emit(if is_playing {
            PlaybackEvent::Resumed { track, position_ms }
        } else {
            PlaybackEvent::Paused { track, position_ms }
        });
        Ok(is_playing)
    }

    /// Pause and rewind. The handle stays bound.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        let handle = state.ready_handle();

        if let Some(handle) = handle {
            let backend = &self.inner.backend;
            backend
                .pause(handle)
                .await
                .map_err(|err| self.record_error(&mut state, err.into()))?;
            backend
                .seek(handle, Duration::ZERO)
                .await
                .map_err(|err| self.record_error(&mut state, err.into()))?;
            state.status = SessionStatus::Ready;
        }

        state.is_playing = false;
        state.progress = 0.0;

        if handle.is_some() {
            let track = state.track_name().unwrap_or_default();
            drop(state);
            self.emit(PlaybackEvent::Stopped { track });
        }
        Ok(())
    }

    /// Seek the bound track. Returns the clamped position in seconds.
    pub async fn seek(&self, seconds: f64) -> Result<f64> {
        let mut state = self.inner.state.lock().await;
        let target = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, state.duration)
        };

        if let Some(handle) = state.ready_handle() {
            self.inner
                .backend
                .seek(handle, Duration::from_secs_f64(target))
                .await
                .map_err(|err| self.record_error(&mut state, err.into()))?;
        }
        state.progress = target;

        let event = self.position_event(&state);
        drop(state);
        if let Some(event) = event {
            self.emit(event);
        }
        Ok(target)
    }

    /// Record a position report from the bound track.
    pub async fn on_progress_tick(&self, seconds: f64) {
        let mut state = self.inner.state.lock().await;
        if let Some(event) = self.apply_progress(&mut state, seconds) {
            drop(state);
            self.emit(event);
        }
    }

    /// React to the bound track reaching its end.
    #[instrument(skip(self))]
    pub async fn on_track_ended(&self) -> Result<()> {
        let generation = {
            let state = self.inner.state.lock().await;
            match state.track.as_ref() {
                Some(track) => track.generation,
                None => return Ok(()),
            }
        };
        self.finish_track(generation).await
    }

    async fn finish_track(&self, generation: u64) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        let Some(handle) = state
            .track
            .as_ref()
            .filter(|track| track.generation == generation && track.is_ready())
            .map(|track| track.handle)
        else {
            trace!(generation, "End of stream for a track that is no longer bound");
            return Ok(());
        };

        let repeat = state.is_repeat;
        let track = state.track_name().unwrap_or_default();
        self.emit(PlaybackEvent::Completed {
            track: track.clone(),
            repeat,
        });

        if repeat {
            let backend = &self.inner.backend;
            backend
                .seek(handle, Duration::ZERO)
                .await
                .map_err(|err| self.record_error(&mut state, err.into()))?;
            backend
                .play(handle)
                .await
                .map_err(|err| self.record_error(&mut state, err.into()))?;

            state.progress = 0.0;
            state.is_playing = true;
            state.status = SessionStatus::Playing;
            let index = state.current_index.unwrap_or_default();
            let duration_ms = secs_to_millis(state.duration);
            drop(state);

            debug!(%track, "Repeating track");
            self.emit(PlaybackEvent::Started {
                track,
                index,
                duration_ms,
            });
            return Ok(());
        }

        state.is_playing = false;
        state.status = SessionStatus::Ended;
        drop(state);

        self.next().await.map(|_| ())
    }

    // ========================================================================
    // Volume and repeat
    // ========================================================================

    /// Set the session volume. Returns the clamped value.
    pub async fn set_volume(&self, volume: f32) -> Result<f32> {
        let mut state = self.inner.state.lock().await;
        let volume = self.apply_volume(&mut state, volume).await?;
        drop(state);

        self.emit(PlaybackEvent::VolumeChanged {
            volume,
            muted: volume == 0.0,
        });
        Ok(volume)
    }

    /// Mute, or restore the volume from before the last mute.
    pub async fn toggle_mute(&self) -> Result<f32> {
        let mut state = self.inner.state.lock().await;
        let target = if state.volume > 0.0 {
            state.previous_volume = state.volume;
            0.0
        } else {
            state.previous_volume
        };
        let volume = self.apply_volume(&mut state, target).await?;
        drop(state);

        self.emit(PlaybackEvent::VolumeChanged {
            volume,
            muted: volume == 0.0,
        });
        Ok(volume)
    }

    pub async fn toggle_repeat(&self) -> bool {
        let enabled = {
            let mut state = self.inner.state.lock().await;
            state.is_repeat = !state.is_repeat;
            state.is_repeat
        };
        self.emit(PlaybackEvent::RepeatChanged { enabled });
        enabled
    }

    pub async fn set_repeat(&self, enabled: bool) {
        self.inner.state.lock().await.is_repeat = enabled;
        self.emit(PlaybackEvent::RepeatChanged { enabled });
    }

    pub async fn clear_error(&self) {
        self.inner.state.lock().await.last_error = None;
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Invalidate in-flight loads and release the bound track.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let mut state = self.inner.state.lock().await;
        self.release_track(&mut state).await;
        state.current_index = None;
        state.is_playing = false;
        state.progress = 0.0;
        state.duration = 0.0;
        state.status = SessionStatus::Idle;
        info!("Playback session shut down");
    }

    // ========================================================================
    // Media signals
    // ========================================================================

    /// Apply one backend signal. Signals from handles other than the bound
    /// one are ignored.
    pub async fn handle_signal(&self, event: MediaEvent) {
        let mut state = self.inner.state.lock().await;
        let is_playing = state.is_playing;
        let Some(track) = state.track.as_mut() else {
            trace!(handle = %event.handle, "Signal with no bound track");
            return;
        };
        if track.handle != event.handle {
            trace!(handle = %event.handle, "Ignoring signal from retired handle");
            return;
        }

        match event.signal {
            MediaSignal::MetadataReady { duration } => {
                if let Some(waiter) = track.waiter.take() {
                    waiter.send(Ok(duration)).ok();
                }
            }
            MediaSignal::Error { message } => {
                if let Some(waiter) = track.waiter.take() {
                    waiter.send(Err(message)).ok();
                    return;
                }

                let err = PlaybackError::Decode(message);
                warn!(error = %err, "Bound track failed during playback");
                self.release_track(&mut state).await;
                state.current_index = None;
                state.is_playing = false;
                state.progress = 0.0;
                state.duration = 0.0;
                state.status = SessionStatus::Error;
                state.last_error = Some(err.clone());
                let name = state.track_name();
                drop(state);
                self.emit_error(name, &err);
            }
            MediaSignal::PositionUpdate { position } => {
                if !track.is_ready() || !is_playing {
                    trace!(handle = %event.handle, "Ignoring position report while not playing");
                    return;
                }
                if let Some(event) = self.apply_progress(&mut state, position.as_secs_f64()) {
                    drop(state);
                    self.emit(event);
                }
            }
            MediaSignal::Ended => {
                if !track.is_ready() || !is_playing {
                    trace!(handle = %event.handle, "Ignoring end of stream while not playing");
                    return;
                }
                let generation = track.generation;
                drop(state);

                // Advancing awaits a new handle's metadata, which arrives
                // through this pump.
                let controller = self.clone();
                tokio::spawn(async move {
                    if let Err(err) = controller.finish_track(generation).await {
                        warn!(error = %err, "Failed to advance after end of track");
                    }
                });
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    async fn start_handle(&self, handle: MediaHandleId, volume: f32) -> Result<()> {
        self.inner.backend.set_volume(handle, volume).await?;
        self.inner.backend.play(handle).await?;
        Ok(())
    }

    /// Empty the slot: pause, release the handle, revoke its content.
    async fn release_track(&self, state: &mut SessionState) {
        if let Some(track) = state.track.take() {
            release_bound(self.inner.backend.as_ref(), track).await;
        }
    }

    async fn fail_if_current(&self, generation: u64, err: PlaybackError) -> Result<LoadOutcome> {
        let mut state = self.inner.state.lock().await;
        if !self.is_current(generation) {
            debug!(generation, error = %err, "Ignoring failure of superseded load");
            return Ok(LoadOutcome::Superseded);
        }
        self.fail_locked(&mut state, err).await
    }

    async fn fail_locked(&self, state: &mut SessionState, err: PlaybackError) -> Result<LoadOutcome> {
        warn!(error = %err, "Track load failed");
        self.release_track(state).await;
        state.current_index = None;
        state.is_playing = false;
        state.progress = 0.0;
        state.duration = 0.0;
        state.status = SessionStatus::Error;
        state.last_error = Some(err.clone());
        self.emit_error(state.track_name(), &err);
        Err(err)
    }

    fn record_error(&self, state: &mut SessionState, err: PlaybackError) -> PlaybackError {
        warn!(error = %err, "Playback command failed");
        state.last_error = Some(err.clone());
        self.emit_error(state.track_name(), &err);
        err
    }

    async fn apply_volume(&self, state: &mut SessionState, volume: f32) -> Result<f32> {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        state.volume = volume;

        if let Some(handle) = state.track.as_ref().map(|track| track.handle) {
            self.inner
                .backend
                .set_volume(handle, volume)
                .await
                .map_err(|err| self.record_error(state, err.into()))?;
        }
        Ok(volume)
    }

    fn apply_progress(&self, state: &mut SessionState, seconds: f64) -> Option<PlaybackEvent> {
        if !seconds.is_finite() {
            return None;
        }
        let seconds = if state.duration > 0.0 {
            seconds.clamp(0.0, state.duration)
        } else {
            seconds.max(0.0)
        };
        state.progress = seconds;
        self.position_event(state)
    }

    fn position_event(&self, state: &SessionState) -> Option<PlaybackEvent> {
        let track = state.current_index.and_then(|index| state.playlist.get(index))?;
        Some(PlaybackEvent::PositionChanged {
            track: track.name.clone(),
            position_ms: secs_to_millis(state.progress),
            duration_ms: secs_to_millis(state.duration),
        })
    }

    fn emit(&self, event: PlaybackEvent) {
        self.inner.events.emit(CoreEvent::Playback(event)).ok();
    }

    fn emit_playlist(&self, event: PlaylistEvent) {
        self.inner.events.emit(CoreEvent::Playlist(event)).ok();
    }

    fn emit_error(&self, track: Option<String>, err: &PlaybackError) {
        self.emit(PlaybackEvent::Error {
            track,
            message: err.to_string(),
            recoverable: !err.is_format_error(),
        });
    }
}

async fn release_bound(backend: &dyn MediaBackend, track: BoundTrack) {
    if let Err(err) = backend.pause(track.handle).await {
        debug!(handle = %track.handle, error = %err, "Pause before release failed");
    }
    if let Err(err) = backend.release(track.handle).await {
        warn!(handle = %track.handle, error = %err, "Failed to release media handle");
    }
    if let Err(err) = backend.revoke_content_ref(track.content).await {
        warn!(content = %track.content, error = %err, "Failed to revoke content reference");
    }
    trace!(generation = track.generation, index = track.index, "Released track");
}

async fn run_signal_pump(controller: Weak<ControllerInner>, mut receiver: MediaEventReceiver) {
    while let Some(event) = receiver.recv().await {
        let Some(inner) = controller.upgrade() else {
            break;
        };
        PlaybackController { inner }.handle_signal(event).await;
    }
    debug!("Media signal pump stopped");
}

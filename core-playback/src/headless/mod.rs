//! # Headless Media Backend
//!
//! A [`MediaBackend`] with no audio device. Content is probed with Symphonia
//! to learn its duration, and a Tokio interval stands in for the output clock:
//! while a handle plays it emits `PositionUpdate` every tick and `Ended` when
//! the position reaches the duration.
//!
//! Useful for servers, CI and tests, or as a template for a real backend.

mod probe;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::playback::{
    ContentRefId, MediaBackend, MediaEvent, MediaEventReceiver, MediaEventSender, MediaHandleId,
    MediaSignal,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

pub(crate) use probe::probe_duration;

/// Default spacing of position reports.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

struct StoredContent {
    data: Bytes,
    extension: Option<String>,
}

struct HandleState {
    content: ContentRefId,
    duration: Option<Duration>,
    position: Duration,
    volume: f32,
    playing: bool,
    probe: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl HandleState {
    fn stop_tasks(&mut self) {
        if let Some(task) = self.probe.take() {
            task.abort();
        }
        if let Some(task) = self.ticker.take() {
            task.abort();
        }
    }
}

struct Shared {
    contents: Mutex<HashMap<ContentRefId, StoredContent>>,
    handles: Mutex<HashMap<MediaHandleId, HandleState>>,
    subscribers: Mutex<Vec<MediaEventSender>>,
    tick_interval: Duration,
}

impl Shared {
    fn emit(&self, handle: MediaHandleId, signal: MediaSignal) {
        let event = MediaEvent::new(handle, signal);
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

/// Device-less [`MediaBackend`]. Requires a Tokio runtime.
#[derive(Clone)]
pub struct HeadlessMediaBackend {
    shared: Arc<Shared>,
}

impl Default for HeadlessMediaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessMediaBackend {
    pub fn new() -> Self {
        Self::with_tick_interval(DEFAULT_TICK_INTERVAL)
    }

    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                contents: Mutex::new(HashMap::new()),
                handles: Mutex::new(HashMap::new()),
                subscribers: Mutex::new(Vec::new()),
                tick_interval: tick_interval.max(Duration::from_millis(1)),
            }),
        }
    }

    /// Number of content references not yet revoked.
    pub fn live_content_refs(&self) -> usize {
        self.shared.contents.lock().len()
    }

    /// Number of handles not yet released.
    pub fn live_handles(&self) -> usize {
        self.shared.handles.lock().len()
    }

    pub fn position(&self, handle: MediaHandleId) -> Option<Duration> {
        self.shared.handles.lock().get(&handle).map(|h| h.position)
    }

    pub fn volume(&self, handle: MediaHandleId) -> Option<f32> {
        self.shared.handles.lock().get(&handle).map(|h| h.volume)
    }

    fn with_handle<T>(
        &self,
        handle: MediaHandleId,
        f: impl FnOnce(&mut HandleState) -> T,
    ) -> Result<T> {
        let mut handles = self.shared.handles.lock();
        let state = handles
            .get_mut(&handle)
            .ok_or_else(|| BridgeError::UnknownResource(handle.to_string()))?;
        Ok(f(state))
    }
}

#[async_trait]
impl MediaBackend for HeadlessMediaBackend {
    async fn create_content_ref(
        &self,
        data: Bytes,
        extension_hint: Option<&str>,
    ) -> Result<ContentRefId> {
        let content = ContentRefId::new();
        trace!(%content, bytes = data.len(), "Created content reference");
        self.shared.contents.lock().insert(
            content,
            StoredContent {
                data,
                extension: extension_hint.map(|ext| ext.trim_start_matches('.').to_string()),
            },
        );
        Ok(content)
    }

    async fn revoke_content_ref(&self, content: ContentRefId) -> Result<()> {
        self.shared
            .contents
            .lock()
            .remove(&content)
            .map(|_| ())
            .ok_or_else(|| BridgeError::UnknownResource(content.to_string()))
    }

    async fn open(&self, content: ContentRefId) -> Result<MediaHandleId> {
        let (data, extension) = {
            let contents = self.shared.contents.lock();
            let stored = contents
                .get(&content)
                .ok_or_else(|| BridgeError::UnknownResource(content.to_string()))?;
            (stored.data.clone(), stored.extension.clone())
        };

        let handle = MediaHandleId::new();
        let mut handles = self.shared.handles.lock();
        handles.insert(
            handle,
            HandleState {
                content,
                duration: None,
                position: Duration::ZERO,
                volume: 1.0,
                playing: false,
                probe: None,
                ticker: None,
            },
        );

        let shared = Arc::downgrade(&self.shared);
        let task = tokio::spawn(run_probe(shared, handle, data, extension));
        if let Some(state) = handles.get_mut(&handle) {
            state.probe = Some(task);
        }
        debug!(%handle, %content, "Opened media handle");
        Ok(handle)
    }

    async fn play(&self, handle: MediaHandleId) -> Result<()> {
        let weak = Arc::downgrade(&self.shared);
        let tick = self.shared.tick_interval;
        self.with_handle(handle, |state| {
            state.playing = true;
            let finished = state
                .ticker
                .as_ref()
                .map_or(true, |task| task.is_finished());
            if finished {
                state.ticker = Some(tokio::spawn(run_ticker(weak, handle, tick)));
            }
        })
    }

    async fn pause(&self, handle: MediaHandleId) -> Result<()> {
        self.with_handle(handle, |state| {
            state.playing = false;
            if let Some(task) = state.ticker.take() {
                task.abort();
            }
        })
    }

    async fn seek(&self, handle: MediaHandleId, position: Duration) -> Result<()> {
        self.with_handle(handle, |state| {
            state.position = match state.duration {
                Some(duration) => position.min(duration),
                None => position,
            };
        })
    }

    async fn set_volume(&self, handle: MediaHandleId, volume: f32) -> Result<()> {
        self.with_handle(handle, |state| state.volume = volume.clamp(0.0, 1.0))
    }

    async fn is_playing(&self, handle: MediaHandleId) -> Result<bool> {
        self.with_handle(handle, |state| state.playing)
    }

    async fn release(&self, handle: MediaHandleId) -> Result<()> {
        let mut state = self
            .shared
            .handles
            .lock()
            .remove(&handle)
            .ok_or_else(|| BridgeError::UnknownResource(handle.to_string()))?;
        state.stop_tasks();
        trace!(%handle, content = %state.content, "Released media handle");
        Ok(())
    }

    fn subscribe(&self) -> MediaEventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.shared.subscribers.lock().push(sender);
        receiver
    }
}

async fn run_probe(
    shared: Weak<Shared>,
    handle: MediaHandleId,
    data: Bytes,
    extension: Option<String>,
) {
    let probed =
        tokio::task::spawn_blocking(move || probe_duration(data, extension.as_deref())).await;

    let Some(shared) = shared.upgrade() else {
        return;
    };

    let signal = match probed {
        Ok(Ok(duration)) => {
            let known = {
                let mut handles = shared.handles.lock();
                match handles.get_mut(&handle) {
                    Some(state) => {
                        state.duration = Some(duration);
                        state.probe = None;
                        true
                    }
                    None => false,
                }
            };
            if !known {
                return;
            }
            MediaSignal::MetadataReady { duration }
        }
        Ok(Err(err)) => {
            debug!(%handle, error = %err, "Probe failed");
            MediaSignal::Error {
                message: err.to_string(),
            }
        }
        Err(err) => {
            warn!(%handle, error = %err, "Probe task failed");
            MediaSignal::Error {
                message: err.to_string(),
            }
        }
    };

    if shared.handles.lock().contains_key(&handle) {
        shared.emit(handle, signal);
    }
}

async fn run_ticker(shared: Weak<Shared>, handle: MediaHandleId, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };

        let (position, ended) = {
            let mut handles = shared.handles.lock();
            let Some(state) = handles.get_mut(&handle) else {
                break;
            };
            if !state.playing {
                break;
            }

            state.position += tick;
            match state.duration {
                Some(duration) if state.position >= duration => {
                    state.position = duration;
                    state.playing = false;
                    state.ticker = None;
                    (duration, true)
                }
                _ => (state.position, false),
            }
        };

        shared.emit(handle, MediaSignal::PositionUpdate { position });
        if ended {
            debug!(%handle, "End of stream");
            shared.emit(handle, MediaSignal::Ended);
            break;
        }
    }
}

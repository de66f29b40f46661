//! Media backend bridge trait and its identifiers and lifecycle signals.

use bytes::Bytes;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;

/// Opaque identifier of a live playable resource owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaHandleId(Uuid);

impl MediaHandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MediaHandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaHandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media-{}", self.0)
    }
}

/// Opaque identifier of a transient content reference (downloaded bytes
/// registered with the backend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentRefId(Uuid);

impl ContentRefId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContentRefId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContentRefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "content-{}", self.0)
    }
}

/// Lifecycle signal emitted by a media handle.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSignal {
    /// Stream metadata has been parsed and the handle can start playing.
    MetadataReady { duration: Duration },
    /// Periodic playback position report.
    PositionUpdate { position: Duration },
    /// End of stream reached.
    Ended,
    /// The handle failed to load or decode.
    Error { message: String },
}

/// Signal tagged with the handle that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub handle: MediaHandleId,
    pub signal: MediaSignal,
}

impl MediaEvent {
    pub fn new(handle: MediaHandleId, signal: MediaSignal) -> Self {
        Self { handle, signal }
    }
}

pub type MediaEventSender = mpsc::UnboundedSender<MediaEvent>;
pub type MediaEventReceiver = mpsc::UnboundedReceiver<MediaEvent>;

/// Host media engine capability.
///
/// A backend owns two kinds of resources: content references (bytes the host
/// can play, e.g. a blob URL on the web) and media handles bound to one
/// content reference. Callers are responsible for releasing every handle and
/// revoking every content reference they create.
///
/// Signals for all handles are delivered through [`subscribe`](Self::subscribe);
/// each call returns an independent receiver that sees every event emitted
/// after it was created.
///
/// # Example
///
/// ```ignore
/// let content = backend.create_content_ref(bytes, Some("mp3")).await?;
/// let handle = backend.open(content).await?;
/// // wait for MediaSignal::MetadataReady on the subscription...
/// backend.set_volume(handle, 0.8).await?;
/// backend.play(handle).await?;
/// ```
#[async_trait::async_trait]
pub trait MediaBackend: Send + Sync {
    /// Register downloaded bytes and return a content reference.
    async fn create_content_ref(
        &self,
        data: Bytes,
        extension_hint: Option<&str>,
    ) -> Result<ContentRefId>;

    /// Revoke a content reference. Revoking an unknown reference is an error.
    async fn revoke_content_ref(&self, content: ContentRefId) -> Result<()>;

    /// Open a new handle bound to `content`. Metadata loading starts
    /// immediately; completion is reported as `MetadataReady` or `Error`.
    async fn open(&self, content: ContentRefId) -> Result<MediaHandleId>;

    async fn play(&self, handle: MediaHandleId) -> Result<()>;

    async fn pause(&self, handle: MediaHandleId) -> Result<()>;

    /// Seek to an absolute position.
    async fn seek(&self, handle: MediaHandleId, position: Duration) -> Result<()>;

    /// Set output volume, normalized to `0.0..=1.0`.
    async fn set_volume(&self, handle: MediaHandleId, volume: f32) -> Result<()>;

    /// Whether the handle is currently producing audio.
    async fn is_playing(&self, handle: MediaHandleId) -> Result<bool>;

    /// Stop and free a handle. No signals are emitted for it afterwards.
    async fn release(&self, handle: MediaHandleId) -> Result<()>;

    /// Subscribe to signals from every handle of this backend.
    fn subscribe(&self) -> MediaEventReceiver;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_unique() {
        let a = MediaHandleId::new();
        let b = MediaHandleId::new();
        assert_ne!(a, b);
        assert_eq!(a, MediaHandleId::from_uuid(*a.as_uuid()));
        assert!(a.to_string().starts_with("media-"));

        let c = ContentRefId::new();
        assert_eq!(c, ContentRefId::from_uuid(*c.as_uuid()));
        assert!(c.to_string().starts_with("content-"));
    }

    #[tokio::test]
    async fn events_flow_through_channel() {
        let (tx, mut rx): (MediaEventSender, MediaEventReceiver) = mpsc::unbounded_channel();
        let handle = MediaHandleId::new();
        tx.send(MediaEvent::new(handle, MediaSignal::Ended)).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.handle, handle);
        assert_eq!(event.signal, MediaSignal::Ended);
    }
}

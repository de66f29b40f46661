//! Session state owned by the playback controller.

use bridge_traits::playback::{ContentRefId, MediaHandleId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::PlaybackError;
use crate::playlist::{Playlist, TrackEntry};

/// Coarse lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Nothing listed yet.
    Idle,
    /// Listing the folder or loading a track.
    Loading,
    /// A track is bound and paused or stopped.
    Ready,
    Playing,
    /// The bound track reached its end without repeat.
    Ended,
    /// The last listing or load failed.
    Error,
    /// The folder had no playable tracks.
    Empty,
}

/// Point-in-time copy of the session for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub status: SessionStatus,
    pub playlist: Playlist,
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub is_repeat: bool,
    /// Seconds.
    pub progress: f64,
    /// Seconds; 0 until metadata is known.
    pub duration: f64,
    pub volume: f32,
    pub last_error: Option<PlaybackError>,
}

impl PlaybackSnapshot {
    pub fn current_track(&self) -> Option<&TrackEntry> {
        self.current_index.and_then(|index| self.playlist.get(index))
    }

    pub fn is_muted(&self) -> bool {
        self.volume == 0.0
    }
}

/// Outcome the metadata waiter receives: duration or the backend's error text.
pub(crate) type MetadataResult = std::result::Result<Duration, String>;

/// The single media handle the session may hold.
pub(crate) struct BoundTrack {
    pub generation: u64,
    pub index: usize,
    pub handle: MediaHandleId,
    pub content: ContentRefId,
    /// Present until the handle reports metadata or an error.
    pub waiter: Option<oneshot::Sender<MetadataResult>>,
}

impl BoundTrack {
    pub fn is_ready(&self) -> bool {
        self.waiter.is_none()
    }
}

pub(crate) struct SessionState {
    pub status: SessionStatus,
    pub playlist: Playlist,
    pub current_index: Option<usize>,
    /// Last index a load was attempted for; `next` advances from here when
    /// that load failed.
    pub cursor: Option<usize>,
    pub track: Option<BoundTrack>,
    pub is_playing: bool,
    pub is_repeat: bool,
    pub progress: f64,
    pub duration: f64,
    pub volume: f32,
    pub previous_volume: f32,
    pub last_error: Option<PlaybackError>,
}

impl SessionState {
    pub fn new(initial_volume: f32) -> Self {
        let volume = initial_volume.clamp(0.0, 1.0);
        Self {
            status: SessionStatus::Idle,
            playlist: Playlist::default(),
            current_index: None,
            cursor: None,
            track: None,
            is_playing: false,
            is_repeat: false,
            progress: 0.0,
            duration: 0.0,
            volume,
            previous_volume: if volume > 0.0 { volume } else { 1.0 },
            last_error: None,
        }
    }

    /// Handle of the bound track once it has reported metadata.
    pub fn ready_handle(&self) -> Option<MediaHandleId> {
        self.track
            .as_ref()
            .filter(|track| track.is_ready())
            .map(|track| track.handle)
    }

    /// Name of the track the session is showing, bound or last attempted.
    pub fn track_name(&self) -> Option<String> {
        self.current_index
            .or(self.cursor)
            .and_then(|index| self.playlist.get(index))
            .map(|entry| entry.name.clone())
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status,
            playlist: self.playlist.clone(),
            current_index: self.current_index,
            is_playing: self.is_playing,
            is_repeat: self.is_repeat,
            progress: self.progress,
            duration: self.duration,
            volume: self.volume,
            last_error: self.last_error.clone(),
        }
    }
}

pub(crate) fn secs_to_millis(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

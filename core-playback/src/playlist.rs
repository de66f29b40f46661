//! # Playlist
//!
//! The ordered list of playable objects in the configured storage folder and
//! the [`PlaylistSource`] seam the controller reads it through.

use async_trait::async_trait;
use bridge_traits::storage::{RemoteObject, RemoteObjectStore};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{PlaybackError, Result};

/// One playable object in the folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    /// Object name relative to the folder, e.g. `intro.mp3`.
    pub name: String,
    pub size_bytes: Option<u64>,
}

impl TrackEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Lowercase extension without the dot, used as a probe hint.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Immutable, cheaply clonable list of tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    tracks: Arc<[TrackEntry]>,
}

impl Playlist {
    pub fn new(tracks: Vec<TrackEntry>) -> Self {
        Self {
            tracks: tracks.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackEntry> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[TrackEntry] {
        &self.tracks
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackEntry> {
        self.tracks.iter()
    }
}

/// Where the controller gets its track list and audio bytes from.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Playable entries, sorted by name.
    async fn list(&self) -> Result<Vec<TrackEntry>>;

    /// Full contents of one entry.
    async fn fetch(&self, entry: &TrackEntry) -> Result<Bytes>;
}

/// [`PlaylistSource`] over a single folder of a [`RemoteObjectStore`].
pub struct RemotePlaylistSource {
    store: Arc<dyn RemoteObjectStore>,
    folder: String,
    extensions: Vec<String>,
}

impl RemotePlaylistSource {
    /// `extensions` are matched case-insensitively against the end of each
    /// object name. A missing leading dot is added.
    pub fn new<I, S>(store: Arc<dyn RemoteObjectStore>, folder: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref().trim().to_ascii_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();

        Self {
            store,
            folder: folder.into().trim_matches('/').to_string(),
            extensions,
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    fn is_playable(&self, object: &RemoteObject) -> bool {
        if object.is_folder() {
            return false;
        }
        let name = object.name.to_ascii_lowercase();
        self.extensions
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
    }

    fn object_path(&self, entry: &TrackEntry) -> String {
        if self.folder.is_empty() {
            entry.name.clone()
        } else {
            format!("{}/{}", self.folder, entry.name)
        }
    }
}

#[async_trait]
impl PlaylistSource for RemotePlaylistSource {
    #[instrument(skip(self), fields(folder = %self.folder))]
    async fn list(&self) -> Result<Vec<TrackEntry>> {
        let objects = self
            .store
            .list(&self.folder)
            .await
            .map_err(PlaybackError::fetch)?;

        let total = objects.len();
        let mut tracks: Vec<TrackEntry> = objects
            .into_iter()
            .filter(|object| self.is_playable(object))
            .map(|object| TrackEntry {
                name: object.name,
                size_bytes: object.size,
            })
            .collect();
        tracks.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(total, playable = tracks.len(), "Filtered folder listing");
        Ok(tracks)
    }

    #[instrument(skip(self, entry), fields(track = %entry.name))]
    async fn fetch(&self, entry: &TrackEntry) -> Result<Bytes> {
        let path = self.object_path(entry);
        let data = self
            .store
            .download(&path)
            .await
            .map_err(PlaybackError::fetch)?;

        debug!(bytes = data.len(), "Downloaded track");
        Ok(data)
    }
}

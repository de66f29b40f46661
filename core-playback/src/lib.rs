//! # Playback Controller
//!
//! Plays the audio files of one remote storage folder as a looping playlist.
//!
//! ## Overview
//!
//! This crate handles:
//! - Listing and downloading tracks through a [`PlaylistSource`]
//! - Owning the single bound media handle and its content reference
//! - Transport commands (play/pause, stop, seek, next, volume, mute, repeat)
//! - Routing backend media signals and publishing [`CoreEvent`]s
//! - A device-less [`HeadlessMediaBackend`] (feature `headless-backend`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{PlaybackConfig, PlaybackController, RemotePlaylistSource};
//!
//! let source = Arc::new(RemotePlaylistSource::new(store, "files", [".mp3"]));
//! let controller = PlaybackController::new(source, backend, PlaybackConfig::default(), bus);
//!
//! controller.initialize().await?;
//! controller.set_volume(0.8).await?;
//! controller.next().await?;
//! ```
//!
//! [`CoreEvent`]: core_runtime::events::CoreEvent

pub mod config;
pub mod controller;
pub mod error;
#[cfg(feature = "headless-backend")]
pub mod headless;
pub mod playlist;
pub mod session;

pub use config::PlaybackConfig;
pub use controller::{LoadOutcome, PlaybackController};
pub use error::{PlaybackError, Result};
#[cfg(feature = "headless-backend")]
pub use headless::HeadlessMediaBackend;
pub use playlist::{Playlist, PlaylistSource, RemotePlaylistSource, TrackEntry};
pub use session::{PlaybackSnapshot, SessionStatus};

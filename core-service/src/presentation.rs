//! # Presentation Adapter
//!
//! Maps user intents onto controller commands and renders the session as a
//! [`PlayerView`] a host UI can draw without further logic.

use core_playback::{LoadOutcome, PlaybackController, PlaybackSnapshot, SessionStatus};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

/// Everything a user can ask the player to do.
#[derive(Debug, Clone, PartialEq)]
pub enum UserIntent {
    TogglePlayPause,
    Stop,
    Next,
    /// Zero-based row of the track list.
    SelectTrack(usize),
    /// Seconds.
    Seek(f64),
    SetVolume(f32),
    ToggleMute,
    ToggleRepeat,
    ToggleVolumeSlider,
    ClearError,
    /// List the folder again.
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolumeLevel {
    Muted,
    Low,
    High,
}

impl VolumeLevel {
    pub fn from_volume(volume: f32) -> Self {
        if volume <= 0.0 {
            VolumeLevel::Muted
        } else if volume < 0.5 {
            VolumeLevel::Low
        } else {
            VolumeLevel::High
        }
    }
}

/// One row of the track list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRow {
    /// One-based.
    pub number: usize,
    pub name: String,
    /// e.g. `"3.25 MB"`; `None` when the listing had no size.
    pub size_label: Option<String>,
    pub is_current: bool,
}

/// Render-ready state of the player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    /// Replaces the player while loading, empty or failed.
    pub status_message: Option<String>,
    /// Whether a "Clear Error" action applies.
    pub can_clear_error: bool,
    pub now_playing: Option<String>,
    pub is_playing: bool,
    pub is_repeat: bool,
    pub repeat_label: &'static str,
    pub elapsed_label: String,
    pub duration_label: String,
    pub progress_seconds: f64,
    pub duration_seconds: f64,
    pub volume: f32,
    pub volume_level: VolumeLevel,
    pub show_volume_slider: bool,
    pub tracks: Vec<TrackRow>,
}

/// `m:ss`; non-finite input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "0:00".to_string();
    }
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Bytes as megabytes with two decimals.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

fn status_message(snapshot: &PlaybackSnapshot) -> Option<String> {
    if let Some(err) = &snapshot.last_error {
        return Some(format!("Error: {err}"));
    }
    match snapshot.status {
        SessionStatus::Idle | SessionStatus::Loading if snapshot.playlist.is_empty() => {
            Some("Loading audio files...".to_string())
        }
        SessionStatus::Empty => Some("No audio files found".to_string()),
        _ => None,
    }
}

impl PlayerView {
    pub fn render(snapshot: &PlaybackSnapshot, show_volume_slider: bool) -> Self {
        let tracks = snapshot
            .playlist
            .iter()
            .enumerate()
            .map(|(index, entry)| TrackRow {
                number: index + 1,
                name: entry.name.clone(),
                size_label: entry.size_bytes.map(format_size),
                is_current: snapshot.current_index == Some(index),
            })
            .collect();

        Self {
            status_message: status_message(snapshot),
            can_clear_error: snapshot.last_error.is_some(),
            now_playing: snapshot.current_track().map(|entry| entry.name.clone()),
            is_playing: snapshot.is_playing,
            is_repeat: snapshot.is_repeat,
            repeat_label: if snapshot.is_repeat {
                "Repeat is on"
            } else {
                "Repeat is off"
            },
            elapsed_label: format_time(snapshot.progress),
            duration_label: format_time(snapshot.duration),
            progress_seconds: snapshot.progress,
            duration_seconds: snapshot.duration,
            volume: snapshot.volume,
            volume_level: VolumeLevel::from_volume(snapshot.volume),
            show_volume_slider,
            tracks,
        }
    }
}

/// UI-facing wrapper around a [`PlaybackController`].
#[derive(Clone)]
pub struct PresentationAdapter {
    controller: PlaybackController,
    show_volume_slider: Arc<AtomicBool>,
}

impl PresentationAdapter {
    pub fn new(controller: PlaybackController) -> Self {
        Self {
            controller,
            show_volume_slider: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Apply one intent. Errors are also kept in the session and show up
    /// in the next [`view`](Self::view).
    pub async fn dispatch(&self, intent: UserIntent) -> Result<()> {
        debug!(?intent, "Dispatching user intent");
        let controller = &self.controller;

        match intent {
            UserIntent::TogglePlayPause => {
                controller.toggle_play_pause().await?;
            }
            UserIntent::Stop => controller.stop().await?,
            UserIntent::Next => {
                controller.next().await?;
            }
            UserIntent::SelectTrack(index) => {
                if controller.select_track(index).await? == LoadOutcome::Superseded {
                    debug!(index, "Selection superseded by a newer one");
                }
            }
            UserIntent::Seek(seconds) => {
                controller.seek(seconds).await?;
            }
            UserIntent::SetVolume(volume) => {
                controller.set_volume(volume).await?;
            }
            UserIntent::ToggleMute => {
                controller.toggle_mute().await?;
            }
            UserIntent::ToggleRepeat => {
                controller.toggle_repeat().await;
            }
            UserIntent::ToggleVolumeSlider => {
                self.show_volume_slider.fetch_xor(true, Ordering::Relaxed);
            }
            UserIntent::ClearError => controller.clear_error().await,
            UserIntent::Reload => {
                controller.initialize().await?;
            }
        }
        Ok(())
    }

    pub async fn view(&self) -> PlayerView {
        let snapshot = self.controller.snapshot().await;
        PlayerView::render(&snapshot, self.show_volume_slider.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_playback::{Playlist, PlaybackError, TrackEntry};

    fn snapshot() -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: SessionStatus::Playing,
            playlist: Playlist::new(vec![
                TrackEntry::new("a.mp3").with_size(3_407_872),
                TrackEntry::new("b.mp3"),
            ]),
            current_index: Some(1),
            is_playing: true,
            is_repeat: false,
            progress: 65.9,
            duration: 184.2,
            volume: 0.4,
            last_error: None,
        }
    }

    #[test]
    fn time_labels() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn volume_levels() {
        assert_eq!(VolumeLevel::from_volume(0.0), VolumeLevel::Muted);
        assert_eq!(VolumeLevel::from_volume(0.49), VolumeLevel::Low);
        assert_eq!(VolumeLevel::from_volume(0.5), VolumeLevel::High);
        assert_eq!(VolumeLevel::from_volume(1.0), VolumeLevel::High);
    }

    #[test]
    fn renders_track_rows() {
        let view = PlayerView::render(&snapshot(), false);

        assert_eq!(view.status_message, None);
        assert_eq!(view.now_playing.as_deref(), Some("b.mp3"));
        assert_eq!(view.elapsed_label, "1:05");
        assert_eq!(view.duration_label, "3:04");
        assert_eq!(view.volume_level, VolumeLevel::Low);
        assert_eq!(view.repeat_label, "Repeat is off");
        assert_eq!(
            view.tracks,
            vec![
                TrackRow {
                    number: 1,
                    name: "a.mp3".to_string(),
                    size_label: Some("3.25 MB".to_string()),
                    is_current: false,
                },
                TrackRow {
                    number: 2,
                    name: "b.mp3".to_string(),
                    size_label: None,
                    is_current: true,
                },
            ]
        );
    }

    #[test]
    fn status_messages() {
        let mut loading = snapshot();
        loading.status = SessionStatus::Loading;
        loading.playlist = Playlist::default();
        assert_eq!(
            PlayerView::render(&loading, false).status_message.as_deref(),
            Some("Loading audio files...")
        );

        // Switching tracks keeps the player visible
        let mut switching = snapshot();
        switching.status = SessionStatus::Loading;
        assert_eq!(PlayerView::render(&switching, false).status_message, None);

        let mut empty = snapshot();
        empty.status = SessionStatus::Empty;
        empty.playlist = Playlist::default();
        assert_eq!(
            PlayerView::render(&empty, false).status_message.as_deref(),
            Some("No audio files found")
        );

        let mut failed = snapshot();
        failed.status = SessionStatus::Error;
        failed.last_error = Some(PlaybackError::Decode("unsupported format".to_string()));
        let view = PlayerView::render(&failed, false);
        assert_eq!(
            view.status_message.as_deref(),
            Some("Error: Failed to decode audio: unsupported format")
        );
        assert!(view.can_clear_error);
    }
}

//! End-to-end playback against the headless backend with in-memory WAV files

#![cfg(feature = "decoder-wav")]

use async_trait::async_trait;
use bytes::Bytes;
use core_playback::{
    HeadlessMediaBackend, LoadOutcome, PlaybackConfig, PlaybackController, PlaylistSource,
    SessionStatus, TrackEntry,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// 16-bit mono PCM WAV filled with silence
fn wav_bytes(sample_rate: u32, frames: u32) -> Bytes {
    let data_len = frames * 2;
    let mut buf = Vec::with_capacity(44 + data_len as usize);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    buf.resize(44 + data_len as usize, 0);
    Bytes::from(buf)
}

/// Serves short WAV clips; `broken.wav` is not audio
struct WavSource {
    names: Vec<&'static str>,
}

#[async_trait]
impl PlaylistSource for WavSource {
    async fn list(&self) -> core_playback::Result<Vec<TrackEntry>> {
        Ok(self.names.iter().map(|name| TrackEntry::new(*name)).collect())
    }

    async fn fetch(&self, entry: &TrackEntry) -> core_playback::Result<Bytes> {
        if entry.name == "broken.wav" {
            return Ok(Bytes::from_static(b"RIFF but not really"));
        }
        // 40 ms at 8 kHz
        Ok(wav_bytes(8_000, 320))
    }
}

fn setup(names: Vec<&'static str>) -> (PlaybackController, HeadlessMediaBackend) {
    let backend = HeadlessMediaBackend::with_tick_interval(Duration::from_millis(5));
    let controller = PlaybackController::new(
        Arc::new(WavSource { names }),
        Arc::new(backend.clone()),
        PlaybackConfig::default(),
        EventBus::new(256),
    );
    (controller, backend)
}

#[tokio::test]
async fn plays_through_playlist_and_wraps() {
    let (controller, backend) = setup(vec!["one.wav", "two.wav"]);
    let mut started = controller
        .subscribe()
        .filter(|event| matches!(event, CoreEvent::Playback(PlaybackEvent::Started { .. })));

    assert_eq!(controller.initialize().await.unwrap(), Some(LoadOutcome::Loaded));
    assert!((controller.snapshot().await.duration - 0.04).abs() < 1e-6);

    let mut indices = Vec::new();
    for _ in 0..3 {
        let event = timeout(Duration::from_secs(5), started.recv())
            .await
            .expect("track started within 5s")
            .unwrap();
        if let CoreEvent::Playback(PlaybackEvent::Started { index, .. }) = event {
            indices.push(index);
        }
    }
    assert_eq!(indices, vec![0, 1, 0]);

    assert_eq!(backend.live_handles(), 1);
    assert_eq!(backend.live_content_refs(), 1);

    controller.shutdown().await;
    assert_eq!(backend.live_handles(), 0);
    assert_eq!(backend.live_content_refs(), 0);
}

#[tokio::test]
async fn repeat_replays_same_track() {
    let (controller, backend) = setup(vec!["one.wav", "two.wav"]);
    let mut completed = controller
        .subscribe()
        .filter(|event| matches!(event, CoreEvent::Playback(PlaybackEvent::Completed { .. })));

    controller.set_repeat(true).await;
    controller.initialize().await.unwrap();

    for _ in 0..2 {
        let event = timeout(Duration::from_secs(5), completed.recv())
            .await
            .expect("track completed within 5s")
            .unwrap();
        assert_eq!(
            event,
            CoreEvent::Playback(PlaybackEvent::Completed {
                track: "one.wav".to_string(),
                repeat: true,
            })
        );
    }

    assert_eq!(controller.snapshot().await.current_index, Some(0));
    assert_eq!(backend.live_handles(), 1);
    controller.shutdown().await;
}

#[tokio::test]
async fn undecodable_track_fails_cleanly() {
    let (controller, backend) = setup(vec!["a.wav", "broken.wav"]);
    controller.set_repeat(true).await;
    controller.initialize().await.unwrap();

    let err = controller.load_track(1).await.unwrap_err();
    assert!(err.is_format_error());
    assert_eq!(backend.live_handles(), 0);
    assert_eq!(backend.live_content_refs(), 0);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.status, SessionStatus::Error);
    assert_eq!(snapshot.current_index, None);
}

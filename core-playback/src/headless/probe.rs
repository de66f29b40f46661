//! Duration probing with Symphonia.

use bytes::Bytes;
use std::io::Cursor;
use std::time::Duration;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use tracing::{debug, trace};

use crate::error::{PlaybackError, Result};

/// Build a probe hint from a file extension such as `mp3`.
pub(crate) fn hint_from_extension(extension: Option<&str>) -> Hint {
    let mut hint = Hint::new();
    match extension {
        Some(extension) => {
            trace!(extension, "Setting probe hint extension");
            hint.with_extension(extension);
        }
        None => trace!("No extension hint, probe will auto-detect"),
    }
    hint
}

/// Duration of the first decodable track in `data`.
///
/// Uses the container's frame count when present and otherwise walks the
/// packets without decoding them.
pub(crate) fn probe_duration(data: Bytes, extension: Option<&str>) -> Result<Duration> {
    let hint = hint_from_extension(extension);
    let source = Box::new(Cursor::new(data)) as Box<dyn MediaSource>;
    let stream = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::Decode(format!("unrecognized audio format: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlaybackError::Decode("no supported audio tracks".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate) {
        if rate > 0 {
            let duration = Duration::from_secs_f64(frames as f64 / rate as f64);
            debug!(?duration, "Duration from frame count");
            return Ok(duration);
        }
    }

    let time_base = params
        .time_base
        .or_else(|| params.sample_rate.map(|rate| TimeBase::new(1, rate)))
        .ok_or_else(|| PlaybackError::Decode("stream has no time base".to_string()))?;

    let mut end_ts = 0u64;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    end_ts = end_ts.max(packet.ts() + packet.dur());
                }
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PlaybackError::Decode(format!("failed to read packets: {e}"))),
        }
    }

    if end_ts == 0 {
        return Err(PlaybackError::Decode(
            "stream contains no audio packets".to_string(),
        ));
    }

    let time = time_base.calc_time(end_ts);
    let duration = Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac);
    debug!(?duration, "Duration from packet scan");
    Ok(duration)
}

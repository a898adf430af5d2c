//! Remote stream listing from the extraction tool's JSON dump (`-J`)

use serde::Deserialize;
use std::cmp::Ordering;
use tracing::trace;

use crate::domain::errors::AcquisitionError;
use crate::domain::model::StreamDescriptor;

#[derive(Debug, Deserialize)]
struct InfoDump {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<FormatEntry>,
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    format_id: String,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    filesize_approx: Option<f64>,
    /// Total bitrate in kbit/s
    #[serde(default)]
    tbr: Option<f64>,
}

/// `"none"` means the stream carries no such track
fn codec(value: Option<String>) -> Option<String> {
    value.filter(|c| !c.is_empty() && c != "none")
}

/// Adaptive-streaming manifests and storyboards are not downloadable as a single file
fn is_manifest_only(entry: &FormatEntry) -> bool {
    let protocol = entry.protocol.as_deref().unwrap_or_default();
    protocol.starts_with("m3u8")
        || protocol.starts_with("http_dash_segments")
        || entry.ext.as_deref() == Some("mhtml")
}

fn descriptor(entry: FormatEntry, duration: Option<f64>) -> Option<StreamDescriptor> {
    if is_manifest_only(&entry) {
        trace!(id = %entry.format_id, "Skipping manifest-only format");
        return None;
    }

    let video_codec = codec(entry.vcodec);
    let audio_codec = codec(entry.acodec);
    if video_codec.is_none() && audio_codec.is_none() {
        return None;
    }

    let approx_size_bytes = entry
        .filesize
        .or(entry.filesize_approx.map(|s| s.round() as u64))
        .or_else(|| match (entry.tbr, duration) {
            (Some(tbr), Some(duration)) if tbr > 0.0 && duration > 0.0 => {
                Some((tbr * 1000.0 / 8.0 * duration).round() as u64)
            }
            _ => None,
        });

    Some(StreamDescriptor {
        id: entry.format_id,
        container: entry.ext.unwrap_or_else(|| "unknown".to_string()),
        width: entry.width,
        height: entry.height,
        fps: entry.fps,
        is_video_only: video_codec.is_some() && audio_codec.is_none(),
        is_audio_only: audio_codec.is_some() && video_codec.is_none(),
        video_codec,
        audio_codec,
        approx_size_bytes,
    })
}

/// Width, then fps, then size, all descending; unknowns sort last
fn compare(a: &StreamDescriptor, b: &StreamDescriptor) -> Ordering {
    b.width
        .unwrap_or(0)
        .cmp(&a.width.unwrap_or(0))
        .then_with(|| {
            b.fps
                .unwrap_or(0.0)
                .partial_cmp(&a.fps.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.approx_size_bytes.unwrap_or(0).cmp(&a.approx_size_bytes.unwrap_or(0)))
}

/// Decode, filter and sort the `formats` array of a `-J` dump
pub fn parse_stream_listing(json: &str) -> Result<Vec<StreamDescriptor>, AcquisitionError> {
    let dump: InfoDump =
        serde_json::from_str(json).map_err(|e| AcquisitionError::Decode(e.to_string()))?;

    let duration = dump.duration;
    let mut streams: Vec<StreamDescriptor> = dump
        .formats
        .into_iter()
        .filter_map(|entry| descriptor(entry, duration))
        .collect();
    streams.sort_by(compare);
    Ok(streams)
}

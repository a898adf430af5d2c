//! Media metadata probing and remote stream listing

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::errors::ProbeError;

pub mod ffprobe;
pub mod formats;

pub use ffprobe::FfprobeProber;
pub use formats::parse_stream_listing;

/// Kind of an elementary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Other,
}

impl StreamKind {
    pub fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "video" => StreamKind::Video,
            "audio" => StreamKind::Audio,
            "subtitle" => StreamKind::Subtitle,
            "data" => StreamKind::Data,
            _ => StreamKind::Other,
        }
    }
}

/// One elementary stream of a probed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: usize,
    pub kind: StreamKind,
    pub codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Duration in seconds, when the stream reports one
    pub duration: Option<f64>,
}

/// Container-level metadata of a probed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds
    pub duration: Option<f64>,
    pub format_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn video_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.kind == StreamKind::Video)
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.kind == StreamKind::Audio)
    }

    /// First video stream's duration, else the container duration
    pub fn best_duration(&self) -> Option<f64> {
        self.video_streams()
            .next()
            .and_then(|s| s.duration)
            .filter(|d| d.is_finite() && *d > 0.0)
            .or(self.duration.filter(|d| d.is_finite() && *d > 0.0))
    }
}

/// Metadata lookup for local media files
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError>;
}

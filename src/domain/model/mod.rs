// Domain models - Core types and data structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::errors::ModelError;

#[cfg(test)]
mod tests;

/// Normalized progress record shared by acquisition and transcoding.
///
/// `percentage` is only present when a total is known. A `None` percentage
/// means the phase is indeterminate and should be rendered as a spinner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressEvent {
    Downloading {
        total_bytes: Option<u64>,
        downloaded_bytes: u64,
        percentage: Option<f64>,
        speed_bytes_per_sec: Option<f64>,
        eta_seconds: Option<u64>,
    },
    Converting {
        elapsed_media_seconds: f64,
        total_media_seconds: Option<f64>,
        percentage: Option<f64>,
        speed_multiplier: Option<f64>,
    },
    Finished {
        result_path: PathBuf,
        total_bytes: Option<u64>,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    /// Build a download event, deriving the percentage from the total when known
    pub fn downloading(
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
        speed_bytes_per_sec: Option<f64>,
        eta_seconds: Option<u64>,
    ) -> Self {
        let total_bytes = total_bytes.filter(|total| *total > 0);
        let percentage = total_bytes
            .map(|total| (downloaded_bytes as f64 / total as f64 * 100.0).clamp(0.0, 100.0));

        ProgressEvent::Downloading {
            total_bytes,
            downloaded_bytes,
            percentage,
            speed_bytes_per_sec,
            eta_seconds,
        }
    }

    /// Build a conversion event, deriving the percentage from the media duration when known
    pub fn converting(
        elapsed_media_seconds: f64,
        total_media_seconds: Option<f64>,
        speed_multiplier: Option<f64>,
    ) -> Self {
        let total_media_seconds = total_media_seconds.filter(|total| *total > 0.0);
        let percentage = total_media_seconds
            .map(|total| (elapsed_media_seconds / total * 100.0).clamp(0.0, 100.0));

        ProgressEvent::Converting {
            elapsed_media_seconds,
            total_media_seconds,
            percentage,
            speed_multiplier,
        }
    }

    pub fn percentage(&self) -> Option<f64> {
        match self {
            ProgressEvent::Downloading { percentage, .. }
            | ProgressEvent::Converting { percentage, .. } => *percentage,
            ProgressEvent::Finished { .. } => Some(100.0),
            ProgressEvent::Error { .. } => None,
        }
    }

    /// True when the caller must render a spinner instead of a filled bar
    pub fn is_indeterminate(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Downloading { percentage: None, .. }
                | ProgressEvent::Converting { percentage: None, .. }
        )
    }

    /// `Finished` and `Error` close an invocation; nothing follows them
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Finished { .. } | ProgressEvent::Error { .. })
    }
}

/// Logical output format requested by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MediaFormat {
    Mp3,
    Mp4,
    Mov,
    Avi,
    Webm,
    Gif,
    Other(String),
}

impl MediaFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp3" => MediaFormat::Mp3,
            "mp4" => MediaFormat::Mp4,
            "mov" => MediaFormat::Mov,
            "avi" => MediaFormat::Avi,
            "webm" => MediaFormat::Webm,
            "gif" => MediaFormat::Gif,
            other => MediaFormat::Other(other.to_string()),
        }
    }

    /// File extension (without dot) used for outputs of this format
    pub fn extension(&self) -> &str {
        match self {
            MediaFormat::Mp3 => "mp3",
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mov => "mov",
            MediaFormat::Avi => "avi",
            MediaFormat::Webm => "webm",
            MediaFormat::Gif => "gif",
            MediaFormat::Other(ext) => ext.as_str(),
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, MediaFormat::Mp3)
    }

    /// Whether the extraction tool can produce this container directly
    pub fn is_directly_acquirable(&self) -> bool {
        matches!(self, MediaFormat::Mp3 | MediaFormat::Mp4 | MediaFormat::Webm)
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for MediaFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ModelError::EmptyFormat);
        }
        Ok(MediaFormat::parse(s))
    }
}

impl From<String> for MediaFormat {
    fn from(value: String) -> Self {
        MediaFormat::parse(&value)
    }
}

impl From<MediaFormat> for String {
    fn from(value: MediaFormat) -> Self {
        value.extension().to_string()
    }
}

/// What the caller wants the extraction stage to fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatRequest {
    /// Target container, lowercased; `None` means "whatever is best"
    pub container_hint: Option<String>,
    /// Explicit stream selection; overrides every container heuristic
    pub explicit_stream_id: Option<String>,
}

impl FormatRequest {
    pub fn new(container_hint: Option<&str>, explicit_stream_id: Option<&str>) -> Self {
        Self {
            container_hint: container_hint
                .map(|hint| hint.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|hint| !hint.is_empty()),
            explicit_stream_id: explicit_stream_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }

    /// Best available streams, unmodified
    pub fn best() -> Self {
        Self::default()
    }

    /// Same request with the hint trimmed and lowercased and empty values dropped
    pub fn normalized(&self) -> Self {
        Self::new(self.container_hint.as_deref(), self.explicit_stream_id.as_deref())
    }

    pub fn container(hint: &str) -> Self {
        Self::new(Some(hint), None)
    }

    pub fn format(&self) -> Option<MediaFormat> {
        self.container_hint.as_deref().map(MediaFormat::parse)
    }
}

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Create a new TimeSpec from hours, minutes, seconds, milliseconds
    pub fn from_components(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> Self {
        let total_seconds = hours as f64 * 3600.0
            + minutes as f64 * 60.0
            + seconds as f64
            + milliseconds as f64 / 1000.0;
        Self {
            seconds: total_seconds,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse `SS[.ms]`, `MM:SS[.ms]` or `HH:MM:SS[.ms]`
    pub fn parse(time_str: &str) -> Result<Self, ModelError> {
        let trimmed = time_str.trim();
        let invalid = || ModelError::InvalidTime(trimmed.to_string());

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid());
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        match parts.as_slice() {
            [minutes, seconds] => {
                let minutes = minutes.parse::<u32>().map_err(|_| invalid())?;
                let seconds = seconds.parse::<f64>().map_err(|_| invalid())?;
                if !(0.0..60.0).contains(&seconds) {
                    return Err(invalid());
                }
                Ok(Self::from_seconds(minutes as f64 * 60.0 + seconds))
            }
            [hours, minutes, seconds] => {
                let hours = hours.parse::<u32>().map_err(|_| invalid())?;
                let minutes = minutes.parse::<u32>().map_err(|_| invalid())?;
                let seconds = seconds.parse::<f64>().map_err(|_| invalid())?;
                if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
                    return Err(invalid());
                }
                Ok(Self::from_seconds(
                    hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
                ))
            }
            _ => Err(invalid()),
        }
    }

    /// Format as HH:MM:SS.mmm
    pub fn format_hms(&self) -> String {
        let total_millis = (self.seconds.max(0.0) * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let milliseconds = total_millis % 1000;

        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

impl FromStr for TimeSpec {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeSpec::parse(s)
    }
}

/// One downloadable stream as reported by the extraction tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub id: String,
    pub container: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub approx_size_bytes: Option<u64>,
    pub is_video_only: bool,
    pub is_audio_only: bool,
}

impl StreamDescriptor {
    pub fn resolution(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }

    pub fn codecs(&self) -> String {
        match (&self.video_codec, &self.audio_codec) {
            (Some(v), Some(a)) => format!("{}+{}", v, a),
            (Some(v), None) => v.clone(),
            (None, Some(a)) => a.clone(),
            (None, None) => "unknown".to_string(),
        }
    }

    /// Human label such as `1920x1080 60fps mp4 (avc1+mp4a) ~12.30 MB`
    pub fn display_label(&self) -> String {
        let mut label = if self.is_audio_only {
            "audio only".to_string()
        } else {
            self.resolution().unwrap_or_else(|| "unknown".to_string())
        };

        if let Some(fps) = self.fps.filter(|fps| *fps > 0.0) {
            label.push_str(&format!(" {}fps", fps.round() as u32));
        }
        label.push_str(&format!(" {} ({})", self.container, self.codecs()));
        if self.is_video_only {
            label.push_str(" [video only]");
        }
        if let Some(size) = self.approx_size_bytes {
            label.push_str(&format!(" ~{}", crate::utils::format_bytes(size)));
        }
        label
    }

    /// Selection expression for this stream, pairing video-only streams with the best audio
    pub fn selection_for(&self, target: Option<&MediaFormat>) -> String {
        let wants_audio = !matches!(target, Some(MediaFormat::Mp3) | Some(MediaFormat::Gif));
        if self.is_video_only && wants_audio {
            format!("{}+bestaudio", self.id)
        } else {
            self.id.clone()
        }
    }
}

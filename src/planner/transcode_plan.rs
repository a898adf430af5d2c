//! Transcode argument planning
//!
//! Maps a target format plus trim and encoder options onto a concrete
//! ffmpeg argument plan. GIF output always goes through a two-branch
//! palettegen/paletteuse graph.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::errors::ModelError;
use crate::domain::model::{MediaFormat, TimeSpec};

/// Encoder presets accepted by the x264/x265 family
pub const PRESETS: [&str; 9] = [
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
];

pub const DEFAULT_PRESET: &str = "fast";
pub const DEFAULT_GIF_FPS: u32 = 10;
pub const DEFAULT_GIF_SCALE_WIDTH: i32 = 480;

/// Trim boundaries closer than this to the file edges count as "whole file"
const TRIM_EPSILON: f64 = 0.001;

/// Video codec families from the container table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Mpeg4,
    Vp9,
}

impl VideoCodec {
    pub fn encoder(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::Mpeg4 => "mpeg4",
            VideoCodec::Vp9 => "libvpx-vp9",
        }
    }
}

/// Audio codec families from the container table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Mp3,
    Opus,
}

impl AudioCodec {
    pub fn encoder(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "libmp3lame",
            AudioCodec::Opus => "libopus",
        }
    }
}

/// Codec pair for a container; `(None, None)` lets the container decide
pub fn codecs_for(format: &MediaFormat) -> (Option<VideoCodec>, Option<AudioCodec>) {
    match format {
        MediaFormat::Mp3 => (None, Some(AudioCodec::Mp3)),
        MediaFormat::Mp4 | MediaFormat::Mov => (Some(VideoCodec::H264), Some(AudioCodec::Aac)),
        MediaFormat::Avi => (Some(VideoCodec::Mpeg4), Some(AudioCodec::Mp3)),
        MediaFormat::Webm => (Some(VideoCodec::Vp9), Some(AudioCodec::Opus)),
        MediaFormat::Gif | MediaFormat::Other(_) => (None, None),
    }
}

/// Caller-tunable conversion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeOptions {
    #[serde(default)]
    pub trim_start: Option<f64>,
    #[serde(default)]
    pub trim_end: Option<f64>,
    /// 0 lets the tool decide
    pub threads: u32,
    pub preset: String,
    pub gif_fps: u32,
    /// Output width in pixels; 0 or less keeps the source size
    pub gif_scale_width: i32,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            trim_start: None,
            trim_end: None,
            threads: 0,
            preset: DEFAULT_PRESET.to_string(),
            gif_fps: DEFAULT_GIF_FPS,
            gif_scale_width: DEFAULT_GIF_SCALE_WIDTH,
        }
    }
}

impl TranscodeOptions {
    pub fn with_trim(mut self, start: Option<TimeSpec>, end: Option<TimeSpec>) -> Self {
        self.trim_start = start.map(|t| t.as_seconds());
        self.trim_end = end.map(|t| t.as_seconds());
        self
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    pub fn with_gif(mut self, fps: u32, scale_width: i32) -> Self {
        self.gif_fps = fps;
        self.gif_scale_width = scale_width;
        self
    }
}

/// Validate a preset name against [`PRESETS`]
pub fn validate_preset(preset: &str) -> Result<(), ModelError> {
    if PRESETS.contains(&preset) {
        Ok(())
    } else {
        Err(ModelError::InvalidPreset(preset.to_string()))
    }
}

/// Immutable ffmpeg argument plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodePlan {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub format: MediaFormat,
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    /// Ordered codec and stream-selection arguments
    pub codec_args: Vec<String>,
    pub filter_graph: Option<String>,
    pub thread_count: u32,
    /// Only set when the video encoder understands presets
    pub preset: Option<String>,
    pub trim_start: Option<f64>,
    pub trim_end: Option<f64>,
}

impl TranscodePlan {
    pub fn has_trim(&self) -> bool {
        self.trim_start.is_some() || self.trim_end.is_some()
    }

    /// Serialize to the tool's flat argument list
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
        ];

        match (self.trim_start, self.trim_end) {
            (Some(start), end) => {
                args.push("-ss".to_string());
                args.push(seconds_arg(start));
                // Input option: still an absolute source position after seeking
                if let Some(end) = end {
                    args.push("-to".to_string());
                    args.push(seconds_arg(end));
                }
                args.push("-i".to_string());
                args.push(self.input_path.to_string_lossy().into_owned());
            }
            (None, Some(end)) => {
                args.push("-i".to_string());
                args.push(self.input_path.to_string_lossy().into_owned());
                args.push("-to".to_string());
                args.push(seconds_arg(end));
            }
            (None, None) => {
                args.push("-i".to_string());
                args.push(self.input_path.to_string_lossy().into_owned());
            }
        }

        if let Some(graph) = &self.filter_graph {
            args.push("-vf".to_string());
            args.push(graph.clone());
        }
        args.extend(self.codec_args.iter().cloned());
        if let Some(preset) = &self.preset {
            args.push("-preset".to_string());
            args.push(preset.clone());
        }
        args.push("-threads".to_string());
        args.push(self.thread_count.to_string());
        args.push(self.output_path.to_string_lossy().into_owned());
        args
    }
}

fn seconds_arg(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

/// GIF palette graph: scale, split, palettegen on one branch, paletteuse on the other
pub fn gif_filter_graph(fps: u32, scale_width: i32) -> String {
    let fps = if fps == 0 { DEFAULT_GIF_FPS } else { fps };
    let mut graph = format!("fps={}", fps);
    if scale_width > 0 {
        graph.push_str(&format!(",scale={}:-1:flags=lanczos", scale_width));
    }
    graph.push_str(
        ",split[s0][s1];[s0]palettegen=stats_mode=single[p];[s1][p]paletteuse=new=1:dither=sierra2_4a",
    );
    graph
}

/// Normalize a trim request against the known duration.
///
/// Returns the `(start, end)` pair to pass to the tool. A start at zero and an
/// end at or past the known duration are dropped.
pub fn normalize_trim(
    trim_start: Option<f64>,
    trim_end: Option<f64>,
    known_duration: Option<f64>,
) -> Result<(Option<f64>, Option<f64>), ModelError> {
    for value in [trim_start, trim_end].into_iter().flatten() {
        if !value.is_finite() || value < 0.0 {
            return Err(ModelError::InvalidTime(value.to_string()));
        }
    }

    if let (Some(start), Some(end)) = (trim_start, trim_end) {
        if end <= start {
            return Err(ModelError::InvalidTrimWindow { start, end });
        }
    }

    let start = trim_start.filter(|s| *s > TRIM_EPSILON);
    let end = trim_end.filter(|e| match known_duration {
        Some(total) if total > 0.0 => *e < total - TRIM_EPSILON,
        _ => true,
    });
    Ok((start, end))
}

/// Media seconds the tool will actually process.
///
/// With a trim window this is `min(end, total) - start`, clamped at zero. A zero
/// or unusable result falls back to the untrimmed total.
pub fn effective_duration(
    total: Option<f64>,
    trim_start: Option<f64>,
    trim_end: Option<f64>,
) -> Option<f64> {
    let total = total.filter(|t| t.is_finite() && *t > 0.0)?;
    if trim_start.is_none() && trim_end.is_none() {
        return Some(total);
    }

    let start = trim_start.unwrap_or(0.0);
    let end = trim_end.map_or(total, |e| e.min(total));
    let window = (end - start).max(0.0);

    if window.is_finite() && window > 0.0 {
        Some(window)
    } else {
        Some(total)
    }
}

/// Build a transcode plan
pub fn build(
    input_path: &Path,
    output_path: &Path,
    format: &MediaFormat,
    options: &TranscodeOptions,
    known_duration: Option<f64>,
) -> Result<TranscodePlan, ModelError> {
    let (trim_start, trim_end) =
        normalize_trim(options.trim_start, options.trim_end, known_duration)?;
    let (video_codec, audio_codec) = codecs_for(format);

    let mut codec_args = Vec::new();
    let mut filter_graph = None;

    match format {
        MediaFormat::Gif => {
            filter_graph = Some(gif_filter_graph(options.gif_fps, options.gif_scale_width));
            codec_args.extend(["-an", "-loop", "0"].map(String::from));
        }
        MediaFormat::Mp3 => {
            codec_args.push("-vn".to_string());
        }
        _ => {}
    }
    if let Some(codec) = video_codec {
        codec_args.push("-c:v".to_string());
        codec_args.push(codec.encoder().to_string());
    }
    if let Some(codec) = audio_codec {
        codec_args.push("-c:a".to_string());
        codec_args.push(codec.encoder().to_string());
    }

    let preset = match video_codec {
        Some(_) => {
            validate_preset(&options.preset)?;
            Some(options.preset.clone())
        }
        None => None,
    };

    let plan = TranscodePlan {
        input_path: input_path.to_path_buf(),
        output_path: output_path.to_path_buf(),
        format: format.clone(),
        video_codec,
        audio_codec,
        codec_args,
        filter_graph,
        thread_count: options.threads,
        preset,
        trim_start,
        trim_end,
    };

    debug!(
        input = %plan.input_path.display(),
        output = %plan.output_path.display(),
        format = %plan.format,
        trim_start = ?plan.trim_start,
        trim_end = ?plan.trim_end,
        "Built transcode plan"
    );
    Ok(plan)
}

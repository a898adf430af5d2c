//! ffprobe-backed [`MediaProber`]

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use super::{MediaInfo, MediaProber, StreamInfo, StreamKind};
use crate::domain::errors::ProbeError;
use crate::process::{capture, tail_lines, ToolCommand, STDERR_TAIL_LINES};

/// Runs `ffprobe -print_format json -show_format -show_streams`
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    tool: ToolCommand,
}

impl FfprobeProber {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new(ToolCommand::new("ffprobe"))
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        if !path.is_file() {
            return Err(ProbeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        debug!(path = %path.display(), "Probing media file");
        let path_arg = path.to_string_lossy().into_owned();
        let args = [
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            path_arg.as_str(),
        ];
        let output = capture(&self.tool, &args).await?;

        if !output.success {
            return Err(ProbeError::ToolFailure {
                exit_code: output.exit_code,
                diagnostic: tail_lines(&output.stderr, STDERR_TAIL_LINES),
            });
        }

        let info = parse_probe_output(&output.stdout)?;
        info!(
            path = %path.display(),
            duration = ?info.best_duration(),
            streams = info.streams.len(),
            "Probed media file"
        );
        Ok(info)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// ffprobe prints numbers as strings and `N/A` for unknowns
fn number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Decode ffprobe's JSON document
pub fn parse_probe_output(json: &str) -> Result<MediaInfo, ProbeError> {
    let output: ProbeOutput = serde_json::from_str(json)?;
    let format = output.format;

    Ok(MediaInfo {
        duration: format.as_ref().and_then(|f| number(f.duration.as_deref())),
        format_name: format.as_ref().and_then(|f| f.format_name.clone()),
        size_bytes: format.as_ref().and_then(|f| number(f.size.as_deref())),
        streams: output
            .streams
            .into_iter()
            .map(|s| StreamInfo {
                index: s.index,
                kind: StreamKind::from_codec_type(s.codec_type.as_deref().unwrap_or_default()),
                codec: s.codec_name,
                width: s.width,
                height: s.height,
                duration: number(s.duration.as_deref()),
            })
            .collect(),
    })
}

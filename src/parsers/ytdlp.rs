//! yt-dlp output decoding
//!
//! The acquisition engine asks yt-dlp for machine-readable lines through
//! `--progress-template` and `--print`. Every such line starts with
//! [`MARKER`] followed by space separated `key=value` pairs. Values that
//! yt-dlp cannot fill in are printed as `NA` or `None` and decode to absent.

use tracing::trace;

/// Prefix of every line produced by our templates
pub const MARKER: &str = "[mediaforge]";

/// Progress template handed to `--progress-template`
pub const PROGRESS_TEMPLATE: &str = "download:[mediaforge] status=%(progress.status)s \
downloaded_bytes=%(progress.downloaded_bytes)s total_bytes=%(progress.total_bytes)s \
total_bytes_estimate=%(progress.total_bytes_estimate)s speed=%(progress.speed)s \
eta=%(progress.eta)s";

/// Printed once the output filename is known, before the download starts
pub const FILENAME_TEMPLATE: &str = "before_dl:[mediaforge] filename=%(filename)s";

/// Printed after post-processing moved the file to its final location
pub const FILEPATH_TEMPLATE: &str = "after_move:[mediaforge] filepath=%(filepath)s";

/// One progress-hook report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YtdlpProgress {
    pub status: String,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<u64>,
    pub speed: Option<f64>,
    pub eta: Option<u64>,
}

impl YtdlpProgress {
    pub fn is_downloading(&self) -> bool {
        self.status == "downloading"
    }

    pub fn is_finished(&self) -> bool {
        self.status == "finished"
    }

    /// Exact total when reported, otherwise the estimate
    pub fn best_total(&self) -> Option<u64> {
        self.total_bytes
            .filter(|t| *t > 0)
            .or(self.total_bytes_estimate.filter(|t| *t > 0))
    }
}

/// A decoded machine-readable line
#[derive(Debug, Clone, PartialEq)]
pub enum YtdlpLine {
    Progress(YtdlpProgress),
    /// Filename prepared by the tool before post-processing
    Filename(String),
    /// Final path after post-processing
    Filepath(String),
}

impl YtdlpLine {
    /// Decode a line of tool output. Lines without our marker yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let start = line.find(MARKER)?;
        let body = line[start + MARKER.len()..].trim();

        // Paths may contain spaces, so these take the rest of the line
        if let Some(name) = body.strip_prefix("filename=") {
            return present(name).map(|n| YtdlpLine::Filename(n.to_string()));
        }
        if let Some(path) = body.strip_prefix("filepath=") {
            return present(path).map(|p| YtdlpLine::Filepath(p.to_string()));
        }

        let mut progress = YtdlpProgress::default();
        let mut saw_status = false;
        for pair in body.split_whitespace() {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = present(value);
            match key {
                "status" => {
                    if let Some(status) = value {
                        progress.status = status.to_string();
                        saw_status = true;
                    }
                }
                "downloaded_bytes" => progress.downloaded_bytes = value.and_then(parse_count),
                "total_bytes" => progress.total_bytes = value.and_then(parse_count),
                "total_bytes_estimate" => {
                    progress.total_bytes_estimate = value.and_then(parse_count)
                }
                "speed" => progress.speed = value.and_then(|v| v.parse::<f64>().ok()),
                "eta" => progress.eta = value.and_then(parse_count),
                _ => trace!(key, "Ignoring unknown progress field"),
            }
        }

        saw_status.then_some(YtdlpLine::Progress(progress))
    }
}

fn present(value: &str) -> Option<&str> {
    let value = value.trim();
    match value {
        "" | "NA" | "None" | "null" => None,
        other => Some(other),
    }
}

/// Byte counts and estimates are sometimes printed as floats
fn parse_count(value: &str) -> Option<u64> {
    value
        .parse::<u64>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.round() as u64)
        })
}

/// Category of a failed yt-dlp run, derived from its diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    InvalidUrl,
    MissingTranscoder,
    Other,
}

/// Classify captured stderr text
pub fn classify_failure(diagnostic: &str) -> FailureClass {
    let lower = diagnostic.to_ascii_lowercase();
    if lower.contains("is not a valid url") || lower.contains("unsupported url") {
        FailureClass::InvalidUrl
    } else if lower.contains("ffmpeg is not installed")
        || lower.contains("ffmpeg not found")
        || lower.contains("ffprobe and ffmpeg not found")
    {
        FailureClass::MissingTranscoder
    } else {
        FailureClass::Other
    }
}

/// Most useful line of a stderr tail: the last `ERROR:` line, else the whole tail
pub fn primary_diagnostic(stderr_tail: &str) -> String {
    stderr_tail
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with("ERROR:"))
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| stderr_tail.trim().to_string())
}

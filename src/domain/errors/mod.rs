// Domain errors - Error types for the domain layer

use std::path::PathBuf;
use thiserror::Error;

/// Validation failures for domain values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid time format: {0}. Expected seconds, MM:SS[.ms] or HH:MM:SS[.ms]")]
    InvalidTime(String),

    #[error("Output format must not be empty")]
    EmptyFormat,

    #[error("Invalid encoder preset: {0}")]
    InvalidPreset(String),

    #[error("Invalid trim window: start ({start:.3}s) must be before end ({end:.3}s)")]
    InvalidTrimWindow { start: f64, end: f64 },
}

/// Failures of the generic child-process wrapper
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The program could not be found on disk or in PATH
    #[error("{program} is not installed or not executable: {source}")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine already owns a live process
    #[error("another operation is already running on this engine")]
    Busy,

    #[error("failed to supervise {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the acquisition stage
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Invalid or unsupported URL: {url}. {diagnostic}")]
    InvalidUrl { url: String, diagnostic: String },

    #[error("The extraction tool needs a transcoder (ffmpeg) to finish this request. {diagnostic}")]
    MissingTranscoder { diagnostic: String },

    #[error("Download cancelled by user")]
    UserCancelled,

    #[error("Extraction tool failed (exit code {exit_code:?}): {diagnostic}")]
    ToolFailure {
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("Downloaded file could not be located (expected near {expected})")]
    FileNotFound { expected: String },

    #[error("Extraction tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("another download is already running on this engine")]
    Busy,

    #[error("I/O error during download: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not decode extraction tool output: {0}")]
    Decode(String),
}

/// Failures of the transcoding stage
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Conversion cancelled by user")]
    UserCancelled,

    #[error("Transcoding tool failed (exit code {exit_code:?}): {captured_stderr}")]
    ToolFailure {
        exit_code: Option<i32>,
        captured_stderr: String,
    },

    #[error("Transcoding tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("another conversion is already running on this engine")]
    Busy,

    #[error("Invalid conversion request: {0}")]
    InvalidRequest(#[from] ModelError),

    #[error("I/O error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the metadata probe
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Probe tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Probe failed (exit code {exit_code:?}): {diagnostic}")]
    ToolFailure {
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("Could not parse probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error while probing: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the direct image download
#[derive(Error, Debug)]
pub enum ImageFetchError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server answered with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Image download cancelled by user")]
    UserCancelled,

    #[error("I/O error while saving image: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SupervisorError> for AcquisitionError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::ToolUnavailable { .. } => {
                AcquisitionError::ToolUnavailable(err.to_string())
            }
            SupervisorError::Busy => AcquisitionError::Busy,
            SupervisorError::Io { source, .. } => AcquisitionError::Io(source),
        }
    }
}

impl From<SupervisorError> for TranscodeError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::ToolUnavailable { .. } => {
                TranscodeError::ToolUnavailable(err.to_string())
            }
            SupervisorError::Busy => TranscodeError::Busy,
            SupervisorError::Io { source, .. } => TranscodeError::Io(source),
        }
    }
}

impl From<SupervisorError> for ProbeError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::ToolUnavailable { .. } => ProbeError::ToolUnavailable(err.to_string()),
            SupervisorError::Busy => ProbeError::ToolFailure {
                exit_code: None,
                diagnostic: err.to_string(),
            },
            SupervisorError::Io { source, .. } => ProbeError::Io(source),
        }
    }
}

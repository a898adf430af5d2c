//! Error handling module for MediaForge

use serde::Serialize;
use thiserror::Error;

use crate::domain::errors::{
    AcquisitionError, ImageFetchError, ModelError, ProbeError, TranscodeError,
};

/// Caller-facing failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing file, malformed URL or invalid option
    InvalidInput,
    /// A required external binary is missing
    ToolUnavailable,
    /// Nonzero exit with captured diagnostic text
    ToolFailure,
    /// The run succeeded but the output file cannot be located
    FilenameResolutionFailure,
    /// Cooperative cancellation was honored
    UserCancelled,
    /// Transport-level error during a direct fetch
    NetworkFailure,
}

/// Main error type for MediaForge operations
#[derive(Error, Debug)]
pub enum MediaError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    ImageFetch(#[from] ImageFetchError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// Configuration file or environment error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Map this failure onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::Acquisition(err) => match err {
                AcquisitionError::InvalidUrl { .. } => ErrorKind::InvalidInput,
                AcquisitionError::MissingTranscoder { .. }
                | AcquisitionError::ToolUnavailable(_) => ErrorKind::ToolUnavailable,
                AcquisitionError::UserCancelled => ErrorKind::UserCancelled,
                AcquisitionError::ToolFailure { .. }
                | AcquisitionError::Io(_)
                | AcquisitionError::Decode(_) => ErrorKind::ToolFailure,
                AcquisitionError::FileNotFound { .. } => ErrorKind::FilenameResolutionFailure,
                AcquisitionError::Busy => ErrorKind::InvalidInput,
            },
            MediaError::Transcode(err) => match err {
                TranscodeError::FileNotFound { .. }
                | TranscodeError::InvalidRequest(_)
                | TranscodeError::Busy => ErrorKind::InvalidInput,
                TranscodeError::UserCancelled => ErrorKind::UserCancelled,
                TranscodeError::ToolFailure { .. } | TranscodeError::Io(_) => {
                    ErrorKind::ToolFailure
                }
                TranscodeError::ToolUnavailable(_) => ErrorKind::ToolUnavailable,
            },
            MediaError::Probe(err) => match err {
                ProbeError::FileNotFound { .. } => ErrorKind::InvalidInput,
                ProbeError::ToolUnavailable(_) => ErrorKind::ToolUnavailable,
                ProbeError::ToolFailure { .. } | ProbeError::Parse(_) | ProbeError::Io(_) => {
                    ErrorKind::ToolFailure
                }
            },
            MediaError::ImageFetch(err) => match err {
                ImageFetchError::InvalidUrl(_) => ErrorKind::InvalidInput,
                ImageFetchError::Network(_) | ImageFetchError::Status(_) => {
                    ErrorKind::NetworkFailure
                }
                ImageFetchError::UserCancelled => ErrorKind::UserCancelled,
                ImageFetchError::Io(_) => ErrorKind::NetworkFailure,
            },
            MediaError::Model(_) | MediaError::Config { .. } => ErrorKind::InvalidInput,
            MediaError::Io(_) => ErrorKind::ToolFailure,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::UserCancelled
    }
}

/// Result type alias for MediaForge operations
pub type MediaResult<T> = std::result::Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_kind_mapping() {
        let err: MediaError = AcquisitionError::FileNotFound {
            expected: "x".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::FilenameResolutionFailure);

        let err: MediaError = TranscodeError::FileNotFound {
            path: PathBuf::from("missing.mp4"),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err: MediaError = AcquisitionError::MissingTranscoder {
            diagnostic: String::new(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ToolUnavailable);
    }

    #[test]
    fn test_cancellation_is_distinguishable() {
        let err: MediaError = TranscodeError::UserCancelled.into();
        assert!(err.is_cancelled());
        let err: MediaError = AcquisitionError::UserCancelled.into();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_tool_failure_message_embeds_diagnostic() {
        let err: MediaError = TranscodeError::ToolFailure {
            exit_code: Some(1),
            captured_stderr: "Unknown encoder 'libfoo'".to_string(),
        }
        .into();
        assert!(err.to_string().contains("Unknown encoder 'libfoo'"));
        assert_eq!(err.kind(), ErrorKind::ToolFailure);
    }
}

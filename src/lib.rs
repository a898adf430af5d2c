//! MediaForge library
//!
//! Orchestrates two external tools: an extraction tool (yt-dlp) that
//! downloads media and a transcoder (ffmpeg) that converts it. The engines
//! supervise one child process at a time, turn its console output into
//! [`ProgressEvent`]s, and honor cancellation from any task.

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod parsers;
pub mod planner;
pub mod probe;
pub mod process;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use domain::model::{FormatRequest, MediaFormat, ProgressEvent, StreamDescriptor, TimeSpec};
pub use engine::{AcquisitionEngine, ProgressCallback, TranscodeEngine};
pub use error::{ErrorKind, MediaError, MediaResult};
pub use planner::TranscodeOptions;
pub use process::{ProcessSupervisor, ToolCommand};

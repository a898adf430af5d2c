//! Pure planning for both tool invocations
//!
//! Plans are built once per request, never mutated afterwards, and only
//! flattened into argument lists at the process boundary.

pub mod format_selector;
pub mod transcode_plan;

pub use format_selector::{select, DownloadPlan, PostProcessor, AUDIO_QUALITY_KBPS};
pub use transcode_plan::{
    effective_duration, AudioCodec, TranscodeOptions, TranscodePlan, VideoCodec, PRESETS,
};

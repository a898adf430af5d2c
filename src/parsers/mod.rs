//! Decoders for the text the external tools print while they run

pub mod ffmpeg;
pub mod ytdlp;

pub use ffmpeg::{parse_clock, FfmpegProgress};
pub use ytdlp::{classify_failure, FailureClass, YtdlpLine, YtdlpProgress};

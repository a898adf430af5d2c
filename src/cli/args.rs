//! Command-line argument definitions

use clap::Args;
use std::path::PathBuf;

/// Trim and encoder options shared by `convert` and `get`
#[derive(Args, Debug, Clone, Default)]
pub struct EncodeArgs {
    /// Trim start (HH:MM:SS[.ms], MM:SS[.ms], or seconds)
    #[arg(short, long)]
    pub start: Option<String>,

    /// Trim end (HH:MM:SS[.ms], MM:SS[.ms], or seconds)
    #[arg(short, long)]
    pub end: Option<String>,

    /// Encoder threads (0 lets the transcoder decide)
    #[arg(long)]
    pub threads: Option<u32>,

    /// Encoder preset (ultrafast ... veryslow), video codecs only
    #[arg(long)]
    pub preset: Option<String>,

    /// GIF frame rate
    #[arg(long)]
    pub gif_fps: Option<u32>,

    /// GIF width in pixels (0 keeps the source width)
    #[arg(long)]
    pub gif_width: Option<i32>,
}

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Source URL
    pub url: String,

    /// Container to acquire (mp4, webm, mp3; others fetch mp4)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Explicit stream id from `streams`; overrides --format
    #[arg(long)]
    pub stream_id: Option<String>,

    /// Destination directory (default: configured video directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input media file
    pub input: PathBuf,

    /// Target format (mp4, mov, avi, webm, mp3, gif, ...)
    #[arg(short, long)]
    pub format: String,

    /// Output file path (default: <input>_converted.<format>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub encode: EncodeArgs,
}

/// Arguments for the get command
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Source URL
    pub url: String,

    /// Final format; containers the extraction tool cannot produce are transcoded afterwards
    #[arg(short, long)]
    pub format: Option<String>,

    /// Destination directory (default: configured video directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    #[command(flatten)]
    pub encode: EncodeArgs,
}

/// Arguments for the streams command
#[derive(Args, Debug)]
pub struct StreamsArgs {
    /// Source URL
    pub url: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input media file
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the image command
#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Direct image URL
    pub url: String,

    /// Destination directory (default: configured image directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

//! CLI module for MediaForge
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

pub use args::{ConvertArgs, EncodeArgs, FetchArgs, GetArgs, ImageArgs, ProbeArgs, StreamsArgs};

/// MediaForge
///
/// Download media with yt-dlp and transcode it with ffmpeg, with live
/// progress and Ctrl-C cancellation.
#[derive(Parser, Debug)]
#[command(name = "mediaforge")]
#[command(about = "MediaForge - download and transcode media with live progress")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "MEDIAFORGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Print progress events as JSON lines on stdout
    #[arg(long, global = true)]
    pub json_progress: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download media from a URL
    Fetch(FetchArgs),
    /// Transcode a local media file
    Convert(ConvertArgs),
    /// Download, then transcode when the target needs it
    Get(GetArgs),
    /// List the streams available for a URL
    Streams(StreamsArgs),
    /// Show metadata of a local media file
    Probe(ProbeArgs),
    /// Download a direct image URL
    Image(ImageArgs),
}

//! MediaForge CLI
//!
//! Downloads media through yt-dlp and transcodes it through ffmpeg, reporting
//! progress while the external tools run.
//!
//! # Usage
//!
//! ```bash
//! mediaforge fetch "https://example.com/watch?v=abc" --format webm
//! mediaforge convert talk.mp4 --format gif --start 00:01:00 --end 00:01:05
//! mediaforge get "https://example.com/watch?v=abc" --format mov
//! mediaforge streams "https://example.com/watch?v=abc"
//! ```

use clap::Parser;
use std::process::ExitCode;

use mediaforge::cli::{commands, Cli};
use mediaforge::MediaError;

/// Exit status used when the user interrupts an operation
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let cancelled = err
                .downcast_ref::<MediaError>()
                .is_some_and(MediaError::is_cancelled);
            if cancelled {
                eprintln!("Cancelled");
                ExitCode::from(EXIT_CANCELLED)
            } else {
                eprintln!("Error: {:#}", err);
                ExitCode::FAILURE
            }
        }
    }
}

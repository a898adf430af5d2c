//! Progress callback contract shared by both engines
//!
//! Callbacks run on whatever task drives the engine future. Events arrive in
//! the order the tool printed the corresponding lines, and a `Finished` or
//! `Error` event always comes last.

use chrono::Utc;
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::domain::model::ProgressEvent;
use crate::utils::{format_bytes, format_eta, format_speed};

/// Receiver of normalized progress events
pub trait ProgressCallback: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressCallback for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Human-readable progress line on stderr
pub struct ConsoleProgressCallback {
    verbose: bool,
    update_interval: Duration,
    last_render: Mutex<Option<Instant>>,
}

impl ConsoleProgressCallback {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            update_interval: Duration::from_millis(100), // At most 10 redraws per second
            last_render: Mutex::new(None),
        }
    }

    fn should_render(&self, event: &ProgressEvent) -> bool {
        if event.is_terminal() || self.verbose {
            return true;
        }
        let Ok(mut last) = self.last_render.lock() else {
            return true;
        };
        let now = Instant::now();
        match *last {
            Some(previous) if now.duration_since(previous) < self.update_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

fn bar(percent: f64) -> String {
    const BAR_LENGTH: usize = 20;
    let filled = ((percent / 100.0) * BAR_LENGTH as f64).round() as usize;
    let filled = filled.min(BAR_LENGTH);
    format!("{}{}", "#".repeat(filled), "-".repeat(BAR_LENGTH - filled))
}

/// One status line for an event
pub fn render_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Downloading {
            downloaded_bytes,
            total_bytes,
            percentage,
            speed_bytes_per_sec,
            eta_seconds,
        } => {
            let speed = format_speed(*speed_bytes_per_sec);
            match (percentage, total_bytes) {
                (Some(percent), Some(total)) => format!(
                    "Downloading [{}] {:>5.1}% {} / {} at {} ETA {}",
                    bar(*percent),
                    percent,
                    format_bytes(*downloaded_bytes),
                    format_bytes(*total),
                    speed,
                    format_eta(*eta_seconds)
                ),
                _ => format!(
                    "Downloading {} at {}",
                    format_bytes(*downloaded_bytes),
                    speed
                ),
            }
        }
        ProgressEvent::Converting {
            elapsed_media_seconds,
            total_media_seconds,
            percentage,
            speed_multiplier,
        } => {
            let speed = speed_multiplier
                .map(|s| format!("{:.2}x", s))
                .unwrap_or_else(|| "-".to_string());
            match (percentage, total_media_seconds) {
                (Some(percent), Some(total)) => format!(
                    "Converting  [{}] {:>5.1}% {:.1}s / {:.1}s speed {}",
                    bar(*percent),
                    percent,
                    elapsed_media_seconds,
                    total,
                    speed
                ),
                _ => format!("Converting {:.1}s speed {}", elapsed_media_seconds, speed),
            }
        }
        ProgressEvent::Finished {
            result_path,
            total_bytes,
        } => match total_bytes {
            Some(bytes) => format!(
                "Finished: {} ({})",
                result_path.display(),
                format_bytes(*bytes)
            ),
            None => format!("Finished: {}", result_path.display()),
        },
        ProgressEvent::Error { message } => format!("Error: {}", message),
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_event(&self, event: &ProgressEvent) {
        if !self.should_render(event) {
            return;
        }

        let line = render_event(event);
        let mut stderr = std::io::stderr().lock();
        // Progress output is best effort
        let _ = if event.is_terminal() {
            writeln!(stderr, "\r{}\x1b[K", line)
        } else if self.verbose {
            writeln!(stderr, "{}", line)
        } else {
            write!(stderr, "\r{}\x1b[K", line)
        };
        let _ = stderr.flush();
    }
}

#[derive(Serialize)]
struct TimestampedEvent<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a ProgressEvent,
}

/// One JSON object per event on stdout
#[derive(Debug, Default)]
pub struct JsonProgressCallback;

impl JsonProgressCallback {
    pub fn new() -> Self {
        Self
    }

    pub fn to_json(event: &ProgressEvent) -> serde_json::Result<String> {
        serde_json::to_string(&TimestampedEvent {
            timestamp: Utc::now().to_rfc3339(),
            event,
        })
    }
}

impl ProgressCallback for JsonProgressCallback {
    fn on_event(&self, event: &ProgressEvent) {
        match Self::to_json(event) {
            Ok(json) => {
                let mut stdout = std::io::stdout().lock();
                let _ = writeln!(stdout, "{}", json);
                let _ = stdout.flush();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize progress event"),
        }
    }
}

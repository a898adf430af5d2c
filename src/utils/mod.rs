//! Common utilities and helpers

pub mod logging;
pub mod path;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use path::{default_output_path, numbered_path, sanitize_file_name, unique_path};

/// Format a byte count for display
pub fn format_bytes(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit_index = 0;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit_index])
    }
}

/// Format a transfer rate; unknown speeds render as `-`
pub fn format_speed(bytes_per_sec: Option<f64>) -> String {
    match bytes_per_sec {
        Some(speed) if speed.is_finite() && speed >= 0.0 => {
            format!("{}/s", format_bytes(speed.round() as u64))
        }
        _ => "-".to_string(),
    }
}

/// `MM:SS`, or `HH:MM:SS` past an hour; `--:--` when unknown
pub fn format_eta(seconds: Option<u64>) -> String {
    match seconds {
        Some(total) => {
            let hours = total / 3600;
            let minutes = (total % 3600) / 60;
            let seconds = total % 60;
            if hours > 0 {
                format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
            } else {
                format!("{:02}:{:02}", minutes, seconds)
            }
        }
        None => "--:--".to_string(),
    }
}

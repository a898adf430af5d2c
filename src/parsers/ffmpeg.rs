//! ffmpeg status line decoding
//!
//! ffmpeg reports `frame=  120 fps= 30 q=28.0 size=    512kB time=00:00:04.00
//! bitrate=1048.6kbits/s speed=1.99x` on stderr. Field spacing varies between
//! builds, and any field may read `N/A`, so every field is optional.

/// One status line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegProgress {
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    pub quality: Option<f64>,
    pub size_kb: Option<u64>,
    /// Output position in seconds
    pub time_seconds: Option<f64>,
    pub bitrate_kbps: Option<f64>,
    /// Processing speed relative to real time
    pub speed: Option<f64>,
}

impl FfmpegProgress {
    /// Decode a status line; `None` unless it carries a usable `time=` value
    pub fn parse_line(line: &str) -> Option<Self> {
        if !line.contains("time=") {
            return None;
        }

        // "fps= 30" and "fps=30" both become ["fps=", "30"]
        let spaced = line.replace('=', "= ");
        let parts: Vec<&str> = spaced.split_whitespace().collect();

        let mut progress = Self::default();
        for (i, part) in parts.iter().enumerate() {
            let Some(value) = parts.get(i + 1).copied() else {
                break;
            };
            if value.ends_with('=') {
                continue;
            }
            match *part {
                "frame=" => progress.frame = value.parse().ok(),
                "fps=" => progress.fps = value.parse().ok(),
                "q=" => progress.quality = value.parse().ok(),
                "size=" | "Lsize=" => {
                    progress.size_kb = value
                        .trim_end_matches("KiB")
                        .trim_end_matches("kB")
                        .parse()
                        .ok()
                }
                "time=" => progress.time_seconds = parse_clock(value),
                "bitrate=" => {
                    progress.bitrate_kbps = value.trim_end_matches("kbits/s").parse().ok()
                }
                "speed=" => progress.speed = value.trim_end_matches('x').parse().ok(),
                _ => {}
            }
        }

        progress.time_seconds.map(|_| progress)
    }
}

/// Parse `HH:MM:SS.cc` (hours may exceed two digits, a leading `-` is clamped to 0)
pub fn parse_clock(value: &str) -> Option<f64> {
    let value = value.trim();
    let (negative, value) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let parts: Vec<&str> = value.split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return None;
    };
    let hours: f64 = hours.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;

    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    if !total.is_finite() {
        return None;
    }
    Some(if negative { 0.0 } else { total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_status_line() {
        let line = "frame=  120 fps= 30 q=28.0 size=     512kB time=00:00:04.00 bitrate=1048.6kbits/s speed=1.99x";
        let progress = FfmpegProgress::parse_line(line).unwrap();
        assert_eq!(progress.frame, Some(120));
        assert_eq!(progress.fps, Some(30.0));
        assert_eq!(progress.quality, Some(28.0));
        assert_eq!(progress.size_kb, Some(512));
        assert_eq!(progress.time_seconds, Some(4.0));
        assert_eq!(progress.bitrate_kbps, Some(1048.6));
        assert_eq!(progress.speed, Some(1.99));
    }

    #[test]
    fn test_audio_only_line() {
        let line = "size=    1024KiB time=00:01:05.50 bitrate= 128.0kbits/s speed=  41x";
        let progress = FfmpegProgress::parse_line(line).unwrap();
        assert_eq!(progress.frame, None);
        assert_eq!(progress.size_kb, Some(1024));
        assert_eq!(progress.time_seconds, Some(65.5));
        assert_eq!(progress.speed, Some(41.0));
    }

    #[test]
    fn test_not_available_fields() {
        let line = "frame=    0 fps=0.0 q=0.0 size=       0kB time=N/A bitrate=N/A speed=N/A";
        assert_eq!(FfmpegProgress::parse_line(line), None);
    }

    #[test]
    fn test_non_progress_lines() {
        let banner = "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'a.mp4':";
        assert_eq!(FfmpegProgress::parse_line(banner), None);
        assert_eq!(FfmpegProgress::parse_line("  Duration: 00:00:10.00, start: 0.000000"), None);
        assert_eq!(FfmpegProgress::parse_line(""), None);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let line = "frame=  60 fps=25 q=-1.0 size=256kB time=00:00:02.40 bitrate=873.8kbits/s speed=2.5x";
        assert_eq!(FfmpegProgress::parse_line(line), FfmpegProgress::parse_line(line));
    }

    #[test]
    fn test_malformed_field_keeps_the_rest() {
        let line = "frame=abc fps=25 q=28.0 size=12xB time=00:00:03.00 bitrate=?? speed=fastx";
        let progress = FfmpegProgress::parse_line(line).unwrap();
        assert_eq!(progress.frame, None);
        assert_eq!(progress.size_kb, None);
        assert_eq!(progress.bitrate_kbps, None);
        assert_eq!(progress.speed, None);
        assert_eq!(progress.fps, Some(25.0));
        assert_eq!(progress.quality, Some(28.0));
        assert_eq!(progress.time_seconds, Some(3.0));

        // Without a usable time the line carries no progress
        let line = "frame=10 fps=25 time=03.00 speed=1.0x";
        assert_eq!(FfmpegProgress::parse_line(line), None);
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("00:00:10.50"), Some(10.5));
        assert_eq!(parse_clock("101:00:00.00"), Some(363600.0));
        assert_eq!(parse_clock("-00:00:00.04"), Some(0.0));
        assert_eq!(parse_clock("10.5"), None);
        assert_eq!(parse_clock("N/A"), None);
    }
}

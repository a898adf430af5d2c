//! Layered application configuration
//!
//! Precedence: CLI > Env > File > Defaults. This module handles the last three;
//! CLI flags are applied on top by the command layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::model::MediaFormat;
use crate::error::MediaError;
use crate::planner::transcode_plan::{
    validate_preset, TranscodeOptions, DEFAULT_GIF_FPS, DEFAULT_GIF_SCALE_WIDTH, DEFAULT_PRESET,
};
use crate::process::ToolCommand;
use crate::utils::logging::{LogFormat, LogLevel, LoggingConfig};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "MEDIAFORGE_CONFIG";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOCAL_CONFIG_FILE: &str = "mediaforge.toml";

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for MediaError {
    fn from(err: ConfigError) -> Self {
        MediaError::Config {
            message: err.to_string(),
        }
    }
}

/// External tool locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ytdlp: ToolCommand,
    pub ffmpeg: ToolCommand,
    pub ffprobe: ToolCommand,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ytdlp: ToolCommand::new("yt-dlp"),
            ffmpeg: ToolCommand::new("ffmpeg"),
            ffprobe: ToolCommand::new("ffprobe"),
        }
    }
}

/// Encoder defaults for conversions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeDefaults {
    pub threads: u32,
    pub preset: String,
    pub gif_fps: u32,
    pub gif_scale_width: i32,
}

impl Default for TranscodeDefaults {
    fn default() -> Self {
        Self {
            threads: 0,
            preset: DEFAULT_PRESET.to_string(),
            gif_fps: DEFAULT_GIF_FPS,
            gif_scale_width: DEFAULT_GIF_SCALE_WIDTH,
        }
    }
}

impl TranscodeDefaults {
    pub fn to_options(&self) -> TranscodeOptions {
        TranscodeOptions::default()
            .with_threads(self.threads)
            .with_preset(self.preset.clone())
            .with_gif(self.gif_fps, self.gif_scale_width)
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub video_download_dir: PathBuf,
    pub image_download_dir: PathBuf,
    pub default_format: MediaFormat,
    pub tools: ToolPaths,
    pub transcode: TranscodeDefaults,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            video_download_dir: home.join("Videos").join("MediaDL"),
            image_download_dir: home.join("Pictures").join("MediaDL"),
            default_format: MediaFormat::Mp4,
            tools: ToolPaths::default(),
            transcode: TranscodeDefaults::default(),
            log_level: LogLevel::Warn,
            log_format: LogFormat::Compact,
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file, then `MEDIAFORGE_*` environment variables
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::locate(explicit_path) {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Config file to read; an explicit path is returned even when missing
    fn locate(explicit_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit_path {
            return Some(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        [default_config_path(), Some(PathBuf::from(LOCAL_CONFIG_FILE))]
            .into_iter()
            .flatten()
            .find(|path| path.is_file())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply `MEDIAFORGE_*` overrides read through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = 0;
        let mut get = |key: &str| {
            let value = lookup(key).filter(|v| !v.trim().is_empty());
            if value.is_some() {
                debug!(key, "Environment override");
                overrides += 1;
            }
            value
        };

        if let Some(dir) = get("MEDIAFORGE_VIDEO_DIR") {
            self.video_download_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("MEDIAFORGE_IMAGE_DIR") {
            self.image_download_dir = PathBuf::from(dir);
        }
        if let Some(format) = get("MEDIAFORGE_DEFAULT_FORMAT") {
            self.default_format = MediaFormat::parse(&format);
        }
        if let Some(program) = get("MEDIAFORGE_YTDLP") {
            self.tools.ytdlp = ToolCommand::new(program);
        }
        if let Some(program) = get("MEDIAFORGE_FFMPEG") {
            self.tools.ffmpeg = ToolCommand::new(program);
        }
        if let Some(program) = get("MEDIAFORGE_FFPROBE") {
            self.tools.ffprobe = ToolCommand::new(program);
        }
        if let Some(threads) = get("MEDIAFORGE_THREADS") {
            self.transcode.threads = parse_value("MEDIAFORGE_THREADS", &threads)?;
        }
        if let Some(preset) = get("MEDIAFORGE_PRESET") {
            self.transcode.preset = preset.trim().to_ascii_lowercase();
        }
        if let Some(fps) = get("MEDIAFORGE_GIF_FPS") {
            self.transcode.gif_fps = parse_value("MEDIAFORGE_GIF_FPS", &fps)?;
        }
        if let Some(width) = get("MEDIAFORGE_GIF_WIDTH") {
            self.transcode.gif_scale_width = parse_value("MEDIAFORGE_GIF_WIDTH", &width)?;
        }
        if let Some(level) = get("MEDIAFORGE_LOG_LEVEL") {
            self.log_level = parse_value("MEDIAFORGE_LOG_LEVEL", &level)?;
        }
        if let Some(format) = get("MEDIAFORGE_LOG_FORMAT") {
            self.log_format = parse_value("MEDIAFORGE_LOG_FORMAT", &format)?;
        }

        if overrides > 0 {
            info!(overrides, "Applied environment overrides");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_preset(&self.transcode.preset).map_err(|_| ConfigError::InvalidValue {
            key: "transcode.preset".to_string(),
            value: self.transcode.preset.clone(),
        })?;
        if self.transcode.gif_fps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "transcode.gif_fps".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig::new(self.log_level, self.log_format)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `%APPDATA%\mediaforge`, `$XDG_CONFIG_HOME/mediaforge` or `~/.config/mediaforge`
pub fn default_config_path() -> Option<PathBuf> {
    let base = if cfg!(windows) {
        std::env::var_os("APPDATA").map(PathBuf::from)
    } else {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
    };
    base.map(|dir| dir.join("mediaforge").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.default_format, MediaFormat::Mp4);
        assert_eq!(config.transcode.preset, "fast");
        assert_eq!(config.transcode.gif_fps, 10);
        assert_eq!(config.transcode.gif_scale_width, 480);
        assert!(config.video_download_dir.ends_with("Videos/MediaDL"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            default_format = "webm"

            [transcode]
            preset = "slow"

            [tools.ytdlp]
            program = "python3"
            prefix_args = ["-m", "yt_dlp"]
            "#,
        )
        .unwrap();

        assert_eq!(config.default_format, MediaFormat::Webm);
        assert_eq!(config.transcode.preset, "slow");
        assert_eq!(config.transcode.gif_fps, 10);
        assert_eq!(config.tools.ytdlp.prefix_args, vec!["-m", "yt_dlp"]);
        assert_eq!(config.tools.ffmpeg, ToolCommand::new("ffmpeg"));

        let options = config.transcode.to_options();
        assert_eq!(options.preset, "slow");
        assert_eq!(options.gif_fps, 10);
        assert_eq!(options.threads, 0);
        assert_eq!(options.trim_start, None);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_toml("[transcode]\nthreads = 2\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("MEDIAFORGE_THREADS", "8"),
            ("MEDIAFORGE_FFMPEG", "/opt/ffmpeg/bin/ffmpeg"),
            ("MEDIAFORGE_LOG_LEVEL", "debug"),
            ("MEDIAFORGE_PRESET", ""),
        ]
        .into_iter()
        .collect();

        config
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.transcode.threads, 8);
        assert_eq!(config.tools.ffmpeg.program, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.transcode.preset, "fast");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = AppConfig::default();
        let result = config
            .apply_env_from(|key| (key == "MEDIAFORGE_GIF_FPS").then(|| "fast".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_invalid_preset_rejected() {
        let mut config = AppConfig::default();
        config.transcode.preset = "ludicrous".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip_and_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.transcode.threads = 6;
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();
        assert_eq!(AppConfig::from_file(&path).unwrap(), config);

        std::fs::write(&path, "transcode = 5").unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            AppConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}

//! Download profile selection for the extraction stage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::domain::model::FormatRequest;
use crate::parsers::ytdlp::{FILENAME_TEMPLATE, FILEPATH_TEMPLATE, PROGRESS_TEMPLATE};

/// Audio quality handed to the extraction post-processor
pub const AUDIO_QUALITY_KBPS: u32 = 192;

const MP4_SELECTION: &str =
    "bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo[vcodec^=avc]+bestaudio[acodec^=mp4a]/best[ext=mp4]/best";
const WEBM_SELECTION: &str =
    "bestvideo[ext=webm]+bestaudio[ext=webm]/bestvideo[vcodec^=vp9]+bestaudio[acodec^=opus]/best[ext=webm]/best";
const AUDIO_SELECTION: &str = "bestaudio/best";
const BEST_SELECTION: &str = "bestvideo+bestaudio/best";

/// Declarative transformation applied by the extraction tool after download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostProcessor {
    /// Re-encapsulate into the given container without re-encoding
    Remux { container: String },
    /// Drop video and encode the audio track
    ExtractAudio { codec: String, quality_kbps: u32 },
}

impl PostProcessor {
    /// Container extension the output ends up with
    pub fn target_extension(&self) -> &str {
        match self {
            PostProcessor::Remux { container } => container,
            PostProcessor::ExtractAudio { codec, .. } => codec,
        }
    }

    fn push_args(&self, args: &mut Vec<String>) {
        match self {
            PostProcessor::Remux { container } => {
                args.push("--remux-video".to_string());
                args.push(container.clone());
            }
            PostProcessor::ExtractAudio {
                codec,
                quality_kbps,
            } => {
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push(codec.clone());
                args.push("--audio-quality".to_string());
                args.push(format!("{}K", quality_kbps));
            }
        }
    }
}

/// Immutable acquisition plan, built once per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadPlan {
    pub selection_expression: String,
    pub merge_container: Option<String>,
    pub post_processors: Vec<PostProcessor>,
    pub quiet: bool,
}

impl DownloadPlan {
    /// Extension the downloaded file should carry after post-processing, if fixed
    pub fn target_extension(&self) -> Option<&str> {
        self.post_processors
            .last()
            .map(PostProcessor::target_extension)
            .or(self.merge_container.as_deref())
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Full extraction tool argument list for `url`, writing into `destination`
    pub fn to_args(&self, url: &str, destination: &Path) -> Vec<String> {
        // '%' in the directory would otherwise be read as a template field
        let directory = destination.to_string_lossy().replace('%', "%%");
        let template = Path::new(&directory).join("%(title)s.%(ext)s");
        let mut args = vec![
            "--newline".to_string(),
            "--progress".to_string(),
            "--no-playlist".to_string(),
            "--no-check-certificate".to_string(),
            "--no-simulate".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--print".to_string(),
            FILENAME_TEMPLATE.to_string(),
            "--print".to_string(),
            FILEPATH_TEMPLATE.to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "-f".to_string(),
            self.selection_expression.clone(),
        ];

        if let Some(container) = &self.merge_container {
            args.push("--merge-output-format".to_string());
            args.push(container.clone());
        }
        for post_processor in &self.post_processors {
            post_processor.push_args(&mut args);
        }
        if self.quiet {
            args.push("--quiet".to_string());
        }

        // End of options: a URL starting with '-' is never read as a flag
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

impl fmt::Display for DownloadPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-f {}", self.selection_expression)?;
        if let Some(container) = &self.merge_container {
            write!(f, " merge={}", container)?;
        }
        for post_processor in &self.post_processors {
            match post_processor {
                PostProcessor::Remux { container } => write!(f, " remux={}", container)?,
                PostProcessor::ExtractAudio {
                    codec,
                    quality_kbps,
                } => write!(f, " extract={}@{}k", codec, quality_kbps)?,
            }
        }
        Ok(())
    }
}

/// Map a format request to a download plan
pub fn select(request: &FormatRequest) -> DownloadPlan {
    // Fields are public, so requests may not have gone through `FormatRequest::new`
    let request = &request.normalized();
    let plan = if let Some(stream_id) = &request.explicit_stream_id {
        DownloadPlan {
            selection_expression: stream_id.clone(),
            merge_container: None,
            post_processors: Vec::new(),
            quiet: false,
        }
    } else {
        match request.container_hint.as_deref() {
            Some("webm") => merged_plan(WEBM_SELECTION, "webm"),
            Some("mp3") => DownloadPlan {
                selection_expression: AUDIO_SELECTION.to_string(),
                merge_container: None,
                post_processors: vec![PostProcessor::ExtractAudio {
                    codec: "mp3".to_string(),
                    quality_kbps: AUDIO_QUALITY_KBPS,
                }],
                quiet: false,
            },
            // mp4 and every container the transcoder produces afterwards
            Some(_) => merged_plan(MP4_SELECTION, "mp4"),
            None => DownloadPlan {
                selection_expression: BEST_SELECTION.to_string(),
                merge_container: None,
                post_processors: Vec::new(),
                quiet: false,
            },
        }
    };

    debug!(?request, plan = %plan, "Selected download plan");
    plan
}

fn merged_plan(selection: &str, container: &str) -> DownloadPlan {
    DownloadPlan {
        selection_expression: selection.to_string(),
        merge_container: Some(container.to_string()),
        post_processors: vec![PostProcessor::Remux {
            container: container.to_string(),
        }],
        quiet: false,
    }
}

//! Transcode engine: probes the input, runs ffmpeg, reports media-time progress

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::progress::ProgressCallback;
use crate::domain::errors::TranscodeError;
use crate::domain::model::{MediaFormat, ProgressEvent};
use crate::parsers::ffmpeg::FfmpegProgress;
use crate::planner::transcode_plan::{self, effective_duration, TranscodeOptions, TranscodePlan};
use crate::probe::{FfprobeProber, MediaProber};
use crate::process::{OutputLine, ProcessSupervisor, ToolCommand};

/// Converts local media files through the transcoding tool.
///
/// One conversion at a time per instance.
pub struct TranscodeEngine {
    tool: ToolCommand,
    prober: Arc<dyn MediaProber>,
    supervisor: ProcessSupervisor,
}

impl std::fmt::Debug for TranscodeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscodeEngine")
            .field("tool", &self.tool)
            .field("busy", &self.supervisor.is_running())
            .finish()
    }
}

impl TranscodeEngine {
    pub fn new(tool: ToolCommand, prober: Arc<dyn MediaProber>) -> Self {
        Self {
            tool,
            prober,
            supervisor: ProcessSupervisor::new(),
        }
    }

    /// Engine probing through ffprobe
    pub fn with_ffprobe(ffmpeg: ToolCommand, ffprobe: ToolCommand) -> Self {
        Self::new(ffmpeg, Arc::new(FfprobeProber::new(ffprobe)))
    }

    pub fn tool(&self) -> &ToolCommand {
        &self.tool
    }

    pub fn is_busy(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Cancel the running conversion. Returns false when nothing is running.
    pub fn cancel_convert(&self) -> bool {
        self.supervisor.cancel()
    }

    /// Probe duration (video stream first, then container); `None` when unknown
    pub async fn source_duration(&self, input: &Path) -> Option<f64> {
        match self.prober.probe(input).await {
            Ok(info) => info.best_duration(),
            Err(e) => {
                warn!(
                    input = %input.display(),
                    error = %e,
                    "Probe failed, progress will be indeterminate"
                );
                None
            }
        }
    }

    /// Build the plan `convert` would run, without running it
    pub async fn plan(
        &self,
        input: &Path,
        output: &Path,
        format: &MediaFormat,
        options: &TranscodeOptions,
    ) -> Result<(TranscodePlan, Option<f64>), TranscodeError> {
        let total = self.source_duration(input).await;
        let plan = transcode_plan::build(input, output, format, options, total)?;
        let effective = effective_duration(total, plan.trim_start, plan.trim_end);
        Ok((plan, effective))
    }

    /// Convert `input` into `output`. `Finished` or `Error` is always the last
    /// event delivered to `progress`. Partial output is left in place on failure.
    pub async fn convert(
        &self,
        input: &Path,
        output: &Path,
        format: &MediaFormat,
        options: &TranscodeOptions,
        progress: &dyn ProgressCallback,
    ) -> Result<PathBuf, TranscodeError> {
        match self.run_convert(input, output, format, options, progress).await {
            Ok(path) => Ok(path),
            Err(err) => {
                warn!(input = %input.display(), error = %err, "Conversion failed");
                progress.on_event(&ProgressEvent::Error {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_convert(
        &self,
        input: &Path,
        output: &Path,
        format: &MediaFormat,
        options: &TranscodeOptions,
        progress: &dyn ProgressCallback,
    ) -> Result<PathBuf, TranscodeError> {
        if self.supervisor.is_running() {
            return Err(TranscodeError::Busy);
        }
        if !input.is_file() {
            return Err(TranscodeError::FileNotFound {
                path: input.to_path_buf(),
            });
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let (plan, effective) = self.plan(input, output, format, options).await?;
        info!(
            input = %input.display(),
            output = %output.display(),
            format = %format,
            duration = ?effective,
            "Starting conversion"
        );

        let args = plan.to_args();
        let outcome = self
            .supervisor
            .run(&self.tool, &args, |line| {
                if let OutputLine::Stderr(text) = line {
                    if let Some(status) = FfmpegProgress::parse_line(text) {
                        let elapsed = status.time_seconds.unwrap_or(0.0);
                        let event = ProgressEvent::converting(elapsed, effective, status.speed);
                        progress.on_event(&event);
                    }
                }
            })
            .await?;

        if outcome.cancelled {
            return Err(TranscodeError::UserCancelled);
        }
        if !outcome.success {
            return Err(TranscodeError::ToolFailure {
                exit_code: outcome.exit_code,
                captured_stderr: outcome.diagnostic(),
            });
        }

        let total_bytes = tokio::fs::metadata(output).await.ok().map(|m| m.len());
        debug!(output = %output.display(), bytes = ?total_bytes, "Output written");
        info!(output = %output.display(), "Conversion finished");
        progress.on_event(&ProgressEvent::Finished {
            result_path: output.to_path_buf(),
            total_bytes,
        });
        Ok(output.to_path_buf())
    }
}

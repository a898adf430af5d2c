//! Acquisition engine: runs the extraction tool and locates what it wrote

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::progress::ProgressCallback;
use crate::domain::errors::AcquisitionError;
use crate::domain::model::{FormatRequest, MediaFormat, ProgressEvent, StreamDescriptor};
use crate::parsers::ytdlp::{classify_failure, primary_diagnostic, FailureClass, YtdlpLine};
use crate::planner::format_selector::{self, DownloadPlan};
use crate::probe::formats::parse_stream_listing;
use crate::process::{
    capture, tail_lines, OutputLine, ProcessSupervisor, ToolCommand, STDERR_TAIL_LINES,
};

/// Suffixes of the tool's in-progress files, never a finished download
const PARTIAL_SUFFIXES: [&str; 4] = [".part", ".ytdl", ".temp", ".tmp"];

/// Downloads remote media through the extraction tool.
///
/// One download at a time per instance; use separate instances for
/// concurrent downloads.
#[derive(Debug)]
pub struct AcquisitionEngine {
    tool: ToolCommand,
    supervisor: ProcessSupervisor,
    quiet: bool,
}

/// Filenames the tool announced while running
#[derive(Debug, Default)]
struct Announced {
    prepared: Option<String>,
    reported: Option<String>,
}

impl AcquisitionEngine {
    pub fn new(tool: ToolCommand) -> Self {
        Self {
            tool,
            supervisor: ProcessSupervisor::new(),
            quiet: false,
        }
    }

    /// Ask the tool to suppress its own console chatter
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn tool(&self) -> &ToolCommand {
        &self.tool
    }

    pub fn is_busy(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Cancel the running download. Returns false when nothing is running.
    pub fn cancel_fetch(&self) -> bool {
        self.supervisor.cancel()
    }

    /// Download `url` into `destination`. `Finished` or `Error` is always the
    /// last event delivered to `progress`.
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        request: &FormatRequest,
        progress: &dyn ProgressCallback,
    ) -> Result<PathBuf, AcquisitionError> {
        match self.run_fetch(url, destination, request, progress).await {
            Ok(path) => Ok(path),
            Err(err) => {
                warn!(url, error = %err, "Download failed");
                progress.on_event(&ProgressEvent::Error {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_fetch(
        &self,
        url: &str,
        destination: &Path,
        request: &FormatRequest,
        progress: &dyn ProgressCallback,
    ) -> Result<PathBuf, AcquisitionError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AcquisitionError::InvalidUrl {
                url: String::new(),
                diagnostic: "no URL given".to_string(),
            });
        }
        if self.supervisor.is_running() {
            return Err(AcquisitionError::Busy);
        }

        let plan = format_selector::select(request).with_quiet(self.quiet);
        tokio::fs::create_dir_all(destination).await?;
        let args = plan.to_args(url, destination);
        info!(url, destination = %destination.display(), plan = %plan, "Starting download");

        let mut announced = Announced::default();
        let outcome = self
            .supervisor
            .run(&self.tool, &args, |line| {
                handle_line(line, &mut announced, progress);
            })
            .await?;

        if outcome.cancelled {
            return Err(AcquisitionError::UserCancelled);
        }
        if !outcome.success {
            return Err(failure(url, outcome.exit_code, &outcome.diagnostic()));
        }

        let path = resolve_output_path(
            announced.reported.as_deref(),
            announced.prepared.as_deref(),
            &plan,
            destination,
        )?;
        let total_bytes = tokio::fs::metadata(&path).await.ok().map(|m| m.len());

        info!(path = %path.display(), bytes = ?total_bytes, "Download finished");
        progress.on_event(&ProgressEvent::Finished {
            result_path: path.clone(),
            total_bytes,
        });
        Ok(path)
    }

    /// Streams the tool can offer for `url`, best first
    pub async fn list_available_streams(
        &self,
        url: &str,
    ) -> Result<Vec<StreamDescriptor>, AcquisitionError> {
        let url = url.trim();
        let args = ["-J", "--no-playlist", "--no-warnings", "--", url];
        let output = capture(&self.tool, &args).await?;

        if !output.success {
            let diagnostic = tail_lines(&output.stderr, STDERR_TAIL_LINES);
            return Err(failure(url, output.exit_code, &diagnostic));
        }

        let streams = parse_stream_listing(&output.stdout)?;
        info!(url, count = streams.len(), "Listed available streams");
        Ok(streams)
    }

    /// Selection for a stream id picked from [`list_available_streams`], with
    /// a video-only stream paired with the best audio unless `target` has no
    /// use for audio. Ids that are already expressions, or that the listing
    /// does not know, are returned unchanged.
    ///
    /// [`list_available_streams`]: Self::list_available_streams
    pub async fn stream_selection(
        &self,
        url: &str,
        stream_id: &str,
        target: Option<&MediaFormat>,
    ) -> Result<String, AcquisitionError> {
        let stream_id = stream_id.trim();
        if stream_id.contains(['+', '/', ',']) {
            return Ok(stream_id.to_string());
        }

        let streams = self.list_available_streams(url).await?;
        match streams.iter().find(|s| s.id == stream_id) {
            Some(stream) => Ok(stream.selection_for(target)),
            None => {
                warn!(url, stream_id, "Stream id not in listing, passing it through");
                Ok(stream_id.to_string())
            }
        }
    }
}

fn handle_line(line: &OutputLine, announced: &mut Announced, progress: &dyn ProgressCallback) {
    let Some(parsed) = YtdlpLine::parse(line.text()) else {
        if line.is_stderr() {
            debug!(line = line.text(), "Extraction tool diagnostic");
        }
        return;
    };

    match parsed {
        YtdlpLine::Progress(report) if report.is_downloading() => {
            progress.on_event(&ProgressEvent::downloading(
                report.downloaded_bytes.unwrap_or(0),
                report.best_total(),
                report.speed,
                report.eta,
            ));
        }
        YtdlpLine::Progress(report) => {
            // "finished" is per fragment; the engine emits its own Finished after resolution
            debug!(
                status = %report.status,
                bytes = ?report.downloaded_bytes,
                "Progress hook status"
            );
        }
        YtdlpLine::Filename(name) => {
            debug!(filename = %name, "Tool prepared filename");
            announced.prepared = Some(name);
        }
        YtdlpLine::Filepath(path) => {
            debug!(filepath = %path, "Tool reported final path");
            announced.reported = Some(path);
        }
    }
}

fn failure(url: &str, exit_code: Option<i32>, stderr_tail: &str) -> AcquisitionError {
    let diagnostic = primary_diagnostic(stderr_tail);
    match classify_failure(stderr_tail) {
        FailureClass::InvalidUrl => AcquisitionError::InvalidUrl {
            url: url.to_string(),
            diagnostic,
        },
        FailureClass::MissingTranscoder => AcquisitionError::MissingTranscoder { diagnostic },
        FailureClass::Other => AcquisitionError::ToolFailure {
            exit_code,
            diagnostic,
        },
    }
}

/// Step (a): the path the tool reported, if it exists
pub fn reported_path(reported: Option<&str>) -> Option<PathBuf> {
    reported
        .map(PathBuf::from)
        .filter(|path| path.is_file())
}

/// Step (b): the prepared filename with the post-processing extension substituted
pub fn substituted_path(prepared: Option<&str>, target_extension: Option<&str>) -> Option<PathBuf> {
    let prepared = PathBuf::from(prepared?);
    let candidate = match target_extension {
        Some(ext) => prepared.with_extension(ext),
        None => prepared,
    };
    candidate.is_file().then_some(candidate)
}

/// Step (c): a file in `dir` whose name starts with `stem`, preferring `target_extension`
pub fn scan_for_stem(dir: &Path, stem: &str, target_extension: Option<&str>) -> Option<PathBuf> {
    if stem.is_empty() {
        return None;
    }

    let mut candidates: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.starts_with(stem) && !PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
        })
        .map(|entry| entry.into_path())
        .collect();

    if let Some(ext) = target_extension {
        if let Some(index) = candidates
            .iter()
            .position(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)))
        {
            return Some(candidates.swap_remove(index));
        }
    }
    candidates.into_iter().next()
}

/// Ordered fallback chain locating the downloaded file
pub fn resolve_output_path(
    reported: Option<&str>,
    prepared: Option<&str>,
    plan: &DownloadPlan,
    destination: &Path,
) -> Result<PathBuf, AcquisitionError> {
    if let Some(path) = reported_path(reported) {
        return Ok(path);
    }
    if reported.is_some() {
        debug!(reported, "Reported path does not exist, trying fallbacks");
    }

    let target_extension = plan.target_extension();
    if let Some(path) = substituted_path(prepared, target_extension) {
        debug!(path = %path.display(), "Resolved output by extension substitution");
        return Ok(path);
    }

    let stem = prepared
        .and_then(|p| Path::new(p).file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default();
    if let Some(path) = scan_for_stem(destination, &stem, target_extension) {
        warn!(path = %path.display(), "Resolved output by directory scan");
        return Ok(path);
    }

    Err(AcquisitionError::FileNotFound {
        expected: prepared
            .or(reported)
            .map(str::to_string)
            .unwrap_or_else(|| destination.display().to_string()),
    })
}

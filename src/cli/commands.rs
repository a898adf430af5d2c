//! Command implementations

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::args::{ConvertArgs, EncodeArgs, FetchArgs, GetArgs, ImageArgs, ProbeArgs, StreamsArgs};
use super::{Cli, Commands};
use crate::config::AppConfig;
use crate::domain::errors::{AcquisitionError, ImageFetchError, TranscodeError};
use crate::domain::model::{FormatRequest, MediaFormat, TimeSpec};
use crate::engine::progress::{ConsoleProgressCallback, JsonProgressCallback, ProgressCallback};
use crate::engine::{AcquisitionEngine, TranscodeEngine};
use crate::error::{MediaError, MediaResult};
use crate::fetch::ImageFetcher;
use crate::planner::TranscodeOptions;
use crate::probe::ffprobe::FfprobeProber;
use crate::probe::{MediaInfo, MediaProber};
use crate::process::ToolCommand;
use crate::utils::logging::LogLevel;
use crate::utils::{default_output_path, format_bytes, unique_path};

/// Load configuration, install logging and run the selected command
pub async fn run(cli: Cli) -> Result<()> {
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.logging().init();
    debug!(?config, "Configuration loaded");

    let session = Session {
        json_progress: cli.json_progress,
        config,
    };

    match cli.command {
        Commands::Fetch(args) => session.fetch(args).await,
        Commands::Convert(args) => session.convert(args).await,
        Commands::Get(args) => session.get(args).await,
        Commands::Streams(args) => session.streams(args).await,
        Commands::Probe(args) => session.probe(args).await,
        Commands::Image(args) => session.image(args).await,
    }
}

struct Session {
    config: AppConfig,
    json_progress: bool,
}

impl Session {
    fn progress(&self) -> Box<dyn ProgressCallback> {
        if self.json_progress {
            Box::new(JsonProgressCallback::new())
        } else {
            Box::new(ConsoleProgressCallback::new(self.config.log_level >= LogLevel::Debug))
        }
    }

    fn acquisition_engine(&self) -> MediaResult<AcquisitionEngine> {
        let tool = &self.config.tools.ytdlp;
        if !tool.is_available() {
            return Err(AcquisitionError::ToolUnavailable(missing(tool)).into());
        }
        Ok(AcquisitionEngine::new(tool.clone()).with_quiet(self.json_progress))
    }

    /// ffprobe is optional: without it progress is indeterminate
    fn transcode_engine(&self) -> MediaResult<TranscodeEngine> {
        let tools = &self.config.tools;
        if !tools.ffmpeg.is_available() {
            return Err(TranscodeError::ToolUnavailable(missing(&tools.ffmpeg)).into());
        }
        Ok(TranscodeEngine::with_ffprobe(
            tools.ffmpeg.clone(),
            tools.ffprobe.clone(),
        ))
    }

    fn report(&self, path: &Path) {
        // JSON mode already carries the path in the Finished event
        if !self.json_progress {
            println!("{}", path.display());
        }
    }

    fn transcode_options(&self, encode: &EncodeArgs) -> Result<TranscodeOptions> {
        let start = encode
            .start
            .as_deref()
            .map(TimeSpec::parse)
            .transpose()
            .context("Invalid start time")?;
        let end = encode
            .end
            .as_deref()
            .map(TimeSpec::parse)
            .transpose()
            .context("Invalid end time")?;

        let mut options = self.config.transcode.to_options().with_trim(start, end);
        if let Some(threads) = encode.threads {
            options = options.with_threads(threads);
        }
        if let Some(preset) = &encode.preset {
            options = options.with_preset(preset.clone());
        }
        let gif_fps = encode.gif_fps.unwrap_or(options.gif_fps);
        let gif_width = encode.gif_width.unwrap_or(options.gif_scale_width);
        Ok(options.with_gif(gif_fps, gif_width))
    }

    async fn download(
        &self,
        engine: &AcquisitionEngine,
        url: &str,
        destination: &Path,
        request: &FormatRequest,
    ) -> Result<PathBuf> {
        let progress = self.progress();
        let path = until_interrupted(
            engine.fetch(url, destination, request, &*progress),
            || engine.cancel_fetch(),
            || AcquisitionError::UserCancelled,
        )
        .await
        .map_err(MediaError::from)
        .with_context(|| format!("Failed to download {}", url))?;
        Ok(path)
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: &MediaFormat,
        options: &TranscodeOptions,
    ) -> Result<PathBuf> {
        let engine = self.transcode_engine()?;
        let progress = self.progress();
        let path = until_interrupted(
            engine.convert(input, output, format, options, &*progress),
            || engine.cancel_convert(),
            || TranscodeError::UserCancelled,
        )
        .await
        .map_err(MediaError::from)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
        Ok(path)
    }

    async fn fetch(&self, args: FetchArgs) -> Result<()> {
        let destination = args.dir.unwrap_or_else(|| self.config.video_download_dir.clone());
        let engine = self.acquisition_engine()?;

        // Without --format the tool picks the best streams unmodified
        let target = args.format.as_deref().map(MediaFormat::parse);
        let selection = match args.stream_id.as_deref() {
            Some(id) => match engine.stream_selection(&args.url, id, target.as_ref()).await {
                Ok(selection) => Some(selection),
                Err(e) => {
                    warn!(
                        stream_id = id,
                        error = %e,
                        "Could not inspect streams, using id as given"
                    );
                    Some(id.to_string())
                }
            },
            None => None,
        };
        let request = FormatRequest::new(args.format.as_deref(), selection.as_deref());
        info!(url = %args.url, ?request, "Executing fetch command");

        let path = self.download(&engine, &args.url, &destination, &request).await?;
        self.report(&path);
        Ok(())
    }

    async fn convert(&self, args: ConvertArgs) -> Result<()> {
        let format = MediaFormat::parse(&args.format);
        let options = self.transcode_options(&args.encode)?;
        let output = args
            .output
            .unwrap_or_else(|| default_output_path(&args.input, None, &format));
        info!(
            input = %args.input.display(),
            output = %output.display(),
            %format,
            "Executing convert command"
        );

        let path = self.transcode(&args.input, &output, &format, &options).await?;
        self.report(&path);
        Ok(())
    }

    async fn get(&self, args: GetArgs) -> Result<()> {
        let format = args
            .format
            .as_deref()
            .map(MediaFormat::parse)
            .unwrap_or_else(|| self.config.default_format.clone());
        // Parse trim options before spending time on the download
        let options = self.transcode_options(&args.encode)?;
        let destination = args.dir.unwrap_or_else(|| self.config.video_download_dir.clone());
        info!(url = %args.url, %format, "Executing get command");

        let engine = self.acquisition_engine()?;
        let request = FormatRequest::container(format.extension());
        let downloaded = self.download(&engine, &args.url, &destination, &request).await?;

        let trimmed = args.encode.start.is_some() || args.encode.end.is_some();
        if format.is_directly_acquirable() && !trimmed {
            self.report(&downloaded);
            return Ok(());
        }

        let output = unique_path(&default_output_path(&downloaded, None, &format));
        let path = self.transcode(&downloaded, &output, &format, &options).await?;
        self.report(&path);
        Ok(())
    }

    async fn streams(&self, args: StreamsArgs) -> Result<()> {
        let engine = self.acquisition_engine()?;
        let streams = engine
            .list_available_streams(&args.url)
            .await
            .map_err(MediaError::from)
            .with_context(|| format!("Failed to list streams for {}", args.url))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&streams)?);
            return Ok(());
        }

        if streams.is_empty() {
            println!("No downloadable streams found");
        }
        for stream in &streams {
            println!("{:<12} {}", stream.id, stream.display_label());
        }
        Ok(())
    }

    async fn probe(&self, args: ProbeArgs) -> Result<()> {
        let prober = FfprobeProber::new(self.config.tools.ffprobe.clone());
        let info = prober
            .probe(&args.input)
            .await
            .map_err(MediaError::from)
            .with_context(|| format!("Failed to probe {}", args.input.display()))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            print_media_info(&args.input, &info);
        }
        Ok(())
    }

    async fn image(&self, args: ImageArgs) -> Result<()> {
        let destination = args.dir.unwrap_or_else(|| self.config.image_download_dir.clone());
        info!(url = %args.url, "Executing image command");

        let fetcher = ImageFetcher::new().map_err(MediaError::from)?;
        let progress = self.progress();
        let path = until_interrupted(
            fetcher.fetch(&args.url, &destination, &*progress),
            || {
                fetcher.cancel();
                true
            },
            || ImageFetchError::UserCancelled,
        )
        .await
        .map_err(MediaError::from)
        .with_context(|| format!("Failed to download image {}", args.url))?;
        self.report(&path);
        Ok(())
    }
}

fn missing(tool: &ToolCommand) -> String {
    format!("{} not found", tool.program.display())
}

/// Run `operation`, turning Ctrl-C into a cancel request. When `cancel`
/// reports a live process the operation is awaited so it can finish its own
/// cleanup; otherwise it is dropped and `cancelled` is returned.
async fn until_interrupted<T, E, Fut>(
    operation: Fut,
    cancel: impl FnOnce() -> bool,
    cancelled: impl FnOnce() -> E,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    tokio::pin!(operation);
    tokio::select! {
        result = &mut operation => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling");
            if cancel() {
                operation.await
            } else {
                Err(cancelled())
            }
        }
    }
}

fn print_media_info(path: &Path, info: &MediaInfo) {
    println!("File:      {}", path.display());
    if let Some(name) = &info.format_name {
        println!("Container: {}", name);
    }
    match info.best_duration() {
        Some(seconds) => println!("Duration:  {}", TimeSpec::from_seconds(seconds).format_hms()),
        None => println!("Duration:  unknown"),
    }
    if let Some(size) = info.size_bytes {
        println!("Size:      {}", format_bytes(size));
    }
    println!(
        "Streams:   {} video, {} audio",
        info.video_streams().count(),
        info.audio_streams().count()
    );
    for stream in &info.streams {
        let dimensions = match (stream.width, stream.height) {
            (Some(w), Some(h)) => format!(" {}x{}", w, h),
            _ => String::new(),
        };
        println!(
            "  #{} {:?} {}{}",
            stream.index,
            stream.kind,
            stream.codec.as_deref().unwrap_or("unknown"),
            dimensions
        );
    }
}

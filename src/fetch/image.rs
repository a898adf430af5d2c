//! Direct single-file image download over HTTP

use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::errors::ImageFetchError;
use crate::domain::model::ProgressEvent;
use crate::engine::progress::ProgressCallback;
use crate::utils::{numbered_path, sanitize_file_name};

/// Extensions treated as direct image links
pub const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "tiff", "ico",
];

/// Whether `url` points straight at an image file (judged by its path extension)
pub fn is_direct_image_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let path = parsed.path().to_ascii_lowercase();
    Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext))
}

/// Extension for an image MIME type
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        "image/svg+xml" => Some("svg"),
        "image/tiff" => Some("tiff"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        _ => None,
    }
}

/// `filename*=` (RFC 5987) wins over `filename=`
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';').map(str::trim) {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.trim().trim_matches('"');
                let name = encoded.rsplit("''").next().unwrap_or(encoded);
                let query = format!("n={}", name.replace('+', "%2B"));
                let decoded: String = url::form_urlencoded::parse(query.as_bytes())
                    .next()
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_else(|| name.to_string());
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
            "filename" => {
                let name = raw.trim().trim_matches('"');
                if !name.is_empty() {
                    plain = Some(name.to_string());
                }
            }
            _ => {}
        }
    }
    plain
}

/// Name for the saved file: Content-Disposition, URL basename, then `image.<ext>`
pub fn derive_file_name(url: &Url, headers: &HeaderMap) -> String {
    let content_ext = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(extension_for_content_type);

    let from_header = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_content_disposition);

    let from_url = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            url::form_urlencoded::parse(format!("n={}", segment.replace('+', "%2B")).as_bytes())
                .next()
                .map(|(_, v)| v.into_owned())
                .unwrap_or_else(|| segment.to_string())
        });

    match from_header.or(from_url) {
        Some(name) => {
            let name = sanitize_file_name(&name);
            match (Path::new(&name).extension(), content_ext) {
                (None, Some(ext)) => format!("{}.{}", name, ext),
                _ => name,
            }
        }
        None => format!("image.{}", content_ext.unwrap_or("jpg")),
    }
}

/// Streams image URLs to disk with reqwest
pub struct ImageFetcher {
    client: reqwest::Client,
    cancelled: AtomicBool,
}

impl ImageFetcher {
    pub fn new() -> Result<Self, ImageFetchError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("mediaforge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            cancelled: AtomicBool::new(false),
        })
    }

    /// Stop the running download after the current chunk
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Download `url` into `destination` without overwriting existing files
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<PathBuf, ImageFetchError> {
        self.cancelled.store(false, Ordering::SeqCst);
        match self.run_fetch(url, destination, progress).await {
            Ok(path) => Ok(path),
            Err(err) => {
                warn!(url, error = %err, "Image download failed");
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
        progress: &dyn ProgressCallback,
    ) -> Result<PathBuf, ImageFetchError> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| ImageFetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ImageFetchError::InvalidUrl(url.to_string()));
        }

        let response = self.client.get(parsed.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::Status(status));
        }

        tokio::fs::create_dir_all(destination).await?;
        let name = derive_file_name(&parsed, response.headers());
        let (path, mut file) = create_unique(&destination.join(name)).await?;
        let total = response.content_length().filter(|len| *len > 0);
        info!(url = %parsed, path = %path.display(), total = ?total, "Downloading image");

        let mut stream = response.bytes_stream();
        let started = Instant::now();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            if self.cancelled.load(Ordering::SeqCst) {
                debug!(path = %path.display(), downloaded, "Image download cancelled");
                return Err(ImageFetchError::UserCancelled);
            }
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            let elapsed = started.elapsed().as_secs_f64();
            let speed = (elapsed > 0.0).then(|| downloaded as f64 / elapsed);
            let eta = match (total, speed) {
                (Some(total), Some(speed)) if speed > 0.0 && total >= downloaded => {
                    Some(((total - downloaded) as f64 / speed).round() as u64)
                }
                _ => None,
            };
            progress.on_event(&ProgressEvent::downloading(downloaded, total, speed, eta));
        }
        file.flush().await?;

        info!(path = %path.display(), bytes = downloaded, "Image saved");
        progress.on_event(&ProgressEvent::Finished {
            result_path: path.clone(),
            total_bytes: Some(downloaded),
        });
        Ok(path)
    }
}

/// Create `path`, or the first free `<stem>_<n>.<ext>` beside it, without
/// ever opening a file that already exists
async fn create_unique(path: &Path) -> std::io::Result<(PathBuf, tokio::fs::File)> {
    let mut candidate = path.to_path_buf();
    let mut n = 0u32;
    loop {
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await;
        match opened {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && n < u32::MAX => {
                n += 1;
                candidate = numbered_path(path, n);
            }
            Err(e) => return Err(e),
        }
    }
}

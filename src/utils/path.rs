//! Output path helpers

use std::path::{Path, PathBuf};

use crate::domain::model::MediaFormat;

/// `<dir>/<input stem>_converted.<format>`; `dir` defaults to the input's directory
pub fn default_output_path(input: &Path, dir: Option<&Path>, format: &MediaFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    dir.join(format!("{}_converted.{}", stem, format.extension()))
}

/// `path` if free, otherwise `<stem>_<n>.<ext>` for the first free `n` from 1
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    (1u32..)
        .map(|n| numbered_path(path, n))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// `<stem>_<n>.<ext>` next to `path`
pub fn numbered_path(path: &Path, n: u32) -> PathBuf {
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    parent.join(name)
}

/// Replace characters that are invalid in file names on common platforms
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed.to_string()
    }
}

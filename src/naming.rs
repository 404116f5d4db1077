//! Centralized file naming for uploads, processed results and downloads.
//!
//! Every stored image file is named `<id><ext>`, where `id` is a UUID and
//! `ext` the lowercase extension of the original upload (`.jpg`, `.jpeg` or
//! `.png`). Processed results keep the source's extension, so the output
//! format always matches the input.
//!
//! - `3f2a…-….jpg`: an upload or processed result on disk
//! - `vintagecam-3f2a….jpg`: the name a download is offered under
//! - `vintage_holiday.png`: a batch output for `holiday.png`

use std::path::{Path, PathBuf};

/// Encodings the pipeline can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Map an extension (with or without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(OutputFormat::Jpeg),
            "image/png" => Some(OutputFormat::Png),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

/// Lowercase extension of `name` including the dot, or `""`.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// `<id><ext>`
pub fn stored_filename(id: &str, ext: &str) -> String {
    format!("{id}{ext}")
}

/// Name offered for download: `vintagecam-<id><ext>`.
pub fn download_filename(id: &str, path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("vintagecam-{id}{ext}")
}

/// Content type for serving a stored file: PNG by extension, JPEG otherwise.
pub fn content_type(path: &Path) -> &'static str {
    match OutputFormat::from_path(path) {
        Some(OutputFormat::Png) => OutputFormat::Png.mime_type(),
        _ => OutputFormat::Jpeg.mime_type(),
    }
}

/// Batch output name for a source file: `vintage_<file name>`.
pub fn batch_output_name(source: &Path) -> Option<String> {
    source
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| format!("vintage_{n}"))
}

/// Find the first file in `dir` whose name starts with `id`.
///
/// Linear in the number of directory entries. Returns `None` if the directory
/// is missing or unreadable.
pub async fn find_by_prefix(dir: &Path, id: &str) -> Option<PathBuf> {
    if id.is_empty() {
        return None;
    }
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| n.starts_with(id)) {
            return Some(entry.path());
        }
    }
    None
}

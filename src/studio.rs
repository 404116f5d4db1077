//! The studio: upload, process, and look up images.
//!
//! This is the boundary every outer surface (the CLI here) calls into. It
//! ties the image pipeline to the metadata store and the filesystem:
//!
//! ```text
//! upload ──▶ uploads/<id><ext> + image:<id>
//! process ─▶ admission gate ─▶ lookup image:<id> ─▶ temp workdir ─▶ pipeline
//!           ─▶ processed/<pid><ext> + processed:<pid>
//! ```
//!
//! ## Lookup and recovery
//!
//! Lookups consult the store first. When the record is missing (expired,
//! store wiped, store read failed) the relevant directory is scanned for a
//! file whose name starts with the id; if one exists a minimal record is
//! rebuilt and written back with a fresh TTL. The scan is linear in the
//! directory size.
//!
//! ## Failure policy
//!
//! - Store **writes** that fail are logged and ignored: the file on disk is
//!   the source of truth and recovery will rebuild its record.
//! - Every processing request runs in its own temp directory that is removed
//!   at the end regardless of outcome. A failed cleanup is logged.
//! - Nothing deduplicates requests: processing the same image twice yields
//!   two independent results.
//! - Image files are never deleted when their record expires.

use crate::admission::{AdmissionGate, MemoryUsage};
use crate::config::AppConfig;
use crate::imaging::{
    BackendError, CropSelection, ImageBackend, ProcessOptions, RenderSettings, process_image,
};
use crate::naming::{
    OutputFormat, batch_output_name, content_type, download_filename, extension_of,
    find_by_prefix, stored_filename,
};
use crate::store::{MetadataStore, StoreError, get_json, put_json};
use crate::types::{
    AppliedCrop, AppliedEffects, ImageRecord, ProcessedImageRecord, expiry_from, image_key,
    processed_key,
};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("{0}")]
    Validation(String),
    #[error("Image not found or expired: {0}")]
    NotFound(String),
    #[error("Processing failed: {0}")]
    Processing(#[from] BackendError),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Server is busy, retry in {}s", .retry_after.as_secs())]
    Capacity { retry_after: Duration },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    /// Only capacity refusals are worth retrying; everything else fails the
    /// same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StudioError::Capacity { .. })
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

/// A stored file ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedFile {
    pub path: PathBuf,
    pub filename: String,
    pub content_type: &'static str,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Result of the status self-test.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub backend: &'static str,
    pub memory: MemoryUsage,
    pub under_pressure: bool,
    pub storage_ok: bool,
    pub storage_error: Option<String>,
}

pub struct Studio<B: ImageBackend> {
    config: AppConfig,
    settings: RenderSettings,
    store: Arc<dyn MetadataStore>,
    backend: B,
    gate: Arc<dyn AdmissionGate>,
}

impl<B: ImageBackend> Studio<B> {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn MetadataStore>,
        backend: B,
        gate: Arc<dyn AdmissionGate>,
    ) -> Self {
        let settings = config.render_settings();
        Self {
            config,
            settings,
            store,
            backend,
            gate,
        }
    }

    /// Replace the render settings (fixed grain seed in tests).
    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Write a record, logging instead of failing.
    async fn record<T: Serialize + Sync>(&self, key: &str, value: &T) {
        if let Err(e) = put_json(self.store.as_ref(), key, value, Some(self.config.ttl())).await {
            warn!(key, error = %e, "metadata write failed, continuing");
        }
    }

    /// Store first, then directory scan with record rebuild.
    async fn lookup<T, F>(&self, key: &str, dir: &Path, id: &str, recover: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Sync,
        F: FnOnce(PathBuf) -> T,
    {
        if id.trim().is_empty() {
            return Err(StudioError::Validation("Image ID is required".into()));
        }

        match get_json::<T>(self.store.as_ref(), key).await {
            Ok(Some(record)) => {
                debug!(key, "metadata hit");
                return Ok(record);
            }
            Ok(None) => debug!(key, "metadata miss, scanning"),
            Err(e) => warn!(key, error = %e, "metadata read failed, scanning"),
        }

        let Some(path) = find_by_prefix(dir, id).await else {
            return Err(StudioError::NotFound(id.to_string()));
        };
        info!(key, path = %path.display(), "recovered record from disk");
        let record = recover(path);
        self.record(key, &record).await;
        Ok(record)
    }

    // =====================================================================
    // Upload
    // =====================================================================

    /// Validate and store an upload given as raw bytes.
    ///
    /// Accepts JPEG and PNG only (extension, declared type and content must
    /// all agree), non-empty and within `output.max_upload_bytes`.
    pub async fn upload_bytes(
        &self,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<ImageRecord> {
        let invalid = |msg: &str| Err(StudioError::Validation(msg.into()));

        if bytes.is_empty() {
            return invalid("No image provided");
        }
        if bytes.len() as u64 > self.config.output.max_upload_bytes {
            return Err(StudioError::Validation(format!(
                "Image exceeds the {} byte upload limit",
                self.config.output.max_upload_bytes
            )));
        }
        let ext = extension_of(original_name);
        let by_ext = OutputFormat::from_extension(&ext);
        let by_mime = OutputFormat::from_mime(mime_type);
        let by_content = match image::guess_format(bytes) {
            Ok(image::ImageFormat::Jpeg) => Some(OutputFormat::Jpeg),
            Ok(image::ImageFormat::Png) => Some(OutputFormat::Png),
            _ => None,
        };
        if by_ext.is_none() || by_ext != by_mime || by_mime != by_content {
            return invalid("Only JPEG and PNG images are allowed");
        }

        let id = Uuid::new_v4().to_string();
        let dir = &self.config.storage.uploads_dir;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(stored_filename(&id, &ext));
        tokio::fs::write(&path, bytes).await?;

        if let Err(e) = self.backend.strip_metadata(&path) {
            warn!(path = %path.display(), error = %e, "could not strip metadata, keeping original bytes");
        }

        let now = Utc::now();
        let record = ImageRecord {
            id: id.clone(),
            path,
            original_name: Some(original_name.to_string()),
            mime_type: Some(mime_type.to_string()),
            size: Some(bytes.len() as u64),
            upload_time: now,
            expiration_time: expiry_from(now, self.config.storage.ttl_seconds),
        };
        self.record(&image_key(&id), &record).await;
        info!(id, name = original_name, size = bytes.len(), "image uploaded");
        Ok(record)
    }

    /// Upload a file from disk, deriving name and type from its path.
    pub async fn upload(&self, source: &Path) -> Result<ImageRecord> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StudioError::Validation("Invalid file name".into()))?;
        let mime = OutputFormat::from_path(source)
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream");
        let bytes = match tokio::fs::read(source).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StudioError::Validation(format!(
                    "No such file: {}",
                    source.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        self.upload_bytes(name, mime, &bytes).await
    }

    // =====================================================================
    // Lookup
    // =====================================================================

    pub async fn find_image(&self, id: &str) -> Result<ImageRecord> {
        let ttl = self.config.storage.ttl_seconds;
        self.lookup(
            &image_key(id),
            &self.config.storage.uploads_dir,
            id,
            |path| ImageRecord::recovered(id, path, Utc::now(), ttl),
        )
        .await
    }

    pub async fn find_processed(&self, id: &str) -> Result<ProcessedImageRecord> {
        let ttl = self.config.storage.ttl_seconds;
        self.lookup(
            &processed_key(id),
            &self.config.storage.processed_dir,
            id,
            |path| ProcessedImageRecord::recovered(id, path, Utc::now(), ttl),
        )
        .await
    }

    /// The uploaded original, for previewing.
    pub async fn preview(&self, id: &str) -> Result<ServedFile> {
        let record = self.find_image(id).await?;
        served(id, record.path, |path| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .await
    }

    /// A processed result, named `vintagecam-<id><ext>` for download.
    pub async fn download(&self, id: &str) -> Result<ServedFile> {
        let record = self.find_processed(id).await?;
        served(id, record.path, |path| download_filename(id, path)).await
    }

    // =====================================================================
    // Processing
    // =====================================================================

    fn admit(&self) -> Result<()> {
        if self.gate.under_pressure() {
            let retry_after = self.config.retry_after();
            warn!(retry_after_secs = retry_after.as_secs(), "memory pressure, refusing work");
            return Err(StudioError::Capacity { retry_after });
        }
        Ok(())
    }

    /// Process an uploaded image and record the result.
    pub async fn process(
        &self,
        image_id: &str,
        options: &ProcessOptions,
    ) -> Result<ProcessedImageRecord> {
        self.admit()?;
        let source = self.find_image(image_id).await?;

        let temp_root = self.config.temp_root();
        tokio::fs::create_dir_all(&temp_root).await?;
        let workdir = tempfile::Builder::new()
            .prefix("vintagecam-")
            .tempdir_in(&temp_root)?;

        let result = self.process_in(workdir.path(), &source, options).await;

        let workdir_path = workdir.path().to_path_buf();
        if let Err(e) = workdir.close() {
            warn!(path = %workdir_path.display(), error = %e, "temp cleanup failed");
        }
        result
    }

    async fn process_in(
        &self,
        workdir: &Path,
        source: &ImageRecord,
        options: &ProcessOptions,
    ) -> Result<ProcessedImageRecord> {
        let ext = source
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .map(extension_of)
            .unwrap_or_default();
        let input = workdir.join(format!("input{ext}"));
        let output = workdir.join(format!("output{ext}"));

        if let Err(e) = tokio::fs::copy(&source.path, &input).await {
            return Err(if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::SourceNotFound(source.path.clone()).into()
            } else {
                e.into()
            });
        }

        let params = process_image(&self.backend, &input, &output, options, &self.settings)?;

        let id = Uuid::new_v4().to_string();
        let dir = &self.config.storage.processed_dir;
        tokio::fs::create_dir_all(dir).await?;
        let dest = dir.join(stored_filename(&id, &ext));
        tokio::fs::copy(&output, &dest).await?;

        let applied = match options.crop_selection() {
            CropSelection::Ratio(ratio) => AppliedCrop::AspectRatio(ratio),
            CropSelection::Custom(_) => AppliedCrop::CropData(params.crop),
        };
        let now = Utc::now();
        let record = ProcessedImageRecord {
            id: id.clone(),
            original_id: Some(source.id.clone()),
            path: dest,
            applied: Some(applied),
            film_stock: Some(params.stock),
            effects: AppliedEffects {
                grain: params.grain.is_some(),
                vignette: params.vignette.is_some(),
            },
            processed_time: now,
            expiration_time: expiry_from(now, self.config.storage.ttl_seconds),
        };
        self.record(&processed_key(&id), &record).await;
        info!(id, original = source.id, "image processed");
        Ok(record)
    }

    /// Process every JPEG/PNG directly inside `input_dir` into `output_dir`
    /// as `vintage_<name>`. Per-file failures are logged and skipped.
    pub fn batch(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        options: &ProcessOptions,
    ) -> Result<BatchSummary> {
        if !input_dir.is_dir() {
            return Err(StudioError::Validation(format!(
                "Input directory not found: {}",
                input_dir.display()
            )));
        }
        self.admit()?;
        std::fs::create_dir_all(output_dir)?;

        let mut summary = BatchSummary::default();
        let entries = WalkDir::new(input_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| OutputFormat::from_path(entry.path()).is_some());

        for entry in entries {
            let source = entry.path();
            let Some(name) = batch_output_name(source) else {
                continue;
            };
            let output = output_dir.join(name);
            match process_image(&self.backend, source, &output, options, &self.settings) {
                Ok(_) => {
                    info!(source = %source.display(), "processed");
                    summary.processed.push(output);
                }
                Err(e) => {
                    warn!(source = %source.display(), error = %e, "batch item failed");
                    summary.failed.push((source.to_path_buf(), e.to_string()));
                }
            }
        }
        Ok(summary)
    }

    // =====================================================================
    // Status
    // =====================================================================

    /// Report the active store and memory, and round-trip a short-lived
    /// test key through the store.
    pub async fn status(&self) -> StatusReport {
        let key = format!("test:{}", Uuid::new_v4());
        let value = Utc::now().to_rfc3339();
        let roundtrip = async {
            self.store
                .set(&key, &value, Some(Duration::from_secs(60)))
                .await?;
            self.store.get(&key).await
        };
        let (storage_ok, storage_error) = match roundtrip.await {
            Ok(Some(read)) if read == value => (true, None),
            Ok(_) => (false, Some("test value did not round-trip".to_string())),
            Err(e) => (false, Some(e.to_string())),
        };

        let memory = self.gate.usage();
        StatusReport {
            backend: self.store.kind(),
            memory,
            under_pressure: memory.fraction() >= self.gate.threshold(),
            storage_ok,
            storage_error,
        }
    }
}

async fn served<F>(id: &str, path: PathBuf, filename: F) -> Result<ServedFile>
where
    F: FnOnce(&Path) -> String,
{
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(StudioError::NotFound(id.to_string()));
    }
    Ok(ServedFile {
        filename: filename(&path),
        content_type: content_type(&path),
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::tests::FixedGate;
    use crate::imaging::backend::Dimensions;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{AspectRatio, CropRegion, FilmStock, RustBackend};
    use crate::store::tests::MemoryStore;
    use crate::store::{DiskStore, FallbackStore};
    use crate::test_helpers::{isolated_config, jpeg_bytes, png_bytes};
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        store: Arc<FallbackStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let store = Arc::new(FallbackStore::new(DiskStore::new(tmp.path().join("metadata"))));
            Self { tmp, store }
        }

        fn config(&self) -> AppConfig {
            isolated_config(self.tmp.path())
        }

        fn studio(&self) -> Studio<RustBackend> {
            self.studio_with(RustBackend::new(), FixedGate::relaxed())
        }

        fn studio_with<B: ImageBackend>(&self, backend: B, gate: FixedGate) -> Studio<B> {
            Studio::new(self.config(), self.store.clone(), backend, Arc::new(gate))
        }

        fn workdir_entries(&self) -> usize {
            std::fs::read_dir(self.tmp.path().join("work"))
                .map(|d| d.count())
                .unwrap_or(0)
        }
    }

    fn processed_files(tmp: &TempDir) -> usize {
        std::fs::read_dir(tmp.path().join("processed"))
            .map(|d| d.count())
            .unwrap_or(0)
    }

    // =========================================================================
    // Upload
    // =========================================================================

    #[tokio::test]
    async fn upload_stores_file_and_record() {
        let fx = Fixture::new();
        let studio = fx.studio();

        let record = studio
            .upload_bytes("Holiday.JPG", "image/jpeg", &jpeg_bytes(64, 48))
            .await
            .unwrap();

        assert!(record.path.exists());
        assert_eq!(record.path.extension().unwrap(), "jpg");
        assert!(record.path.file_name().unwrap().to_str().unwrap().starts_with(&record.id));
        assert_eq!(record.original_name.as_deref(), Some("Holiday.JPG"));
        assert_eq!(
            (record.expiration_time - record.upload_time).num_seconds(),
            86_400
        );

        let found = studio.find_image(&record.id).await.unwrap();
        assert_eq!(found, record);
    }

    #[tokio::test]
    async fn upload_rejects_wrong_types() {
        let fx = Fixture::new();
        let studio = fx.studio();

        let gif = b"GIF89a\x01\x00\x01\x00";
        for (name, mime, bytes) in [
            ("a.gif", "image/gif", gif.as_slice()),
            ("a.jpg", "image/png", &jpeg_bytes(8, 8)[..]),
            ("a.png", "image/png", &jpeg_bytes(8, 8)[..]),
            ("a.txt", "text/plain", b"hello".as_slice()),
        ] {
            let err = studio.upload_bytes(name, mime, bytes).await.unwrap_err();
            assert!(matches!(err, StudioError::Validation(_)), "{name} {mime}");
            assert!(!err.is_retryable());
        }
    }

    #[tokio::test]
    async fn upload_rejects_empty_and_oversized() {
        let fx = Fixture::new();
        let mut config = fx.config();
        config.output.max_upload_bytes = 100;
        let studio = Studio::new(
            config,
            fx.store.clone(),
            RustBackend::new(),
            Arc::new(FixedGate::relaxed()),
        );

        let empty = studio.upload_bytes("a.png", "image/png", &[]).await;
        assert!(matches!(empty, Err(StudioError::Validation(_))));

        let big = studio
            .upload_bytes("a.png", "image/png", &png_bytes(64, 64))
            .await;
        assert!(matches!(big, Err(StudioError::Validation(msg)) if msg.contains("100")));
    }

    #[tokio::test]
    async fn upload_strips_metadata_through_backend() {
        let fx = Fixture::new();
        let studio = fx.studio_with(MockBackend::new(), FixedGate::relaxed());

        let record = studio
            .upload_bytes("a.png", "image/png", &png_bytes(16, 16))
            .await
            .unwrap();

        let ops = studio.backend.get_operations();
        assert_eq!(
            ops,
            vec![RecordedOp::StripMetadata(
                record.path.to_string_lossy().to_string()
            )]
        );
    }

    #[tokio::test]
    async fn upload_survives_store_write_failure() {
        let fx = Fixture::new();
        let failing = Arc::new(MemoryStore::new());
        failing.fail();
        let studio = Studio::new(
            fx.config(),
            failing,
            RustBackend::new(),
            Arc::new(FixedGate::relaxed()),
        );

        let record = studio
            .upload_bytes("a.jpg", "image/jpeg", &jpeg_bytes(32, 32))
            .await
            .unwrap();
        assert!(record.path.exists());

        // Reads fail too, so lookup goes straight to the scan
        let found = studio.find_image(&record.id).await.unwrap();
        assert_eq!(found.path, record.path);
    }

    // =========================================================================
    // Lookup and recovery
    // =========================================================================

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let err = studio.find_image("does-not-exist").await.unwrap_err();
        assert!(matches!(err, StudioError::NotFound(id) if id == "does-not-exist"));
    }

    #[tokio::test]
    async fn empty_id_is_validation_error() {
        let fx = Fixture::new();
        let studio = fx.studio();
        assert!(matches!(
            studio.find_processed("").await,
            Err(StudioError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_record_recovered_from_scan_and_reinserted() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let uploads = fx.tmp.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::write(uploads.join("orphan-1234.jpg"), jpeg_bytes(16, 16)).unwrap();

        let record = studio.find_image("orphan-1234").await.unwrap();
        assert_eq!(record.path, uploads.join("orphan-1234.jpg"));
        assert_eq!(record.original_name, None);

        let stored = fx.store.get("image:orphan-1234").await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn expired_record_still_recovers_while_file_exists() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let record = studio
            .upload_bytes("a.jpg", "image/jpeg", &jpeg_bytes(16, 16))
            .await
            .unwrap();

        // Expire the record; the file stays on disk
        fx.store
            .set(&image_key(&record.id), "{}", Some(Duration::ZERO))
            .await
            .unwrap();
        assert!(record.path.exists());

        let recovered = studio.find_image(&record.id).await.unwrap();
        assert_eq!(recovered.path, record.path);
    }

    #[tokio::test]
    async fn preview_reports_content_type() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let record = studio
            .upload_bytes("a.png", "image/png", &png_bytes(16, 16))
            .await
            .unwrap();

        let served = studio.preview(&record.id).await.unwrap();
        assert_eq!(served.content_type, "image/png");
        assert_eq!(served.path, record.path);
    }

    #[tokio::test]
    async fn preview_of_record_without_file_is_not_found() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let record = studio
            .upload_bytes("a.png", "image/png", &png_bytes(16, 16))
            .await
            .unwrap();
        std::fs::remove_file(&record.path).unwrap();

        assert!(matches!(
            studio.preview(&record.id).await,
            Err(StudioError::NotFound(_))
        ));
    }

    // =========================================================================
    // Processing
    // =========================================================================

    #[tokio::test]
    async fn process_writes_result_and_record() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let upload = studio
            .upload_bytes("a.jpg", "image/jpeg", &jpeg_bytes(300, 200))
            .await
            .unwrap();

        let options = ProcessOptions {
            aspect_ratio: AspectRatio::Square,
            film_stock: FilmStock::Portra400,
            add_vignette: true,
            ..Default::default()
        };
        let processed = studio.process(&upload.id, &options).await.unwrap();

        assert_ne!(processed.id, upload.id);
        assert_eq!(processed.original_id.as_deref(), Some(upload.id.as_str()));
        assert_eq!(processed.film_stock, Some(FilmStock::Portra400));
        assert_eq!(
            processed.applied,
            Some(AppliedCrop::AspectRatio(AspectRatio::Square))
        );
        assert!(processed.effects.vignette);
        assert!(!processed.effects.grain);
        assert_eq!(image::image_dimensions(&processed.path).unwrap(), (200, 200));

        let download = studio.download(&processed.id).await.unwrap();
        assert_eq!(download.filename, format!("vintagecam-{}.jpg", processed.id));
        assert_eq!(download.content_type, "image/jpeg");
        assert_eq!(fx.workdir_entries(), 0);
    }

    #[tokio::test]
    async fn custom_crop_recorded_as_clamped_region() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let upload = studio
            .upload_bytes("a.png", "image/png", &png_bytes(100, 80))
            .await
            .unwrap();

        let options = ProcessOptions {
            crop_data: Some(CropRegion {
                x: 50,
                y: 40,
                width: 500,
                height: 500,
            }),
            ..Default::default()
        };
        let processed = studio.process(&upload.id, &options).await.unwrap();
        assert_eq!(
            processed.applied,
            Some(AppliedCrop::CropData(CropRegion {
                x: 50,
                y: 40,
                width: 50,
                height: 40
            }))
        );
        assert_eq!(processed.path.extension().unwrap(), "png");
    }

    #[tokio::test]
    async fn sliver_upload_processes_to_single_pixel() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let upload = studio
            .upload_bytes("sliver.png", "image/png", &png_bytes(1, 1000))
            .await
            .unwrap();

        let options = ProcessOptions {
            aspect_ratio: AspectRatio::Widescreen,
            film_stock: FilmStock::Kodachrome,
            ..Default::default()
        };
        let processed = studio.process(&upload.id, &options).await.unwrap();
        assert_eq!(image::image_dimensions(&processed.path).unwrap(), (1, 1));
        assert_eq!(fx.workdir_entries(), 0);
    }

    #[tokio::test]
    async fn capacity_refusal_is_retryable_and_records_nothing() {
        let fx = Fixture::new();
        let studio = fx.studio_with(RustBackend::new(), FixedGate::saturated());
        let upload = studio
            .upload_bytes("a.jpg", "image/jpeg", &jpeg_bytes(64, 64))
            .await
            .unwrap();

        let err = studio
            .process(&upload.id, &ProcessOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(
            matches!(err, StudioError::Capacity { retry_after } if retry_after == Duration::from_secs(30))
        );
        assert_eq!(processed_files(&fx.tmp), 0);
    }

    #[tokio::test]
    async fn invalid_crop_fails_without_record_and_cleans_up() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let upload = studio
            .upload_bytes("a.jpg", "image/jpeg", &jpeg_bytes(64, 64))
            .await
            .unwrap();

        let options = ProcessOptions {
            crop_data: Some(CropRegion {
                x: 0,
                y: 0,
                width: 5,
                height: 5,
            }),
            ..Default::default()
        };
        let err = studio.process(&upload.id, &options).await.unwrap_err();
        assert!(matches!(
            err,
            StudioError::Processing(BackendError::InvalidCrop { .. })
        ));
        assert_eq!(processed_files(&fx.tmp), 0);
        assert_eq!(fx.workdir_entries(), 0);
    }

    #[tokio::test]
    async fn process_unknown_image_is_not_found() {
        let fx = Fixture::new();
        let studio = fx.studio();
        assert!(matches!(
            studio.process("nope", &ProcessOptions::default()).await,
            Err(StudioError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn source_deleted_after_upload_is_processing_error() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let upload = studio
            .upload_bytes("a.jpg", "image/jpeg", &jpeg_bytes(32, 32))
            .await
            .unwrap();
        std::fs::remove_file(&upload.path).unwrap();

        let err = studio
            .process(&upload.id, &ProcessOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StudioError::Processing(BackendError::SourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_requests_produce_two_records() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let upload = studio
            .upload_bytes("a.jpg", "image/jpeg", &jpeg_bytes(48, 48))
            .await
            .unwrap();

        let a = studio.process(&upload.id, &ProcessOptions::default()).await.unwrap();
        let b = studio.process(&upload.id, &ProcessOptions::default()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.path, b.path);
        assert_eq!(processed_files(&fx.tmp), 2);
    }

    #[tokio::test]
    async fn process_passes_resolved_params_to_backend() {
        let fx = Fixture::new();
        let studio = fx.studio_with(
            MockBackend::with_dimensions(vec![Dimensions {
                width: 1200,
                height: 800,
            }]),
            FixedGate::relaxed(),
        );
        let upload = studio
            .upload_bytes("a.jpg", "image/jpeg", &jpeg_bytes(16, 16))
            .await
            .unwrap();

        let options = ProcessOptions {
            film_stock: FilmStock::Velvia,
            add_grain: true,
            ..Default::default()
        };
        studio.process(&upload.id, &options).await.unwrap();

        let render = studio
            .backend
            .get_operations()
            .into_iter()
            .find(|op| matches!(op, RecordedOp::Render { .. }))
            .unwrap();
        assert!(matches!(
            render,
            RecordedOp::Render {
                crop: CropRegion {
                    x: 200,
                    y: 0,
                    width: 800,
                    height: 800
                },
                stock: FilmStock::Velvia,
                grain: true,
                vignette: false,
                quality: 90,
                ..
            }
        ));
    }

    // =========================================================================
    // Batch
    // =========================================================================

    #[test]
    fn batch_processes_images_and_skips_others() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let input = fx.tmp.path().join("in");
        let output = fx.tmp.path().join("out");
        std::fs::create_dir_all(input.join("nested")).unwrap();
        std::fs::write(input.join("a.jpg"), jpeg_bytes(40, 30)).unwrap();
        std::fs::write(input.join("b.PNG"), png_bytes(30, 40)).unwrap();
        std::fs::write(input.join("broken.jpg"), b"not an image").unwrap();
        std::fs::write(input.join("notes.txt"), b"hello").unwrap();
        std::fs::write(input.join("nested/c.jpg"), jpeg_bytes(20, 20)).unwrap();

        let summary = studio
            .batch(&input, &output, &ProcessOptions::default())
            .unwrap();

        assert_eq!(
            summary.processed,
            vec![output.join("vintage_a.jpg"), output.join("vintage_b.PNG")]
        );
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].0.ends_with("broken.jpg"));
        assert!(!output.join("vintage_broken.jpg").exists());
        assert_eq!(image::image_dimensions(output.join("vintage_a.jpg")).unwrap(), (30, 30));
    }

    #[test]
    fn batch_missing_input_dir_is_validation_error() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let result = studio.batch(
            &fx.tmp.path().join("missing"),
            &fx.tmp.path().join("out"),
            &ProcessOptions::default(),
        );
        assert!(matches!(result, Err(StudioError::Validation(_))));
    }

    // =========================================================================
    // Status
    // =========================================================================

    #[tokio::test]
    async fn status_roundtrips_test_key() {
        let fx = Fixture::new();
        let studio = fx.studio();
        let report = studio.status().await;
        assert_eq!(report.backend, "file");
        assert!(report.storage_ok);
        assert!(report.storage_error.is_none());
        assert!(!report.under_pressure);
    }

    #[tokio::test]
    async fn status_reports_failing_store() {
        let fx = Fixture::new();
        let failing = Arc::new(MemoryStore::new());
        failing.fail();
        let studio = Studio::new(
            fx.config(),
            failing,
            RustBackend::new(),
            Arc::new(FixedGate::saturated()),
        );
        let report = studio.status().await;
        assert!(!report.storage_ok);
        assert!(report.storage_error.is_some());
        assert!(report.under_pressure);
    }
}

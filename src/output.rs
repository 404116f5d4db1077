//! CLI output formatting for every command.
//!
//! Output is **record-first**: the id a user passes to the next command is
//! always the header line, with paths and settings indented underneath.
//!
//! ## Upload
//!
//! ```text
//! Uploaded 3f2a9c1e-…
//!     Name: holiday.jpg (image/jpeg, 48213 bytes)
//!     Stored: uploads/3f2a9c1e-….jpg
//!     Expires: 2026-10-17 09:12:44 UTC
//! ```
//!
//! ## Process
//!
//! ```text
//! Processed 9b01d7aa-… from 3f2a9c1e-…
//!     Film stock: velvia
//!     Crop: 1:1
//!     Effects: grain, vignette
//!     Stored: processed/9b01d7aa-….jpg
//!     Download as: vintagecam-9b01d7aa-….jpg
//! ```
//!
//! ## Batch
//!
//! ```text
//! vintage_a.jpg
//! FAILED broken.jpg: Decode error: …
//!
//! Processed 1 image, 1 failed
//! ```
//!
//! Each command has a pure `format_*` function returning lines and a
//! `print_*` wrapper that writes them to stdout.

use crate::studio::{BatchSummary, ServedFile, StatusReport};
use crate::types::{AppliedCrop, AppliedEffects, ImageRecord, ProcessedImageRecord};
use chrono::{DateTime, Utc};
use std::path::Path;

fn indent(line: impl AsRef<str>) -> String {
    format!("    {}", line.as_ref())
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn effects_line(effects: &AppliedEffects) -> String {
    let names: Vec<&str> = [(effects.grain, "grain"), (effects.vignette, "vignette")]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn crop_line(crop: &AppliedCrop) -> String {
    match crop {
        AppliedCrop::AspectRatio(ratio) => ratio.to_string(),
        AppliedCrop::CropData(r) => format!("{}x{} at ({}, {})", r.width, r.height, r.x, r.y),
    }
}

// ============================================================================
// Records
// ============================================================================

pub fn format_upload(record: &ImageRecord) -> Vec<String> {
    let mut lines = vec![format!("Uploaded {}", record.id)];
    if let Some(name) = &record.original_name {
        let mut detail = name.clone();
        match (&record.mime_type, record.size) {
            (Some(mime), Some(size)) => detail.push_str(&format!(" ({mime}, {size} bytes)")),
            (Some(mime), None) => detail.push_str(&format!(" ({mime})")),
            (None, Some(size)) => detail.push_str(&format!(" ({size} bytes)")),
            (None, None) => {}
        }
        lines.push(indent(format!("Name: {detail}")));
    }
    lines.push(indent(format!("Stored: {}", record.path.display())));
    lines.push(indent(format!("Expires: {}", timestamp(&record.expiration_time))));
    lines
}

pub fn format_processed(record: &ProcessedImageRecord, download: Option<&ServedFile>) -> Vec<String> {
    let header = match &record.original_id {
        Some(original) => format!("Processed {} from {original}", record.id),
        None => format!("Processed {}", record.id),
    };
    let mut lines = vec![header];
    if let Some(stock) = record.film_stock {
        lines.push(indent(format!("Film stock: {stock}")));
    }
    if let Some(crop) = &record.applied {
        lines.push(indent(format!("Crop: {}", crop_line(crop))));
    }
    lines.push(indent(format!("Effects: {}", effects_line(&record.effects))));
    lines.push(indent(format!("Stored: {}", record.path.display())));
    if let Some(file) = download {
        lines.push(indent(format!("Download as: {}", file.filename)));
    }
    lines.push(indent(format!("Expires: {}", timestamp(&record.expiration_time))));
    lines
}

pub fn format_served(file: &ServedFile) -> Vec<String> {
    vec![
        file.path.display().to_string(),
        indent(format!("Name: {}", file.filename)),
        indent(format!("Content-Type: {}", file.content_type)),
    ]
}

// ============================================================================
// Batch and status
// ============================================================================

pub fn format_batch(summary: &BatchSummary) -> Vec<String> {
    let mut lines: Vec<String> = summary.processed.iter().map(|p| file_name(p)).collect();
    for (source, error) in &summary.failed {
        lines.push(format!("FAILED {}: {error}", file_name(source)));
    }
    lines.push(String::new());
    lines.push(format!(
        "Processed {}, {} failed",
        plural(summary.processed.len(), "image"),
        summary.failed.len()
    ));
    lines
}

pub fn format_status(report: &StatusReport) -> Vec<String> {
    const MIB: u64 = 1024 * 1024;
    let mut lines = vec![format!("Storage backend: {}", report.backend)];
    match &report.storage_error {
        None if report.storage_ok => lines.push(indent("Round-trip: ok")),
        None => lines.push(indent("Round-trip: failed")),
        Some(error) => lines.push(indent(format!("Round-trip: failed ({error})"))),
    }
    lines.push(format!(
        "Memory: {} / {} MiB ({:.1}%)",
        report.memory.used / MIB,
        report.memory.total / MIB,
        report.memory.fraction() * 100.0
    ));
    if report.under_pressure {
        lines.push(indent("Under pressure: new work is refused"));
    }
    lines
}

// ============================================================================
// Printing
// ============================================================================

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

pub fn print_upload(record: &ImageRecord) {
    print_lines(format_upload(record));
}

pub fn print_processed(record: &ProcessedImageRecord, download: Option<&ServedFile>) {
    print_lines(format_processed(record, download));
}

pub fn print_served(file: &ServedFile) {
    print_lines(format_served(file));
}

pub fn print_batch(summary: &BatchSummary) {
    print_lines(format_batch(summary));
}

pub fn print_status(report: &StatusReport) {
    print_lines(format_status(report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::MemoryUsage;
    use crate::imaging::{AspectRatio, CropRegion, FilmStock};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, 12, 44).unwrap()
    }

    fn processed(applied: Option<AppliedCrop>) -> ProcessedImageRecord {
        ProcessedImageRecord {
            id: "p1".into(),
            original_id: Some("u1".into()),
            path: PathBuf::from("processed/p1.jpg"),
            applied,
            film_stock: Some(FilmStock::Velvia),
            effects: AppliedEffects {
                grain: true,
                vignette: true,
            },
            processed_time: fixed_time(),
            expiration_time: fixed_time(),
        }
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "image"), "1 image");
        assert_eq!(plural(0, "image"), "0 images");
    }

    #[test]
    fn effects_none_and_both() {
        assert_eq!(effects_line(&AppliedEffects::default()), "none");
        assert_eq!(
            effects_line(&AppliedEffects {
                grain: true,
                vignette: true
            }),
            "grain, vignette"
        );
    }

    // =========================================================================
    // Records
    // =========================================================================

    #[test]
    fn upload_output() {
        let record = ImageRecord {
            id: "u1".into(),
            path: PathBuf::from("uploads/u1.jpg"),
            original_name: Some("holiday.jpg".into()),
            mime_type: Some("image/jpeg".into()),
            size: Some(42),
            upload_time: fixed_time(),
            expiration_time: fixed_time(),
        };
        assert_eq!(
            format_upload(&record),
            vec![
                "Uploaded u1",
                "    Name: holiday.jpg (image/jpeg, 42 bytes)",
                "    Stored: uploads/u1.jpg",
                "    Expires: 2026-10-17 09:12:44 UTC",
            ]
        );
    }

    #[test]
    fn recovered_upload_has_no_name_line() {
        let record = ImageRecord::recovered("u1", "uploads/u1.jpg".into(), fixed_time(), 0);
        let lines = format_upload(&record);
        assert_eq!(lines.len(), 3);
        assert!(!lines.iter().any(|l| l.contains("Name:")));
    }

    #[test]
    fn processed_output_with_ratio() {
        let served = ServedFile {
            path: PathBuf::from("processed/p1.jpg"),
            filename: "vintagecam-p1.jpg".into(),
            content_type: "image/jpeg",
        };
        let lines = format_processed(
            &processed(Some(AppliedCrop::AspectRatio(AspectRatio::Square))),
            Some(&served),
        );
        assert_eq!(lines[0], "Processed p1 from u1");
        assert!(lines.contains(&"    Film stock: velvia".to_string()));
        assert!(lines.contains(&"    Crop: 1:1".to_string()));
        assert!(lines.contains(&"    Effects: grain, vignette".to_string()));
        assert!(lines.contains(&"    Download as: vintagecam-p1.jpg".to_string()));
    }

    #[test]
    fn processed_output_with_custom_crop() {
        let lines = format_processed(
            &processed(Some(AppliedCrop::CropData(CropRegion {
                x: 5,
                y: 6,
                width: 100,
                height: 50,
            }))),
            None,
        );
        assert!(lines.contains(&"    Crop: 100x50 at (5, 6)".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Download as")));
    }

    // =========================================================================
    // Batch and status
    // =========================================================================

    #[test]
    fn batch_summary_lines() {
        let summary = BatchSummary {
            processed: vec![PathBuf::from("/out/vintage_a.jpg")],
            failed: vec![(PathBuf::from("/in/broken.jpg"), "Decode error: bad".into())],
        };
        assert_eq!(
            format_batch(&summary),
            vec![
                "vintage_a.jpg",
                "FAILED broken.jpg: Decode error: bad",
                "",
                "Processed 1 image, 1 failed",
            ]
        );
    }

    #[test]
    fn empty_batch() {
        let lines = format_batch(&BatchSummary::default());
        assert_eq!(lines.last().unwrap(), "Processed 0 images, 0 failed");
    }

    #[test]
    fn status_lines() {
        let report = StatusReport {
            backend: "redis",
            memory: MemoryUsage {
                total: 8 * 1024 * 1024 * 1024,
                used: 2 * 1024 * 1024 * 1024,
            },
            under_pressure: false,
            storage_ok: true,
            storage_error: None,
        };
        assert_eq!(
            format_status(&report),
            vec![
                "Storage backend: redis",
                "    Round-trip: ok",
                "Memory: 2048 / 8192 MiB (25.0%)",
            ]
        );
    }

    #[test]
    fn status_failure_and_pressure() {
        let report = StatusReport {
            backend: "file",
            memory: MemoryUsage {
                total: 100,
                used: 99,
            },
            under_pressure: true,
            storage_ok: false,
            storage_error: Some("disk full".into()),
        };
        let lines = format_status(&report);
        assert_eq!(lines[1], "    Round-trip: failed (disk full)");
        assert!(lines.last().unwrap().contains("Under pressure"));
    }
}

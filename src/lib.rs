//! # VintageCam
//!
//! Turns ordinary photos into film-look images: crop to an aspect ratio or a
//! custom region, develop with one of six film-stock profiles, then add
//! optional grain and vignette. Uploads and results are plain files on disk
//! with short-lived JSON metadata records alongside.
//!
//! # Architecture
//!
//! ```text
//! upload ─▶ uploads/<id><ext>          image:<id>       ┐
//!                                                        ├─ metadata store
//! process ─▶ crop ─▶ profile ─▶ grain ─▶ vignette        │  (redis, or files)
//!           ─▶ processed/<pid><ext>    processed:<pid>  ┘
//! ```
//!
//! The pixel pipeline in [`imaging`] is synchronous and pure apart from file
//! I/O at its edges. Everything that waits on storage is async and lives in
//! [`studio`] and [`store`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Crop geometry, film-stock profiles, color stages, grain, vignette, encode |
//! | [`studio`] | Upload, process, lookup with disk recovery, batch, status |
//! | [`store`] | Metadata stores (redis, files) and the fallback selector between them |
//! | [`admission`] | Memory-pressure gate checked before processing |
//! | [`config`] | `config.toml` loading, validation and stock defaults |
//! | [`types`] | Metadata records and their store keys |
//! | [`naming`] | File naming, formats and the id-prefix directory scan |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Files Are the Source of Truth
//!
//! Metadata records expire after 24 hours and the store may vanish entirely,
//! but image files are never deleted. Any lookup that misses the store scans
//! the relevant directory for a file named after the id and rebuilds a minimal
//! record, so an id keeps working as long as its file exists.
//!
//! ## Network Store With File Fallback
//!
//! At startup the store tries redis once, bounded by a timeout and checked
//! with a verification write. Until then, and forever after a failure, the
//! file store serves every request. A network error at runtime demotes to
//! files permanently; there is no promotion back.
//!
//! ## Same Format Out as In
//!
//! Results keep the source's extension and encoding. JPEG quality comes from
//! config; PNG is lossless.

pub mod admission;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod store;
pub mod studio;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

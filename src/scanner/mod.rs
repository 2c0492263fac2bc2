//! Scan orchestration: the per-file engine, the directory walker, and the
//! report-producing operations invoked by front-ends.

pub mod engine;
pub mod walker;

pub use engine::ScanEngine;
pub use walker::DirectoryWalker;

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{ScanMode, ScanReport, StorageKind};
use crate::storage::StorageBackend;
use std::path::Path;
use std::sync::Arc;

/// Scan a single file and persist the resulting report.
///
/// An unreadable target surfaces directly as an error here; only directory
/// scans degrade read failures into per-file `error` results.
pub async fn scan_file(
    backend: &dyn StorageBackend,
    storage: StorageKind,
    config: &Config,
    path: &Path,
    heuristics: bool,
) -> Result<ScanReport> {
    if !path.is_file() {
        return Err(Error::Argument(format!(
            "Target path is not a readable file: {}",
            path.display()
        )));
    }

    let signatures = backend.load_signatures()?;
    log::debug!("Loaded {} signature hashes", signatures.len());

    let engine = ScanEngine::new(signatures, heuristics, &config.scan);
    let result = engine.scan_path(path)?;

    let report = ScanReport::assemble(path, ScanMode::File, heuristics, storage, vec![result]);
    backend.append_report(&report)?;
    Ok(report)
}

/// Scan a directory tree and persist the resulting report.
pub async fn scan_directory(
    backend: &dyn StorageBackend,
    storage: StorageKind,
    config: &Config,
    path: &Path,
    recursive: bool,
    heuristics: bool,
) -> Result<ScanReport> {
    if !path.is_dir() {
        return Err(Error::Argument(format!(
            "Target path is not a readable directory: {}",
            path.display()
        )));
    }

    let signatures = backend.load_signatures()?;
    log::debug!("Loaded {} signature hashes", signatures.len());

    let engine = Arc::new(ScanEngine::new(signatures, heuristics, &config.scan));
    let walker = DirectoryWalker::new(engine, &config.scan);
    let results = walker.scan_directory(path, recursive).await?;

    let report = ScanReport::assemble(path, ScanMode::Directory, heuristics, storage, results);
    log::info!(
        "Scan completed: {} files scanned, {} flagged",
        report.summary.files_scanned,
        report.summary.flagged
    );

    backend.append_report(&report)?;
    Ok(report)
}

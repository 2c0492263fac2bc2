//! Flat-file storage backend.
//!
//! Signatures live in `signatures.json`, history in `scan_history.json`.
//! Mutations write a sibling temp file and rename it into place, so a
//! crash mid-write leaves either the old or the new document, never a
//! truncation. A `fs2` advisory lock serializes writers.

use crate::core::error::{Error, Result};
use crate::core::types::{MergeSummary, ScanReport};
use crate::detection::signature::{SignatureDocument, SignatureSet};
use crate::storage::{StorageBackend, HISTORY_READ_LIMIT};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Flat-file backend rooted at the data directory.
pub struct JsonBackend {
    data_dir: PathBuf,
}

/// RAII guard for the backend's exclusive writer lock.
struct WriteLock {
    file: File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl JsonBackend {
    /// Open (and if needed create) the backend under `data_dir`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| Error::DirectoryAccess {
            path: data_dir.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    fn signatures_path(&self) -> PathBuf {
        self.data_dir.join("signatures.json")
    }

    fn history_path(&self) -> PathBuf {
        self.data_dir.join("scan_history.json")
    }

    fn lock_path(&self) -> PathBuf {
        self.data_dir.join(".storage.lock")
    }

    /// Take the exclusive writer lock; released when the guard drops.
    fn lock_exclusive(&self) -> Result<WriteLock> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(self.lock_path())
            .map_err(|e| Error::file_write(self.lock_path(), e))?;

        file.lock_exclusive()
            .map_err(|e| Error::file_write(self.lock_path(), e))?;

        Ok(WriteLock { file })
    }

    /// Write `contents` to `path` via a sibling temp file and rename.
    fn write_atomic(path: &Path, contents: &str) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents).map_err(|e| Error::file_write(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| Error::file_write(path, e))
    }

    fn persist_signatures(&self, set: &SignatureSet) -> Result<()> {
        let doc = set.to_document();
        let contents = serde_json::to_string_pretty(&doc)?;
        Self::write_atomic(&self.signatures_path(), &contents)
    }

    /// Read the raw history array, oldest first.
    fn read_history_values(&self) -> Result<Vec<serde_json::Value>> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, e))?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::store_corrupt(&path, format!("history log does not parse: {}", e)))
    }
}

impl JsonBackend {
    /// Read the signature store, seeding the default set on first use.
    ///
    /// The seeding write is atomic, so concurrent first loads converge on
    /// the same content without holding the writer lock.
    fn read_or_seed_signatures(&self) -> Result<SignatureSet> {
        let path = self.signatures_path();

        if !path.exists() {
            let defaults = SignatureSet::default_set();
            self.persist_signatures(&defaults)?;
            log::info!("Seeded default signature set at {}", path.display());
            return Ok(defaults);
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, e))?;
        let doc: SignatureDocument = serde_json::from_str(&contents).map_err(|e| {
            Error::store_corrupt(&path, format!("signature store does not parse: {}", e))
        })?;

        SignatureSet::from_document(doc)
            .map_err(|e| Error::store_corrupt(&path, format!("signature store invalid: {}", e)))
    }
}

impl StorageBackend for JsonBackend {
    fn load_signatures(&self) -> Result<SignatureSet> {
        self.read_or_seed_signatures()
    }

    fn merge_signatures(&self, incoming: &SignatureSet) -> Result<MergeSummary> {
        let _lock = self.lock_exclusive()?;

        // Reload under the lock so concurrent updates serialize cleanly.
        let mut current = self.read_or_seed_signatures()?;
        let summary = current.merge(incoming);
        self.persist_signatures(&current)?;

        log::info!(
            "Merged signature update: {} added, {} already present, {} total",
            summary.added,
            summary.skipped,
            summary.total
        );
        Ok(summary)
    }

    fn append_report(&self, report: &ScanReport) -> Result<()> {
        let _lock = self.lock_exclusive()?;

        let mut entries = self.read_history_values()?;
        entries.push(serde_json::to_value(report)?);

        let contents = serde_json::to_string_pretty(&entries)?;
        Self::write_atomic(&self.history_path(), &contents)
    }

    fn read_history(&self) -> Result<Vec<ScanReport>> {
        let path = self.history_path();
        let values = self.read_history_values()?;

        let mut reports = Vec::with_capacity(values.len());
        for value in values {
            let report: ScanReport = serde_json::from_value(value).map_err(|e| {
                Error::store_corrupt(&path, format!("history entry does not parse: {}", e))
            })?;
            reports.push(report);
        }

        reports.reverse();
        reports.truncate(HISTORY_READ_LIMIT);
        Ok(reports)
    }
}

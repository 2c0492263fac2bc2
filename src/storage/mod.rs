//! Persistent storage behind a pluggable backend.
//!
//! One capability surface, two implementations: a flat-file backend (JSON
//! documents, write-new-then-rename) and an embedded-database backend
//! (SQLite, transactional). Selection is driven by configuration, never by
//! runtime type inspection.

pub mod json;
pub mod sqlite;

pub use json::JsonBackend;
pub use sqlite::SqliteBackend;

pub use crate::core::types::StorageKind;

use crate::core::error::Result;
use crate::core::types::{MergeSummary, ScanReport};
use crate::detection::signature::SignatureSet;
use std::path::Path;

/// Newest-first cap on history reads.
pub const HISTORY_READ_LIMIT: usize = 200;

/// Storage capability shared by both backends.
///
/// Signature mutation and history appends hold exclusive access for the
/// duration of the write (advisory lock or transaction); reads observe the
/// last fully-committed state.
pub trait StorageBackend: Send + Sync {
    /// Load the signature set, seeding the built-in default on first use.
    ///
    /// Fails with `StoreCorrupt` when the persisted set does not parse;
    /// there is no silent fallback to an empty set.
    fn load_signatures(&self) -> Result<SignatureSet>;

    /// Merge an already-validated incoming set into the store, atomically.
    fn merge_signatures(&self, incoming: &SignatureSet) -> Result<MergeSummary>;

    /// Append one completed report to the history log. Entries are never
    /// edited or deleted.
    fn append_report(&self, report: &ScanReport) -> Result<()>;

    /// Read persisted reports, newest first, capped at [`HISTORY_READ_LIMIT`].
    fn read_history(&self) -> Result<Vec<ScanReport>>;
}

/// Open the backend selected by configuration.
pub fn open_backend(kind: StorageKind, data_dir: &Path) -> Result<Box<dyn StorageBackend>> {
    match kind {
        StorageKind::Json => Ok(Box::new(JsonBackend::new(data_dir)?)),
        StorageKind::Sqlite => Ok(Box::new(SqliteBackend::open(data_dir)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ScanMode, ScanResult};
    use tempfile::TempDir;

    fn sample_report(storage: StorageKind) -> ScanReport {
        ScanReport::assemble(
            Path::new("/tmp/sample.txt"),
            ScanMode::File,
            true,
            storage,
            vec![ScanResult::clean("/tmp/sample.txt", "ab".repeat(32))],
        )
    }

    /// Both backends satisfy the same contract.
    fn exercise_backend(backend: &dyn StorageBackend, kind: StorageKind) {
        // Seeded on first load
        let set = backend.load_signatures().unwrap();
        assert_eq!(set.len(), 3);

        // Merge is atomic and idempotent
        let incoming = SignatureSet::parse(&format!(
            r#"{{ "version": "9.9", "updated": "2025-07-01",
                 "hashes": {{ "sha256": ["{}"] }} }}"#,
            "d".repeat(64)
        ))
        .unwrap();

        let summary = backend.merge_signatures(&incoming).unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.total, 4);

        let summary = backend.merge_signatures(&incoming).unwrap();
        assert_eq!(summary.added, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total, 4);

        let reloaded = backend.load_signatures().unwrap();
        assert!(reloaded.contains(&"d".repeat(64)));
        assert_eq!(reloaded.version, "9.9");

        // History is append-only, newest first
        assert!(backend.read_history().unwrap().is_empty());
        backend.append_report(&sample_report(kind)).unwrap();
        backend.append_report(&sample_report(kind)).unwrap();

        let history = backend.read_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].summary.files_scanned, 1);
    }

    #[test]
    fn test_json_backend_contract() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(StorageKind::Json, dir.path()).unwrap();
        exercise_backend(backend.as_ref(), StorageKind::Json);
    }

    #[test]
    fn test_sqlite_backend_contract() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(StorageKind::Sqlite, dir.path()).unwrap();
        exercise_backend(backend.as_ref(), StorageKind::Sqlite);
    }
}

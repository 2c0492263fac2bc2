//! Embedded-database storage backend (SQLite).
//!
//! Signatures and history share one database file; every mutation runs in
//! a transaction, so a failed merge leaves the store untouched.

use crate::core::error::{Error, Result};
use crate::core::types::{MergeSummary, ScanReport};
use crate::detection::signature::{HashBlock, SignatureDocument, SignatureSet};
use crate::storage::{StorageBackend, HISTORY_READ_LIMIT};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// SQL schema version for migrations.
const SCHEMA_VERSION: u32 = 1;

/// SQLite-backed storage.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteBackend {
    /// Open or create the database under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| Error::DirectoryAccess {
            path: data_dir.to_path_buf(),
            source: e,
        })?;

        let path = data_dir.join("ferroscan.db");
        let conn = Connection::open(&path)
            .map_err(|e| Error::Database(format!("Failed to open database: {}", e)))?;

        let backend = Self {
            conn: Mutex::new(conn),
            path,
        };

        backend.initialize_schema()?;
        Ok(backend)
    }

    /// Get the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::Database(format!("Failed to acquire database lock: {}", e)))
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS signatures (
                hash TEXT PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS scans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                target TEXT NOT NULL,
                mode TEXT NOT NULL,
                heuristics_enabled INTEGER NOT NULL,
                storage TEXT NOT NULL,
                files_scanned INTEGER NOT NULL,
                flagged INTEGER NOT NULL,
                report_json TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| Error::Database(format!("Failed to create schema: {}", e)))?;

        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| Error::Database(format!("Failed to record schema version: {}", e)))?;

        // Seed the default set on first use
        let seeded: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| Error::Database(format!("Failed to query metadata: {}", e)))?;

        if seeded.is_none() {
            drop(conn);
            self.store_set(&SignatureSet::default_set())?;
            log::info!("Seeded default signature set in {}", self.path.display());
        }

        Ok(())
    }

    /// Replace the stored set's hashes and metadata in one transaction.
    fn store_set(&self, set: &SignatureSet) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM signatures", [])?;
        for hash in set.iter() {
            tx.execute(
                "INSERT OR IGNORE INTO signatures (hash) VALUES (?1)",
                params![hash],
            )?;
        }
        Self::write_meta(&tx, set)?;

        tx.commit()?;
        Ok(())
    }

    fn write_meta(tx: &rusqlite::Transaction<'_>, set: &SignatureSet) -> Result<()> {
        let doc = set.to_document();
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?1)",
            params![doc.version],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('updated', ?1)",
            params![doc.updated.to_string()],
        )?;
        if let Some(notes) = &doc.hashes.notes {
            tx.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES ('notes', ?1)",
                params![notes],
            )?;
        }
        Ok(())
    }

    fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::Database(format!("Failed to query metadata: {}", e)))
    }
}

impl StorageBackend for SqliteBackend {
    fn load_signatures(&self) -> Result<SignatureSet> {
        let conn = self.lock()?;

        let version = Self::read_meta(&conn, "version")?
            .ok_or_else(|| Error::store_corrupt(&self.path, "signature metadata missing"))?;
        let updated_raw = Self::read_meta(&conn, "updated")?
            .ok_or_else(|| Error::store_corrupt(&self.path, "signature metadata missing"))?;
        let updated: NaiveDate = updated_raw.parse().map_err(|_| {
            Error::store_corrupt(&self.path, format!("invalid updated date {:?}", updated_raw))
        })?;
        let notes = Self::read_meta(&conn, "notes")?;

        let mut stmt = conn
            .prepare("SELECT hash FROM signatures ORDER BY hash")
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;
        let hashes: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| Error::Database(format!("Failed to query signatures: {}", e)))?
            .collect::<rusqlite::Result<_>>()
            .map_err(|e| Error::Database(format!("Failed to read signature row: {}", e)))?;

        let doc = SignatureDocument {
            version,
            updated,
            hashes: HashBlock {
                sha256: hashes,
                notes,
            },
        };

        SignatureSet::from_document(doc).map_err(|e| {
            Error::store_corrupt(&self.path, format!("signature store invalid: {}", e))
        })
    }

    fn merge_signatures(&self, incoming: &SignatureSet) -> Result<MergeSummary> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut added = 0usize;
        let mut skipped = 0usize;
        for hash in incoming.iter() {
            let changed = tx.execute(
                "INSERT OR IGNORE INTO signatures (hash) VALUES (?1)",
                params![hash],
            )?;
            if changed > 0 {
                added += 1;
            } else {
                skipped += 1;
            }
        }

        Self::write_meta(&tx, incoming)?;

        let total: i64 =
            tx.query_row("SELECT COUNT(*) FROM signatures", [], |row| row.get(0))?;

        tx.commit()?;

        log::info!(
            "Merged signature update: {} added, {} already present, {} total",
            added,
            skipped,
            total
        );
        Ok(MergeSummary {
            added,
            skipped,
            total: total as usize,
        })
    }

    fn append_report(&self, report: &ScanReport) -> Result<()> {
        let conn = self.lock()?;
        let report_json = serde_json::to_string(report)?;

        conn.execute(
            "INSERT INTO scans (
                timestamp, target, mode, heuristics_enabled, storage,
                files_scanned, flagged, report_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                report.timestamp.to_rfc3339(),
                report.target.to_string_lossy().into_owned(),
                report.mode.to_string(),
                report.heuristics_enabled as i32,
                report.storage.as_str(),
                report.summary.files_scanned as i64,
                report.summary.flagged as i64,
                report_json,
            ],
        )
        .map_err(|e| Error::Database(format!("Failed to append report: {}", e)))?;

        Ok(())
    }

    fn read_history(&self) -> Result<Vec<ScanReport>> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT report_json FROM scans ORDER BY id DESC LIMIT ?1")
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let rows: Vec<String> = stmt
            .query_map(params![HISTORY_READ_LIMIT as i64], |row| row.get(0))
            .map_err(|e| Error::Database(format!("Failed to query history: {}", e)))?
            .collect::<rusqlite::Result<_>>()
            .map_err(|e| Error::Database(format!("Failed to read history row: {}", e)))?;

        let mut reports = Vec::with_capacity(rows.len());
        for raw in rows {
            let report: ScanReport = serde_json::from_str(&raw).map_err(|e| {
                Error::store_corrupt(&self.path, format!("history entry does not parse: {}", e))
            })?;
            reports.push(report);
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ScanMode, ScanResult, StorageKind};
    use tempfile::TempDir;

    fn report_for(target: &str) -> ScanReport {
        ScanReport::assemble(
            Path::new(target),
            ScanMode::Directory,
            false,
            StorageKind::Sqlite,
            vec![ScanResult::clean(
                format!("{}/file.txt", target),
                "ef".repeat(32),
            )],
        )
    }

    #[test]
    fn test_open_seeds_defaults() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::open(dir.path()).unwrap();

        let set = backend.load_signatures().unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.version, "1.0");
    }

    #[test]
    fn test_reopen_preserves_state() {
        let dir = TempDir::new().unwrap();

        {
            let backend = SqliteBackend::open(dir.path()).unwrap();
            let incoming = SignatureSet::parse(&format!(
                r#"{{ "version": "3.0", "updated": "2025-03-03",
                     "hashes": {{ "sha256": ["{}"] }} }}"#,
                "f".repeat(64)
            ))
            .unwrap();
            backend.merge_signatures(&incoming).unwrap();
        }

        let backend = SqliteBackend::open(dir.path()).unwrap();
        let set = backend.load_signatures().unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.version, "3.0");
        assert!(set.contains(&"f".repeat(64)));
    }

    #[test]
    fn test_history_newest_first() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::open(dir.path()).unwrap();

        backend.append_report(&report_for("/first")).unwrap();
        backend.append_report(&report_for("/second")).unwrap();

        let history = backend.read_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].target, PathBuf::from("/second"));
        assert_eq!(history[1].target, PathBuf::from("/first"));
    }

    #[test]
    fn test_report_round_trip_keeps_results() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::open(dir.path()).unwrap();

        let report = report_for("/scanned");
        backend.append_report(&report).unwrap();

        let history = backend.read_history().unwrap();
        assert_eq!(history[0].results.len(), 1);
        assert_eq!(history[0].results[0].sha256, report.results[0].sha256);
    }
}

//! Core type definitions used throughout ferroscan.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Verdict status for a single scanned file.
///
/// Exactly one status is assigned per file, following the fixed precedence
/// EICAR > signature > heuristic > clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// No signature match and no heuristic finding
    Clean,
    /// SHA-256 present in the loaded signature set
    SignatureMatch,
    /// One or more heuristic rules triggered
    HeuristicFlag,
    /// The EICAR test file (harmless, industry-standard)
    EicarTest,
    /// The file could not be read
    Error,
}

impl ScanStatus {
    /// Get string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Clean => "clean",
            ScanStatus::SignatureMatch => "signature_match",
            ScanStatus::HeuristicFlag => "heuristic_flag",
            ScanStatus::EicarTest => "eicar_test",
            ScanStatus::Error => "error",
        }
    }

    /// Whether this status counts toward the report's `flagged` total.
    pub fn is_flagged(&self) -> bool {
        !matches!(self, ScanStatus::Clean)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scan invocation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Single-file scan
    File,
    /// Directory scan (optionally recursive)
    Directory,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::File => write!(f, "file"),
            ScanMode::Directory => write!(f, "directory"),
        }
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Flat-file backend (JSON documents under the data directory)
    Json,
    /// Embedded database backend (SQLite)
    Sqlite,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Json => "json",
            StorageKind::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The verdict for one scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Path of the scanned file
    pub path: PathBuf,
    /// Verdict status
    pub status: ScanStatus,
    /// Risk score, 0-100
    pub risk_score: u8,
    /// SHA-256 of the full content; absent when the file was unreadable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Human-readable reasons, in rule-evaluation order
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl ScanResult {
    /// A clean verdict: score 0, no reasons.
    pub fn clean(path: impl Into<PathBuf>, sha256: String) -> Self {
        Self {
            path: path.into(),
            status: ScanStatus::Clean,
            risk_score: 0,
            sha256: Some(sha256),
            reasons: Vec::new(),
        }
    }

    /// An error verdict: no hash, a single reason describing the failure.
    pub fn error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: ScanStatus::Error,
            risk_score: 0,
            sha256: None,
            reasons: vec![reason.into()],
        }
    }
}

/// Aggregate counts over a report's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Total results in the report
    pub files_scanned: u64,
    /// Results whose status is not `clean`
    pub flagged: u64,
}

/// The aggregate of one scan invocation.
///
/// Immutable after creation; appended verbatim to the history store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Instant of completion (UTC)
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Root path scanned
    pub target: PathBuf,
    /// file or directory
    pub mode: ScanMode,
    /// Whether heuristic rules were evaluated
    pub heuristics_enabled: bool,
    /// Backend the report was persisted to
    pub storage: StorageKind,
    /// Derived counts
    pub summary: Summary,
    /// Per-file verdicts, sorted by path
    pub results: Vec<ScanResult>,
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl ScanReport {
    /// Assemble the final report from per-file results.
    ///
    /// Results are sorted by path before the summary is derived, so the
    /// report is independent of the order files were scanned in.
    pub fn assemble(
        target: &Path,
        mode: ScanMode,
        heuristics_enabled: bool,
        storage: StorageKind,
        mut results: Vec<ScanResult>,
    ) -> Self {
        results.sort_by(|a, b| a.path.cmp(&b.path));

        let flagged = results.iter().filter(|r| r.status.is_flagged()).count() as u64;
        let summary = Summary {
            files_scanned: results.len() as u64,
            flagged,
        };

        Self {
            timestamp: Utc::now(),
            target: target.to_path_buf(),
            mode,
            heuristics_enabled,
            storage,
            summary,
            results,
        }
    }
}

/// Outcome of merging a signature update into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    /// Hashes newly added to the set
    pub added: usize,
    /// Hashes already present (silently deduplicated)
    pub skipped: usize,
    /// Size of the set after the merge
    pub total: usize,
}

//! Per-file scan engine.
//!
//! Verdict pipeline: read content, hash, EICAR check, signature lookup,
//! heuristic pass. The precedence EICAR > signature > heuristic > clean is
//! fixed; scanning the same unchanged file twice produces byte-identical
//! results.

use crate::core::config::ScanConfig;
use crate::core::error::{Error, Result};
use crate::core::types::{ScanResult, ScanStatus};
use crate::detection::heuristic::{FileFacts, HeuristicAnalyzer};
use crate::detection::signature::SignatureSet;
use crate::utils::hash::HashCalculator;
use std::io::Read;
use std::path::Path;

/// The industry-standard EICAR antivirus test string.
pub const EICAR_STRING: &[u8] =
    b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

/// SHA-256 of the canonical EICAR test file.
pub const EICAR_SHA256: &str = "275a021bbfb6489e54d471899f7db9d1663fc695ec2fe2a2c4538aabf651fd0f";

/// Fixed risk score for an EICAR detection.
pub const EICAR_RISK_SCORE: u8 = 90;

/// Risk score for a signature match.
pub const SIGNATURE_RISK_SCORE: u8 = 100;

/// Scan engine for individual files.
///
/// Holds the signature set loaded once per invocation; the set is never
/// mutated while scanning.
pub struct ScanEngine {
    signatures: SignatureSet,
    analyzer: Option<HeuristicAnalyzer>,
    max_inline_bytes: u64,
    analysis_sample_bytes: usize,
}

impl ScanEngine {
    /// Create an engine over a loaded signature set.
    pub fn new(signatures: SignatureSet, heuristics_enabled: bool, scan: &ScanConfig) -> Self {
        Self {
            signatures,
            analyzer: heuristics_enabled.then(HeuristicAnalyzer::new),
            max_inline_bytes: scan.max_inline_bytes,
            analysis_sample_bytes: scan.analysis_sample_bytes,
        }
    }

    /// Whether the heuristic pass is enabled.
    pub fn heuristics_enabled(&self) -> bool {
        self.analyzer.is_some()
    }

    /// Scan one file and produce its verdict.
    ///
    /// Returns `Err` when the file cannot be read; directory scans recover
    /// this into an `error` result, single-file scans surface it directly.
    pub fn scan_path(&self, path: &Path) -> Result<ScanResult> {
        let metadata = std::fs::metadata(path).map_err(|e| Error::file_read(path, e))?;
        let size = metadata.len();

        // Small files are read once and served from memory; larger files
        // are stream-hashed with a bounded leading sample for analysis.
        let (sha256, sample, full_content_available) = if size <= self.max_inline_bytes {
            let content = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
            let sha = HashCalculator::sha256_bytes(&content);
            (sha, content, true)
        } else {
            let sha = HashCalculator::sha256_file(path)?;
            let sample = read_leading_sample(path, self.analysis_sample_bytes)?;
            (sha, sample, false)
        };

        if self.is_eicar(&sha256, &sample, full_content_available) {
            return Ok(ScanResult {
                path: path.to_path_buf(),
                status: ScanStatus::EicarTest,
                risk_score: EICAR_RISK_SCORE,
                sha256: Some(sha256),
                reasons: vec![
                    "EICAR test string detected (harmless test signature)".to_string(),
                ],
            });
        }

        if self.signatures.contains(&sha256) {
            return Ok(ScanResult {
                path: path.to_path_buf(),
                status: ScanStatus::SignatureMatch,
                risk_score: SIGNATURE_RISK_SCORE,
                sha256: Some(sha256),
                reasons: vec![
                    "Known signature match: SHA-256 present in the offline signature set"
                        .to_string(),
                ],
            });
        }

        if let Some(analyzer) = &self.analyzer {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let facts = FileFacts::new(&file_name, &sample);
            let findings = analyzer.analyze(&facts);

            if !findings.is_empty() {
                let total: u32 = findings.iter().map(|f| f.weight as u32).sum();
                let reasons = findings.into_iter().map(|f| f.reason).collect();
                return Ok(ScanResult {
                    path: path.to_path_buf(),
                    status: ScanStatus::HeuristicFlag,
                    risk_score: total.clamp(1, 99) as u8,
                    sha256: Some(sha256),
                    reasons,
                });
            }
        }

        Ok(ScanResult::clean(path, sha256))
    }

    /// EICAR detection: exact hash match at any size, or a literal
    /// substring hit when the full content is in memory. Takes precedence
    /// over signature lookup.
    fn is_eicar(&self, sha256: &str, sample: &[u8], full_content: bool) -> bool {
        if sha256.eq_ignore_ascii_case(EICAR_SHA256) {
            return true;
        }
        full_content && contains_subslice(sample, EICAR_STRING)
    }
}

/// Read up to `limit` leading bytes of a file.
fn read_leading_sample(path: &Path, limit: usize) -> Result<Vec<u8>> {
    let file = std::fs::File::open(path).map_err(|e| Error::file_read(path, e))?;
    let mut sample = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64)
        .read_to_end(&mut sample)
        .map_err(|e| Error::file_read(path, e))?;
    Ok(sample)
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScanConfig;
    use std::io::Write;
    use tempfile::TempDir;

    fn engine_with(hashes: &[&str], heuristics: bool) -> ScanEngine {
        let json = format!(
            r#"{{ "version": "t", "updated": "2025-01-01",
                 "hashes": {{ "sha256": [{}] }} }}"#,
            hashes
                .iter()
                .map(|h| format!("\"{}\"", h))
                .collect::<Vec<_>>()
                .join(",")
        );
        let set = SignatureSet::parse(&json).unwrap();
        ScanEngine::new(set, heuristics, &ScanConfig::default())
    }

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_clean_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "hello.txt", b"hello world");
        let engine = engine_with(&[], true);

        let result = engine.scan_path(&path).unwrap();
        assert_eq!(result.status, ScanStatus::Clean);
        assert_eq!(result.risk_score, 0);
        assert!(result.reasons.is_empty());
        assert_eq!(
            result.sha256.as_deref(),
            Some(HashCalculator::sha256_bytes(b"hello world").as_str())
        );
    }

    #[test]
    fn test_signature_match_scores_100() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bad.bin", b"malicious payload");
        let sha = HashCalculator::sha256_bytes(b"malicious payload");
        let engine = engine_with(&[sha.as_str()], true);

        let result = engine.scan_path(&path).unwrap();
        assert_eq!(result.status, ScanStatus::SignatureMatch);
        assert_eq!(result.risk_score, 100);
        assert_eq!(result.reasons.len(), 1);
    }

    #[test]
    fn test_eicar_by_content() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "eicar.com", EICAR_STRING);
        let engine = engine_with(&[], true);

        let result = engine.scan_path(&path).unwrap();
        assert_eq!(result.status, ScanStatus::EicarTest);
        assert_eq!(result.risk_score, EICAR_RISK_SCORE);
        assert!(result.reasons[0].contains("harmless test signature"));
    }

    #[test]
    fn test_eicar_embedded_regardless_of_extension() {
        let dir = TempDir::new().unwrap();
        let mut content = b"some leading bytes ".to_vec();
        content.extend_from_slice(EICAR_STRING);
        content.extend_from_slice(b" trailing");
        let path = write_file(&dir, "archive.dat", &content);
        let engine = engine_with(&[], true);

        let result = engine.scan_path(&path).unwrap();
        assert_eq!(result.status, ScanStatus::EicarTest);
    }

    #[test]
    fn test_eicar_takes_precedence_over_signature() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "eicar.txt", EICAR_STRING);
        // The EICAR hash is also in the signature set; EICAR still wins.
        let engine = engine_with(&[EICAR_SHA256], true);

        let result = engine.scan_path(&path).unwrap();
        assert_eq!(result.status, ScanStatus::EicarTest);
        assert_eq!(result.risk_score, EICAR_RISK_SCORE);
    }

    #[test]
    fn test_signature_takes_precedence_over_heuristics() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "report.pdf.exe", b"payload");
        let sha = HashCalculator::sha256_bytes(b"payload");
        let engine = engine_with(&[sha.as_str()], true);

        let result = engine.scan_path(&path).unwrap();
        assert_eq!(result.status, ScanStatus::SignatureMatch);
    }

    #[test]
    fn test_double_extension_flags() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "report.pdf.exe", b"plain harmless text");
        let engine = engine_with(&[], true);

        let result = engine.scan_path(&path).unwrap();
        assert_eq!(result.status, ScanStatus::HeuristicFlag);
        assert!(result
            .reasons
            .iter()
            .any(|r| r.contains("Double extension masquerade")));
        assert!(result.risk_score >= 1 && result.risk_score <= 99);
    }

    #[test]
    fn test_heuristics_disabled_yields_clean() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "report.pdf.exe", b"plain harmless text");
        let engine = engine_with(&[], false);

        let result = engine.scan_path(&path).unwrap();
        assert_eq!(result.status, ScanStatus::Clean);
    }

    #[test]
    fn test_missing_file_is_err() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with(&[], true);
        let err = engine.scan_path(&dir.path().join("absent.txt")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_scan_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "invoice.pdf.exe", b"not really a pdf");
        let engine = engine_with(&[], true);

        let first = engine.scan_path(&path).unwrap();
        let second = engine.scan_path(&path).unwrap();
        assert_eq!(first, second);
    }
}

//! Signature set wire format, validation, and merging.
//!
//! The on-disk and update-file shape is identical:
//!
//! ```json
//! { "version": "1.0", "updated": "2025-01-01",
//!   "hashes": { "sha256": ["<64-hex>", ...], "notes": "..." } }
//! ```

use crate::core::error::{Error, Result};
use crate::core::types::MergeSummary;
use crate::utils::hash::is_sha256_hex;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw signature document as serialized on disk and in update files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureDocument {
    /// Set version (free-form, e.g. "1.0" or "2025.01.15")
    pub version: String,
    /// Date of last update
    pub updated: NaiveDate,
    /// Hash block
    pub hashes: HashBlock,
}

/// The hash block inside a signature document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashBlock {
    /// SHA-256 digests, 64 hex characters each
    pub sha256: Vec<String>,
    /// Optional free-text annotation, preserved across merges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A validated, canonical signature set.
///
/// Every hash is lowercase 64-hex; the set holds no duplicates and is
/// never mutated during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSet {
    pub version: String,
    pub updated: NaiveDate,
    hashes: BTreeSet<String>,
    notes: Option<String>,
}

impl SignatureSet {
    /// The built-in set used to seed an empty store.
    ///
    /// These placeholder digests do not correspond to any real content.
    pub fn default_set() -> Self {
        let hashes = [
            "0000000000000000000000000000000000000000000000000000000000000000",
            "1111111111111111111111111111111111111111111111111111111111111111",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            version: "1.0".to_string(),
            updated: NaiveDate::from_ymd_opt(2025, 1, 1).expect("static date"),
            hashes,
            notes: Some("Placeholder signature set.".to_string()),
        }
    }

    /// Validate a raw document into a canonical set.
    ///
    /// All-or-nothing: a single malformed hash rejects the whole document.
    /// Duplicates and mixed case are normalized, not errors.
    pub fn from_document(doc: SignatureDocument) -> Result<Self> {
        let mut hashes = BTreeSet::new();
        for h in &doc.hashes.sha256 {
            if !is_sha256_hex(h) {
                return Err(Error::Validation(format!(
                    "Each sha256 hash must be a 64-character hex string, got {:?}",
                    h
                )));
            }
            hashes.insert(h.to_ascii_lowercase());
        }

        Ok(Self {
            version: doc.version,
            updated: doc.updated,
            hashes,
            notes: doc.hashes.notes,
        })
    }

    /// Convert back to the wire document (hashes sorted).
    pub fn to_document(&self) -> SignatureDocument {
        SignatureDocument {
            version: self.version.clone(),
            updated: self.updated,
            hashes: HashBlock {
                sha256: self.hashes.iter().cloned().collect(),
                notes: self.notes.clone(),
            },
        }
    }

    /// Exact, case-normalized membership test.
    pub fn contains(&self, sha256: &str) -> bool {
        self.hashes.contains(&sha256.to_ascii_lowercase())
    }

    /// Number of hashes in the set.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether the set holds no hashes.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Iterate the hashes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hashes.iter().map(String::as_str)
    }

    /// Merge an incoming set into this one.
    ///
    /// Version, date, and (when present) notes are taken from the incoming
    /// document; hashes are unioned. Returns counts of hashes added vs.
    /// already present. Applying the same update twice adds nothing.
    pub fn merge(&mut self, incoming: &SignatureSet) -> MergeSummary {
        let mut added = 0;
        let mut skipped = 0;

        for h in &incoming.hashes {
            if self.hashes.insert(h.clone()) {
                added += 1;
            } else {
                skipped += 1;
            }
        }

        self.version = incoming.version.clone();
        self.updated = incoming.updated;
        if incoming.notes.is_some() {
            self.notes = incoming.notes.clone();
        }

        MergeSummary {
            added,
            skipped,
            total: self.hashes.len(),
        }
    }

    /// Parse and validate a JSON document from a string.
    pub fn parse(json: &str) -> Result<Self> {
        let doc: SignatureDocument = serde_json::from_str(json).map_err(|e| {
            Error::Validation(format!("Signature document is not well-formed: {}", e))
        })?;
        Self::from_document(doc)
    }
}

//! Heuristic rules: explainable, independent signals over a file's name,
//! header bytes, and byte distribution.
//!
//! Rules run unconditionally and in a fixed order; findings accumulate and
//! none suppresses another, so two runs over the same input produce the
//! same reasons in the same order.

use crate::detection::filetype::{self, MAGIC_HEADER_LEN};

/// Extensions in the fixed high-risk script/executable class.
const SUSPICIOUS_EXTENSIONS: &[&str] = &[
    "exe", "scr", "js", "vbs", "bat", "cmd", "ps1", "dll", "jar",
];

/// Document/media-class extensions commonly used as the decoy half of a
/// masquerading chain.
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf",
];

/// Filename bait terms that pair badly with an executable extension.
const LURE_TERMS: &[&str] = &[
    "invoice", "urgent", "payment", "security", "update", "statement",
];

/// Shannon entropy threshold above which content looks packed/encrypted.
pub const ENTROPY_THRESHOLD: f64 = 7.2;

/// Weight of each rule's contribution to the risk score.
const WEIGHT_SUSPICIOUS_EXTENSION: u8 = 12;
const WEIGHT_DOUBLE_EXTENSION: u8 = 25;
const WEIGHT_HEADER_MISMATCH: u8 = 30;
const WEIGHT_HIGH_ENTROPY: u8 = 18;

/// The closed set of heuristic rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeuristicRule {
    /// Final extension belongs to the high-risk class
    SuspiciousExtension,
    /// Document-class suffix immediately followed by an executable-class one
    DoubleExtensionMasquerade,
    /// Leading bytes contradict the class the extension claims
    HeaderMismatch,
    /// Byte distribution looks packed/encrypted (advisory only)
    HighEntropy,
    /// Explainable naming anomalies (dots, whitespace, lure terms)
    FilenameAnomaly,
}

impl HeuristicRule {
    /// All rules in evaluation order.
    pub const ALL: [HeuristicRule; 5] = [
        HeuristicRule::SuspiciousExtension,
        HeuristicRule::DoubleExtensionMasquerade,
        HeuristicRule::HeaderMismatch,
        HeuristicRule::HighEntropy,
        HeuristicRule::FilenameAnomaly,
    ];

    /// Evaluate this rule against the file facts, yielding at most one finding.
    pub fn evaluate(&self, facts: &FileFacts<'_>) -> Option<HeuristicFinding> {
        match self {
            HeuristicRule::SuspiciousExtension => suspicious_extension(facts),
            HeuristicRule::DoubleExtensionMasquerade => double_extension(facts),
            HeuristicRule::HeaderMismatch => header_mismatch(facts),
            HeuristicRule::HighEntropy => high_entropy(facts),
            HeuristicRule::FilenameAnomaly => filename_anomaly(facts),
        }
    }
}

/// One triggered heuristic rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicFinding {
    /// Which rule fired
    pub rule: HeuristicRule,
    /// Human-readable explanation
    pub reason: String,
    /// Contribution to the risk score
    pub weight: u8,
}

/// Read-only facts the rules consume.
///
/// `sample` holds the file's full content for small files, or a bounded
/// leading slice for large ones.
#[derive(Debug, Clone, Copy)]
pub struct FileFacts<'a> {
    pub file_name: &'a str,
    pub sample: &'a [u8],
}

impl<'a> FileFacts<'a> {
    pub fn new(file_name: &'a str, sample: &'a [u8]) -> Self {
        Self { file_name, sample }
    }

    /// Leading bytes for magic detection.
    pub fn header(&self) -> &[u8] {
        &self.sample[..self.sample.len().min(MAGIC_HEADER_LEN)]
    }

    /// The final extension, lowercased, without the dot.
    pub fn final_extension(&self) -> Option<String> {
        let (_, chain) = split_extensions(self.file_name);
        chain.last().cloned()
    }

    /// All extension-like suffixes after the stem, lowercased.
    pub fn extension_chain(&self) -> Vec<String> {
        split_extensions(self.file_name).1
    }
}

/// Split `name.ext1.ext2` into the stem and its suffix chain.
fn split_extensions(file_name: &str) -> (String, Vec<String>) {
    let lower = file_name.to_lowercase();
    let mut parts = lower.split('.');
    let stem = parts.next().unwrap_or_default().to_string();
    let chain: Vec<String> = parts.map(String::from).collect();
    (stem, chain)
}

fn suspicious_extension(facts: &FileFacts<'_>) -> Option<HeuristicFinding> {
    let ext = facts.final_extension()?;
    if !SUSPICIOUS_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }

    Some(HeuristicFinding {
        rule: HeuristicRule::SuspiciousExtension,
        reason: format!("Suspicious or high-risk extension: .{}", ext),
        weight: WEIGHT_SUSPICIOUS_EXTENSION,
    })
}

fn double_extension(facts: &FileFacts<'_>) -> Option<HeuristicFinding> {
    let chain = facts.extension_chain();
    if chain.len() < 2 {
        return None;
    }

    let decoy = &chain[chain.len() - 2];
    let actual = &chain[chain.len() - 1];
    if !DOCUMENT_EXTENSIONS.contains(&decoy.as_str())
        || !SUSPICIOUS_EXTENSIONS.contains(&actual.as_str())
    {
        return None;
    }

    Some(HeuristicFinding {
        rule: HeuristicRule::DoubleExtensionMasquerade,
        reason: format!(
            "Double extension masquerade: document-like .{} followed by executable .{}",
            decoy, actual
        ),
        weight: WEIGHT_DOUBLE_EXTENSION,
    })
}

fn header_mismatch(facts: &FileFacts<'_>) -> Option<HeuristicFinding> {
    let ext = facts.final_extension()?;
    let mismatch = filetype::header_mismatch(&ext, facts.header())?;

    let reason = match mismatch.expected {
        Some(expected) => format!(
            "Header/extension mismatch: .{} claims {} but content is {}",
            ext, expected, mismatch.actual
        ),
        None => format!(
            "Header/extension mismatch: document-like .{} but content is {}",
            ext, mismatch.actual
        ),
    };

    Some(HeuristicFinding {
        rule: HeuristicRule::HeaderMismatch,
        reason,
        weight: WEIGHT_HEADER_MISMATCH,
    })
}

fn high_entropy(facts: &FileFacts<'_>) -> Option<HeuristicFinding> {
    if facts.sample.is_empty() {
        return None;
    }

    let entropy = shannon_entropy(facts.sample);
    if entropy < ENTROPY_THRESHOLD {
        return None;
    }

    Some(HeuristicFinding {
        rule: HeuristicRule::HighEntropy,
        reason: format!(
            "High entropy ({:.2}) may indicate packing or obfuscation",
            entropy
        ),
        weight: WEIGHT_HIGH_ENTROPY,
    })
}

fn filename_anomaly(facts: &FileFacts<'_>) -> Option<HeuristicFinding> {
    let name = facts.file_name;
    let lower = name.to_lowercase();
    let mut notes = Vec::new();
    let mut weight = 0u8;

    if lower.matches('.').count() >= 3 {
        weight += 8;
        notes.push("unusually many dots in filename");
    }

    if name != name.trim() {
        weight += 10;
        notes.push("filename has leading/trailing whitespace");
    }

    let has_lure = LURE_TERMS.iter().any(|t| lower.contains(t));
    let has_exec_ext = SUSPICIOUS_EXTENSIONS
        .iter()
        .any(|e| lower.ends_with(&format!(".{}", e)));
    if has_lure && has_exec_ext {
        weight += 6;
        notes.push("lure term combined with a script/executable extension");
    }

    if notes.is_empty() {
        return None;
    }

    Some(HeuristicFinding {
        rule: HeuristicRule::FilenameAnomaly,
        reason: format!("Filename anomaly: {}", notes.join("; ")),
        weight,
    })
}

/// Shannon entropy (base-2) over the byte-value histogram.
///
/// 0.0 for uniform content, approaching 8.0 for random bytes.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut frequencies = [0u64; 256];
    for &byte in data {
        frequencies[byte as usize] += 1;
    }

    let len = data.len() as f64;
    let mut entropy = 0.0;

    for &count in &frequencies {
        if count > 0 {
            let probability = count as f64 / len;
            entropy -= probability * probability.log2();
        }
    }

    entropy
}

/// Runs the full rule set over a file's facts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every rule, in order, with no short-circuiting.
    pub fn analyze(&self, facts: &FileFacts<'_>) -> Vec<HeuristicFinding> {
        HeuristicRule::ALL
            .iter()
            .filter_map(|rule| rule.evaluate(facts))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(name: &str, sample: &[u8]) -> Vec<HeuristicFinding> {
        HeuristicAnalyzer::new().analyze(&FileFacts::new(name, sample))
    }

    #[test]
    fn test_plain_text_file_is_quiet() {
        let findings = analyze("notes.txt", b"nothing unusual here");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_suspicious_extension() {
        let findings = analyze("tool.exe", b"not a real pe");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, HeuristicRule::SuspiciousExtension);
        assert!(findings[0].reason.contains(".exe"));
    }

    #[test]
    fn test_double_extension_names_both() {
        let findings = analyze("report.pdf.exe", b"harmless text");
        let double = findings
            .iter()
            .find(|f| f.rule == HeuristicRule::DoubleExtensionMasquerade)
            .expect("masquerade finding");
        assert!(double.reason.contains(".pdf"));
        assert!(double.reason.contains(".exe"));
        // The plain suspicious-extension rule fires too; neither suppresses the other
        assert!(findings
            .iter()
            .any(|f| f.rule == HeuristicRule::SuspiciousExtension));
    }

    #[test]
    fn test_pe_header_under_txt() {
        let findings = analyze("readme.txt", b"MZ\x90\x00\x03\x00");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, HeuristicRule::HeaderMismatch);
        assert!(findings[0].reason.contains(".txt"));
    }

    #[test]
    fn test_high_entropy_flags() {
        // Near-uniform byte distribution
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 256) as u8).collect();
        let findings = analyze("blob.dat", &data);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, HeuristicRule::HighEntropy);
    }

    #[test]
    fn test_low_entropy_does_not_flag() {
        let data = vec![0u8; 4096];
        assert!(analyze("zeros.dat", &data).is_empty());
    }

    #[test]
    fn test_filename_anomaly_lure_term() {
        let findings = analyze("invoice_overdue.js", b"console.log(1)");
        let anomaly = findings
            .iter()
            .find(|f| f.rule == HeuristicRule::FilenameAnomaly)
            .expect("anomaly finding");
        assert!(anomaly.reason.contains("lure term"));
    }

    #[test]
    fn test_filename_anomaly_quiet_on_ordinary_document() {
        let findings = analyze("quarterly-statement.pdf", b"%PDF-1.5");
        assert!(findings
            .iter()
            .all(|f| f.rule != HeuristicRule::FilenameAnomaly));
    }

    #[test]
    fn test_findings_order_is_stable() {
        // A file tripping several rules reports them in rule order
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let mut named = b"MZ\x00".to_vec();
        named.extend_from_slice(&data);
        let findings = analyze("statement.pdf.exe", &named);

        let rules: Vec<HeuristicRule> = findings.iter().map(|f| f.rule).collect();
        let mut sorted = rules.clone();
        sorted.sort_by_key(|r| HeuristicRule::ALL.iter().position(|x| x == r).unwrap());
        assert_eq!(rules, sorted);
    }

    #[test]
    fn test_entropy_bounds() {
        assert_eq!(shannon_entropy(&[]), 0.0);
        assert!(shannon_entropy(&[7u8; 1000]) < 0.01);

        let uniform: Vec<u8> = (0..=255u8).collect::<Vec<_>>().repeat(4);
        assert!(shannon_entropy(&uniform) > 7.9);
    }
}

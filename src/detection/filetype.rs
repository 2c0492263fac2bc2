//! File type detection using magic bytes and extension expectations.

/// Maximum bytes needed for magic detection.
pub const MAGIC_HEADER_LEN: usize = 16;

/// File kind detectable from leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Windows executable (PE format, `MZ`)
    Pe,
    /// ELF binary
    Elf,
    /// Script with an interpreter line (`#!`)
    Shebang,
    /// PDF document
    Pdf,
    /// ZIP container (also jar/docx/xlsx/pptx)
    Zip,
    /// PNG image
    Png,
    /// JPEG image
    Jpeg,
    /// GIF image
    Gif,
}

impl FileKind {
    /// Whether this kind is a compiled binary executable.
    pub fn is_binary_executable(&self) -> bool {
        matches!(self, FileKind::Pe | FileKind::Elf)
    }

    /// Short label used in reason strings.
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Pe => "Windows executable (PE)",
            FileKind::Elf => "ELF binary",
            FileKind::Shebang => "script with interpreter line",
            FileKind::Pdf => "PDF document",
            FileKind::Zip => "ZIP container",
            FileKind::Png => "PNG image",
            FileKind::Jpeg => "JPEG image",
            FileKind::Gif => "GIF image",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Magic number table, checked in order.
const MAGIC: &[(FileKind, &[u8])] = &[
    (FileKind::Elf, b"\x7fELF"),
    (FileKind::Png, b"\x89PNG\r\n\x1a\n"),
    (FileKind::Pdf, b"%PDF"),
    (FileKind::Zip, b"PK\x03\x04"),
    (FileKind::Gif, b"GIF8"),
    (FileKind::Jpeg, b"\xff\xd8\xff"),
    (FileKind::Shebang, b"#!"),
    (FileKind::Pe, b"MZ"),
];

/// Detect a file kind from leading bytes. Unknown headers yield `None`.
pub fn detect_kind(header: &[u8]) -> Option<FileKind> {
    MAGIC
        .iter()
        .find(|(_, sig)| header.starts_with(sig))
        .map(|(kind, _)| *kind)
}

/// The kind a given extension claims to be, when we have an expectation.
pub fn expected_kind(ext: &str) -> Option<FileKind> {
    match ext {
        "exe" | "dll" | "scr" | "sys" => Some(FileKind::Pe),
        "so" => Some(FileKind::Elf),
        "sh" => Some(FileKind::Shebang),
        "pdf" => Some(FileKind::Pdf),
        "zip" | "jar" | "docx" | "xlsx" | "pptx" => Some(FileKind::Zip),
        "png" => Some(FileKind::Png),
        "jpg" | "jpeg" => Some(FileKind::Jpeg),
        "gif" => Some(FileKind::Gif),
        _ => None,
    }
}

/// Extensions that claim document- or plain-text-class content. A binary
/// executable header under one of these is always suspicious.
pub fn is_document_class_ext(ext: &str) -> bool {
    matches!(
        ext,
        "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "rtf" | "odt"
            | "txt" | "md" | "log" | "csv" | "ini" | "json" | "xml" | "html" | "htm"
            | "yml" | "yaml"
    )
}

/// A detected mismatch between claimed extension and actual header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicMismatch {
    /// What the extension claimed, when a concrete expectation exists
    pub expected: Option<FileKind>,
    /// What the header actually is
    pub actual: FileKind,
}

/// Compare the claimed extension against the detected header kind.
///
/// Flags when the extension has a concrete expectation and the detected
/// kind differs, or when a document/text-class extension covers a binary
/// executable header. An unrecognized header never flags.
pub fn header_mismatch(ext: &str, header: &[u8]) -> Option<MagicMismatch> {
    let actual = detect_kind(header)?;

    if let Some(expected) = expected_kind(ext) {
        if actual != expected {
            return Some(MagicMismatch {
                expected: Some(expected),
                actual,
            });
        }
        return None;
    }

    if is_document_class_ext(ext) && actual.is_binary_executable() {
        return Some(MagicMismatch {
            expected: None,
            actual,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_known_magics() {
        assert_eq!(detect_kind(b"MZ\x90\x00"), Some(FileKind::Pe));
        assert_eq!(detect_kind(b"\x7fELF\x02"), Some(FileKind::Elf));
        assert_eq!(detect_kind(b"#!/bin/sh\n"), Some(FileKind::Shebang));
        assert_eq!(detect_kind(b"%PDF-1.7"), Some(FileKind::Pdf));
        assert_eq!(detect_kind(b"PK\x03\x04"), Some(FileKind::Zip));
        assert_eq!(detect_kind(b"plain text"), None);
        assert_eq!(detect_kind(b""), None);
    }

    #[test]
    fn test_pe_under_txt_flags() {
        let mismatch = header_mismatch("txt", b"MZ\x90\x00\x03").unwrap();
        assert_eq!(mismatch.actual, FileKind::Pe);
        assert_eq!(mismatch.expected, None);
    }

    #[test]
    fn test_expectation_mismatch_flags() {
        // A "pdf" that is actually a PE
        let mismatch = header_mismatch("pdf", b"MZ\x90\x00").unwrap();
        assert_eq!(mismatch.expected, Some(FileKind::Pdf));
        assert_eq!(mismatch.actual, FileKind::Pe);
    }

    #[test]
    fn test_matching_expectation_is_quiet() {
        assert!(header_mismatch("exe", b"MZ\x90\x00").is_none());
        assert!(header_mismatch("pdf", b"%PDF-1.4").is_none());
        assert!(header_mismatch("docx", b"PK\x03\x04").is_none());
    }

    #[test]
    fn test_unknown_header_never_flags() {
        assert!(header_mismatch("exe", b"not a pe file").is_none());
        assert!(header_mismatch("txt", b"just words").is_none());
    }

    #[test]
    fn test_shebang_under_txt_is_tolerated() {
        // Plain text files legitimately start with #!
        assert!(header_mismatch("txt", b"#!/usr/bin/env python").is_none());
    }

    #[test]
    fn test_no_expectation_no_document_class() {
        // .bin carries no claim, anything goes
        assert!(header_mismatch("bin", b"MZ\x90\x00").is_none());
    }
}

//! Detection primitives: signature sets, file-type magic, heuristic rules.

pub mod filetype;
pub mod heuristic;
pub mod signature;

pub use filetype::{FileKind, MagicMismatch};
pub use heuristic::{FileFacts, HeuristicAnalyzer, HeuristicFinding, HeuristicRule};
pub use signature::{SignatureDocument, SignatureSet};

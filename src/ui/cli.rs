//! Command-line interface definition.
//!
//! Every command emits exactly one JSON document on stdout; failures emit
//! a JSON error object and a non-zero exit status. Embedding UIs consume
//! this contract uniformly and hold no scanning logic.

use crate::core::types::StorageKind;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// ferroscan: on-demand file scanning with offline signatures and heuristics
#[derive(Parser, Debug)]
#[command(name = "ferroscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose diagnostics on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress all diagnostics except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a single file
    ScanFile {
        /// File to scan
        #[arg(long)]
        path: PathBuf,

        /// Evaluate heuristic rules
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        heuristics: bool,

        /// Storage backend for signatures and history
        #[arg(long, value_enum)]
        storage: Option<StorageKind>,
    },

    /// Scan a directory
    ScanDir {
        /// Directory to scan
        #[arg(long)]
        path: PathBuf,

        /// Descend into subdirectories
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        recursive: bool,

        /// Evaluate heuristic rules
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        heuristics: bool,

        /// Storage backend for signatures and history
        #[arg(long, value_enum)]
        storage: Option<StorageKind>,
    },

    /// Merge an offline signature update into the local store
    UpdateSignatures {
        /// Signature update document (JSON)
        #[arg(long, visible_alias = "file")]
        path: PathBuf,

        /// Storage backend holding the signature store
        #[arg(long, value_enum)]
        storage: Option<StorageKind>,
    },

    /// Read persisted scan history
    History {
        /// Storage backend to read from
        #[arg(long, value_enum)]
        storage: Option<StorageKind>,
    },
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_file_defaults() {
        let cli = Cli::try_parse_from(["ferroscan", "scan-file", "--path", "/tmp/x"]).unwrap();
        match cli.command {
            Commands::ScanFile {
                path,
                heuristics,
                storage,
            } => {
                assert_eq!(path, PathBuf::from("/tmp/x"));
                assert!(heuristics);
                assert!(storage.is_none());
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_explicit_flag_values() {
        let cli = Cli::try_parse_from([
            "ferroscan",
            "scan-dir",
            "--path",
            "/tmp",
            "--recursive",
            "false",
            "--heuristics",
            "false",
            "--storage",
            "sqlite",
        ])
        .unwrap();

        match cli.command {
            Commands::ScanDir {
                recursive,
                heuristics,
                storage,
                ..
            } => {
                assert!(!recursive);
                assert!(!heuristics);
                assert_eq!(storage, Some(StorageKind::Sqlite));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_update_accepts_file_alias() {
        let cli =
            Cli::try_parse_from(["ferroscan", "update-signatures", "--file", "/tmp/update.json"])
                .unwrap();
        match cli.command {
            Commands::UpdateSignatures { path, .. } => {
                assert_eq!(path, PathBuf::from("/tmp/update.json"));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_missing_path_is_rejected() {
        assert!(Cli::try_parse_from(["ferroscan", "scan-file"]).is_err());
    }
}

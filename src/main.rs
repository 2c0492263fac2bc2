//! ferroscan: on-demand file scanning engine.
//!
//! This is the CLI entry point. It parses the command contract, drives the
//! engine, and prints exactly one JSON document on stdout per invocation.

use ferroscan::core::config::Config;
use ferroscan::core::error::{Error, Result};
use ferroscan::detection::signature::SignatureSet;
use ferroscan::scanner;
use ferroscan::storage::open_backend;
use ferroscan::ui::cli::{Cli, Commands};
use ferroscan::utils::logging::{init_logging, LogConfig};
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    log::debug!("ferroscan v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("[{}] {}", e.category(), e);
            let error_doc = json!({
                "error": {
                    "code": e.code(),
                    "message": e.to_string(),
                }
            });
            println!("{}", error_doc);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let config = Config::load_or_default();
    config.validate()?;
    let data_dir = Config::data_dir();

    let output = match cli.command {
        Commands::ScanFile {
            path,
            heuristics,
            storage,
        } => {
            let kind = storage.unwrap_or(config.default_storage);
            let backend = open_backend(kind, &data_dir)?;
            let report =
                scanner::scan_file(backend.as_ref(), kind, &config, &path, heuristics).await?;
            serde_json::to_value(&report)?
        }

        Commands::ScanDir {
            path,
            recursive,
            heuristics,
            storage,
        } => {
            let kind = storage.unwrap_or(config.default_storage);
            let backend = open_backend(kind, &data_dir)?;
            let report = scanner::scan_directory(
                backend.as_ref(),
                kind,
                &config,
                &path,
                recursive,
                heuristics,
            )
            .await?;
            serde_json::to_value(&report)?
        }

        Commands::UpdateSignatures { path, storage } => {
            let kind = storage.unwrap_or(config.default_storage);
            let backend = open_backend(kind, &data_dir)?;
            update_signatures(backend.as_ref(), &path)?
        }

        Commands::History { storage } => {
            let kind = storage.unwrap_or(config.default_storage);
            let backend = open_backend(kind, &data_dir)?;
            let history = backend.read_history()?;
            json!({
                "status": "ok",
                "storage": kind.as_str(),
                "history": history,
            })
        }
    };

    Ok(serde_json::to_string(&output)?)
}

/// Validate and merge an offline signature update document.
fn update_signatures(
    backend: &dyn ferroscan::storage::StorageBackend,
    path: &Path,
) -> Result<serde_json::Value> {
    if !path.is_file() {
        return Err(Error::Argument(format!(
            "Signature update file does not exist or is not a file: {}",
            path.display()
        )));
    }

    let raw = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    let incoming = SignatureSet::parse(&raw)?;

    let summary = backend.merge_signatures(&incoming)?;
    let doc = incoming.to_document();

    Ok(json!({
        "status": "ok",
        "added": summary.added,
        "skipped": summary.skipped,
        "total": summary.total,
        "version": doc.version,
        "updated": doc.updated.to_string(),
    }))
}

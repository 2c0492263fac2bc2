//! Directory enumeration and parallel scanning.
//!
//! Files under the root are distributed to a bounded worker pool; each
//! file's verdict is independent, and results are sorted by path before
//! aggregation so the report does not depend on execution order.

use crate::core::config::ScanConfig;
use crate::core::error::{Error, Result};
use crate::core::types::ScanResult;
use crate::scanner::engine::ScanEngine;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Message sent back from a scan worker.
enum WorkerMsg {
    Result(ScanResult),
    Fatal(Error),
}

/// Directory walker driving the per-file scan engine.
pub struct DirectoryWalker {
    engine: Arc<ScanEngine>,
    workers: usize,
    follow_symlinks: bool,
    cancelled: Arc<AtomicBool>,
}

impl DirectoryWalker {
    /// Create a walker over a shared scan engine.
    pub fn new(engine: Arc<ScanEngine>, scan: &ScanConfig) -> Self {
        Self {
            engine,
            workers: scan.scan_workers.clamp(1, 8),
            follow_symlinks: scan.follow_symlinks,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation; takes effect between files. A cancelled scan
    /// produces no report, partial results are discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if the scan has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Enumerate files under `root` and scan each one.
    ///
    /// A per-file read failure becomes an `error` result for that path and
    /// never aborts the walk. Returned results are sorted by path.
    pub async fn scan_directory(&self, root: &Path, recursive: bool) -> Result<Vec<ScanResult>> {
        let files = self.collect_files(root, recursive)?;
        log::info!("Found {} files to scan under {}", files.len(), root.display());

        let queue = Arc::new(Mutex::new(VecDeque::from(files)));
        let (tx, mut rx) = mpsc::channel::<WorkerMsg>(256);

        let mut handles = Vec::new();
        for _ in 0..self.workers {
            let queue = Arc::clone(&queue);
            let engine = Arc::clone(&self.engine);
            let cancelled = Arc::clone(&self.cancelled);
            let tx = tx.clone();

            let handle = tokio::spawn(async move {
                loop {
                    let popped = match queue.lock() {
                        Ok(mut q) => Ok(q.pop_front()),
                        Err(_) => Err(()),
                    };

                    let path = match popped {
                        Ok(Some(p)) => p,
                        Ok(None) => break,
                        Err(()) => {
                            let _ = tx
                                .send(WorkerMsg::Fatal(Error::Internal(
                                    "file queue lock poisoned".to_string(),
                                )))
                                .await;
                            break;
                        }
                    };

                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }

                    let msg = match engine.scan_path(&path) {
                        Ok(result) => WorkerMsg::Result(result),
                        Err(e) if e.is_recoverable() => {
                            log::debug!("Degrading {} to error result: {}", path.display(), e);
                            WorkerMsg::Result(ScanResult::error(&path, read_failure_reason(&e)))
                        }
                        Err(e) => WorkerMsg::Fatal(e),
                    };

                    if tx.send(msg).await.is_err() {
                        break;
                    }
                }
            });

            handles.push(handle);
        }

        // Close the channel once all workers finish
        drop(tx);

        let mut results = Vec::new();
        let mut fatal: Option<Error> = None;

        while let Some(msg) = rx.recv().await {
            match msg {
                WorkerMsg::Result(result) => results.push(result),
                WorkerMsg::Fatal(e) => {
                    self.cancel();
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
            }
        }

        for handle in handles {
            let _ = handle.await;
        }

        if let Some(e) = fatal {
            return Err(e);
        }
        if self.is_cancelled() {
            return Err(Error::ScanCancelled);
        }

        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    /// Collect regular files under the root. Directories are traversed,
    /// never scanned as targets; unreadable subtrees are skipped with a
    /// warning rather than aborting the walk.
    fn collect_files(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .max_depth(max_depth)
        {
            if self.is_cancelled() {
                return Err(Error::ScanCancelled);
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Skipping unreadable entry during walk: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}

/// Single reason string for an unreadable file, carrying the OS detail.
fn read_failure_reason(e: &Error) -> String {
    match e {
        Error::FileRead { source, .. } | Error::PermissionDenied { source, .. } => {
            format!("cannot read file: {}", source)
        }
        other => format!("cannot read file: {}", other),
    }
}

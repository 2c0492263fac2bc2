//! ferroscan: an on-demand file scanning engine.
//!
//! This crate provides the core scanning functionality consumed by embedding
//! front-ends: offline signature matching, explainable heuristic analysis,
//! per-file and per-directory verdict aggregation, and append-only scan
//! history behind interchangeable storage backends.

pub mod core;
pub mod detection;
pub mod scanner;
pub mod storage;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;

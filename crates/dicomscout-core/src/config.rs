//! Scan configuration.
//!
//! All knobs that used to be process-wide constants live here and are passed
//! explicitly into [`crate::scanner::ScanOrchestrator`]. Every field has a
//! default, so a JSON config file only needs the fields it changes.
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory name that is never descended into.
pub const DEFAULT_SENTINEL_DIR: &str = "#recycle";

/// Message fragment that marks a transient remote/network read failure.
pub const DEFAULT_TRANSIENT_MARKER: &str = "An unexpected network error occurred";

/// Default deepest container nesting (a top-level archive is depth 1).
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 16;

/// Default cap on bytes copied out of one nested archive entry (4 GiB).
pub const DEFAULT_MAX_MATERIALIZED_BYTES: u64 = 4 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Directories with exactly this name are skipped along with their subtree.
    pub sentinel_dir_name: String,
    /// Deepest container nesting that is still opened.
    pub max_nesting_depth: usize,
    /// Per-entry cap on bytes copied into a temporary artifact.
    pub max_materialized_bytes: u64,
    /// Directory for temporary artifacts; the OS temp dir when `None`.
    pub temp_dir: Option<PathBuf>,
    /// Substrings that escalate an error to fatal severity.
    pub transient_error_markers: Vec<String>,
    /// Stop a root's walk at its first unreadable directory instead of
    /// skipping just that subtree.
    pub abort_root_on_directory_error: bool,
    /// Walk roots concurrently on a rayon pool.
    pub parallel_roots: bool,
    /// Worker count for `parallel_roots`; CPU count when `None`.
    pub threads: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sentinel_dir_name: DEFAULT_SENTINEL_DIR.to_string(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_materialized_bytes: DEFAULT_MAX_MATERIALIZED_BYTES,
            temp_dir: None,
            transient_error_markers: vec![DEFAULT_TRANSIENT_MARKER.to_string()],
            abort_root_on_directory_error: false,
            parallel_roots: false,
            threads: None,
        }
    }
}

impl ScanConfig {
    /// Parse a config from JSON text. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Worker count used when `parallel_roots` is set.
    pub fn worker_threads(&self) -> usize {
        self.threads.filter(|&n| n > 0).unwrap_or_else(num_cpus::get)
    }
}

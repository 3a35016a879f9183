//! A top-level directory to scan.
use compact_str::CompactString;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A filesystem path plus the directory name that must never be descended.
///
/// Built once from the root list, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    pub path: PathBuf,
    pub sentinel: CompactString,
}

impl ScanRoot {
    pub fn new(path: impl Into<PathBuf>, sentinel: &str) -> Self {
        Self {
            path: path.into(),
            sentinel: CompactString::new(sentinel),
        }
    }

    /// `true` if `name` is the sentinel directory name (exact match).
    pub fn is_sentinel(&self, name: &OsStr) -> bool {
        !self.sentinel.is_empty() && name == OsStr::new(self.sentinel.as_str())
    }

    /// `true` if the root itself is a sentinel directory.
    pub fn is_sentinel_root(&self) -> bool {
        self.path.is_dir()
            && self
                .path
                .file_name()
                .is_some_and(|name| self.is_sentinel(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

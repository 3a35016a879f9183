//! Reporting-only location of a discovery.
//!
//! A `LogicalPath` may cross any number of container boundaries, e.g.
//! `/data/case.zip/inner.7z/brain.dcm`. It describes *where* something was
//! found and is never used for I/O: nothing at that path exists on disk once
//! a container boundary has been crossed.
use compact_str::CompactString;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, MAIN_SEPARATOR};

/// Separator used when rendering a logical path.
pub const SEPARATOR: char = MAIN_SEPARATOR;

/// Ordered path segments, first the filesystem path of the outermost file,
/// then one segment per container entry, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalPath {
    segments: Vec<CompactString>,
}

impl LogicalPath {
    /// Logical path of a real file on disk: a single segment.
    pub fn from_fs(path: &Path) -> Self {
        Self {
            segments: vec![CompactString::new(path.to_string_lossy())],
        }
    }

    /// Append an archive entry name.
    ///
    /// Separators inside the entry name (`/` or `\`) are normalised to
    /// [`SEPARATOR`], and a trailing separator (zip directory entries) is dropped.
    pub fn child(&self, entry_name: &str) -> Self {
        let mut normalised = CompactString::with_capacity(entry_name.len());
        for ch in entry_name.chars() {
            normalised.push(if ch == '/' || ch == '\\' { SEPARATOR } else { ch });
        }
        while normalised.ends_with(SEPARATOR) {
            normalised.pop();
        }
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(normalised);
        Self { segments }
    }

    pub fn segments(&self) -> &[CompactString] {
        &self.segments
    }

    /// Number of container boundaries crossed (0 for a plain file).
    pub fn container_depth(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    /// Last segment: the file or entry name that was found.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(CompactString::as_str).unwrap_or("")
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && !segment.is_empty() {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl Serialize for LogicalPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

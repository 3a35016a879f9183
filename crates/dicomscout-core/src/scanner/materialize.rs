//! Copies a nested archive entry to a temporary file so it can be reopened.
//!
//! Archive readers need a seekable source, and an entry stream from another
//! archive is not one. The entry is copied to a uniquely named temp file whose
//! suffix keeps the container kind. The returned [`ScopedArtifact`] deletes
//! the file when released or dropped, so every exit path of the caller
//! (success, error, or unwinding panic) cleans up.
use crate::error::ScanError;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Creates temporary artifacts for nested containers.
#[derive(Debug, Clone)]
pub struct Materializer {
    temp_dir: Option<PathBuf>,
    max_bytes: u64,
}

/// A temp file that exists exactly as long as this value.
#[derive(Debug)]
pub struct ScopedArtifact {
    path: TempPath,
    len: u64,
}

impl ScopedArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes copied into the artifact.
    pub fn copied(&self) -> u64 {
        self.len
    }

    /// Delete the artifact now, surfacing any deletion error.
    pub fn release(self) -> io::Result<()> {
        self.path.close()
    }
}

impl Materializer {
    pub fn new(temp_dir: Option<PathBuf>, max_bytes: u64) -> Self {
        Self {
            temp_dir,
            max_bytes,
        }
    }

    /// Copy `reader` to a fresh temp file named after `entry_name`, ending
    /// in `.{extension}`.
    ///
    /// The base name is `entry_name` with every non-alphanumeric character
    /// removed, cut to [`MAX_PREFIX_CHARS`]; uniqueness comes from the random
    /// part `tempfile` adds. On any failure the partial file is deleted before
    /// returning.
    pub fn materialize(
        &self,
        reader: &mut dyn Read,
        entry_name: &str,
        extension: &str,
    ) -> Result<ScopedArtifact, ScanError> {
        let prefix = temp_prefix(entry_name);
        let suffix = if extension.is_empty() {
            String::new()
        } else {
            format!(".{extension}")
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(&suffix);
        let created = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file = created.map_err(|source| ScanError::TempFileIo {
            entry: entry_name.to_string(),
            source,
        })?;

        // Read one byte past the cap so "exactly at the cap" still passes.
        let mut limited = reader.take(self.max_bytes.saturating_add(1));
        let copied = io::copy(&mut limited, file.as_file_mut()).map_err(|source| {
            ScanError::TempFileIo {
                entry: entry_name.to_string(),
                source,
            }
        })?;
        if copied > self.max_bytes {
            return Err(ScanError::MaterializeLimit {
                location: entry_name.to_string(),
                max: self.max_bytes,
            });
        }

        // Close the handle so the archive reader can reopen the path on any OS.
        Ok(ScopedArtifact {
            path: file.into_temp_path(),
            len: copied,
        })
    }
}

/// Longest temp-file prefix, well inside every OS's file-name limit.
pub const MAX_PREFIX_CHARS: usize = 64;

/// `[^A-Za-z0-9]` stripped from the entry name, keeping the last
/// [`MAX_PREFIX_CHARS`] characters (the file name end of a long entry path).
fn temp_prefix(entry_name: &str) -> String {
    let kept: Vec<char> = entry_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    let start = kept.len().saturating_sub(MAX_PREFIX_CHARS);
    kept[start..].iter().collect()
}

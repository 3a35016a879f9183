//! Root-list files: one directory per line.
//!
//! Lines starting with `**` are comments. Carriage returns are stripped so
//! files written on Windows parse the same. Blank lines are dropped rather
//! than read as "the current directory".
use crate::error::ConfigError;
use crate::model::ScanRoot;
use std::path::Path;

/// Prefix of a comment line.
pub const COMMENT_MARKER: &str = "**";

/// Root paths listed in `text`, in order, duplicates kept.
pub fn parse_root_list(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.replace('\r', ""))
        .filter(|line| !line.starts_with(COMMENT_MARKER) && !line.is_empty())
        .collect()
}

/// Read a root-list file and build a [`ScanRoot`] for every entry.
pub fn load_root_list(path: &Path, sentinel: &str) -> Result<Vec<ScanRoot>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_root_list(&text)
        .into_iter()
        .map(|root| ScanRoot::new(root, sentinel))
        .collect())
}

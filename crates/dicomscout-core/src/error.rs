//! Error taxonomy for the scanner.
//!
//! Every failure the scanner can hit is one of these variants. None of them
//! ever escapes [`crate::scanner::ScanOrchestrator::run`]: each is caught at
//! the smallest enclosing unit (entry, container, directory, root) and turned
//! into a log record plus a [`crate::scanner::progress::ScanEvent::Error`].
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Windows `ERROR_UNEXP_NET_ERR`: "An unexpected network error occurred."
#[cfg(windows)]
const ERROR_UNEXP_NET_ERR: i32 = 59;

/// Errors raised while scanning a root.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A directory (or the root itself) could not be listed.
    #[error("could not read directory {}: {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A container could not be opened at all.
    #[error("could not open archive {location}: {message}")]
    ContainerOpen { location: String, message: String },

    /// A container opened but its enumeration broke part-way through.
    #[error("error searching archive {location}: {message}")]
    ContainerRead { location: String, message: String },

    /// A single entry inside an opened container could not be streamed.
    #[error("error viewing archive entry {location}: {message}")]
    EntryRead { location: String, message: String },

    /// Copying a nested container into a temporary file failed.
    #[error("could not materialise nested archive {entry}: {source}")]
    TempFileIo {
        entry: String,
        #[source]
        source: io::Error,
    },

    /// A remote/network hiccup, recognised by its message.
    #[error("transient remote failure at {location}: {message}")]
    TransientRemote { location: String, message: String },

    /// The nested container would exceed the configured nesting depth.
    #[error("archive nesting too deep at {location} (max depth {max})")]
    NestingTooDeep { location: String, max: usize },

    /// The nested container is larger than the materialisation cap.
    #[error("nested archive {location} exceeds {max} bytes")]
    MaterializeLimit { location: String, max: u64 },

    /// A decoder or the walker panicked; the panic was contained.
    #[error("panic while scanning {location}: {message}")]
    Panicked { location: String, message: String },
}

impl ScanError {
    /// The path (physical or logical) this error concerns, for structured logs.
    pub fn location(&self) -> String {
        match self {
            Self::DirectoryRead { path, .. } => path.display().to_string(),
            Self::TempFileIo { entry, .. } => entry.clone(),
            Self::ContainerOpen { location, .. }
            | Self::ContainerRead { location, .. }
            | Self::EntryRead { location, .. }
            | Self::TransientRemote { location, .. }
            | Self::NestingTooDeep { location, .. }
            | Self::MaterializeLimit { location, .. }
            | Self::Panicked { location, .. } => location.clone(),
        }
    }

    /// Whether this error was already raised at fatal severity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransientRemote { .. } | Self::Panicked { .. })
    }

    /// Whether the error text carries one of the transient-remote `markers`.
    pub fn is_transient(&self, markers: &[String]) -> bool {
        if let Self::DirectoryRead { source, .. } | Self::TempFileIo { source, .. } = self {
            if is_unexpected_network_error(source) {
                return true;
            }
        }
        let text = self.to_string();
        markers
            .iter()
            .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
    }

    /// The elevated record to log alongside this error, if it is transient.
    ///
    /// The original error is still logged at its own severity; this is a
    /// reporting distinction only and never triggers a retry.
    pub fn escalate(&self, markers: &[String]) -> Option<ScanError> {
        if self.is_fatal() || !self.is_transient(markers) {
            return None;
        }
        let message = match self {
            Self::DirectoryRead { source, .. } | Self::TempFileIo { source, .. } => {
                source.to_string()
            }
            Self::ContainerOpen { message, .. }
            | Self::ContainerRead { message, .. }
            | Self::EntryRead { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Some(Self::TransientRemote {
            location: self.location(),
            message,
        })
    }
}

#[cfg(windows)]
fn is_unexpected_network_error(err: &io::Error) -> bool {
    err.raw_os_error() == Some(ERROR_UNEXP_NET_ERR)
}

#[cfg(not(windows))]
fn is_unexpected_network_error(_err: &io::Error) -> bool {
    false
}

/// Errors loading configuration or the root-path list.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report write failed: {0}")]
    Io(#[from] io::Error),

    #[error("CSV report write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON report write failed: {0}")]
    Json(#[from] serde_json::Error),
}

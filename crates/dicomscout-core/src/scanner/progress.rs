//! Scan events and the sinks that receive them.
//!
//! The scanner never prints. Everything it learns (discoveries, progress,
//! errors) is emitted as a [`ScanEvent`] to a [`ScanSink`], and errors are
//! also logged through `tracing` at the matching severity.
use crate::error::ScanError;
use crate::model::LogicalPath;
use crossbeam_channel::Sender;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Severity of an error record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recoverable: logged, the scan moves on.
    Error,
    /// Escalated but still non-terminating (transient remote failures, panics).
    Fatal,
}

/// A qualifying file found during the scan.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub logical_path: LogicalPath,
    /// Root whose walk produced this discovery.
    pub root: PathBuf,
    /// The file on disk, when the discovery is not inside a container.
    /// This is what a dataset processor would open.
    pub physical_path: Option<PathBuf>,
}

/// Messages emitted by the scanner, in traversal order.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    RootStarted { root: PathBuf },
    /// Pre-order: about to list this directory.
    DirectoryEntered { path: PathBuf },
    /// Post-order: the directory and its subtree are done. Observability only.
    DirectoryVisited { path: PathBuf },
    /// About to enumerate a container.
    ContainerEntered { location: LogicalPath },
    Discovered(Discovery),
    Error {
        severity: Severity,
        location: String,
        message: String,
    },
    RootFinished { root: PathBuf, stats: RootStats },
    /// Emitted exactly once, after the last root.
    Complete(ScanSummary),
}

/// Per-root counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RootStats {
    pub discoveries: u64,
    pub directories: u64,
    pub containers: u64,
    pub errors: u64,
    pub fatal_errors: u64,
}

impl RootStats {
    pub fn merge(&mut self, other: &RootStats) {
        self.discoveries += other.discoveries;
        self.directories += other.directories;
        self.containers += other.containers;
        self.errors += other.errors;
        self.fatal_errors += other.fatal_errors;
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanSummary {
    pub roots: u64,
    pub totals: RootStats,
    pub duration: Duration,
}

/// Receiver of scan events.
pub trait ScanSink {
    fn emit(&mut self, event: ScanEvent);
}

impl ScanSink for Vec<ScanEvent> {
    fn emit(&mut self, event: ScanEvent) {
        self.push(event);
    }
}

impl ScanSink for Sender<ScanEvent> {
    fn emit(&mut self, event: ScanEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.send(event);
    }
}

/// Per-root front end to a sink: counts, logs, and applies severity rules.
pub(crate) struct Recorder<'s> {
    sink: &'s mut dyn ScanSink,
    root: PathBuf,
    markers: &'s [String],
    stats: RootStats,
}

impl<'s> Recorder<'s> {
    pub(crate) fn new(sink: &'s mut dyn ScanSink, root: PathBuf, markers: &'s [String]) -> Self {
        Self {
            sink,
            root,
            markers,
            stats: RootStats::default(),
        }
    }

    pub(crate) fn stats(&self) -> RootStats {
        self.stats
    }

    pub(crate) fn discovered(&mut self, logical_path: LogicalPath, physical_path: Option<PathBuf>) {
        self.stats.discoveries += 1;
        info!(path = %logical_path, "Found DICOM candidate");
        self.sink.emit(ScanEvent::Discovered(Discovery {
            logical_path,
            root: self.root.clone(),
            physical_path,
        }));
    }

    pub(crate) fn directory_entered(&mut self, path: PathBuf) {
        self.stats.directories += 1;
        info!("Visiting directory: {}", path.display());
        self.sink.emit(ScanEvent::DirectoryEntered { path });
    }

    pub(crate) fn directory_visited(&mut self, path: PathBuf) {
        info!("Directory visited: {}", path.display());
        self.sink.emit(ScanEvent::DirectoryVisited { path });
    }

    pub(crate) fn container_entered(&mut self, location: &LogicalPath) {
        self.stats.containers += 1;
        info!("Visiting archive: {location}");
        self.sink.emit(ScanEvent::ContainerEntered {
            location: location.clone(),
        });
    }

    /// Log `err` and, if it carries a transient-remote marker, log the
    /// escalated fatal record as well.
    pub(crate) fn error(&mut self, err: ScanError) {
        if err.is_fatal() {
            self.fatal(&err);
            return;
        }
        self.stats.errors += 1;
        let location = err.location();
        error!(path = %location, "{err}");
        self.sink.emit(ScanEvent::Error {
            severity: Severity::Error,
            location,
            message: err.to_string(),
        });
        if let Some(escalated) = err.escalate(self.markers) {
            self.fatal(&escalated);
        }
    }

    fn fatal(&mut self, err: &ScanError) {
        self.stats.fatal_errors += 1;
        let location = err.location();
        error!(severity = "fatal", path = %location, "{err}");
        self.sink.emit(ScanEvent::Error {
            severity: Severity::Fatal,
            location,
            message: err.to_string(),
        });
    }
}

//! DicomScout Core: archive-aware discovery of DICOM files.
//!
//! Walks a list of root directories, reports every file that looks like DICOM
//! (a `.dcm` extension or no extension at all), and looks inside zip and 7z
//! archives at any nesting depth, reporting those files under a logical path
//! that crosses the archive boundaries.
//!
//! # Modules
//!
//! - [`model`]: entry classification, logical paths, scan roots.
//! - [`scanner`]: directory walker, container descent, orchestration.
//! - [`report`]: renders discoveries as text, CSV or JSON lines.
//! - [`roots`]: root-list file parsing.
//! - [`config`]: tunables, loadable from JSON.
//! - [`error`]: error types.
pub mod config;
pub mod error;
pub mod model;
pub mod report;
pub mod roots;
pub mod scanner;

pub use config::ScanConfig;
pub use error::{ConfigError, ReportError, ScanError};
pub use model::{ContainerKind, EntryClass, LogicalPath, ScanRoot};
pub use report::{ReportFormat, ReportWriter};
pub use scanner::progress::{Discovery, RootStats, ScanEvent, ScanSink, ScanSummary, Severity};
pub use scanner::{start_scan, ScanHandle, ScanOrchestrator};

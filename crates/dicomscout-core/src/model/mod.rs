//! Data model shared by every scanner stage.
//!
//! Re-exports the entry classifier, the reporting-only logical path, and
//! scan roots.
pub mod entry;
pub mod logical_path;
pub mod scan_root;

pub use entry::{classify, extension_of, ContainerKind, EntryClass};
pub use logical_path::LogicalPath;
pub use scan_root::ScanRoot;

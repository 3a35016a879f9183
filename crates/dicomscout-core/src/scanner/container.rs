//! Container descent: enumerate an archive, report what qualifies, recurse
//! into archives nested inside it.
//!
//! Two container kinds are supported:
//!
//! - **Zip** is opened as a random-access [`ContainerHandle::RandomAccess`]:
//!   the central directory is read up front and entries are opened by index.
//! - **7z** is opened as a sequential [`ContainerHandle::Sequential`]:
//!   entries are decoded once, in stored order, each through a stream that is
//!   only valid inside the per-entry callback.
//!
//! Entries are visited in the container's native order. A nested archive is
//! copied to a [`ScopedArtifact`](super::materialize::ScopedArtifact), opened
//! from there, descended, closed, and deleted before the next entry is looked
//! at.
//!
//! # Failure granularity
//!
//! - A single unreadable entry is logged and enumeration continues.
//! - A container that cannot be opened, or whose enumeration breaks, returns
//!   an error to the caller, which logs it and moves on to *its* next entry.
//! - A panic inside a decoder is caught at the container boundary.
use super::{panic_message, ScanContext};
use crate::error::ScanError;
use crate::model::{classify, extension_of, ContainerKind, EntryClass, LogicalPath};
use sevenz_rust::{Password, SevenZReader};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

/// An opened archive. Dropping it releases the underlying file.
pub enum ContainerHandle {
    RandomAccess(ZipArchive<BufReader<File>>),
    Sequential(SevenZReader<File>),
}

impl ContainerHandle {
    /// Open the archive at `path` as `kind`. `location` is only used for errors.
    pub fn open(path: &Path, kind: ContainerKind, location: &LogicalPath) -> Result<Self, ScanError> {
        let open_error = |message: String| ScanError::ContainerOpen {
            location: location.to_string(),
            message,
        };
        match kind {
            ContainerKind::Zip => {
                let file = File::open(path).map_err(|e| open_error(e.to_string()))?;
                let archive =
                    ZipArchive::new(BufReader::new(file)).map_err(|e| open_error(e.to_string()))?;
                Ok(Self::RandomAccess(archive))
            }
            ContainerKind::SevenZ => {
                let reader = SevenZReader::open(path, Password::empty())
                    .map_err(|e| open_error(e.to_string()))?;
                Ok(Self::Sequential(reader))
            }
        }
    }
}

/// One archive entry, valid only for the iteration step that produced it.
pub struct EntryRef<'r> {
    pub name: &'r str,
    pub is_dir: bool,
    /// Lowercase extension of the entry's last path component.
    pub extension: String,
    pub reader: &'r mut dyn Read,
}

impl<'r> EntryRef<'r> {
    pub fn new(name: &'r str, is_dir: bool, reader: &'r mut dyn Read) -> Self {
        Self {
            name,
            is_dir,
            extension: extension_of(name).to_ascii_lowercase(),
            reader,
        }
    }
}

/// Open the archive at `path` and descend into it, containing any panic.
///
/// `depth` is the nesting depth of this archive (an archive found on disk is 1).
pub(crate) fn descend_path(
    ctx: &mut ScanContext<'_>,
    path: &Path,
    kind: ContainerKind,
    location: &LogicalPath,
    depth: usize,
) -> Result<(), ScanError> {
    check_depth(ctx, location, depth)?;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let handle = ContainerHandle::open(path, kind, location)?;
        descend(ctx, handle, location, depth)
    }));
    match outcome {
        Ok(result) => result,
        Err(payload) => Err(ScanError::Panicked {
            location: location.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Enumerate `handle`, consuming and closing it.
pub(crate) fn descend(
    ctx: &mut ScanContext<'_>,
    handle: ContainerHandle,
    prefix: &LogicalPath,
    depth: usize,
) -> Result<(), ScanError> {
    ctx.recorder.container_entered(prefix);
    match handle {
        ContainerHandle::RandomAccess(mut archive) => {
            for index in 0..archive.len() {
                let mut entry = match archive.by_index(index) {
                    Ok(entry) => entry,
                    // The archive file itself stopped reading; the remaining
                    // entries would all fail the same way.
                    Err(ZipError::Io(err)) => {
                        return Err(ScanError::ContainerRead {
                            location: prefix.to_string(),
                            message: err.to_string(),
                        });
                    }
                    Err(err) => {
                        ctx.recorder.error(ScanError::EntryRead {
                            location: format!("{prefix} (entry #{index})"),
                            message: err.to_string(),
                        });
                        continue;
                    }
                };
                let name = entry.name().to_string();
                let is_dir = entry.is_dir();
                if let Err(err) = visit_entry(ctx, EntryRef::new(&name, is_dir, &mut entry), prefix, depth)
                {
                    ctx.recorder.error(err);
                }
            }
            Ok(())
        }
        ContainerHandle::Sequential(mut reader) => reader
            .for_each_entries(|entry, stream| {
                let name = entry.name().to_string();
                let is_dir = entry.is_directory();
                let visited = visit_entry(ctx, EntryRef::new(&name, is_dir, &mut *stream), prefix, depth);
                let failed = visited.is_err();
                if let Err(err) = visited {
                    ctx.recorder.error(err);
                }
                // Entries of a solid block share one decoder: whatever the
                // visit left unread, on success or failure, must be consumed
                // so the next entry starts at its own data.
                let drained = io::copy(stream, &mut io::sink());
                if let Err(err) = drained {
                    if !failed {
                        ctx.recorder.error(ScanError::EntryRead {
                            location: prefix.child(&name).to_string(),
                            message: err.to_string(),
                        });
                    }
                }
                Ok(true)
            })
            .map_err(|err| ScanError::ContainerRead {
                location: prefix.to_string(),
                message: err.to_string(),
            }),
    }
}

/// Classify one entry and act on it.
///
/// Errors returned here are entry-level: the caller logs them and continues
/// with the next entry of the same container.
fn visit_entry(
    ctx: &mut ScanContext<'_>,
    entry: EntryRef<'_>,
    prefix: &LogicalPath,
    depth: usize,
) -> Result<(), ScanError> {
    let location = prefix.child(entry.name);
    match classify(entry.name, !entry.is_dir) {
        EntryClass::QualifyingFile => {
            ctx.recorder.discovered(location, None);
            Ok(())
        }
        EntryClass::NestedContainer(_) if entry.is_dir => {
            debug!("Skipping directory entry with archive name: {location}");
            Ok(())
        }
        EntryClass::NestedContainer(kind) => {
            check_depth(ctx, &location, depth + 1)?;
            let artifact = ctx
                .materializer
                .materialize(entry.reader, entry.name, &entry.extension)
                .map_err(|err| relocate(err, &location))?;
            debug!(
                "Materialised {location} ({} bytes) at {}",
                artifact.copied(),
                artifact.path().display()
            );
            // The nested handle is opened and closed inside `descend_path`,
            // so it is always released before the artifact is deleted.
            let result = descend_path(ctx, artifact.path(), kind, &location, depth + 1);
            if let Err(source) = artifact.release() {
                ctx.recorder.error(ScanError::TempFileIo {
                    entry: location.to_string(),
                    source,
                });
            }
            result
        }
        EntryClass::Ignore => Ok(()),
    }
}

fn check_depth(ctx: &ScanContext<'_>, location: &LogicalPath, depth: usize) -> Result<(), ScanError> {
    let max = ctx.config.max_nesting_depth;
    if depth > max {
        return Err(ScanError::NestingTooDeep {
            location: location.to_string(),
            max,
        });
    }
    Ok(())
}

/// Materialiser errors only know the entry name; report the full location.
fn relocate(err: ScanError, location: &LogicalPath) -> ScanError {
    match err {
        ScanError::TempFileIo { source, .. } => ScanError::TempFileIo {
            entry: location.to_string(),
            source,
        },
        ScanError::MaterializeLimit { max, .. } => ScanError::MaterializeLimit {
            location: location.to_string(),
            max,
        },
        other => other,
    }
}

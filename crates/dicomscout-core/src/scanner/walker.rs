//! Directory walker: one root, depth first, using `jwalk`.
//!
//! jwalk runs serially with sorted children, so a walk always yields the same
//! pre-order for the same tree. Sentinel directories are removed from their
//! parent's child list before jwalk ever reads them, which skips the whole
//! subtree without logging anything for it.
//!
//! Post-order ("directory visited") events are synthesised from depth changes:
//! an open directory is closed as soon as an entry at the same or a shallower
//! depth arrives. They are for progress display only.
use super::{container, ScanContext};
use crate::error::ScanError;
use crate::model::{classify, EntryClass, LogicalPath, ScanRoot};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Walk `root`, routing every regular file through the classifier.
///
/// Unreadable directories are logged and skipped (or end the walk, when
/// `abort_root_on_directory_error` is set). A root that does not exist is a
/// root-level error returned to the orchestrator.
pub(crate) fn walk(root: &ScanRoot, ctx: &mut ScanContext<'_>) -> Result<(), ScanError> {
    if root.is_sentinel_root() {
        debug!("Skipping sentinel root {}", root.path.display());
        return Ok(());
    }
    std::fs::metadata(&root.path).map_err(|source| ScanError::DirectoryRead {
        path: root.path.clone(),
        source,
    })?;

    let sentinel = root.sentinel.clone();
    let walker = jwalk::WalkDir::new(&root.path)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .parallelism(jwalk::Parallelism::Serial)
        .process_read_dir(move |_depth, _path, _state, children| {
            children.retain(|child| match child {
                Ok(entry) => {
                    !(entry.file_type().is_dir()
                        && !sentinel.is_empty()
                        && entry.file_name() == OsStr::new(sentinel.as_str()))
                }
                Err(_) => true,
            });
        });

    let mut open_dirs: Vec<(usize, PathBuf)> = Vec::new();

    for entry_result in walker {
        let mut entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                on_directory_error(ctx, &mut open_dirs, directory_error(&root.path, err))?;
                continue;
            }
        };

        close_dirs(ctx, &mut open_dirs, entry.depth);

        let path = entry.path();
        let file_type = entry.file_type();
        if file_type.is_dir() {
            ctx.recorder.directory_entered(path.clone());
            open_dirs.push((entry.depth, path));
            // jwalk attaches a failed read_dir to the directory's own entry.
            if let Some(err) = entry.read_children_error.take() {
                on_directory_error(ctx, &mut open_dirs, directory_error(&root.path, err))?;
            }
            continue;
        }

        let is_regular = file_type.is_file() || (file_type.is_symlink() && path.is_file());
        visit_file(ctx, &path, is_regular);
    }

    close_dirs(ctx, &mut open_dirs, 0);
    Ok(())
}

/// Classify one file on disk and report it or descend into it.
fn visit_file(ctx: &mut ScanContext<'_>, path: &Path, is_regular: bool) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    match classify(&name, is_regular) {
        EntryClass::QualifyingFile => {
            ctx.recorder
                .discovered(LogicalPath::from_fs(path), Some(path.to_path_buf()));
        }
        EntryClass::NestedContainer(kind) => {
            let location = LogicalPath::from_fs(path);
            if let Err(err) = container::descend_path(ctx, path, kind, &location, 1) {
                ctx.recorder.error(err);
            }
        }
        EntryClass::Ignore => {}
    }
}

/// Log an unreadable directory and carry on, or end the walk when the
/// config asks for that.
fn on_directory_error(
    ctx: &mut ScanContext<'_>,
    open_dirs: &mut Vec<(usize, PathBuf)>,
    error: ScanError,
) -> Result<(), ScanError> {
    if ctx.config.abort_root_on_directory_error {
        close_dirs(ctx, open_dirs, 0);
        return Err(error);
    }
    ctx.recorder.error(error);
    Ok(())
}

/// Emit post-order events for every open directory at `depth` or deeper.
fn close_dirs(ctx: &mut ScanContext<'_>, open_dirs: &mut Vec<(usize, PathBuf)>, depth: usize) {
    while open_dirs.last().is_some_and(|(d, _)| *d >= depth) {
        if let Some((_, path)) = open_dirs.pop() {
            ctx.recorder.directory_visited(path);
        }
    }
}

fn directory_error(root: &Path, err: jwalk::Error) -> ScanError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    ScanError::DirectoryRead { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::scanner::progress::ScanEvent;
    use std::fs;
    use tempfile::TempDir;

    fn run(config: &ScanConfig, root: &ScanRoot) -> (Vec<ScanEvent>, Result<(), ScanError>) {
        let mut events: Vec<ScanEvent> = Vec::new();
        let result = {
            let mut ctx = ScanContext::new(config, &mut events, root.path.clone());
            walk(root, &mut ctx)
        };
        (events, result)
    }

    fn discovered(events: &[ScanEvent]) -> Vec<PathBuf> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Discovered(d) => d.physical_path.clone(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn reports_in_sorted_pre_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("b").join("2.dcm"), b"").unwrap();
        fs::write(root.join("a").join("1.dcm"), b"").unwrap();
        fs::write(root.join("c.dcm"), b"").unwrap();
        fs::write(root.join("readme.txt"), b"").unwrap();

        let config = ScanConfig::default();
        let (events, result) = run(&config, &ScanRoot::new(root, "#recycle"));
        result.unwrap();
        assert_eq!(
            discovered(&events),
            [
                root.join("a").join("1.dcm"),
                root.join("b").join("2.dcm"),
                root.join("c.dcm"),
            ]
        );
    }

    /// Every entered directory is closed exactly once, after its children.
    #[test]
    fn post_order_events_follow_children() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a").join("deep")).unwrap();
        fs::write(root.join("a").join("deep").join("x.dcm"), b"").unwrap();
        fs::write(root.join("z.dcm"), b"").unwrap();

        let config = ScanConfig::default();
        let (events, _) = run(&config, &ScanRoot::new(root, "#recycle"));
        let trace: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::DirectoryEntered { path } => Some(format!("+{}", path.display())),
                ScanEvent::DirectoryVisited { path } => Some(format!("-{}", path.display())),
                ScanEvent::Discovered(d) => Some(format!("={}", d.logical_path)),
                _ => None,
            })
            .collect();
        let a = root.join("a");
        let deep = a.join("deep");
        assert_eq!(
            trace,
            [
                format!("+{}", root.display()),
                format!("+{}", a.display()),
                format!("+{}", deep.display()),
                format!("={}", deep.join("x.dcm").display()),
                format!("-{}", deep.display()),
                format!("-{}", a.display()),
                format!("={}", root.join("z.dcm").display()),
                format!("-{}", root.display()),
            ]
        );
    }

    #[test]
    fn sentinel_subtree_is_skipped_silently() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let recycle = root.join("sub").join("#recycle");
        fs::create_dir_all(&recycle).unwrap();
        fs::write(recycle.join("old.dcm"), b"").unwrap();
        fs::write(root.join("sub").join("new.dcm"), b"").unwrap();

        let config = ScanConfig::default();
        let (events, result) = run(&config, &ScanRoot::new(root, "#recycle"));
        result.unwrap();
        assert_eq!(discovered(&events), [root.join("sub").join("new.dcm")]);
        assert!(!events.iter().any(|e| matches!(e, ScanEvent::Error { .. })));
        assert!(!events.iter().any(|e| matches!(
            e,
            ScanEvent::DirectoryEntered { path } if path.ends_with("#recycle")
        )));
    }

    /// Only directories are excluded by name; a *file* called `#recycle` is a
    /// regular extension-less file.
    #[test]
    fn sentinel_named_file_is_not_excluded() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("#recycle"), b"").unwrap();
        let config = ScanConfig::default();
        let (events, _) = run(&config, &ScanRoot::new(tmp.path(), "#recycle"));
        assert_eq!(discovered(&events), [tmp.path().join("#recycle")]);
    }

    #[test]
    fn sentinel_root_visits_nothing() {
        let tmp = TempDir::new().unwrap();
        let recycle = tmp.path().join("#recycle");
        fs::create_dir(&recycle).unwrap();
        fs::write(recycle.join("old.dcm"), b"").unwrap();
        let config = ScanConfig::default();
        let (events, result) = run(&config, &ScanRoot::new(&recycle, "#recycle"));
        result.unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn missing_root_is_a_directory_error() {
        let tmp = TempDir::new().unwrap();
        let config = ScanConfig::default();
        let (events, result) = run(&config, &ScanRoot::new(tmp.path().join("gone"), "#recycle"));
        assert!(matches!(result, Err(ScanError::DirectoryRead { .. })));
        assert!(events.is_empty());
    }

    /// A root that is itself a file is classified like any other file.
    #[test]
    fn file_root_is_classified() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("IM0001");
        fs::write(&file, b"").unwrap();
        let config = ScanConfig::default();
        let (events, result) = run(&config, &ScanRoot::new(&file, "#recycle"));
        result.unwrap();
        assert_eq!(discovered(&events), [file]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_logged_and_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let locked = root.join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.dcm"), b"").unwrap();
        fs::write(root.join("visible.dcm"), b"").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Running with privileges that ignore permissions; nothing to test.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let config = ScanConfig::default();
        let (events, result) = run(&config, &ScanRoot::new(root, "#recycle"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        result.unwrap();
        assert_eq!(discovered(&events), [root.join("visible.dcm")]);
        assert!(events.iter().any(|e| matches!(e, ScanEvent::Error { .. })));

        let strict = ScanConfig {
            abort_root_on_directory_error: true,
            ..ScanConfig::default()
        };
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let (_, result) = run(&strict, &ScanRoot::new(root, "#recycle"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(ScanError::DirectoryRead { .. })));
    }
}

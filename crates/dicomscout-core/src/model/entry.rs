//! Entry classification: decides what a file or archive entry is, by name.
//!
//! Pure and total. The classifier never touches the filesystem; callers pass
//! the "is a regular file" flag they already know.

/// Extension of a qualifying imaging file.
pub const QUALIFYING_EXTENSION: &str = "dcm";

/// The two supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Zip: central directory, entries opened by index from a seekable file.
    Zip,
    /// 7z: entries decoded once, in stored order, as a stream.
    SevenZ,
}

impl ContainerKind {
    /// Lowercase extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::SevenZ => "7z",
        }
    }

    /// Map a (case-insensitive) extension to a container kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        [Self::Zip, Self::SevenZ]
            .into_iter()
            .find(|kind| ext.eq_ignore_ascii_case(kind.extension()))
    }
}

/// Result of classifying one name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    /// Report it.
    QualifyingFile,
    /// Open it and descend.
    NestedContainer(ContainerKind),
    /// Skip it.
    Ignore,
}

/// Extension of the last path component: the text after its last `.`.
///
/// Both `/` and `\` count as separators so archive entry names from either
/// platform work. A name without a dot has an empty extension; so does a name
/// ending in a dot.
pub fn extension_of(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(dot) => &base[dot + 1..],
        None => "",
    }
}

/// Classify `name`, applying the rules in order:
///
/// 1. ends with `.dcm` (any case): qualifying file;
/// 2. a regular file with no extension at all: qualifying file (a heuristic,
///    imaging exports are often extension-less);
/// 3. ends with `.zip` or `.7z` (any case): nested container;
/// 4. anything else: ignore.
pub fn classify(name: &str, is_regular_file: bool) -> EntryClass {
    let ext = extension_of(name);
    if ends_with_extension(name, QUALIFYING_EXTENSION) {
        return EntryClass::QualifyingFile;
    }
    if is_regular_file && ext.is_empty() {
        return EntryClass::QualifyingFile;
    }
    match ContainerKind::from_extension(ext) {
        Some(kind) => EntryClass::NestedContainer(kind),
        None => EntryClass::Ignore,
    }
}

/// Case-insensitive `name.ends_with(".{ext}")` without allocating.
fn ends_with_extension(name: &str, ext: &str) -> bool {
    let bytes = name.as_bytes();
    let needed = ext.len() + 1;
    if bytes.len() < needed {
        return false;
    }
    let tail = &bytes[bytes.len() - needed..];
    tail[0] == b'.' && tail[1..].eq_ignore_ascii_case(ext.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── extension_of ─────────────────────────────────────────────────────

    #[test]
    fn extension_uses_last_component_only() {
        assert_eq!(extension_of("inner.d/brain"), "");
        assert_eq!(extension_of(r"case.v2\scan"), "");
        assert_eq!(extension_of("inner/brain.dcm"), "dcm");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("trailing."), "");
        assert_eq!(extension_of("dir/"), "");
    }

    // ── classify ─────────────────────────────────────────────────────────

    #[test]
    fn dcm_is_qualifying_in_any_case() {
        for name in ["scan.dcm", "SCAN.DCM", "a/b/Scan.Dcm"] {
            assert_eq!(classify(name, true), EntryClass::QualifyingFile, "{name}");
        }
    }

    /// Rule 1 does not look at the regular-file flag.
    #[test]
    fn dcm_name_wins_even_when_not_regular() {
        assert_eq!(classify("odd.dcm", false), EntryClass::QualifyingFile);
    }

    #[test]
    fn extensionless_regular_file_is_qualifying() {
        assert_eq!(classify("IM000001", true), EntryClass::QualifyingFile);
        assert_eq!(classify("series/IM000001", true), EntryClass::QualifyingFile);
    }

    #[test]
    fn extensionless_directory_is_ignored() {
        assert_eq!(classify("series", false), EntryClass::Ignore);
        assert_eq!(classify("series/", false), EntryClass::Ignore);
    }

    #[test]
    fn containers_are_tagged_by_kind() {
        assert_eq!(
            classify("case.zip", true),
            EntryClass::NestedContainer(ContainerKind::Zip)
        );
        assert_eq!(
            classify("inner/Case.7Z", true),
            EntryClass::NestedContainer(ContainerKind::SevenZ)
        );
    }

    #[test]
    fn other_extensions_are_ignored() {
        for name in ["notes.txt", "image.png", "backup.rar", "x.dcmx", "a.zip.bak"] {
            assert_eq!(classify(name, true), EntryClass::Ignore, "{name}");
        }
    }

    /// A bare "zip" has no dot, so it is an extension-less file, not a container.
    #[test]
    fn container_word_without_dot_is_extensionless() {
        assert_eq!(classify("zip", true), EntryClass::QualifyingFile);
    }

    #[test]
    fn container_kind_round_trips_extension() {
        for kind in [ContainerKind::Zip, ContainerKind::SevenZ] {
            assert_eq!(ContainerKind::from_extension(kind.extension()), Some(kind));
        }
        assert_eq!(ContainerKind::from_extension("ZIP"), Some(ContainerKind::Zip));
        assert_eq!(ContainerKind::from_extension("rar"), None);
    }
}

//! Virtual path arithmetic.
//!
//! Folder virtual paths always start and end with `/` (`/docs/reports/`).
//! File virtual paths start with `/` and end with the on-disk file name
//! (`/docs/reports/<uuid>.pdf`). Empty segments are never significant, so
//! `docs`, `/docs` and `//docs/` all denote the same folder.

use std::path::{Path, PathBuf};

use super::EntryName;

/// Iterates over the non-empty segments of a virtual path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Normalises a folder path to the canonical `/a/b/` form. The empty path
/// normalises to `/`.
#[must_use]
pub fn normalize_folder_path(raw: &str) -> String {
    let mut out = String::from("/");
    for segment in segments(raw) {
        out.push_str(segment);
        out.push('/');
    }
    out
}

/// Normalises a file path to the canonical `/a/b/file.ext` form.
#[must_use]
pub fn normalize_file_path(raw: &str) -> String {
    let joined = segments(raw).collect::<Vec<_>>().join("/");
    format!("/{joined}")
}

/// Builds the virtual path of a folder named `name` under `parent`.
#[must_use]
pub fn child_folder_path(parent: &str, name: &EntryName) -> String {
    let mut out = normalize_folder_path(parent);
    out.push_str(name.as_str());
    out.push('/');
    out
}

/// Builds the virtual path of a file stored as `file_name` in `folder`.
#[must_use]
pub fn file_path(folder: &str, file_name: &str) -> String {
    let mut out = normalize_folder_path(folder);
    out.push_str(file_name);
    out
}

/// `true` when `candidate` is `ancestor` itself or lies beneath it.
/// Both arguments must be canonical folder paths.
#[must_use]
pub fn is_within(candidate: &str, ancestor: &str) -> bool {
    candidate.starts_with(ancestor)
}

/// Replaces the leading `old_prefix` of `path` with `new_prefix`.
#[must_use]
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    path.strip_prefix(old_prefix)
        .map(|rest| format!("{new_prefix}{rest}"))
}

/// Maps a virtual path onto the physical tree rooted at `base`.
#[must_use]
pub fn physical_path(base: &Path, virtual_path: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    out.extend(segments(virtual_path));
    out
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn name(raw: &str) -> EntryName {
        let Ok(name) = EntryName::parse(raw) else {
            panic!("valid name {raw}");
        };
        name
    }

    #[test]
    fn folder_paths_normalise() {
        assert_eq!(normalize_folder_path(""), "/");
        assert_eq!(normalize_folder_path("/"), "/");
        assert_eq!(normalize_folder_path("docs"), "/docs/");
        assert_eq!(normalize_folder_path("//docs//2024/"), "/docs/2024/");
    }

    #[test]
    fn file_paths_normalise() {
        assert_eq!(normalize_file_path("docs/a.png"), "/docs/a.png");
        assert_eq!(normalize_file_path("/docs//a.png"), "/docs/a.png");
    }

    #[test]
    fn child_paths_under_root_and_base() {
        assert_eq!(child_folder_path("/", &name("docs")), "/docs/");
        assert_eq!(child_folder_path("/files/", &name("docs")), "/files/docs/");
        assert_eq!(child_folder_path("/docs", &name("2024")), "/docs/2024/");
    }

    #[test]
    fn file_path_joins_folder_and_name() {
        assert_eq!(file_path("/docs/", "x.pdf"), "/docs/x.pdf");
        assert_eq!(file_path("/", "x.pdf"), "/x.pdf");
    }

    #[test]
    fn within_is_prefix_on_whole_segments() {
        assert!(is_within("/a/b/", "/a/"));
        assert!(is_within("/a/", "/a/"));
        assert!(!is_within("/ab/", "/a/"));
    }

    #[test]
    fn rebase_swaps_prefix() {
        assert_eq!(
            rebase("/a/b/c.txt", "/a/", "/z/"),
            Some("/z/b/c.txt".to_string())
        );
        assert_eq!(rebase("/q/c.txt", "/a/", "/z/"), None);
    }

    #[test]
    fn physical_path_skips_empty_segments() {
        let base = Path::new("/srv/storage");
        assert_eq!(
            physical_path(base, "/docs/2024/"),
            PathBuf::from("/srv/storage/docs/2024")
        );
        assert_eq!(physical_path(base, "/"), PathBuf::from("/srv/storage"));
    }
}

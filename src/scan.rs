//! Source discovery.
//!
//! Lists the input directory (flat, not recursive), keeps files whose
//! extension is in the configured set, and groups them by stem:
//!
//! ```text
//! images_original/chosen/
//! ├── beach.png        ┐
//! ├── beach.JPG        ┘→ "beach" → [beach.JPG, beach.png]
//! ├── forest.jpeg       → "forest" → [forest.jpeg]
//! ├── notes.txt         (extension not configured)
//! └── .DS_Store         (hidden)
//! ```
//!
//! When a stem has several candidates, [`canonical_source`] picks the one to
//! decode by a fixed format preference, independent of directory order.

use crate::naming::split_file_name;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::trace;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Input directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source extensions from most to least preferred as canonical source.
pub const SOURCE_PREFERENCE: &[&str] = &["avif", "webp", "png", "jpg", "jpeg"];

/// Candidate source files grouped by stem, each list sorted by path.
pub type SourceGroups = BTreeMap<String, Vec<PathBuf>>;

/// Scan `dir` for files with one of `extensions` (lowercase, no dot).
///
/// A missing directory is [`ScanError::DirectoryNotFound`]; an existing
/// directory without matches yields an empty map.
pub fn scan_sources(dir: &Path, extensions: &[String]) -> Result<SourceGroups, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut groups = SourceGroups::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.into_path();
        let Some((stem, ext)) = split_file_name(&path) else {
            continue;
        };
        if !extensions.iter().any(|e| *e == ext) {
            trace!("skipping {}", path.display());
            continue;
        }
        groups.entry(stem).or_default().push(path);
    }

    for paths in groups.values_mut() {
        paths.sort();
    }
    Ok(groups)
}

/// Preference rank of a source extension; lower wins. Unknown extensions
/// rank after every listed one.
pub fn source_rank(extension: &str) -> usize {
    let ext = extension.to_ascii_lowercase();
    SOURCE_PREFERENCE
        .iter()
        .position(|p| *p == ext)
        .unwrap_or(SOURCE_PREFERENCE.len())
}

/// The file to decode for a stem: best-ranked extension, ties broken by path.
pub fn canonical_source(paths: &[PathBuf]) -> Option<&Path> {
    paths
        .iter()
        .min_by(|a, b| {
            let rank = |p: &Path| {
                p.extension()
                    .map(|e| source_rank(&e.to_string_lossy()))
                    .unwrap_or(usize::MAX)
            };
            rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
        })
        .map(PathBuf::as_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        let result = scan_sources(&missing, &exts(&["png"]));
        assert!(matches!(result, Err(ScanError::DirectoryNotFound(p)) if p == missing));
    }

    #[test]
    fn empty_directory_is_empty_result() {
        let tmp = TempDir::new().unwrap();
        let groups = scan_sources(tmp.path(), &exts(&["png"])).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn groups_by_stem_with_case_insensitive_extensions() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "beach.png");
        touch(tmp.path(), "beach.JPG");
        touch(tmp.path(), "forest.jpeg");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), ".hidden.png");

        let groups = scan_sources(tmp.path(), &exts(&["jpg", "jpeg", "png"])).unwrap();
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["beach", "forest"]);
        assert_eq!(
            groups["beach"],
            vec![tmp.path().join("beach.JPG"), tmp.path().join("beach.png")]
        );
    }

    #[test]
    fn does_not_descend_into_subdirectories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("webp")).unwrap();
        touch(&tmp.path().join("webp"), "a_50.png");
        touch(tmp.path(), "a.png");

        let groups = scan_sources(tmp.path(), &exts(&["png"])).unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("a"));
    }

    #[test]
    fn directories_with_image_names_are_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("looks.png")).unwrap();
        let groups = scan_sources(tmp.path(), &exts(&["png"])).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn rank_follows_preference_order() {
        assert!(source_rank("avif") < source_rank("webp"));
        assert!(source_rank("webp") < source_rank("png"));
        assert!(source_rank("png") < source_rank("jpg"));
        assert!(source_rank("jpg") < source_rank("jpeg"));
        assert!(source_rank("jpeg") < source_rank("tiff"));
        assert_eq!(source_rank("PNG"), source_rank("png"));
    }

    #[test]
    fn canonical_source_prefers_best_format() {
        let paths = vec![
            PathBuf::from("in/a.jpg"),
            PathBuf::from("in/a.png"),
            PathBuf::from("in/a.avif"),
            PathBuf::from("in/a.webp"),
        ];
        assert_eq!(canonical_source(&paths), Some(Path::new("in/a.avif")));
    }

    #[test]
    fn canonical_source_ignores_enumeration_order() {
        let paths = [
            PathBuf::from("in/a.jpeg"),
            PathBuf::from("in/a.PNG"),
            PathBuf::from("in/a.jpg"),
        ];
        // every rotation and its reverse
        for shift in 0..paths.len() {
            let mut rotated = paths.to_vec();
            rotated.rotate_left(shift);
            assert_eq!(canonical_source(&rotated), Some(Path::new("in/a.PNG")));
            rotated.reverse();
            assert_eq!(canonical_source(&rotated), Some(Path::new("in/a.PNG")));
        }
    }

    #[test]
    fn canonical_source_empty_is_none() {
        assert_eq!(canonical_source(&[]), None);
    }
}

//! Local Inventory Source.
//!
//! Keys are paths relative to the **parent** of the scanned root, joined with
//! `/`, so the root directory's own name is the first segment of every key:
//!
//! ```text
//! /srv/photos/2024/a.jpg   (root = /srv/photos)  →  photos/2024/a.jpg
//! ```
//!
//! Renaming the root therefore changes every key.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use mirror_core::{LocalEntry, ObjectKey};

use crate::error::{io_err, InventoryError};

// ---------------------------------------------------------------------------
// Extension filter
// ---------------------------------------------------------------------------

/// Case-insensitive file-name suffix allow-list.
///
/// `"txt"`, `".txt"` and `".TXT"` are equivalent. An empty filter admits
/// every file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtensionFilter {
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();
        suffixes.sort();
        suffixes.dedup();
        Self { suffixes }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        if self.suffixes.is_empty() {
            return true;
        }
        let lower = file_name.to_lowercase();
        self.suffixes.iter().any(|suffix| lower.ends_with(suffix))
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Snapshot of the local tree taken at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInventory {
    /// Canonical root that was scanned.
    pub root: PathBuf,
    /// Directory keys are relative to (the root's parent).
    pub base: PathBuf,
    entries: BTreeMap<ObjectKey, LocalEntry>,
}

impl LocalInventory {
    pub fn get(&self, key: &ObjectKey) -> Option<&LocalEntry> {
        self.entries.get(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &ObjectKey> {
        self.entries.keys()
    }

    /// `(key, modification instant)` pairs in key order.
    pub fn modification_times(&self) -> impl Iterator<Item = (&ObjectKey, &DateTime<Utc>)> {
        self.entries.iter().map(|(k, e)| (k, &e.modified))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recursively list the files under `root`.
///
/// Fails with [`InventoryError::NotFound`] if `root` does not exist and
/// [`InventoryError::NotADirectory`] if it is not a directory. Symlinks are
/// followed. Dangling symlinks and non-UTF-8 paths are skipped with a warning.
pub fn scan(root: &Path, filter: Option<&ExtensionFilter>) -> Result<LocalInventory, InventoryError> {
    let root = match std::fs::canonicalize(root) {
        Ok(path) => path,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(InventoryError::NotFound {
                path: root.to_path_buf(),
            })
        }
        Err(err) => return Err(io_err(root, err)),
    };
    if !root.is_dir() {
        return Err(InventoryError::NotADirectory { path: root });
    }
    let base = root
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.clone());

    let mut entries = BTreeMap::new();
    for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_dangling_link(&err) => {
                if let Some(path) = err.path() {
                    tracing::warn!(path = %path.display(), "skipping dangling symlink");
                }
                continue;
            }
            Err(source) => {
                return Err(InventoryError::Walk {
                    root: root.clone(),
                    source,
                })
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(filter) = filter {
            if !filter.matches(&entry.file_name().to_string_lossy()) {
                continue;
            }
        }
        let Some(key) = key_for(&base, entry.path()) else {
            tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 path");
            continue;
        };
        let metadata = entry.metadata().map_err(|source| InventoryError::Walk {
            root: root.clone(),
            source,
        })?;
        let modified = metadata.modified().map_err(|e| io_err(entry.path(), e))?;
        entries.insert(
            key.clone(),
            LocalEntry {
                key,
                path: entry.path().to_path_buf(),
                modified: DateTime::<Utc>::from(modified),
            },
        );
    }

    tracing::debug!(root = %root.display(), files = entries.len(), "scanned local tree");
    Ok(LocalInventory {
        root,
        base,
        entries,
    })
}

/// A symlink whose target no longer exists. Loops and permission errors are
/// not dangling links.
fn is_dangling_link(err: &walkdir::Error) -> bool {
    let target_missing = err
        .io_error()
        .is_some_and(|io| io.kind() == ErrorKind::NotFound);
    target_missing
        && err.path().is_some_and(|path| {
            std::fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
        })
}

/// Forward-slash key for `path` relative to `base`, or `None` if any segment
/// is not valid UTF-8.
pub fn key_for(base: &Path, path: &Path) -> Option<ObjectKey> {
    let relative = path.strip_prefix(base).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?),
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(ObjectKey::from(segments.join("/")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_tree() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("test_dir");
        fs::create_dir_all(root.join("subdir")).expect("mkdir");
        fs::write(root.join("file1.txt"), "1").expect("write");
        fs::write(root.join("file2.pdf"), "2").expect("write");
        fs::write(root.join("file3.PDF"), "3").expect("write");
        fs::write(root.join("subdir").join("file4.txt"), "4").expect("write");
        (tmp, root)
    }

    fn keys(inventory: &LocalInventory) -> Vec<String> {
        inventory.keys().map(|k| k.to_string()).collect()
    }

    #[test]
    fn lists_all_files_with_root_name_prefix() {
        let (_tmp, root) = setup_tree();
        let inventory = scan(&root, None).expect("scan");
        assert_eq!(
            keys(&inventory),
            vec![
                "test_dir/file1.txt",
                "test_dir/file2.pdf",
                "test_dir/file3.PDF",
                "test_dir/subdir/file4.txt",
            ]
        );
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        let (_tmp, root) = setup_tree();
        let filter = ExtensionFilter::new([".pdf"]);
        let inventory = scan(&root, Some(&filter)).expect("scan");
        assert_eq!(keys(&inventory), vec!["test_dir/file2.pdf", "test_dir/file3.PDF"]);
    }

    #[test]
    fn extension_filter_accepts_bare_extensions() {
        let (_tmp, root) = setup_tree();
        let filter = ExtensionFilter::new(["TXT"]);
        let inventory = scan(&root, Some(&filter)).expect("scan");
        assert_eq!(
            keys(&inventory),
            vec!["test_dir/file1.txt", "test_dir/subdir/file4.txt"]
        );
    }

    #[test]
    fn empty_filter_admits_everything() {
        let filter = ExtensionFilter::new(Vec::<String>::new());
        assert!(filter.matches("anything.bin"));
        assert!(filter.suffixes().is_empty());
    }

    #[test]
    fn nonexistent_root_is_not_found() {
        let tmp = TempDir::new().expect("tempdir");
        let err = scan(&tmp.path().join("missing"), None).unwrap_err();
        assert!(matches!(err, InventoryError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let (_tmp, root) = setup_tree();
        let err = scan(&root.join("file1.txt"), None).unwrap_err();
        assert!(matches!(err, InventoryError::NotADirectory { .. }), "got: {err}");
    }

    #[test]
    fn entries_carry_absolute_paths() {
        let (_tmp, root) = setup_tree();
        let inventory = scan(&root, None).expect("scan");
        let entry = inventory
            .get(&ObjectKey::from("test_dir/subdir/file4.txt"))
            .expect("entry");
        assert!(entry.path.is_absolute());
        assert_eq!(fs::read_to_string(&entry.path).expect("read"), "4");
    }

    #[test]
    fn empty_directory_yields_empty_inventory() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("empty");
        fs::create_dir_all(root.join("nested")).expect("mkdir");
        let inventory = scan(&root, None).expect("scan");
        assert!(inventory.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("photos");
        fs::create_dir_all(&root).expect("mkdir");
        fs::write(root.join("a.txt"), "a").expect("write");
        std::os::unix::fs::symlink(root.join("missing.txt"), root.join("link.txt"))
            .expect("symlink");

        let inventory = scan(&root, None).expect("scan");
        assert_eq!(keys(&inventory), vec!["photos/a.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn live_symlink_is_followed() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("photos");
        fs::create_dir_all(&root).expect("mkdir");
        fs::write(tmp.path().join("outside.txt"), "o").expect("write");
        std::os::unix::fs::symlink(tmp.path().join("outside.txt"), root.join("link.txt"))
            .expect("symlink");

        let inventory = scan(&root, None).expect("scan");
        assert_eq!(keys(&inventory), vec!["photos/link.txt"]);
    }

    #[test]
    fn key_for_rejects_paths_outside_base() {
        assert_eq!(key_for(Path::new("/a/b"), Path::new("/c/d.txt")), None);
        assert_eq!(
            key_for(Path::new("/a"), Path::new("/a/b/c.txt")),
            Some(ObjectKey::from("b/c.txt"))
        );
    }
}

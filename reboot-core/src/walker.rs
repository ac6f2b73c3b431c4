//! Source Tree Walker
//!
//! Enumerates candidate source files under a root directory, lazily and
//! in lexicographic order so runs are reproducible and diffable.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazily yields every Java source file under `root`. Unreadable entries
/// are reported and skipped, never fatal; symlinks are not followed, so
/// link cycles cannot trap the walk.
pub fn source_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "java"))
}

//! Directory walker: lazy, single-pass enumeration of candidate files.

use crate::error::{DredgeError, Result};
use crate::filter::NameFilter;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Yields the plain files under `root` whose names pass the name filter.
///
/// Subdirectories are descended only when `recursive` is set and are never
/// yielded themselves. Entries come back sorted by file name within each
/// directory. The first listing error is returned once and ends the walk.
pub struct DirWalker {
    inner: walkdir::IntoIter,
    names: NameFilter,
    done: bool,
}

impl DirWalker {
    pub fn new(root: &Path, recursive: bool, names: NameFilter) -> Self {
        let walk = WalkDir::new(root)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .sort_by_file_name();
        Self {
            inner: walk.into_iter(),
            names,
            done: false,
        }
    }
}

impl Iterator for DirWalker {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    self.done = true;
                    return Some(Err(DredgeError::Walk(err)));
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            // Links to directories are not followed; they count as directories.
            if file_type.is_symlink() && entry.path().is_dir() {
                continue;
            }

            let matched = self.names.matches(&entry.file_name().to_string_lossy());
            if matched {
                return Some(Ok(entry.into_path()));
            }
        }
    }
}

impl std::iter::FusedIterator for DirWalker {}

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Metadata directory suffix for Git repositories, bare mirrors included.
pub const GIT_SUFFIX: &str = ".git";

/// Lazily walks a directory tree, yielding every directory whose name ends with
/// the repository suffix. Siblings are visited in file-name order and the walk
/// never descends into a directory it has yielded.
pub struct RepoIter {
    walker: walkdir::IntoIter,
    suffix: String,
}

impl RepoIter {
    pub fn new(root: &Path, suffix: &str, max_depth: Option<usize>) -> Self {
        let mut walk = WalkDir::new(root).follow_links(false).sort_by_file_name();
        if let Some(depth) = max_depth {
            walk = walk.max_depth(depth);
        }
        Self {
            walker: walk.into_iter(),
            suffix: suffix.to_string(),
        }
    }

    fn is_repo(&self, entry: &walkdir::DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .map_or(false, |name| name.ends_with(&self.suffix))
    }
}

impl Iterator for RepoIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable path: {e}");
                    continue;
                }
            };
            if self.is_repo(&entry) {
                self.walker.skip_current_dir();
                if entry.path().to_str().is_none() {
                    warn!("skipping repository with non UTF-8 path: {}", entry.path().display());
                    continue;
                }
                return Some(entry.into_path());
            }
        }
    }
}

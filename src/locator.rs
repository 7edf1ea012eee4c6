//! Discovery of lockfiles and manifests under a source tree.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::{Config, VENDOR_DIR};
use crate::error::{Error, Result};

pub const LOCKFILE: &str = "Cargo.lock";
pub const MANIFEST: &str = "Cargo.toml";

/// Recursively finds files by name, skipping excluded directory names.
///
/// # Example
///
/// ```no_run
/// use lockfile_audit::locator::{Locator, LOCKFILE};
/// use std::path::Path;
///
/// let locator = Locator::new(["vendor"]);
/// for lockfile in locator.find(Path::new("."), LOCKFILE)? {
///     println!("{}", lockfile.display());
/// }
/// # Ok::<(), lockfile_audit::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Locator {
    excluded: Vec<String>,
}

impl Locator {
    /// Creates a locator excluding `vendor` plus the given directory names.
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = vec![VENDOR_DIR.to_string()];
        for name in excluded {
            let name = name.into();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self { excluded: names }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.excluded_dirs())
    }

    /// Returns absolute paths of all files named `file_name` under `root`.
    ///
    /// Directories whose name is excluded are pruned below the root. Directory
    /// symlinks are not descended into, but a symlinked file is returned when
    /// its target is a regular file. Unreadable entries are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceDir`] if `root` does not exist or cannot be resolved.
    pub fn find(&self, root: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
        let root = std::fs::canonicalize(root).map_err(|source| Error::SourceDir {
            path: root.to_path_buf(),
            source,
        })?;

        let mut found = Vec::new();
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(
                        path = ?e.path().map(Path::display),
                        error = %e,
                        "skipping unreadable entry"
                    );
                    continue;
                }
            };

            // `Path::is_file` follows the link, `DirEntry::file_type` does not.
            if entry.file_name() == file_name && entry.path().is_file() {
                found.push(entry.into_path());
            }
        }

        Ok(found)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .map(|name| self.excluded.iter().any(|x| x == name))
                .unwrap_or(false)
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

//! Enumeration of capture files under a search root.

use crate::core::error::{Error, Result};
use crate::core::types::SearchRequest;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file selected for searching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Path of the file
    pub path: PathBuf,
    /// Size in bytes at enumeration time
    pub size: u64,
}

/// Recursive, extension-filtered file enumeration.
#[derive(Debug, Clone, Default)]
pub struct FileCatalog {
    follow_symlinks: bool,
}

impl FileCatalog {
    /// Create a catalog that does not follow symbolic links.
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow (or not) symbolic links while walking.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Check that the root can be searched at all.
    pub fn validate_root(root: &Path) -> Result<()> {
        let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::PathNotFound(root.to_path_buf()),
            _ => Error::DirectoryAccess {
                path: root.to_path_buf(),
                source: e,
            },
        })?;

        if !metadata.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }

        std::fs::read_dir(root).map_err(|e| Error::DirectoryAccess {
            path: root.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Snapshot every matching file below the request root, sorted by path.
    ///
    /// Unreadable subdirectories and entries are skipped; only a bad root is
    /// an error.
    pub fn enumerate(&self, request: &SearchRequest) -> Result<Vec<CatalogEntry>> {
        if request.file_extensions.is_empty() {
            return Err(Error::NoExtensions);
        }
        Self::validate_root(&request.root_path)?;

        let mut entries = Vec::new();
        let walker = WalkDir::new(&request.root_path).follow_links(self.follow_symlinks);

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !request.matches_extension(entry.path()) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    log::debug!("Skipping {:?}: {}", entry.path(), e);
                    continue;
                }
            };

            entries.push(CatalogEntry {
                path: entry.into_path(),
                size,
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        log::info!(
            "Found {} file(s) under {:?}",
            entries.len(),
            request.root_path
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_enumerate_recursive_by_extension() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("day1").join("session");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a.pcap"), b"1234").unwrap();
        fs::write(nested.join("b.PCAPNG"), b"12").unwrap();
        fs::write(nested.join("notes.txt"), b"skip").unwrap();
        fs::create_dir(dir.path().join("dir.pcap")).unwrap();

        let request = SearchRequest::new(dir.path(), ["pcap", "pcapng"], 1);
        let entries = FileCatalog::new().enumerate(&request).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, dir.path().join("a.pcap"));
        assert_eq!(entries[0].size, 4);
        assert_eq!(entries[1].path, nested.join("b.PCAPNG"));
        assert_eq!(entries[1].size, 2);
    }

    #[test]
    fn test_empty_root() {
        let dir = tempdir().unwrap();
        let request = SearchRequest::new(dir.path(), ["pcap"], 1);
        assert!(FileCatalog::new().enumerate(&request).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root() {
        let dir = tempdir().unwrap();
        let request = SearchRequest::new(dir.path().join("missing"), ["pcap"], 1);
        let err = FileCatalog::new().enumerate(&request).unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
        assert!(err.is_path_error());
    }

    #[test]
    fn test_root_is_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.pcap");
        fs::write(&file, b"").unwrap();

        let request = SearchRequest::new(&file, ["pcap"], 1);
        let err = FileCatalog::new().enumerate(&request).unwrap_err();
        assert!(matches!(err, Error::NotADirectory(_)));
    }

    #[test]
    fn test_no_extensions() {
        let dir = tempdir().unwrap();
        let request = SearchRequest::new(dir.path(), Vec::<String>::new(), 1);
        assert!(matches!(
            FileCatalog::new().enumerate(&request),
            Err(Error::NoExtensions)
        ));
    }
}

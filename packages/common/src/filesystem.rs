use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File system abstraction for source reads, atomic writes and testing
pub trait FileSystem: Send + Sync {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Canonicalize a path (resolve symlinks, make absolute)
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, io::Error>;

    fn read_to_string(&self, path: &Path) -> Result<String, io::Error>;

    /// Replace the file's contents so that readers see either the old or the
    /// new text, never a partial write
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), io::Error>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, io::Error> {
        std::fs::canonicalize(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, io::Error> {
        std::fs::read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), io::Error> {
        // The temp file must live on the same file system for the rename
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(contents.as_bytes())?;
        file.as_file().sync_all()?;

        if let Ok(metadata) = std::fs::metadata(path) {
            // Keep the permissions of the file being replaced
            file.as_file().set_permissions(metadata.permissions())?;
        }

        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-memory file system for testing
#[derive(Default)]
pub struct MockFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    failing_writes: Mutex<HashSet<PathBuf>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.lock().insert(path.into(), contents.into());
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.lock().get(path).cloned()
    }

    /// Make every write to `path` fail with a permission error
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        self.failing_writes.lock().insert(path.into());
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, io::Error> {
        // For mock, just return the path as-is
        Ok(path.to_path_buf())
    }

    fn read_to_string(&self, path: &Path) -> Result<String, io::Error> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), io::Error> {
        if self.failing_writes.lock().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                path.display().to_string(),
            ));
        }
        self.files.lock().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_atomic_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.tsx");
        std::fs::write(&path, "old").unwrap();

        RealFileSystem.write_atomic(&path, "new contents").unwrap();

        assert_eq!(RealFileSystem.read_to_string(&path).unwrap(), "new contents");
        // No temp files left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_mock_file_system() {
        let fs = MockFileSystem::new();
        let path = PathBuf::from("/app/page.tsx");
        fs.add_file(&path, "a");

        assert!(fs.exists(&path));
        assert_eq!(fs.read_to_string(&path).unwrap(), "a");

        fs.write_atomic(&path, "b").unwrap();
        assert_eq!(fs.contents(&path).as_deref(), Some("b"));

        fs.fail_writes_to(&path);
        assert!(fs.write_atomic(&path, "c").is_err());
        assert_eq!(fs.contents(&path).as_deref(), Some("b"));

        assert!(fs.read_to_string(Path::new("/missing.tsx")).is_err());
    }
}

//! Storage backends for the cache store.

use super::CacheIndex;
use crate::errors::CacheError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Raw storage for encoded values and the entry index.
///
/// Implementations do no locking across processes; the index is replaced as
/// a whole on every write.
pub trait CacheBackend: Send + Sync + Debug {
    /// Reads the blob stored under `digest`, if any.
    fn read_blob(&self, digest: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Writes the blob for `digest`, replacing any previous one.
    fn write_blob(&self, digest: &str, bytes: &[u8]) -> Result<(), CacheError>;

    /// Removes the blob for `digest`. Missing blobs are not an error.
    fn remove_blob(&self, digest: &str) -> Result<(), CacheError>;

    /// Loads the index. A backend that has never been written returns an empty index.
    fn load_index(&self) -> Result<CacheIndex, CacheError>;

    /// Replaces the index.
    fn save_index(&self, index: &CacheIndex) -> Result<(), CacheError>;

    /// Lists the digests of every stored blob, whether or not the index knows them.
    fn list_blobs(&self) -> Result<Vec<String>, CacheError>;
}

/// Stores each value in `<root>/<digest>.bin` and the index in `<root>/index.json`.
#[derive(Debug, Clone)]
pub struct FsCacheBackend {
    root: PathBuf,
}

impl FsCacheBackend {
    /// Index file name.
    pub const INDEX_FILE: &'static str = "index.json";

    /// Creates a backend rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the blob stored under `digest`.
    #[must_use]
    pub fn blob_path(&self, digest: &str) -> PathBuf {
        self.root.join(format!("{digest}.bin"))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(Self::INDEX_FILE)
    }

    fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root).map_err(|source| CacheError::Io {
            path: self.root.clone(),
            source,
        })
    }
}

impl CacheBackend for FsCacheBackend {
    fn read_blob(&self, digest: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.blob_path(digest);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    fn write_blob(&self, digest: &str, bytes: &[u8]) -> Result<(), CacheError> {
        self.ensure_dir()?;
        let path = self.blob_path(digest);
        fs::write(&path, bytes).map_err(|source| CacheError::Io { path, source })
    }

    fn remove_blob(&self, digest: &str) -> Result<(), CacheError> {
        let path = self.blob_path(digest);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    fn load_index(&self) -> Result<CacheIndex, CacheError> {
        let path = self.index_path();
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(CacheIndex::new()),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    fn save_index(&self, index: &CacheIndex) -> Result<(), CacheError> {
        self.ensure_dir()?;
        let path = self.index_path();
        let json = serde_json::to_vec_pretty(index)?;
        fs::write(&path, json).map_err(|source| CacheError::Io { path, source })
    }

    fn list_blobs(&self) -> Result<Vec<String>, CacheError> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut digests = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|source| CacheError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "bin") && path.is_file() {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    digests.push(stem.to_string());
                }
            }
        }
        digests.sort();
        Ok(digests)
    }
}

/// Keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    blobs: DashMap<String, Vec<u8>>,
    index: Mutex<CacheIndex>,
}

impl MemoryCacheBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn read_blob(&self, digest: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.blobs.get(digest).map(|b| b.value().clone()))
    }

    fn write_blob(&self, digest: &str, bytes: &[u8]) -> Result<(), CacheError> {
        self.blobs.insert(digest.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove_blob(&self, digest: &str) -> Result<(), CacheError> {
        self.blobs.remove(digest);
        Ok(())
    }

    fn load_index(&self) -> Result<CacheIndex, CacheError> {
        Ok(self.index.lock().clone())
    }

    fn save_index(&self, index: &CacheIndex) -> Result<(), CacheError> {
        *self.index.lock() = index.clone();
        Ok(())
    }

    fn list_blobs(&self) -> Result<Vec<String>, CacheError> {
        let mut digests: Vec<String> = self.blobs.iter().map(|e| e.key().clone()).collect();
        digests.sort();
        Ok(digests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_backend_blob_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let backend = FsCacheBackend::new(tmp.path().join("cache"));

        assert_eq!(backend.read_blob("abc").unwrap(), None);
        backend.write_blob("abc", b"payload").unwrap();
        assert!(backend.blob_path("abc").exists());
        assert_eq!(backend.read_blob("abc").unwrap(), Some(b"payload".to_vec()));

        backend.remove_blob("abc").unwrap();
        backend.remove_blob("abc").unwrap();
        assert_eq!(backend.read_blob("abc").unwrap(), None);
    }

    #[test]
    fn test_fs_backend_lists_only_blobs() {
        let tmp = TempDir::new().unwrap();
        let backend = FsCacheBackend::new(tmp.path().join("cache"));
        assert!(backend.list_blobs().unwrap().is_empty());

        backend.write_blob("bbb", b"2").unwrap();
        backend.write_blob("aaa", b"1").unwrap();
        backend.save_index(&CacheIndex::new()).unwrap();

        assert_eq!(backend.list_blobs().unwrap(), vec!["aaa", "bbb"]);
    }

    #[test]
    fn test_fs_backend_missing_index_is_empty() {
        let tmp = TempDir::new().unwrap();
        let backend = FsCacheBackend::new(tmp.path());
        assert!(backend.load_index().unwrap().is_empty());
    }

    #[test]
    fn test_fs_backend_corrupt_index_errors() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(FsCacheBackend::INDEX_FILE), "{not json").unwrap();
        let backend = FsCacheBackend::new(tmp.path());
        assert!(matches!(backend.load_index(), Err(CacheError::Index(_))));
    }

    #[test]
    fn test_memory_backend_blob_lifecycle() {
        let backend = MemoryCacheBackend::new();
        backend.write_blob("abc", b"1").unwrap();
        assert_eq!(backend.read_blob("abc").unwrap(), Some(b"1".to_vec()));
        backend.remove_blob("abc").unwrap();
        assert_eq!(backend.read_blob("abc").unwrap(), None);
        assert!(backend.load_index().unwrap().is_empty());
    }
}

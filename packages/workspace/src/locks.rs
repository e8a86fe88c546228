use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use unicode_normalization::UnicodeNormalization;

/// Key used for per-path state: the NFC form of the path, so that the same
/// file reported with composed and decomposed names maps to one entry
pub fn normalize_path(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().nfc().collect::<String>())
}

/// One async lock per file path. Scans, diff production and writes of the
/// same file take the lock, so they never interleave.
#[derive(Clone, Default)]
pub struct PathLocks {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .entry(normalize_path(path))
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Drop locks nobody is holding or waiting on
    pub fn prune(&self) {
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Paths with a lock entry
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

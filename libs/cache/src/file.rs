//! Content-addressed store for single source files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quarry_id::FileId;
use tracing::{debug, info};

use crate::error::CacheError;
use crate::registry::EntryRegistry;

struct Inner {
    root: PathBuf,
    staging: PathBuf,
    registry: EntryRegistry<FileId>,
}

/// Single-writer, multi-reader file store. Committed files live at
/// `<root>/<id-hex>`; in-flight writes stage under `<root>/staging`.
#[derive(Clone)]
pub struct FileCache {
    inner: Arc<Inner>,
}

impl FileCache {
    /// Opens a cache rooted at `root`, creating it if needed.
    /// Committed entries already on disk are re-registered; stale
    /// staging files from a previous crash are discarded.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        let staging = root.join("staging");
        fs::create_dir_all(&root)?;
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let registry = EntryRegistry::new();
        let mut recovered = 0usize;
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| FileId::parse(name).ok())
            {
                registry.register_ready(id);
                recovered += 1;
            }
        }
        if recovered > 0 {
            info!(count = recovered, root = %root.display(), "recovered file cache entries");
        }

        Ok(Self {
            inner: Arc::new(Inner {
                root,
                staging,
                registry,
            }),
        })
    }

    /// Claims `id` and returns a staging guard to write into. Fails
    /// with [`CacheError::AlreadyExists`] if the entry exists in any
    /// state. Dropping the guard without committing aborts the write.
    pub fn create(&self, id: FileId) -> Result<PendingFile, CacheError> {
        self.inner.registry.begin_write(id)?;
        let staging = self.inner.staging.join(id.to_string());
        debug!(id = %id, "file cache write started");
        Ok(PendingFile {
            inner: Arc::clone(&self.inner),
            id,
            staging,
            committed: false,
        })
    }

    /// Writes `bytes` under `id` in one step: create, write, commit.
    pub fn put_bytes(&self, id: FileId, bytes: &[u8]) -> Result<(), CacheError> {
        let pending = self.create(id)?;
        fs::write(pending.path(), bytes)?;
        pending.commit()
    }

    /// Takes a read handle on a committed file. Waits while the entry
    /// is being written; fails with [`CacheError::NotFound`] if it is
    /// absent or the write aborts.
    pub async fn get(&self, id: FileId) -> Result<FileHandle, CacheError> {
        self.inner.registry.acquire(id).await?;
        Ok(FileHandle {
            path: self.inner.root.join(id.to_string()),
            inner: Arc::clone(&self.inner),
            id,
        })
    }

    /// Whether `id` is committed right now.
    pub fn contains(&self, id: FileId) -> bool {
        self.inner.registry.is_ready(id)
    }

    /// Evicts a committed entry with no readers.
    pub fn remove(&self, id: FileId) -> Result<(), CacheError> {
        self.inner.registry.remove(id)?;
        fs::remove_file(self.inner.root.join(id.to_string()))?;
        Ok(())
    }
}

/// Refcounted read handle; the entry stays pinned until drop.
pub struct FileHandle {
    inner: Arc<Inner>,
    id: FileId,
    path: PathBuf,
}

impl FileHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        self.inner.registry.release(self.id);
    }
}

/// Staging guard returned by [`FileCache::create`].
pub struct PendingFile {
    inner: Arc<Inner>,
    id: FileId,
    staging: PathBuf,
    committed: bool,
}

impl PendingFile {
    /// The staging path to write into.
    pub fn path(&self) -> &Path {
        &self.staging
    }

    /// Atomically publishes the staged file and marks the entry ready.
    pub fn commit(mut self) -> Result<(), CacheError> {
        let target = self.inner.root.join(self.id.to_string());
        fs::rename(&self.staging, target)?;
        self.committed = true;
        self.inner.registry.commit(self.id);
        debug!(id = %self.id, "file cache write committed");
        Ok(())
    }

    /// Discards the staged file. Equivalent to dropping the guard.
    pub fn abort(self) {}
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.staging);
            self.inner.registry.abort(self.id);
            debug!(id = %self.id, "file cache write aborted");
        }
    }
}

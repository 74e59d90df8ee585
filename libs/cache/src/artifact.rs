//! Content-addressed store for artifact directories.
//!
//! Mirrors [`crate::file::FileCache`] but each entry is a directory
//! tree, and entries move between workers as tar streams (see
//! [`crate::tarstream`] and [`download`]).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quarry_id::{JobId, WorkerId};
use tracing::{debug, info};

use crate::client::TransferError;
use crate::error::CacheError;
use crate::registry::EntryRegistry;
use crate::tarstream;

struct Inner {
    root: PathBuf,
    staging: PathBuf,
    registry: EntryRegistry<JobId>,
}

/// Single-writer, multi-reader artifact store. Committed artifact
/// directories live at `<root>/<job-id-hex>`.
#[derive(Clone)]
pub struct ArtifactCache {
    inner: Arc<Inner>,
}

impl ArtifactCache {
    /// Opens a cache rooted at `root`, creating it if needed and
    /// re-registering artifact directories left by a previous run.
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
            if !entry.file_type()?.is_dir() || entry.path() == staging {
                continue;
            }
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| JobId::parse(name).ok())
            {
                registry.register_ready(id);
                recovered += 1;
            }
        }
        if recovered > 0 {
            info!(count = recovered, root = %root.display(), "recovered artifacts");
        }

        Ok(Self {
            inner: Arc::new(Inner {
                root,
                staging,
                registry,
            }),
        })
    }

    /// Claims `id` and returns a fresh staging directory to populate.
    /// Dropping the guard without committing aborts.
    pub fn create(&self, id: JobId) -> Result<PendingArtifact, CacheError> {
        self.inner.registry.begin_write(id)?;
        let staging = self.inner.staging.join(id.to_string());
        if let Err(e) = fs::create_dir(&staging) {
            self.inner.registry.abort(id);
            return Err(e.into());
        }
        debug!(id = %id, "artifact staging started");
        Ok(PendingArtifact {
            inner: Arc::clone(&self.inner),
            id,
            staging,
            committed: false,
        })
    }

    /// Takes a read handle on a committed artifact directory. Waits
    /// out an in-flight write; fails with [`CacheError::NotFound`] if
    /// the entry is absent or the write aborts.
    pub async fn get(&self, id: JobId) -> Result<ArtifactHandle, CacheError> {
        self.inner.registry.acquire(id).await?;
        Ok(ArtifactHandle {
            path: self.inner.root.join(id.to_string()),
            inner: Arc::clone(&self.inner),
            id,
        })
    }

    /// Whether `id` is committed right now.
    pub fn contains(&self, id: JobId) -> bool {
        self.inner.registry.is_ready(id)
    }

    /// Evicts a committed artifact with no readers.
    pub fn remove(&self, id: JobId) -> Result<(), CacheError> {
        self.inner.registry.remove(id)?;
        fs::remove_dir_all(self.inner.root.join(id.to_string()))?;
        Ok(())
    }
}

/// Refcounted read handle on an artifact directory.
pub struct ArtifactHandle {
    inner: Arc<Inner>,
    id: JobId,
    path: PathBuf,
}

impl ArtifactHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactHandle {
    fn drop(&mut self) {
        self.inner.registry.release(self.id);
    }
}

/// Staging guard returned by [`ArtifactCache::create`].
pub struct PendingArtifact {
    inner: Arc<Inner>,
    id: JobId,
    staging: PathBuf,
    committed: bool,
}

impl PendingArtifact {
    /// The staging directory to populate.
    pub fn path(&self) -> &Path {
        &self.staging
    }

    /// Atomically publishes the staged directory and marks the entry
    /// ready.
    pub fn commit(mut self) -> Result<(), CacheError> {
        let target = self.inner.root.join(self.id.to_string());
        fs::rename(&self.staging, target)?;
        self.committed = true;
        self.inner.registry.commit(self.id);
        debug!(id = %self.id, "artifact committed");
        Ok(())
    }

    /// Discards the staged directory. Equivalent to dropping.
    pub fn abort(self) {}
}

impl Drop for PendingArtifact {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_dir_all(&self.staging);
            self.inner.registry.abort(self.id);
            debug!(id = %self.id, "artifact staging aborted");
        }
    }
}

/// Fetches an artifact from the worker that owns it into the local
/// cache. A no-op when the artifact is already present locally.
pub async fn download(
    client: &reqwest::Client,
    owner: &WorkerId,
    cache: &ArtifactCache,
    id: JobId,
) -> Result<(), TransferError> {
    if cache.contains(id) {
        return Ok(());
    }

    let url = format!("{}/artifact?id={}", owner.as_str(), id);
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(TransferError::Status {
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    let bytes = response.bytes().await?;

    // A concurrent fetch of the same dep may have won the claim.
    let pending = match cache.create(id) {
        Ok(pending) => pending,
        Err(CacheError::AlreadyExists(_)) => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    tarstream::unpack(&bytes, pending.path()).map_err(CacheError::Io)?;
    pending.commit()?;

    debug!(id = %id, owner = %owner, "artifact downloaded");
    Ok(())
}

//! Entry state registry shared by both caches.
//!
//! Tracks each ID through Writing → Ready with a reader refcount.
//! Invariants: one writer, never alongside readers; readers only on
//! ready entries; a ready entry stays in place when its last reader
//! releases.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::CacheError;

#[derive(Debug)]
enum EntryState {
    Writing,
    Ready { readers: usize },
}

pub(crate) struct EntryRegistry<I> {
    entries: Mutex<HashMap<I, EntryState>>,
    changed: Notify,
}

impl<I> EntryRegistry<I>
where
    I: Copy + Eq + Hash + Display,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            changed: Notify::new(),
        }
    }

    /// Claims an ID for writing. Fails if any entry exists, in either
    /// state.
    pub fn begin_write(&self, id: I) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&id) {
            return Err(CacheError::AlreadyExists(id.to_string()));
        }
        entries.insert(id, EntryState::Writing);
        Ok(())
    }

    /// Flips a writing entry to ready and wakes waiting readers.
    pub fn commit(&self, id: I) {
        let mut entries = self.entries.lock();
        entries.insert(id, EntryState::Ready { readers: 0 });
        drop(entries);
        self.changed.notify_waiters();
    }

    /// Drops a writing entry and wakes waiting readers (they resolve
    /// to not-found).
    pub fn abort(&self, id: I) {
        let mut entries = self.entries.lock();
        entries.remove(&id);
        drop(entries);
        self.changed.notify_waiters();
    }

    /// Registers an already-committed entry, e.g. found on disk at
    /// startup.
    pub fn register_ready(&self, id: I) {
        self.entries
            .lock()
            .entry(id)
            .or_insert(EntryState::Ready { readers: 0 });
    }

    /// Whether a committed entry exists right now.
    pub fn is_ready(&self, id: I) -> bool {
        matches!(self.entries.lock().get(&id), Some(EntryState::Ready { .. }))
    }

    /// Takes a read reference. Waits while the entry is being written;
    /// resolves not-found once it is absent (never created, or
    /// aborted while we waited). Cancel-safe: dropping the future
    /// takes no reference.
    pub async fn acquire(&self, id: I) -> Result<(), CacheError> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register for wakeups before checking, so a commit or
            // abort between the check and the await is not lost.
            notified.as_mut().enable();

            {
                let mut entries = self.entries.lock();
                match entries.get_mut(&id) {
                    None => return Err(CacheError::NotFound(id.to_string())),
                    Some(EntryState::Ready { readers }) => {
                        *readers += 1;
                        return Ok(());
                    }
                    Some(EntryState::Writing) => {}
                }
            }

            notified.await;
        }
    }

    /// Returns a read reference taken by [`acquire`].
    pub fn release(&self, id: I) {
        let mut entries = self.entries.lock();
        if let Some(EntryState::Ready { readers }) = entries.get_mut(&id) {
            *readers = readers.saturating_sub(1);
        }
    }

    /// Evicts a ready entry with no readers.
    pub fn remove(&self, id: I) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        match entries.get(&id) {
            None | Some(EntryState::Writing) => Err(CacheError::NotFound(id.to_string())),
            Some(EntryState::Ready { readers }) if *readers > 0 => {
                Err(CacheError::Busy(id.to_string()))
            }
            Some(EntryState::Ready { .. }) => {
                entries.remove(&id);
                Ok(())
            }
        }
    }
}

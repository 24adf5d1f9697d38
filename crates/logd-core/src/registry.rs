//! Registry of readers and their cursors.
//!
//! Each [`Reader`] remembers the store it reads, the sequence number of the
//! next record to visit and how many records it lost to eviction. The
//! registry map has its own lock; every reader additionally sits behind its
//! own mutex so a query only serializes with fixups touching that reader.
//!
//! Lock order: the buffer's store lock, then the registry map, then a
//! reader mutex. Nothing here takes the store lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::store::StoreKind;
use crate::types::ReaderId;

/// Callback invoked when new data lands at the end of a reader's store.
pub type NotifyCallback = Arc<dyn Fn() + Send + Sync>;

/// Why records are being removed from a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveReason {
    /// Capacity eviction; readers that had not reached the record missed it.
    Overflow,
    /// Operator-requested clear; not reported as a loss.
    Cleared,
}

/// Cursor state of one reader.
pub struct Reader {
    store: Option<StoreKind>,
    cursor: u64,
    missed: u64,
    notify: Option<NotifyCallback>,
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("store", &self.store)
            .field("cursor", &self.cursor)
            .field("missed", &self.missed)
            .field("notify", &self.notify.is_some())
            .finish()
    }
}

impl Reader {
    fn new(notify: Option<NotifyCallback>) -> Self {
        Self {
            store: None,
            cursor: 0,
            missed: 0,
            notify,
        }
    }

    /// Store the reader is positioned in, if any.
    #[must_use]
    pub const fn store(&self) -> Option<StoreKind> {
        self.store
    }

    /// Sequence number of the next record to visit.
    #[must_use]
    pub const fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Records lost to eviction since the last gap report.
    #[must_use]
    pub const fn missed(&self) -> u64 {
        self.missed
    }

    /// Moves the reader to `cursor` in `store`.
    pub fn reposition(&mut self, store: StoreKind, cursor: u64) {
        self.store = Some(store);
        self.cursor = cursor;
    }

    /// Sets the next record to visit within the current store.
    pub const fn advance_to(&mut self, cursor: u64) {
        self.cursor = cursor;
    }

    /// Returns and clears the missed-record counter.
    pub const fn take_missed(&mut self) -> u64 {
        std::mem::replace(&mut self.missed, 0)
    }

    /// True if the record `seq` in `store` is still ahead of this reader.
    fn is_ahead(&self, store: StoreKind, seq: u64) -> bool {
        self.store == Some(store) && self.cursor <= seq
    }
}

/// Thread-safe map of reader identifiers to reader state.
pub struct ReaderRegistry {
    readers: RwLock<HashMap<ReaderId, Arc<Mutex<Reader>>>>,
    next_id: AtomicU64,
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            readers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new, unpositioned reader.
    pub fn open(&self, notify: Option<NotifyCallback>) -> ReaderId {
        let id = ReaderId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.readers
            .write()
            .insert(id, Arc::new(Mutex::new(Reader::new(notify))));
        id
    }

    /// Unregisters a reader. Returns false if it was not registered.
    pub fn close(&self, id: ReaderId) -> bool {
        self.readers.write().remove(&id).is_some()
    }

    /// Looks up a reader.
    #[must_use]
    pub fn get(&self, id: ReaderId) -> Option<Arc<Mutex<Reader>>> {
        self.readers.read().get(&id).cloned()
    }

    /// Number of registered readers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readers.read().len()
    }

    /// Returns true if no reader is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.read().is_empty()
    }

    /// Fixes up cursors before `seqs` are removed from `store`.
    ///
    /// Cursors are sequence numbers, so they stay valid on their own; this
    /// only accounts the loss for readers that had not reached the records.
    pub fn on_remove(&self, store: StoreKind, seqs: &[u64], reason: RemoveReason) {
        if reason != RemoveReason::Overflow || seqs.is_empty() {
            return;
        }
        for reader in self.readers.read().values() {
            let mut reader = reader.lock();
            let lost = seqs.iter().filter(|&&seq| reader.is_ahead(store, seq)).count();
            reader.missed += lost as u64;
        }
    }

    /// Callbacks of readers in `store` that were waiting at its end when
    /// the record `seq` was appended.
    #[must_use]
    pub fn waiting_at_end(&self, store: StoreKind, seq: u64) -> Vec<NotifyCallback> {
        self.readers
            .read()
            .values()
            .filter_map(|reader| {
                let reader = reader.lock();
                if reader.store == Some(store) && reader.cursor >= seq {
                    reader.notify.clone()
                } else {
                    None
                }
            })
            .collect()
    }
}

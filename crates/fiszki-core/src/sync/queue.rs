//! Durable FIFO of remote writes waiting for replay.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::storage::{load_json, save_json, StateStorage, SYNC_QUEUE_KEY};
use crate::error::Result;
use crate::models::{
    CategoryId, CategorySnapshot, CategoryUpdate, LanguagePair, NewWordPair, WordId,
};
use crate::util::unix_millis_now;

/// A remote write captured with the arguments of the original call.
///
/// Ids are stored in their local form and translated when replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params", rename_all = "kebab-case")]
pub enum Operation {
    CreateCategory {
        local_id: CategoryId,
        name: String,
        description: String,
        language_pair: LanguagePair,
    },
    UpdateCategory {
        id: CategoryId,
        update: CategoryUpdate,
    },
    DeleteCategory {
        id: CategoryId,
    },
    CreateWord {
        local_id: WordId,
        category_id: CategoryId,
        pair: NewWordPair,
    },
    ImportWords {
        category_id: CategoryId,
        pairs: Vec<NewWordPair>,
    },
    DeleteWord {
        id: WordId,
    },
    DeleteWordsByCategory {
        category_id: CategoryId,
    },
    ImportCategoryFromSnapshot {
        local_id: CategoryId,
        snapshot: CategorySnapshot,
    },
}

impl Operation {
    /// Wire name of the operation
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateCategory { .. } => "create-category",
            Self::UpdateCategory { .. } => "update-category",
            Self::DeleteCategory { .. } => "delete-category",
            Self::CreateWord { .. } => "create-word",
            Self::ImportWords { .. } => "import-words",
            Self::DeleteWord { .. } => "delete-word",
            Self::DeleteWordsByCategory { .. } => "delete-words-by-category",
            Self::ImportCategoryFromSnapshot { .. } => "import-category-from-snapshot",
        }
    }
}

/// Persisted queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Monotonic position, unique within one queue
    pub seq: u64,
    pub operation: Operation,
    /// Enqueue time (Unix ms)
    pub enqueued_at: i64,
}

/// Outcome of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Entries replayed and removed
    pub replayed: usize,
    /// Entries whose replay failed and stay queued
    pub failed: usize,
    /// Queue length after the pass, including entries pushed meanwhile
    pub remaining: usize,
}

/// Ordered log of pending remote writes.
///
/// Every push and every removal is written to [`StateStorage`] before the
/// call returns.
pub struct OperationQueue {
    storage: Arc<dyn StateStorage>,
    entries: Mutex<Vec<QueuedOperation>>,
    next_seq: AtomicU64,
}

impl OperationQueue {
    /// Load the persisted queue, or start empty
    pub fn load(storage: Arc<dyn StateStorage>) -> Result<Self> {
        let entries: Vec<QueuedOperation> =
            load_json(storage.as_ref(), SYNC_QUEUE_KEY)?.unwrap_or_default();
        if !entries.is_empty() {
            tracing::info!("Loaded {} pending sync operation(s)", entries.len());
        }
        let next_seq = entries.iter().map(|entry| entry.seq).max().unwrap_or(0) + 1;
        Ok(Self {
            storage,
            entries: Mutex::new(entries),
            next_seq: AtomicU64::new(next_seq),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueuedOperation>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &[QueuedOperation]) -> Result<()> {
        save_json(self.storage.as_ref(), SYNC_QUEUE_KEY, entries)
    }

    /// Append an operation and persist the queue.
    pub fn enqueue(&self, operation: Operation) -> Result<QueuedOperation> {
        let mut entries = self.lock();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let entry = QueuedOperation {
            seq,
            operation,
            enqueued_at: unix_millis_now(),
        };
        entries.push(entry.clone());
        if let Err(error) = self.persist(&entries) {
            entries.pop();
            return Err(error);
        }
        tracing::debug!("Queued {} (seq {seq})", entry.operation.name());
        Ok(entry)
    }

    /// Snapshot of all entries in FIFO order
    pub fn peek_all(&self) -> Vec<QueuedOperation> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every pending entry.
    pub fn clear(&self) -> Result<usize> {
        let mut entries = self.lock();
        let dropped = entries.len();
        self.persist(&[])?;
        entries.clear();
        Ok(dropped)
    }

    /// Write the current entries again
    pub fn flush(&self) -> Result<()> {
        let entries = self.lock();
        self.persist(&entries)
    }

    /// Remove one entry after a confirmed replay.
    fn acknowledge(&self, seq: u64) -> Result<()> {
        let mut entries = self.lock();
        let Some(position) = entries.iter().position(|entry| entry.seq == seq) else {
            return Ok(());
        };
        let removed = entries.remove(position);
        if let Err(error) = self.persist(&entries) {
            entries.insert(position, removed);
            return Err(error);
        }
        Ok(())
    }

    /// Replay a snapshot of the queue in FIFO order.
    ///
    /// Each entry is removed right after its replay succeeds. A failing entry
    /// stays untouched and does not stop later entries from being attempted.
    /// Callers provide mutual exclusion between drains.
    pub async fn drain<F, Fut>(&self, mut replay: F) -> Result<DrainReport>
    where
        F: FnMut(QueuedOperation) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let snapshot = self.peek_all();
        let mut report = DrainReport::default();

        for entry in snapshot {
            let seq = entry.seq;
            let name = entry.operation.name();
            match replay(entry).await {
                Ok(()) => {
                    self.acknowledge(seq)?;
                    report.replayed += 1;
                    tracing::debug!("Replayed {name} (seq {seq})");
                }
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!("Replay of {name} (seq {seq}) failed, keeping it queued: {error}");
                }
            }
        }

        report.remaining = self.len();
        Ok(report)
    }
}

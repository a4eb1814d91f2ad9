//! Process-wide sync flags and the persisted sync mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use super::storage::{load_json, save_json, StateStorage, SYNC_MODE_KEY};
use crate::error::Result;
use crate::models::SyncMode;

/// Read-only snapshot returned by `sync_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    pub mode: SyncMode,
    pub queue_length: usize,
}

/// Connectivity, in-progress flag and mode.
///
/// Written only by the connectivity listener, the mode setter and the
/// in-progress guard.
pub struct SyncState {
    online: AtomicBool,
    syncing: AtomicBool,
    mode: Mutex<SyncMode>,
    storage: Arc<dyn StateStorage>,
}

impl SyncState {
    /// Load the persisted mode, falling back to `default_mode`. Starts offline.
    pub fn load(storage: Arc<dyn StateStorage>, default_mode: SyncMode) -> Result<Self> {
        let mode = match load_json::<SyncMode>(storage.as_ref(), SYNC_MODE_KEY) {
            Ok(Some(mode)) => mode,
            Ok(None) => default_mode,
            Err(error) => {
                tracing::warn!("Ignoring unreadable sync mode: {error}");
                default_mode
            }
        };
        Ok(Self {
            online: AtomicBool::new(false),
            syncing: AtomicBool::new(false),
            mode: Mutex::new(mode),
            storage,
        })
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Set the connectivity flag, returning the previous value
    pub(crate) fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst)
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    pub fn mode(&self) -> SyncMode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change and persist the mode
    pub(crate) fn set_mode(&self, mode: SyncMode) -> Result<()> {
        let mut current = self.mode.lock().unwrap_or_else(PoisonError::into_inner);
        save_json(self.storage.as_ref(), SYNC_MODE_KEY, &mode)?;
        *current = mode;
        Ok(())
    }

    /// Whether remote calls should be attempted right now
    pub fn remote_enabled(&self) -> bool {
        self.is_online() && self.mode().allows_remote()
    }

    /// Claim the in-progress flag. `None` when another pass holds it.
    pub(crate) fn try_begin_sync(&self) -> Option<SyncGuard<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SyncGuard { flag: &self.syncing })
    }

    pub(crate) fn flush(&self) -> Result<()> {
        save_json(self.storage.as_ref(), SYNC_MODE_KEY, &self.mode())
    }
}

/// Releases the in-progress flag when dropped, on every exit path.
pub(crate) struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

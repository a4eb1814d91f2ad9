//! Local to remote id tables for records created while the remote was unreachable.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::storage::{load_json, save_json, StateStorage, CATEGORY_MAPPINGS_KEY, WORD_MAPPINGS_KEY};
use crate::error::Result;
use crate::models::{CategoryId, WordId};

/// One persisted local→remote table
struct IdTable {
    key: &'static str,
    entries: Mutex<BTreeMap<String, String>>,
}

impl IdTable {
    fn load(storage: &dyn StateStorage, key: &'static str) -> Result<Self> {
        let entries = load_json(storage, key)?.unwrap_or_default();
        Ok(Self {
            key,
            entries: Mutex::new(entries),
        })
    }

    fn with<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> T {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut entries)
    }

    fn to_remote(&self, id: &str) -> String {
        self.with(|entries| entries.get(id).cloned())
            .unwrap_or_else(|| id.to_string())
    }

    fn to_local(&self, id: &str) -> String {
        self.with(|entries| {
            entries
                .iter()
                .find(|(_, remote)| remote.as_str() == id)
                .map(|(local, _)| local.clone())
        })
        .unwrap_or_else(|| id.to_string())
    }

    fn update(
        &self,
        storage: &dyn StateStorage,
        change: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<()> {
        self.with(|entries| {
            if change(entries) {
                save_json(storage, self.key, &*entries)
            } else {
                Ok(())
            }
        })
    }

    fn persist(&self, storage: &dyn StateStorage) -> Result<()> {
        self.with(|entries| save_json(storage, self.key, &*entries))
    }

    fn len(&self) -> usize {
        self.with(|entries| entries.len())
    }
}

/// Translation between local ids and the ids the remote store assigned.
///
/// Unmapped ids translate to themselves, so a caller may pass either form.
pub struct IdMappings {
    storage: Arc<dyn StateStorage>,
    categories: IdTable,
    words: IdTable,
}

impl IdMappings {
    pub fn load(storage: Arc<dyn StateStorage>) -> Result<Self> {
        let categories = IdTable::load(storage.as_ref(), CATEGORY_MAPPINGS_KEY)?;
        let words = IdTable::load(storage.as_ref(), WORD_MAPPINGS_KEY)?;
        Ok(Self {
            storage,
            categories,
            words,
        })
    }

    pub fn remote_category(&self, id: &CategoryId) -> CategoryId {
        CategoryId::from(self.categories.to_remote(id.as_str()))
    }

    pub fn local_category(&self, id: &CategoryId) -> CategoryId {
        CategoryId::from(self.categories.to_local(id.as_str()))
    }

    pub fn remote_word(&self, id: &WordId) -> WordId {
        WordId::from(self.words.to_remote(id.as_str()))
    }

    pub fn local_word(&self, id: &WordId) -> WordId {
        WordId::from(self.words.to_local(id.as_str()))
    }

    pub fn record_category(&self, local: &CategoryId, remote: &CategoryId) -> Result<()> {
        if local == remote {
            return Ok(());
        }
        self.categories.update(self.storage.as_ref(), |entries| {
            entries.insert(local.to_string(), remote.to_string()).as_deref() != Some(remote.as_str())
        })
    }

    pub fn record_word(&self, local: &WordId, remote: &WordId) -> Result<()> {
        if local == remote {
            return Ok(());
        }
        self.words.update(self.storage.as_ref(), |entries| {
            entries.insert(local.to_string(), remote.to_string()).as_deref() != Some(remote.as_str())
        })
    }

    pub fn forget_category(&self, local: &CategoryId) -> Result<()> {
        self.categories.update(self.storage.as_ref(), |entries| {
            entries.remove(local.as_str()).is_some()
        })
    }

    pub fn forget_word(&self, local: &WordId) -> Result<()> {
        self.words.update(self.storage.as_ref(), |entries| {
            entries.remove(local.as_str()).is_some()
        })
    }

    /// Forget several words at once, e.g. the ones a category delete cascaded to.
    pub fn forget_words(&self, locals: &[WordId]) -> Result<()> {
        self.words.update(self.storage.as_ref(), |entries| {
            let before = entries.len();
            for local in locals {
                entries.remove(local.as_str());
            }
            entries.len() != before
        })
    }

    /// Drop every mapping, e.g. once local ids equal remote ids again.
    pub fn clear(&self) -> Result<()> {
        self.categories.update(self.storage.as_ref(), |entries| {
            let changed = !entries.is_empty();
            entries.clear();
            changed
        })?;
        self.words.update(self.storage.as_ref(), |entries| {
            let changed = !entries.is_empty();
            entries.clear();
            changed
        })
    }

    /// Number of mapped categories and words
    pub fn counts(&self) -> (usize, usize) {
        (self.categories.len(), self.words.len())
    }

    pub fn flush(&self) -> Result<()> {
        self.categories.persist(self.storage.as_ref())?;
        self.words.persist(self.storage.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::storage::MemoryStateStorage;

    fn cat(id: &str) -> CategoryId {
        CategoryId::from(id.to_string())
    }

    #[test]
    fn unmapped_ids_translate_to_themselves() {
        let mappings = IdMappings::load(Arc::new(MemoryStateStorage::new())).unwrap();
        assert_eq!(mappings.remote_category(&cat("x")), cat("x"));
        assert_eq!(mappings.local_category(&cat("x")), cat("x"));
    }

    #[test]
    fn mappings_translate_both_ways_and_persist() {
        let storage = MemoryStateStorage::new();
        let mappings = IdMappings::load(Arc::new(storage.clone())).unwrap();
        mappings.record_category(&cat("local-1"), &cat("42")).unwrap();
        mappings
            .record_word(&WordId::from("w-local".to_string()), &WordId::from("99".to_string()))
            .unwrap();

        let reloaded = IdMappings::load(Arc::new(storage)).unwrap();
        assert_eq!(reloaded.remote_category(&cat("local-1")), cat("42"));
        assert_eq!(reloaded.local_category(&cat("42")), cat("local-1"));
        assert_eq!(
            reloaded.remote_word(&WordId::from("w-local".to_string())).as_str(),
            "99"
        );
        assert_eq!(reloaded.counts(), (1, 1));
    }

    #[test]
    fn forget_and_clear_remove_entries() {
        let mappings = IdMappings::load(Arc::new(MemoryStateStorage::new())).unwrap();
        mappings.record_category(&cat("a"), &cat("1")).unwrap();
        mappings.record_category(&cat("b"), &cat("2")).unwrap();
        mappings.forget_category(&cat("a")).unwrap();
        assert_eq!(mappings.remote_category(&cat("a")), cat("a"));
        mappings.clear().unwrap();
        assert_eq!(mappings.counts(), (0, 0));
    }
}

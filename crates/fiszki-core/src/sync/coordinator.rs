//! Local-first write path, read fallback, queue replay and full resync.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use super::mappings::IdMappings;
use super::queue::{DrainReport, Operation, OperationQueue, QueuedOperation};
use super::state::{SyncState, SyncStatus};
use super::storage::StateStorage;
use crate::error::{Error, Result};
use crate::models::{
    normalize_category_name, validate_pairs, Category, CategoryId, CategorySnapshot,
    CategoryUpdate, LanguagePair, NewWordPair, Statistics, SyncMode, SyncSettings, WordId,
    WordPair,
};
use crate::store::{FlashcardStore, MirrorStore};

/// Why a sync pass did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Offline,
    OfflineOnly,
    AlreadyInProgress,
}

/// Result of a guarded pass: either it ran, or it was a no-op
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncOutcome<T> {
    Ran(T),
    Skipped(SkipReason),
}

/// Summary of a completed full resync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub drained: DrainReport,
    pub categories: usize,
    pub words: usize,
}

/// Summary of a local to cloud migration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub categories: usize,
    pub words: usize,
    /// Names of categories that could not be uploaded
    pub failed: Vec<String>,
}

/// What happened to the remote half of a mutating call
enum Remote<T> {
    Applied(T),
    Skipped,
    Queued,
}

/// Keeps a local store and a remote store eventually consistent.
///
/// Every mutating call writes locally first, then tries the remote store:
/// network failures are queued for replay, rejections are returned to the
/// caller with the local write kept. While anything is queued or a sync is
/// running, new writes are queued too, so the remote sees them in call order.
/// Reads prefer the remote store and fall back to the local one.
pub struct SyncCoordinator<L, R> {
    local: L,
    remote: R,
    queue: OperationQueue,
    mappings: IdMappings,
    state: SyncState,
    /// Serializes mutations with the rebuild step of a full resync
    writes: Mutex<()>,
}

impl<L: MirrorStore, R: FlashcardStore> SyncCoordinator<L, R> {
    /// Load persisted mode, queue and id mappings from `storage`.
    pub fn new(
        local: L,
        remote: R,
        storage: Arc<dyn StateStorage>,
        settings: &SyncSettings,
    ) -> Result<Self> {
        Ok(Self {
            local,
            remote,
            queue: OperationQueue::load(Arc::clone(&storage))?,
            mappings: IdMappings::load(Arc::clone(&storage))?,
            state: SyncState::load(storage, settings.default_mode)?,
            writes: Mutex::new(()),
        })
    }

    pub const fn local(&self) -> &L {
        &self.local
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Prepare both stores; a usable remote session marks the coordinator online.
    ///
    /// In auto mode a full resync runs right away. Remote trouble is logged,
    /// never returned. Returns the resulting connectivity flag.
    pub async fn init(&self) -> Result<bool> {
        self.local.init().await?;

        if !self.state.mode().allows_remote() {
            tracing::info!("Sync mode is offline-only; remote store not contacted");
            return Ok(false);
        }

        let online = match self.remote.init().await {
            Ok(ready) => ready,
            Err(error) => {
                tracing::warn!("Remote store unavailable at startup: {error}");
                false
            }
        };
        self.state.set_online(online);

        if online && self.state.mode() == SyncMode::Auto {
            if let Err(error) = self.sync_all().await {
                tracing::warn!("Initial sync failed: {error}");
            }
        }
        Ok(online)
    }


    pub async fn add_category(
        &self,
        name: &str,
        description: &str,
        language_pair: &LanguagePair,
    ) -> Result<Category> {
        let name = normalize_category_name(name)?;
        let description = description.trim();
        let _write = self.writes.lock().await;
        let local = self
            .local
            .add_category(&name, description, language_pair)
            .await?;

        let outcome = self
            .propagate(
                || Operation::CreateCategory {
                    local_id: local.id.clone(),
                    name: name.clone(),
                    description: description.to_string(),
                    language_pair: language_pair.clone(),
                },
                self.remote.add_category(&name, description, language_pair),
            )
            .await?;

        match outcome {
            Remote::Applied(remote) => {
                self.mappings.record_category(&local.id, &remote.id)?;
                Ok(remote)
            }
            Remote::Skipped | Remote::Queued => Ok(local),
        }
    }

    pub async fn update_category(
        &self,
        id: &CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        let update = update.normalized()?;
        let _write = self.writes.lock().await;
        let local_id = self.mappings.local_category(id);
        let local = self.local.update_category(&local_id, &update).await?;

        let remote_id = self.mappings.remote_category(id);
        let outcome = self
            .propagate(
                || Operation::UpdateCategory {
                    id: local_id.clone(),
                    update: update.clone(),
                },
                self.remote.update_category(&remote_id, &update),
            )
            .await?;

        Ok(match outcome {
            Remote::Applied(remote) => remote,
            Remote::Skipped | Remote::Queued => local,
        })
    }

    /// Delete a category and its words
    pub async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        let _write = self.writes.lock().await;
        let local_id = self.mappings.local_category(id);
        let cascaded: Vec<WordId> = match self.local.get_words_by_category(&local_id).await {
            Ok(words) => words.into_iter().map(|word| word.id).collect(),
            Err(Error::NotFound(_)) => Vec::new(),
            Err(error) => return Err(error),
        };
        self.local.delete_category(&local_id).await?;

        let remote_id = self.mappings.remote_category(id);
        let outcome = self
            .propagate(
                || Operation::DeleteCategory {
                    id: local_id.clone(),
                },
                self.remote.delete_category(&remote_id),
            )
            .await?;

        if matches!(outcome, Remote::Applied(())) {
            self.mappings.forget_category(&local_id)?;
            self.mappings.forget_words(&cascaded)?;
        }
        Ok(())
    }

    pub async fn add_word(&self, category_id: &CategoryId, pair: &NewWordPair) -> Result<WordPair> {
        let pair = pair.validate()?;
        let _write = self.writes.lock().await;
        let local_category = self.mappings.local_category(category_id);
        let local = self.local.add_word(&local_category, &pair).await?;
        self.local.recompute_word_count(&local_category).await?;

        let remote_category = self.mappings.remote_category(category_id);
        let outcome = self
            .propagate(
                || Operation::CreateWord {
                    local_id: local.id.clone(),
                    category_id: local_category.clone(),
                    pair: pair.clone(),
                },
                self.remote.add_word(&remote_category, &pair),
            )
            .await?;

        match outcome {
            Remote::Applied(remote) => {
                self.mappings.record_word(&local.id, &remote.id)?;
                Ok(remote)
            }
            Remote::Skipped | Remote::Queued => Ok(local),
        }
    }

    /// Import a batch of pairs, returning how many were stored
    pub async fn import_words_to_category(
        &self,
        category_id: &CategoryId,
        pairs: &[NewWordPair],
    ) -> Result<usize> {
        let pairs = validate_pairs(pairs)?;
        let _write = self.writes.lock().await;
        let local_category = self.mappings.local_category(category_id);
        let imported = self
            .local
            .import_words_to_category(&local_category, &pairs)
            .await?;
        self.local.recompute_word_count(&local_category).await?;

        let remote_category = self.mappings.remote_category(category_id);
        let outcome = self
            .propagate(
                || Operation::ImportWords {
                    category_id: local_category.clone(),
                    pairs: pairs.clone(),
                },
                self.remote
                    .import_words_to_category(&remote_category, &pairs),
            )
            .await?;

        Ok(match outcome {
            Remote::Applied(count) => count,
            Remote::Skipped | Remote::Queued => imported,
        })
    }

    pub async fn delete_word(&self, id: &WordId) -> Result<()> {
        let _write = self.writes.lock().await;
        let local_id = self.mappings.local_word(id);
        let owner = match self.local.get_word(&local_id).await {
            Ok(word) => Some(word.category_id),
            Err(Error::NotFound(_)) => None,
            Err(error) => return Err(error),
        };
        self.local.delete_word(&local_id).await?;
        if let Some(category_id) = &owner {
            self.refresh_local_count(category_id).await?;
        }

        let remote_id = self.mappings.remote_word(id);
        let outcome = self
            .propagate(
                || Operation::DeleteWord {
                    id: local_id.clone(),
                },
                self.remote.delete_word(&remote_id),
            )
            .await?;

        if matches!(outcome, Remote::Applied(())) {
            self.mappings.forget_word(&local_id)?;
        }
        Ok(())
    }

    pub async fn delete_words_by_category(&self, category_id: &CategoryId) -> Result<()> {
        let _write = self.writes.lock().await;
        let local_category = self.mappings.local_category(category_id);
        self.local.delete_words_by_category(&local_category).await?;
        self.refresh_local_count(&local_category).await?;

        let remote_category = self.mappings.remote_category(category_id);
        self.propagate(
            || Operation::DeleteWordsByCategory {
                category_id: local_category.clone(),
            },
            self.remote.delete_words_by_category(&remote_category),
        )
        .await?;
        Ok(())
    }

    /// Create a category and its words from an export file
    pub async fn import_category_from_snapshot(
        &self,
        snapshot: &CategorySnapshot,
    ) -> Result<Category> {
        normalize_category_name(&snapshot.category.name)?;
        validate_pairs(&snapshot.words)?;
        let _write = self.writes.lock().await;
        let local = self.local.import_category_from_snapshot(snapshot).await?;

        let outcome = self
            .propagate(
                || Operation::ImportCategoryFromSnapshot {
                    local_id: local.id.clone(),
                    snapshot: snapshot.clone(),
                },
                self.remote.import_category_from_snapshot(snapshot),
            )
            .await?;

        match outcome {
            Remote::Applied(remote) => {
                self.mappings.record_category(&local.id, &remote.id)?;
                Ok(remote)
            }
            Remote::Skipped | Remote::Queued => Ok(local),
        }
    }

    /// Wipe local data, pending operations and id mappings, then the remote
    /// data on a best-effort basis.
    pub async fn clear_all_data(&self) -> Result<()> {
        let _write = self.writes.lock().await;
        self.local.clear_all_data().await?;
        let dropped = self.queue.clear()?;
        self.mappings.clear()?;
        if dropped > 0 {
            tracing::info!("Dropped {dropped} pending operation(s) with the local data");
        }

        if self.state.remote_enabled() {
            if let Err(error) = self.remote.clear_all_data().await {
                tracing::warn!("Failed to clear remote data: {error}");
            }
        }
        Ok(())
    }


    pub async fn get_all_categories(&self) -> Result<Vec<Category>> {
        self.read(
            "categories",
            self.remote.get_all_categories(),
            self.local.get_all_categories(),
        )
        .await
    }

    pub async fn get_category(&self, id: &CategoryId) -> Result<Category> {
        let remote_id = self.mappings.remote_category(id);
        let local_id = self.mappings.local_category(id);
        self.read(
            "category",
            self.remote.get_category(&remote_id),
            self.local.get_category(&local_id),
        )
        .await
    }

    pub async fn get_words_by_category(&self, category_id: &CategoryId) -> Result<Vec<WordPair>> {
        let remote_id = self.mappings.remote_category(category_id);
        let local_id = self.mappings.local_category(category_id);
        self.read(
            "words",
            self.remote.get_words_by_category(&remote_id),
            self.local.get_words_by_category(&local_id),
        )
        .await
    }

    pub async fn export_category(&self, category_id: &CategoryId) -> Result<CategorySnapshot> {
        let remote_id = self.mappings.remote_category(category_id);
        let local_id = self.mappings.local_category(category_id);
        self.read(
            "export",
            self.remote.export_category(&remote_id),
            self.local.export_category(&local_id),
        )
        .await
    }

    pub async fn get_statistics(&self) -> Result<Statistics> {
        self.read(
            "statistics",
            self.remote.get_statistics(),
            self.local.get_statistics(),
        )
        .await
    }


    /// Replay pending operations against the remote store.
    pub async fn drain_queue(&self) -> Result<SyncOutcome<DrainReport>> {
        if let Some(reason) = self.skip_reason() {
            return Ok(SyncOutcome::Skipped(reason));
        }
        let Some(_guard) = self.state.try_begin_sync() else {
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadyInProgress));
        };
        self.drain_locked().await.map(SyncOutcome::Ran)
    }

    /// Drain the queue, then rebuild the local store from the remote one.
    ///
    /// The rebuild is skipped with `Error::SyncIncomplete` when any queued
    /// operation is still pending, so unsynced local edits are never wiped.
    pub async fn sync_all(&self) -> Result<SyncOutcome<SyncReport>> {
        if let Some(reason) = self.skip_reason() {
            tracing::info!("Sync skipped: {reason:?}");
            return Ok(SyncOutcome::Skipped(reason));
        }
        let Some(_guard) = self.state.try_begin_sync() else {
            tracing::debug!("Sync already in progress");
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadyInProgress));
        };

        tracing::info!("Starting full sync");
        let drained = self.drain_locked().await?;
        self.ensure_queue_empty()?;

        let categories = self.remote.get_all_categories().await?;
        let mut words = Vec::new();
        for category in &categories {
            words.extend(self.remote.get_words_by_category(&category.id).await?);
        }

        // Writes made since the drain are queued; keep them and their mappings.
        let _write = self.writes.lock().await;
        self.ensure_queue_empty()?;

        self.local.replace_all(&categories, &words).await?;
        for category in &categories {
            self.local.recompute_word_count(&category.id).await?;
        }
        // Local ids now equal remote ids.
        self.mappings.clear()?;

        let report = SyncReport {
            drained,
            categories: categories.len(),
            words: words.len(),
        };
        tracing::info!(
            "Full sync completed: {} categories, {} words, {} replayed",
            report.categories,
            report.words,
            report.drained.replayed
        );
        Ok(SyncOutcome::Ran(report))
    }

    /// Connectivity listener entry point.
    ///
    /// Going online in auto mode runs a full resync; going offline only
    /// flips the flag.
    pub async fn handle_connectivity_change(
        &self,
        online: bool,
    ) -> Result<Option<SyncOutcome<SyncReport>>> {
        let was_online = self.state.set_online(online);
        if online == was_online {
            return Ok(None);
        }
        if online {
            tracing::info!("Network online");
            if self.state.mode() == SyncMode::Auto {
                return self.sync_all().await.map(Some);
            }
        } else {
            tracing::info!("Network offline");
        }
        Ok(None)
    }

    pub fn set_sync_mode(&self, mode: SyncMode) -> Result<()> {
        self.state.set_mode(mode)?;
        tracing::info!("Sync mode set to {mode}");
        Ok(())
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.state.mode()
    }

    pub fn sync_status(&self) -> SyncStatus {
        SyncStatus {
            is_online: self.state.is_online(),
            is_syncing: self.state.is_syncing(),
            mode: self.state.mode(),
            queue_length: self.queue.len(),
        }
    }

    pub fn pending_operations(&self) -> Vec<QueuedOperation> {
        self.queue.peek_all()
    }

    /// Discard every pending operation, e.g. ones the server keeps rejecting.
    pub fn clear_queue(&self) -> Result<usize> {
        let dropped = self.queue.clear()?;
        tracing::warn!("Discarded {dropped} pending operation(s)");
        Ok(dropped)
    }

    /// Upload every local category and its words to the remote store.
    ///
    /// Failures are logged per category and do not stop the migration.
    pub async fn migrate_local_to_cloud(&self) -> Result<MigrationReport> {
        if !self.state.mode().allows_remote() {
            return Err(Error::Validation(
                "cannot migrate in offline-only mode".to_string(),
            ));
        }
        if !self.state.is_online() {
            return Err(Error::Network("cannot migrate while offline".to_string()));
        }

        tracing::info!("Starting migration from local to cloud");
        let mut report = MigrationReport::default();
        for category in self.local.get_all_categories().await? {
            match self.migrate_category(&category).await {
                Ok(words) => {
                    report.categories += 1;
                    report.words += words;
                    tracing::info!("Migrated category {}", category.name);
                }
                Err(error) => {
                    tracing::warn!("Failed to migrate category {}: {error}", category.name);
                    report.failed.push(category.name);
                }
            }
        }
        tracing::info!("Migration completed");
        Ok(report)
    }

    /// Persist mode, queue and mappings. Call before exit.
    pub fn flush(&self) -> Result<()> {
        self.state.flush()?;
        self.queue.flush()?;
        self.mappings.flush()
    }


    fn skip_reason(&self) -> Option<SkipReason> {
        if !self.state.mode().allows_remote() {
            Some(SkipReason::OfflineOnly)
        } else if !self.state.is_online() {
            Some(SkipReason::Offline)
        } else {
            None
        }
    }

    fn ensure_queue_empty(&self) -> Result<()> {
        let pending = self.queue.len();
        if pending == 0 {
            Ok(())
        } else {
            tracing::warn!("Keeping local data: {pending} operation(s) still pending");
            Err(Error::SyncIncomplete { pending })
        }
    }

    /// Attempt the remote half of a mutating call after the local write.
    ///
    /// While offline the operation is queued without a remote attempt, so
    /// the next resync does not discard it. The same happens while earlier
    /// operations are pending or a sync is running, keeping remote writes in
    /// FIFO order. Offline-only mode never queues.
    async fn propagate<T>(
        &self,
        operation: impl FnOnce() -> Operation,
        call: impl Future<Output = Result<T>>,
    ) -> Result<Remote<T>> {
        if !self.state.mode().allows_remote() {
            return Ok(Remote::Skipped);
        }
        if !self.state.is_online() {
            let entry = self.queue.enqueue(operation())?;
            tracing::debug!("Offline; queued {} for later", entry.operation.name());
            return Ok(Remote::Queued);
        }
        let pending = self.queue.len();
        if pending > 0 || self.state.is_syncing() {
            let entry = self.queue.enqueue(operation())?;
            tracing::debug!(
                "Queued {} behind {pending} pending operation(s)",
                entry.operation.name()
            );
            return Ok(Remote::Queued);
        }
        match call.await {
            Ok(value) => Ok(Remote::Applied(value)),
            Err(Error::Network(message)) => {
                let entry = self.queue.enqueue(operation())?;
                tracing::warn!(
                    "Remote write failed ({message}); queued {} for retry",
                    entry.operation.name()
                );
                Ok(Remote::Queued)
            }
            Err(error) => Err(error),
        }
    }

    /// Remote first when reachable, local on any remote failure.
    async fn read<T>(
        &self,
        what: &str,
        remote: impl Future<Output = Result<T>>,
        local: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        if self.state.remote_enabled() {
            match remote.await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    tracing::warn!("Failed to fetch {what} from remote, using local: {error}");
                }
            }
        }
        local.await
    }

    async fn refresh_local_count(&self, category_id: &CategoryId) -> Result<()> {
        match self.local.recompute_word_count(category_id).await {
            Ok(_) | Err(Error::NotFound(_)) => Ok(()),
            Err(error) => Err(error),
        }
    }

    async fn drain_locked(&self) -> Result<DrainReport> {
        let pending = self.queue.len();
        if pending > 0 {
            tracing::info!("Processing {pending} queued operation(s)");
        }
        self.queue.drain(|entry| self.replay(entry)).await
    }

    async fn replay(&self, entry: QueuedOperation) -> Result<()> {
        match entry.operation {
            Operation::CreateCategory {
                local_id,
                name,
                description,
                language_pair,
            } => {
                let remote = self
                    .remote
                    .add_category(&name, &description, &language_pair)
                    .await?;
                self.mappings.record_category(&local_id, &remote.id)
            }
            Operation::UpdateCategory { id, update } => {
                let remote_id = self.mappings.remote_category(&id);
                self.remote.update_category(&remote_id, &update).await?;
                Ok(())
            }
            Operation::DeleteCategory { id } => {
                let remote_id = self.mappings.remote_category(&id);
                self.remote.delete_category(&remote_id).await?;
                self.mappings.forget_category(&id)
            }
            Operation::CreateWord {
                local_id,
                category_id,
                pair,
            } => {
                let remote_category = self.mappings.remote_category(&category_id);
                let remote = self.remote.add_word(&remote_category, &pair).await?;
                self.mappings.record_word(&local_id, &remote.id)
            }
            Operation::ImportWords { category_id, pairs } => {
                let remote_category = self.mappings.remote_category(&category_id);
                self.remote
                    .import_words_to_category(&remote_category, &pairs)
                    .await?;
                Ok(())
            }
            Operation::DeleteWord { id } => {
                let remote_id = self.mappings.remote_word(&id);
                self.remote.delete_word(&remote_id).await?;
                self.mappings.forget_word(&id)
            }
            Operation::DeleteWordsByCategory { category_id } => {
                let remote_category = self.mappings.remote_category(&category_id);
                self.remote
                    .delete_words_by_category(&remote_category)
                    .await
            }
            Operation::ImportCategoryFromSnapshot { local_id, snapshot } => {
                let remote = self
                    .remote
                    .import_category_from_snapshot(&snapshot)
                    .await?;
                self.mappings.record_category(&local_id, &remote.id)
            }
        }
    }

    async fn migrate_category(&self, category: &Category) -> Result<usize> {
        let remote = self
            .remote
            .add_category(&category.name, &category.description, &category.language_pair)
            .await?;
        self.mappings.record_category(&category.id, &remote.id)?;

        let pairs: Vec<NewWordPair> = self
            .local
            .get_words_by_category(&category.id)
            .await?
            .iter()
            .map(WordPair::to_new)
            .collect();
        if pairs.is_empty() {
            return Ok(0);
        }
        self.remote
            .import_words_to_category(&remote.id, &pairs)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WordSide;
    use crate::store::{FailureKind, MemoryStore};
    use crate::sync::storage::MemoryStateStorage;
    use pretty_assertions::assert_eq;

    type TestCoordinator = SyncCoordinator<MemoryStore, MemoryStore>;

    struct Harness {
        local: MemoryStore,
        remote: MemoryStore,
        storage: MemoryStateStorage,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                local: MemoryStore::new(),
                remote: MemoryStore::with_numeric_ids(),
                storage: MemoryStateStorage::new(),
            }
        }

        fn coordinator(&self, mode: SyncMode) -> TestCoordinator {
            let settings = SyncSettings {
                default_mode: mode,
                ..SyncSettings::default()
            };
            SyncCoordinator::new(
                self.local.clone(),
                self.remote.clone(),
                Arc::new(self.storage.clone()),
                &settings,
            )
            .unwrap()
        }

        /// Coordinator that is online in manual mode, so nothing resyncs implicitly
        async fn online_manual(&self) -> TestCoordinator {
            let coordinator = self.coordinator(SyncMode::Manual);
            assert!(coordinator.init().await.unwrap());
            coordinator
        }
    }

    fn travel() -> LanguagePair {
        LanguagePair {
            lang1: "English".to_string(),
            lang2: "French".to_string(),
        }
    }

    fn pair(a: &str, b: &str) -> NewWordPair {
        NewWordPair::new(WordSide::new(a, ""), WordSide::new(b, ""))
    }

    fn operation_names(coordinator: &TestCoordinator) -> Vec<&'static str> {
        coordinator
            .pending_operations()
            .iter()
            .map(|entry| entry.operation.name())
            .collect()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn network_failure_keeps_local_write_and_queues() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        harness.remote.fail_with(FailureKind::Network);

        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();

        let local = harness.local.get_category(&category.id).await.unwrap();
        assert_eq!(local.name, "Travel");
        assert_eq!(operation_names(&coordinator), vec!["create-category"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn online_write_returns_remote_result_and_maps_ids() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;

        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();
        assert_eq!(category.id.as_str(), "1");

        let local = harness.local.get_all_categories().await.unwrap();
        assert_eq!(local.len(), 1);
        assert_ne!(local[0].id, category.id);

        // The remote id reaches the local row through the mapping.
        let word = coordinator
            .add_word(&category.id, &pair("hello", "bonjour"))
            .await
            .unwrap();
        assert_eq!(word.category_id, category.id);
        let local_words = harness
            .local
            .get_words_by_category(&local[0].id)
            .await
            .unwrap();
        assert_eq!(local_words.len(), 1);
        assert!(coordinator.pending_operations().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejected_write_surfaces_and_is_never_queued() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        harness.remote.fail_with(FailureKind::Rejected);

        let err = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Rejected(_)));
        assert_eq!(harness.local.get_all_categories().await.unwrap().len(), 1);
        assert!(coordinator.pending_operations().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn local_failure_aborts_without_remote_call() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        let calls = harness.remote.call_count();
        harness.local.fail_with(FailureKind::Rejected);

        assert!(coordinator.add_category("Travel", "", &travel()).await.is_err());
        assert_eq!(harness.remote.call_count(), calls);
        assert!(coordinator.pending_operations().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn validation_happens_before_any_store() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        let calls = (harness.local.call_count(), harness.remote.call_count());

        let err = coordinator
            .add_word(&CategoryId::from("1".to_string()), &pair("hello", "  "))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(
            (harness.local.call_count(), harness.remote.call_count()),
            calls
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn queue_survives_restart_in_order() {
        let harness = Harness::new();
        {
            let coordinator = harness.online_manual().await;
            harness.remote.fail_with(FailureKind::Network);
            let category = coordinator
                .add_category("Travel", "", &travel())
                .await
                .unwrap();
            coordinator
                .add_word(&category.id, &pair("hello", "bonjour"))
                .await
                .unwrap();
            coordinator.delete_word(&WordId::from("gone".to_string())).await.unwrap();
            coordinator.flush().unwrap();
        }

        let restarted = harness.coordinator(SyncMode::Manual);
        assert_eq!(
            operation_names(&restarted),
            vec!["create-category", "create-word", "delete-word"]
        );
        let seqs: Vec<u64> = restarted
            .pending_operations()
            .iter()
            .map(|entry| entry.seq)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(restarted.sync_mode(), SyncMode::Manual);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn drain_keeps_only_the_failing_entry() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        harness.remote.fail_with(FailureKind::Network);
        for name in ["A", "B", "C"] {
            coordinator.add_category(name, "", &travel()).await.unwrap();
        }
        harness.remote.heal();
        harness
            .remote
            .script([None, Some(FailureKind::Network), None]);

        let outcome = coordinator.drain_queue().await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Ran(DrainReport {
                replayed: 2,
                failed: 1,
                remaining: 1,
            })
        );
        let pending = coordinator.pending_operations();
        assert_eq!(pending.len(), 1);
        assert!(matches!(
            &pending[0].operation,
            Operation::CreateCategory { name, .. } if name == "B"
        ));
        let remote_names: Vec<String> = harness
            .remote
            .get_all_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();
        assert_eq!(remote_names, vec!["A", "C"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn partial_drain_blocks_rebuild() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        harness.remote.fail_with(FailureKind::Network);
        for name in ["A", "B"] {
            coordinator.add_category(name, "", &travel()).await.unwrap();
        }
        harness.remote.heal();
        harness.remote.script([None, Some(FailureKind::Network)]);

        let err = coordinator.sync_all().await.unwrap_err();

        assert!(matches!(err, Error::SyncIncomplete { pending: 1 }));
        assert_eq!(harness.local.get_all_categories().await.unwrap().len(), 2);
        assert!(!coordinator.sync_status().is_syncing);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_sync_runs_once() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        coordinator.add_category("Travel", "", &travel()).await.unwrap();

        let (first, second) = tokio::join!(coordinator.sync_all(), coordinator.sync_all());

        assert!(matches!(first.unwrap(), SyncOutcome::Ran(_)));
        assert_eq!(
            second.unwrap(),
            SyncOutcome::Skipped(SkipReason::AlreadyInProgress)
        );
        assert!(!coordinator.sync_status().is_syncing);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn resync_is_idempotent() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();
        coordinator
            .import_words_to_category(&category.id, &[pair("hello", "bonjour"), pair("cat", "chat")])
            .await
            .unwrap();

        coordinator.sync_all().await.unwrap();
        let categories = harness.local.get_all_categories().await.unwrap();
        let words = harness.local.get_words_by_category(&category.id).await.unwrap();

        coordinator.sync_all().await.unwrap();
        assert_eq!(harness.local.get_all_categories().await.unwrap(), categories);
        assert_eq!(
            harness.local.get_words_by_category(&category.id).await.unwrap(),
            words
        );
        assert_eq!(categories[0].id, category.id);
        assert_eq!(categories[0].word_count, 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn word_count_tracks_word_mutations() {
        let harness = Harness::new();
        let coordinator = harness.coordinator(SyncMode::OfflineOnly);
        coordinator.init().await.unwrap();
        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();

        let word = coordinator
            .add_word(&category.id, &pair("hello", "bonjour"))
            .await
            .unwrap();
        coordinator
            .import_words_to_category(&category.id, &[pair("cat", "chat")])
            .await
            .unwrap();
        assert_eq!(coordinator.get_category(&category.id).await.unwrap().word_count, 2);

        coordinator.delete_word(&word.id).await.unwrap();
        assert_eq!(coordinator.get_category(&category.id).await.unwrap().word_count, 1);

        coordinator.delete_words_by_category(&category.id).await.unwrap();
        let stats = coordinator.get_statistics().await.unwrap();
        assert_eq!(stats.total_words, 0);
        assert_eq!(stats.categories[0].word_count, 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn offline_only_never_touches_remote() {
        let harness = Harness::new();
        let coordinator = harness.coordinator(SyncMode::OfflineOnly);

        assert!(!coordinator.init().await.unwrap());
        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();
        coordinator
            .add_word(&category.id, &pair("hello", "bonjour"))
            .await
            .unwrap();
        coordinator.get_all_categories().await.unwrap();
        coordinator.handle_connectivity_change(true).await.unwrap();

        assert_eq!(
            coordinator.sync_all().await.unwrap(),
            SyncOutcome::Skipped(SkipReason::OfflineOnly)
        );
        assert_eq!(harness.remote.call_count(), 0);
        assert!(coordinator.pending_operations().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reads_fall_back_to_local() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        harness.remote.fail_with(FailureKind::Network);
        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();

        let categories = coordinator.get_all_categories().await.unwrap();
        assert_eq!(categories, vec![category.clone()]);
        let snapshot = coordinator.export_category(&category.id).await.unwrap();
        assert_eq!(snapshot.category.name, "Travel");

        harness.local.fail_with(FailureKind::Rejected);
        assert!(coordinator.get_all_categories().await.is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn offline_edits_reach_remote_after_reconnect() {
        let harness = Harness::new();
        let coordinator = harness.coordinator(SyncMode::Auto);
        harness.remote.fail_with(FailureKind::Network);
        assert!(!coordinator.init().await.unwrap());

        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();
        coordinator
            .add_word(&category.id, &pair("hello", "bonjour"))
            .await
            .unwrap();

        let local = harness.local.get_all_categories().await.unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].word_count, 1);
        assert_eq!(
            operation_names(&coordinator),
            vec!["create-category", "create-word"]
        );

        harness.remote.heal();
        let outcome = coordinator.handle_connectivity_change(true).await.unwrap();

        assert!(matches!(outcome, Some(SyncOutcome::Ran(_))));
        assert!(coordinator.pending_operations().is_empty());
        let remote = harness.remote.get_all_categories().await.unwrap();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].name, "Travel");
        let remote_words = harness
            .remote
            .get_words_by_category(&remote[0].id)
            .await
            .unwrap();
        assert_eq!(remote_words.len(), 1);
        assert_eq!(remote_words[0].lang2.word, "bonjour");

        // Local now mirrors the remote ids.
        assert_eq!(harness.local.get_all_categories().await.unwrap(), remote);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn replay_translates_ids_of_queued_category() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        harness.remote.fail_with(FailureKind::Network);
        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();
        coordinator
            .update_category(
                &category.id,
                &CategoryUpdate {
                    name: Some("Trips".to_string()),
                    ..CategoryUpdate::default()
                },
            )
            .await
            .unwrap();
        harness.remote.heal();

        coordinator.drain_queue().await.unwrap();

        let remote = harness.remote.get_all_categories().await.unwrap();
        assert_eq!(remote[0].name, "Trips");
        // The local id still resolves against the remote store.
        let fetched = coordinator.get_category(&category.id).await.unwrap();
        assert_eq!(fetched.id, remote[0].id);

        coordinator.delete_category(&category.id).await.unwrap();
        assert!(harness.remote.get_all_categories().await.unwrap().is_empty());
        assert!(harness.local.get_all_categories().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn connectivity_changes_only_act_on_transitions() {
        let harness = Harness::new();
        let coordinator = harness.coordinator(SyncMode::Auto);

        assert!(coordinator.handle_connectivity_change(true).await.unwrap().is_some());
        assert!(coordinator.handle_connectivity_change(true).await.unwrap().is_none());
        assert!(coordinator.handle_connectivity_change(false).await.unwrap().is_none());
        assert!(!coordinator.sync_status().is_online);
        assert_eq!(
            coordinator.drain_queue().await.unwrap(),
            SyncOutcome::Skipped(SkipReason::Offline)
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn migrate_uploads_local_data() {
        let harness = Harness::new();
        let coordinator = harness.coordinator(SyncMode::OfflineOnly);
        coordinator.init().await.unwrap();
        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();
        coordinator
            .import_words_to_category(&category.id, &[pair("hello", "bonjour"), pair("cat", "chat")])
            .await
            .unwrap();
        assert!(coordinator.migrate_local_to_cloud().await.is_err());

        coordinator.set_sync_mode(SyncMode::Manual).unwrap();
        coordinator.handle_connectivity_change(true).await.unwrap();
        let report = coordinator.migrate_local_to_cloud().await.unwrap();

        assert_eq!(
            report,
            MigrationReport {
                categories: 1,
                words: 2,
                failed: Vec::new(),
            }
        );
        let remote = harness.remote.get_all_categories().await.unwrap();
        assert_eq!(remote[0].word_count, 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn clear_all_data_drops_queue_and_remote() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        coordinator.add_category("Kept", "", &travel()).await.unwrap();
        harness.remote.script([Some(FailureKind::Network)]);
        coordinator.add_category("Queued", "", &travel()).await.unwrap();
        assert_eq!(coordinator.sync_status().queue_length, 1);

        coordinator.clear_all_data().await.unwrap();

        assert_eq!(coordinator.sync_status().queue_length, 0);
        assert!(harness.local.get_all_categories().await.unwrap().is_empty());
        assert!(harness.remote.get_all_categories().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn writes_queue_behind_pending_operations() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        harness.remote.fail_with(FailureKind::Network);
        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();
        let rename = |name: &str| CategoryUpdate {
            name: Some(name.to_string()),
            ..CategoryUpdate::default()
        };
        coordinator
            .update_category(&category.id, &rename("Tour"))
            .await
            .unwrap();
        harness.remote.heal();
        let calls = harness.remote.call_count();

        coordinator
            .add_word(&category.id, &pair("hello", "bonjour"))
            .await
            .unwrap();
        coordinator
            .update_category(&category.id, &rename("Trips"))
            .await
            .unwrap();

        assert_eq!(harness.remote.call_count(), calls);
        assert_eq!(
            operation_names(&coordinator),
            vec![
                "create-category",
                "update-category",
                "create-word",
                "update-category"
            ]
        );

        assert!(matches!(
            coordinator.sync_all().await.unwrap(),
            SyncOutcome::Ran(_)
        ));
        let remote = harness.remote.get_all_categories().await.unwrap();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].name, "Trips");
        let local_words = harness
            .local
            .get_words_by_category(&remote[0].id)
            .await
            .unwrap();
        assert_eq!(local_words.len(), 1);
        assert_eq!(local_words[0].lang2.word, "bonjour");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn write_during_sync_survives_rebuild() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();

        let hello = pair("hello", "bonjour");
        let (synced, word) = tokio::join!(
            coordinator.sync_all(),
            coordinator.add_word(&category.id, &hello)
        );

        word.unwrap();
        assert!(matches!(
            synced,
            Ok(SyncOutcome::Ran(_)) | Err(Error::SyncIncomplete { .. })
        ));
        assert!(matches!(
            coordinator.sync_all().await.unwrap(),
            SyncOutcome::Ran(_)
        ));
        assert!(coordinator.pending_operations().is_empty());
        let remote_words = harness
            .remote
            .get_words_by_category(&category.id)
            .await
            .unwrap();
        assert_eq!(remote_words.len(), 1);
        let local_words = harness
            .local
            .get_words_by_category(&category.id)
            .await
            .unwrap();
        assert_eq!(local_words, remote_words);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn delete_category_forgets_word_mappings() {
        let harness = Harness::new();
        let coordinator = harness.online_manual().await;
        let category = coordinator
            .add_category("Travel", "", &travel())
            .await
            .unwrap();
        coordinator
            .add_word(&category.id, &pair("hello", "bonjour"))
            .await
            .unwrap();
        coordinator
            .add_word(&category.id, &pair("cat", "chat"))
            .await
            .unwrap();
        assert_eq!(coordinator.mappings.counts(), (1, 2));

        coordinator.delete_category(&category.id).await.unwrap();

        assert_eq!(coordinator.mappings.counts(), (0, 0));
        assert!(harness.remote.get_all_categories().await.unwrap().is_empty());
    }
}

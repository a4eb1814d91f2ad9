//! Local libSQL-backed flashcard store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{new_word, Database, LibSqlFlashcardRepository};
use crate::error::{Error, Result};
use crate::models::{
    normalize_category_name, validate_pairs, Category, CategoryId, CategoryUpdate, LanguagePair,
    NewWordPair, WordId, WordPair,
};
use crate::store::{FlashcardStore, MirrorStore};
use crate::util::unix_millis_now;

/// Thread-safe local store. Clones share one connection.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open the store at the given filesystem path.
    ///
    /// A file that is not a database is moved aside and a fresh one created.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Database::open(&db_path).await {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Local database at {} is unreadable ({error}); starting a fresh one",
                    db_path.display()
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path).await?
            }
            Err(error) => return Err(error),
        };
        tracing::debug!("Opened local store at {}", db_path.display());

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn is_corrupted_db_error(error: &Error) -> bool {
        error
            .to_string()
            .to_ascii_lowercase()
            .contains("file is not a database")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let base_name = db_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("fiszki.db");
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted local DB file from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        for suffix in ["-wal", "-shm"] {
            let mut sidecar = db_path.as_os_str().to_owned();
            sidecar.push(suffix);
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                std::fs::remove_file(&sidecar)?;
            }
        }
        Ok(())
    }
}

impl FlashcardStore for LocalStore {
    async fn init(&self) -> Result<bool> {
        Ok(true)
    }

    async fn add_category(
        &self,
        name: &str,
        description: &str,
        language_pair: &LanguagePair,
    ) -> Result<Category> {
        let now = unix_millis_now();
        let category = Category {
            id: CategoryId::new(),
            name: normalize_category_name(name)?,
            description: description.trim().to_string(),
            language_pair: language_pair.clone(),
            created_at: now,
            updated_at: now,
            word_count: 0,
        };
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.insert_category(&category).await?;
        Ok(category)
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.list_categories().await
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Category> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.get_category(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("category {id}")))
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        let update = update.normalized()?;
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.update_category(id, &update).await
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.delete_category(id).await
    }

    async fn add_word(&self, category_id: &CategoryId, pair: &NewWordPair) -> Result<WordPair> {
        let pair = pair.validate()?;
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        if repo.get_category(category_id).await?.is_none() {
            return Err(Error::NotFound(format!("category {category_id}")));
        }
        let word = new_word(category_id, &pair, unix_millis_now());
        repo.insert_word(&word).await?;
        Ok(word)
    }

    async fn get_word(&self, id: &WordId) -> Result<WordPair> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.get_word(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("word {id}")))
    }

    async fn get_words_by_category(&self, category_id: &CategoryId) -> Result<Vec<WordPair>> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.list_words(category_id).await
    }

    async fn import_words_to_category(
        &self,
        category_id: &CategoryId,
        pairs: &[NewWordPair],
    ) -> Result<usize> {
        let pairs = validate_pairs(pairs)?;
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        if repo.get_category(category_id).await?.is_none() {
            return Err(Error::NotFound(format!("category {category_id}")));
        }
        repo.insert_words(category_id, &pairs).await
    }

    async fn delete_word(&self, id: &WordId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.delete_word(id).await
    }

    async fn delete_words_by_category(&self, category_id: &CategoryId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.delete_words_by_category(category_id).await
    }

    async fn recompute_word_count(&self, category_id: &CategoryId) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        let count = repo.count_words(category_id).await?;
        repo.set_word_count(category_id, count).await?;
        Ok(count)
    }

    async fn clear_all_data(&self) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.clear().await?;
        tracing::info!("Cleared local store");
        Ok(())
    }
}

impl MirrorStore for LocalStore {
    async fn replace_all(&self, categories: &[Category], words: &[WordPair]) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlFlashcardRepository::new(db.connection());
        repo.replace_all(categories, words).await?;
        tracing::debug!(
            "Replaced local content with {} categories and {} words",
            categories.len(),
            words.len()
        );
        Ok(())
    }
}

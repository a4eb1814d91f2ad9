//! The storage contract shared by every flashcard backend.
//!
//! The local libSQL store, the Supabase remote store and the in-memory
//! store all implement [`FlashcardStore`]; the sync coordinator only ever
//! sees this trait.

mod memory;

pub use memory::{FailureKind, MemoryStore};

use crate::error::Result;
use crate::models::{
    Category, CategoryId, CategorySnapshot, CategoryUpdate, LanguagePair, NewWordPair,
    Statistics, WordId, WordPair,
};

/// Category and word-pair persistence.
///
/// `delete_*` calls on ids that do not exist succeed without doing anything.
/// `get_*` and `update_category` signal `Error::NotFound` instead.
#[allow(async_fn_in_trait)]
pub trait FlashcardStore {
    /// Prepare the store. Returns whether a usable connection or session exists.
    async fn init(&self) -> Result<bool>;

    async fn add_category(
        &self,
        name: &str,
        description: &str,
        language_pair: &LanguagePair,
    ) -> Result<Category>;

    async fn get_all_categories(&self) -> Result<Vec<Category>>;

    async fn get_category(&self, id: &CategoryId) -> Result<Category>;

    async fn update_category(&self, id: &CategoryId, update: &CategoryUpdate)
        -> Result<Category>;

    /// Delete a category together with its word pairs
    async fn delete_category(&self, id: &CategoryId) -> Result<()>;

    async fn add_word(&self, category_id: &CategoryId, pair: &NewWordPair) -> Result<WordPair>;

    async fn get_word(&self, id: &WordId) -> Result<WordPair>;

    async fn get_words_by_category(&self, category_id: &CategoryId) -> Result<Vec<WordPair>>;

    /// Insert a batch of pairs, returning how many were stored
    async fn import_words_to_category(
        &self,
        category_id: &CategoryId,
        pairs: &[NewWordPair],
    ) -> Result<usize>;

    async fn delete_word(&self, id: &WordId) -> Result<()>;

    async fn delete_words_by_category(&self, category_id: &CategoryId) -> Result<()>;

    /// Count the category's word pairs and store the count on the category.
    async fn recompute_word_count(&self, category_id: &CategoryId) -> Result<usize>;

    async fn clear_all_data(&self) -> Result<()>;

    async fn export_category(&self, category_id: &CategoryId) -> Result<CategorySnapshot> {
        let category = self.get_category(category_id).await?;
        let words = self.get_words_by_category(category_id).await?;
        Ok(CategorySnapshot::from_parts(&category, &words))
    }

    /// Create a category from a snapshot and import its words
    async fn import_category_from_snapshot(
        &self,
        snapshot: &CategorySnapshot,
    ) -> Result<Category> {
        let header = &snapshot.category;
        let category = self
            .add_category(&header.name, &header.description, &header.language_pair)
            .await?;
        if !snapshot.words.is_empty() {
            self.import_words_to_category(&category.id, &snapshot.words)
                .await?;
        }
        self.recompute_word_count(&category.id).await?;
        self.get_category(&category.id).await
    }

    async fn get_statistics(&self) -> Result<Statistics> {
        let categories = self.get_all_categories().await?;
        Ok(Statistics::from_categories(&categories))
    }
}

/// A store that can take over another store's records verbatim.
///
/// Full resync uses this to rebuild the local store from the remote one with
/// ids and timestamps preserved.
#[allow(async_fn_in_trait)]
pub trait MirrorStore: FlashcardStore {
    /// Replace every category and word with the given records.
    async fn replace_all(&self, categories: &[Category], words: &[WordPair]) -> Result<()>;
}

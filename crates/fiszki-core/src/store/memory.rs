//! In-memory store with failure injection

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::{FlashcardStore, MirrorStore};
use crate::error::{Error, Result};
use crate::models::{
    normalize_category_name, validate_pairs, Category, CategoryId, CategoryUpdate, LanguagePair,
    NewWordPair, WordId, WordPair,
};
use crate::util::unix_millis_now;

/// Failure a [`MemoryStore`] can be told to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Behave like an unreachable server
    Network,
    /// Behave like a server refusing the request
    Rejected,
}

impl FailureKind {
    fn to_error(self) -> Error {
        match self {
            Self::Network => Error::Network("simulated network failure".into()),
            Self::Rejected => Error::Rejected("simulated rejection".into()),
        }
    }
}

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    words: Vec<WordPair>,
    next_id: u64,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    sticky_failure: Mutex<Option<FailureKind>>,
    scripted: Mutex<VecDeque<Option<FailureKind>>>,
    calls: AtomicUsize,
    numeric_ids: bool,
}

/// A [`FlashcardStore`] kept entirely in memory.
///
/// Clones share the same data, so a test can keep a handle to a store it
/// has handed to a coordinator. Word counts are derived on every read.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Store that hands out UUID v7 ids, like the local store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that hands out sequential numeric ids, like the remote server
    #[must_use]
    pub fn with_numeric_ids() -> Self {
        Self {
            inner: Arc::new(Inner {
                numeric_ids: true,
                ..Inner::default()
            }),
        }
    }

    /// Fail every following call with `kind` until [`Self::heal`] is called
    pub fn fail_with(&self, kind: FailureKind) {
        *lock(&self.inner.sticky_failure) = Some(kind);
    }

    /// Stop failing
    pub fn heal(&self) {
        *lock(&self.inner.sticky_failure) = None;
    }

    /// Queue per-call outcomes consumed before the sticky failure applies.
    ///
    /// `None` lets the call succeed, `Some(kind)` fails it.
    pub fn script(&self, outcomes: impl IntoIterator<Item = Option<FailureKind>>) {
        lock(&self.inner.scripted).extend(outcomes);
    }

    /// Number of store calls made so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Every call suspends once, like a real I/O boundary would.
    async fn enter(&self) -> Result<MutexGuard<'_, Tables>> {
        tokio::task::yield_now().await;
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = lock(&self.inner.scripted).pop_front();
        let failure = match scripted {
            Some(outcome) => outcome,
            None => *lock(&self.inner.sticky_failure),
        };
        if let Some(kind) = failure {
            return Err(kind.to_error());
        }
        Ok(lock(&self.inner.tables))
    }

    fn next_id(&self, tables: &mut Tables) -> String {
        tables.next_id += 1;
        if self.inner.numeric_ids {
            tables.next_id.to_string()
        } else {
            Uuid::now_v7().to_string()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn with_count(tables: &Tables, category: &Category) -> Category {
    let mut category = category.clone();
    category.word_count = tables
        .words
        .iter()
        .filter(|word| word.category_id == category.id)
        .count();
    category
}

fn find_category<'a>(tables: &'a Tables, id: &CategoryId) -> Result<&'a Category> {
    tables
        .categories
        .iter()
        .find(|category| &category.id == id)
        .ok_or_else(|| Error::NotFound(format!("category {id}")))
}

fn ensure_unique_name(tables: &Tables, name: &str, except: Option<&CategoryId>) -> Result<()> {
    let taken = tables
        .categories
        .iter()
        .any(|category| category.name == name && Some(&category.id) != except);
    if taken {
        Err(Error::Conflict(format!("category name '{name}' already exists")))
    } else {
        Ok(())
    }
}

fn insert_word(
    store: &MemoryStore,
    tables: &mut Tables,
    category_id: &CategoryId,
    pair: NewWordPair,
) -> WordPair {
    let word = WordPair {
        id: WordId::from(store.next_id(tables)),
        category_id: category_id.clone(),
        lang1: pair.lang1,
        lang2: pair.lang2,
        created_at: unix_millis_now(),
    };
    tables.words.push(word.clone());
    word
}

impl FlashcardStore for MemoryStore {
    async fn init(&self) -> Result<bool> {
        self.enter().await?;
        Ok(true)
    }

    async fn add_category(
        &self,
        name: &str,
        description: &str,
        language_pair: &LanguagePair,
    ) -> Result<Category> {
        let name = normalize_category_name(name)?;
        let mut tables = self.enter().await?;
        ensure_unique_name(&tables, &name, None)?;
        let now = unix_millis_now();
        let category = Category {
            id: CategoryId::from(self.next_id(&mut tables)),
            name,
            description: description.trim().to_string(),
            language_pair: language_pair.clone(),
            created_at: now,
            updated_at: now,
            word_count: 0,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>> {
        let tables = self.enter().await?;
        Ok(tables
            .categories
            .iter()
            .map(|category| with_count(&tables, category))
            .collect())
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Category> {
        let tables = self.enter().await?;
        let category = find_category(&tables, id)?;
        Ok(with_count(&tables, category))
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        let update = update.normalized()?;
        let mut tables = self.enter().await?;
        find_category(&tables, id)?;
        if let Some(name) = &update.name {
            ensure_unique_name(&tables, name, Some(id))?;
        }
        let mut updated = None;
        if let Some(category) = tables.categories.iter_mut().find(|c| &c.id == id) {
            update.apply_to(category);
            category.updated_at = unix_millis_now();
            updated = Some(category.clone());
        }
        let category = updated.ok_or_else(|| Error::NotFound(format!("category {id}")))?;
        Ok(with_count(&tables, &category))
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        let mut tables = self.enter().await?;
        tables.words.retain(|word| &word.category_id != id);
        tables.categories.retain(|category| &category.id != id);
        Ok(())
    }

    async fn add_word(&self, category_id: &CategoryId, pair: &NewWordPair) -> Result<WordPair> {
        let pair = pair.validate()?;
        let mut tables = self.enter().await?;
        find_category(&tables, category_id)?;
        Ok(insert_word(self, &mut tables, category_id, pair))
    }

    async fn get_word(&self, id: &WordId) -> Result<WordPair> {
        let tables = self.enter().await?;
        tables
            .words
            .iter()
            .find(|word| &word.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("word {id}")))
    }

    async fn get_words_by_category(&self, category_id: &CategoryId) -> Result<Vec<WordPair>> {
        let tables = self.enter().await?;
        Ok(tables
            .words
            .iter()
            .filter(|word| &word.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn import_words_to_category(
        &self,
        category_id: &CategoryId,
        pairs: &[NewWordPair],
    ) -> Result<usize> {
        let pairs = validate_pairs(pairs)?;
        let mut tables = self.enter().await?;
        find_category(&tables, category_id)?;
        let count = pairs.len();
        for pair in pairs {
            insert_word(self, &mut tables, category_id, pair);
        }
        Ok(count)
    }

    async fn delete_word(&self, id: &WordId) -> Result<()> {
        let mut tables = self.enter().await?;
        tables.words.retain(|word| &word.id != id);
        Ok(())
    }

    async fn delete_words_by_category(&self, category_id: &CategoryId) -> Result<()> {
        let mut tables = self.enter().await?;
        tables.words.retain(|word| &word.category_id != category_id);
        Ok(())
    }

    async fn recompute_word_count(&self, category_id: &CategoryId) -> Result<usize> {
        let mut tables = self.enter().await?;
        let count = tables
            .words
            .iter()
            .filter(|word| &word.category_id == category_id)
            .count();
        let category = tables
            .categories
            .iter_mut()
            .find(|category| &category.id == category_id)
            .ok_or_else(|| Error::NotFound(format!("category {category_id}")))?;
        category.word_count = count;
        Ok(count)
    }

    async fn clear_all_data(&self) -> Result<()> {
        let mut tables = self.enter().await?;
        tables.categories.clear();
        tables.words.clear();
        Ok(())
    }
}

impl MirrorStore for MemoryStore {
    async fn replace_all(&self, categories: &[Category], words: &[WordPair]) -> Result<()> {
        let mut tables = self.enter().await?;
        tables.categories = categories.to_vec();
        tables.words = words.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WordSide;

    fn pair(a: &str, b: &str) -> NewWordPair {
        NewWordPair::new(WordSide::new(a, ""), WordSide::new(b, ""))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn numeric_ids_are_sequential() {
        let store = MemoryStore::with_numeric_ids();
        let category = store
            .add_category("Travel", "", &LanguagePair::default())
            .await
            .unwrap();
        let word = store.add_word(&category.id, &pair("hello", "bonjour")).await.unwrap();
        assert_eq!(category.id.as_str(), "1");
        assert_eq!(word.id.as_str(), "2");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn duplicate_name_is_conflict() {
        let store = MemoryStore::new();
        store.add_category("Travel", "", &LanguagePair::default()).await.unwrap();
        let err = store
            .add_category(" Travel ", "", &LanguagePair::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn scripted_outcomes_run_before_sticky_failure() {
        let store = MemoryStore::new();
        store.script([None, Some(FailureKind::Rejected)]);
        store.fail_with(FailureKind::Network);

        assert!(store.init().await.is_ok());
        assert!(matches!(store.init().await, Err(Error::Rejected(_))));
        assert!(matches!(store.init().await, Err(Error::Network(_))));
        store.heal();
        assert!(store.init().await.is_ok());
        assert_eq!(store.call_count(), 4);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn delete_category_cascades_to_words() {
        let store = MemoryStore::new();
        let category = store
            .add_category("Food", "", &LanguagePair::default())
            .await
            .unwrap();
        store
            .import_words_to_category(&category.id, &[pair("bread", "chleb"), pair("milk", "mleko")])
            .await
            .unwrap();
        assert_eq!(store.get_category(&category.id).await.unwrap().word_count, 2);

        store.delete_category(&category.id).await.unwrap();
        assert!(store.get_words_by_category(&category.id).await.unwrap().is_empty());
        store.delete_category(&category.id).await.unwrap();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn add_word_to_missing_category_fails() {
        let store = MemoryStore::new();
        let err = store
            .add_word(&CategoryId::from("nope".to_string()), &pair("a", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

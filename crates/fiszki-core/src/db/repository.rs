//! Category and word pair repository

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)] // SQLite counts are i64

use crate::error::{Error, Result};
use crate::models::{
    Category, CategoryId, CategoryUpdate, LanguagePair, NewWordPair, WordId, WordPair, WordSide,
};
use crate::util::unix_millis_now;
use libsql::{params, Connection, Row};

const CATEGORY_COLUMNS: &str =
    "id, name, description, lang1, lang2, created_at, updated_at, word_count";
const WORD_COLUMNS: &str =
    "id, category_id, word1, pronunciation1, word2, pronunciation2, created_at";

/// libSQL statements for categories and words, borrowed from a [`super::Database`]
pub struct LibSqlFlashcardRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlFlashcardRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_category(row: &Row) -> Result<Category> {
        Ok(Category {
            id: CategoryId::from(row.get::<String>(0)?),
            name: row.get(1)?,
            description: row.get(2)?,
            language_pair: LanguagePair::new(row.get::<String>(3)?, row.get::<String>(4)?),
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            word_count: row.get::<i64>(7)?.max(0) as usize,
        })
    }

    fn parse_word(row: &Row) -> Result<WordPair> {
        Ok(WordPair {
            id: WordId::from(row.get::<String>(0)?),
            category_id: CategoryId::from(row.get::<String>(1)?),
            lang1: WordSide::new(row.get::<String>(2)?, row.get::<String>(3)?),
            lang2: WordSide::new(row.get::<String>(4)?, row.get::<String>(5)?),
            created_at: row.get(6)?,
        })
    }

    /// Map a name uniqueness violation to `Conflict`
    fn map_write_error(error: libsql::Error, name: &str) -> Error {
        if error.to_string().contains("UNIQUE constraint failed: categories.name") {
            Error::Conflict(format!("category name '{name}' already exists"))
        } else {
            Error::LibSql(error)
        }
    }

    pub async fn insert_category(&self, category: &Category) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO categories (id, name, description, lang1, lang2, created_at, updated_at, word_count)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    category.id.as_str(),
                    category.name.as_str(),
                    category.description.as_str(),
                    category.language_pair.lang1.as_str(),
                    category.language_pair.lang2.as_str(),
                    category.created_at,
                    category.updated_at,
                    category.word_count as i64,
                ],
            )
            .await
            .map_err(|error| Self::map_write_error(error, &category.name))?;
        Ok(())
    }

    pub async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?");
        let mut rows = self.conn.query(&sql, [id.as_str()]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_category(&row)?)),
            None => Ok(None),
        }
    }

    /// All categories, oldest first
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY created_at ASC, rowid ASC"
        );
        let mut rows = self.conn.query(&sql, ()).await?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next().await? {
            categories.push(Self::parse_category(&row)?);
        }
        Ok(categories)
    }

    pub async fn update_category(
        &self,
        id: &CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        let mut category = self
            .get_category(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("category {id}")))?;
        update.apply_to(&mut category);
        category.updated_at = unix_millis_now();

        self.conn
            .execute(
                "UPDATE categories SET name = ?, description = ?, lang1 = ?, lang2 = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    category.name.as_str(),
                    category.description.as_str(),
                    category.language_pair.lang1.as_str(),
                    category.language_pair.lang2.as_str(),
                    category.updated_at,
                    id.as_str(),
                ],
            )
            .await
            .map_err(|error| Self::map_write_error(error, &category.name))?;
        Ok(category)
    }

    /// Delete a category; its words go with it through the foreign key cascade
    pub async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        self.conn
            .execute("DELETE FROM categories WHERE id = ?", [id.as_str()])
            .await?;
        Ok(())
    }

    pub async fn insert_word(&self, word: &WordPair) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO words (id, category_id, word1, pronunciation1, word2, pronunciation2, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    word.id.as_str(),
                    word.category_id.as_str(),
                    word.lang1.word.as_str(),
                    word.lang1.pronunciation.as_str(),
                    word.lang2.word.as_str(),
                    word.lang2.pronunciation.as_str(),
                    word.created_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Insert a batch of pairs inside one transaction
    pub async fn insert_words(&self, category_id: &CategoryId, pairs: &[NewWordPair]) -> Result<usize> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let created_at = unix_millis_now();
        for pair in pairs {
            let word = new_word(category_id, pair, created_at);
            if let Err(e) = self.insert_word(&word).await {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
        Ok(pairs.len())
    }

    pub async fn get_word(&self, id: &WordId) -> Result<Option<WordPair>> {
        let sql = format!("SELECT {WORD_COLUMNS} FROM words WHERE id = ?");
        let mut rows = self.conn.query(&sql, [id.as_str()]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_word(&row)?)),
            None => Ok(None),
        }
    }

    /// Words of one category, oldest first
    pub async fn list_words(&self, category_id: &CategoryId) -> Result<Vec<WordPair>> {
        let sql = format!(
            "SELECT {WORD_COLUMNS} FROM words WHERE category_id = ? ORDER BY created_at ASC, rowid ASC"
        );
        let mut rows = self.conn.query(&sql, [category_id.as_str()]).await?;
        let mut words = Vec::new();
        while let Some(row) = rows.next().await? {
            words.push(Self::parse_word(&row)?);
        }
        Ok(words)
    }

    pub async fn delete_word(&self, id: &WordId) -> Result<()> {
        self.conn
            .execute("DELETE FROM words WHERE id = ?", [id.as_str()])
            .await?;
        Ok(())
    }

    pub async fn delete_words_by_category(&self, category_id: &CategoryId) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM words WHERE category_id = ?",
                [category_id.as_str()],
            )
            .await?;
        Ok(())
    }

    pub async fn count_words(&self, category_id: &CategoryId) -> Result<usize> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM words WHERE category_id = ?",
                [category_id.as_str()],
            )
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(count.max(0) as usize)
    }

    /// Store a word count on the category record
    pub async fn set_word_count(&self, category_id: &CategoryId, count: usize) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE categories SET word_count = ? WHERE id = ?",
                params![count as i64, category_id.as_str()],
            )
            .await?;
        if changed == 0 {
            return Err(Error::NotFound(format!("category {category_id}")));
        }
        Ok(())
    }

    /// Swap the whole content for the given records inside one transaction.
    pub async fn replace_all(&self, categories: &[Category], words: &[WordPair]) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        if let Err(e) = self.replace_all_inner(categories, words).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
        Ok(())
    }

    async fn replace_all_inner(&self, categories: &[Category], words: &[WordPair]) -> Result<()> {
        self.conn.execute("DELETE FROM words", ()).await?;
        self.conn.execute("DELETE FROM categories", ()).await?;
        for category in categories {
            self.insert_category(category).await?;
        }
        for word in words {
            self.insert_word(word).await?;
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        for stmt in ["DELETE FROM words", "DELETE FROM categories"] {
            if let Err(e) = self.conn.execute(stmt, ()).await {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
        }
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
        Ok(())
    }
}

/// Build a fresh word pair with a local id
pub fn new_word(category_id: &CategoryId, pair: &NewWordPair, created_at: i64) -> WordPair {
    WordPair {
        id: WordId::new(),
        category_id: category_id.clone(),
        lang1: pair.lang1.clone(),
        lang2: pair.lang2.clone(),
        created_at,
    }
}

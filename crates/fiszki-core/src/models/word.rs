//! Word pair model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::CategoryId;
use crate::error::{Error, Result};

/// Opaque word pair identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(String);

impl WordId {
    /// Create a new unique word ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("word id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<String> for WordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One side of a word pair: the term and an optional pronunciation hint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSide {
    pub word: String,
    #[serde(default)]
    pub pronunciation: String,
}

impl WordSide {
    pub fn new(word: impl Into<String>, pronunciation: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            pronunciation: pronunciation.into(),
        }
    }

    fn trimmed(&self) -> Self {
        Self {
            word: self.word.trim().to_string(),
            pronunciation: self.pronunciation.trim().to_string(),
        }
    }
}

/// Input for creating a word pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWordPair {
    pub lang1: WordSide,
    pub lang2: WordSide,
}

impl NewWordPair {
    pub fn new(lang1: WordSide, lang2: WordSide) -> Self {
        Self { lang1, lang2 }
    }

    /// Trim both sides and reject a pair with an empty term on either side.
    pub fn validate(&self) -> Result<Self> {
        let lang1 = self.lang1.trimmed();
        let lang2 = self.lang2.trimmed();
        if lang1.word.is_empty() || lang2.word.is_empty() {
            return Err(Error::Validation(
                "both sides of a word pair need a non-empty term".into(),
            ));
        }
        Ok(Self { lang1, lang2 })
    }
}

/// Validate every pair of a batch, failing on the first invalid one.
pub fn validate_pairs(pairs: &[NewWordPair]) -> Result<Vec<NewWordPair>> {
    pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| {
            pair.validate().map_err(|err| match err {
                Error::Validation(message) => {
                    Error::Validation(format!("pair {}: {message}", index + 1))
                }
                other => other,
            })
        })
        .collect()
}

/// A stored word pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    pub id: WordId,
    pub category_id: CategoryId,
    pub lang1: WordSide,
    pub lang2: WordSide,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl WordPair {
    /// The creation input that would reproduce this pair
    #[must_use]
    pub fn to_new(&self) -> NewWordPair {
        NewWordPair::new(self.lang1.clone(), self.lang2.clone())
    }
}

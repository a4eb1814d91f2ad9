//! Portable category export format

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, LanguagePair, NewWordPair, WordPair};
use crate::error::{Error, Result};

/// Current export format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Category header inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language_pair: LanguagePair,
}

/// A self-contained export of one category and its word pairs.
///
/// Serialized as camelCase JSON:
/// `{ category: { name, description, languagePair }, words, exportedAt, version }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySnapshot {
    pub category: SnapshotCategory,
    #[serde(default)]
    pub words: Vec<NewWordPair>,
    pub exported_at: DateTime<Utc>,
    #[serde(default = "default_version")]
    pub version: u32,
}

const fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl CategorySnapshot {
    /// Build a snapshot from a stored category and its words
    #[must_use]
    pub fn from_parts(category: &Category, words: &[WordPair]) -> Self {
        Self {
            category: SnapshotCategory {
                name: category.name.clone(),
                description: category.description.clone(),
                language_pair: category.language_pair.clone(),
            },
            words: words.iter().map(WordPair::to_new).collect(),
            exported_at: Utc::now(),
            version: SNAPSHOT_VERSION,
        }
    }

    /// Parse a snapshot from JSON text, rejecting unknown versions.
    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(text)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(Error::Validation(format!(
                "unsupported snapshot version {} (newest supported is {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryId, WordId, WordSide};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_snapshot_json_shape() {
        let category = Category {
            id: CategoryId::new(),
            name: "Travel".to_string(),
            description: "Trips".to_string(),
            language_pair: LanguagePair::new("English", "French"),
            created_at: 0,
            updated_at: 0,
            word_count: 1,
        };
        let words = vec![WordPair {
            id: WordId::new(),
            category_id: category.id.clone(),
            lang1: WordSide::new("hello", ""),
            lang2: WordSide::new("bonjour", "bon-ZHOOR"),
            created_at: 0,
        }];
        let snapshot = CategorySnapshot::from_parts(&category, &words);
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["category"]["languagePair"]["lang2"], "French");
        assert_eq!(value["words"][0]["lang2"]["pronunciation"], "bon-ZHOOR");
        assert_eq!(value["version"], 1);
        assert!(value["exportedAt"].is_string());
    }

    #[test]
    fn test_snapshot_parses_exported_file() {
        let text = r#"{
            "category": {"name": "Food", "description": "", "languagePair": {"lang1": "English", "lang2": "Polish"}},
            "words": [{"lang1": {"word": "bread", "pronunciation": ""}, "lang2": {"word": "chleb", "pronunciation": "hlep"}}],
            "exportedAt": "2024-03-01T10:00:00.000Z",
            "version": 1
        }"#;
        let snapshot = CategorySnapshot::from_json(text).unwrap();
        assert_eq!(snapshot.category.name, "Food");
        assert_eq!(snapshot.words.len(), 1);
        assert_eq!(snapshot.words[0].lang2.word, "chleb");
    }

    #[test]
    fn test_snapshot_rejects_future_version() {
        let text = r#"{"category": {"name": "X"}, "words": [], "exportedAt": "2024-03-01T10:00:00Z", "version": 7}"#;
        assert!(matches!(
            CategorySnapshot::from_json(text),
            Err(Error::Validation(_))
        ));
    }
}

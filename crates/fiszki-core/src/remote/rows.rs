//! PostgREST row shapes for the `categories` and `words` tables.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use chrono::DateTime;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::models::{
    Category, CategoryId, CategoryUpdate, LanguagePair, NewWordPair, WordId, WordPair, WordSide,
};

/// Accept both integer and string primary keys.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn timestamp_millis(value: Option<&str>) -> i64 {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map_or(0, |parsed| parsed.timestamp_millis())
}

#[derive(Debug, Deserialize)]
pub(super) struct CountRow {
    count: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct CategoryRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    lang1: Option<String>,
    #[serde(default)]
    lang2: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    /// Embedded `words(count)` aggregate, absent on insert/update responses
    #[serde(default)]
    words: Vec<CountRow>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        let defaults = LanguagePair::default();
        let created_at = timestamp_millis(row.created_at.as_deref());
        Self {
            id: CategoryId::from(row.id),
            name: row.name,
            description: row.description.unwrap_or_default(),
            language_pair: LanguagePair::new(
                row.lang1.unwrap_or(defaults.lang1),
                row.lang2.unwrap_or(defaults.lang2),
            ),
            created_at,
            updated_at: row
                .updated_at
                .as_deref()
                .map_or(created_at, |raw| timestamp_millis(Some(raw))),
            word_count: row.words.first().map_or(0, |c| c.count.max(0) as usize),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WordRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(deserialize_with = "id_string")]
    category_id: String,
    word1: String,
    #[serde(default)]
    pronunciation1: Option<String>,
    word2: String,
    #[serde(default)]
    pronunciation2: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<WordRow> for WordPair {
    fn from(row: WordRow) -> Self {
        Self {
            id: WordId::from(row.id),
            category_id: CategoryId::from(row.category_id),
            lang1: WordSide::new(row.word1, row.pronunciation1.unwrap_or_default()),
            lang2: WordSide::new(row.word2, row.pronunciation2.unwrap_or_default()),
            created_at: timestamp_millis(row.created_at.as_deref()),
        }
    }
}

pub(super) fn new_category_body(
    user_id: &str,
    name: &str,
    description: &str,
    language_pair: &LanguagePair,
) -> Value {
    json!({
        "user_id": user_id,
        "name": name,
        "description": description,
        "lang1": language_pair.lang1,
        "lang2": language_pair.lang2,
    })
}

/// Only the fields present in the update, plus a fresh `updated_at`.
pub(super) fn category_update_body(update: &CategoryUpdate, updated_at: &str) -> Value {
    let mut body = serde_json::Map::new();
    body.insert("updated_at".into(), json!(updated_at));
    if let Some(name) = &update.name {
        body.insert("name".into(), json!(name));
    }
    if let Some(description) = &update.description {
        body.insert("description".into(), json!(description));
    }
    if let Some(pair) = &update.language_pair {
        body.insert("lang1".into(), json!(pair.lang1));
        body.insert("lang2".into(), json!(pair.lang2));
    }
    Value::Object(body)
}

pub(super) fn new_word_body(user_id: &str, category_id: &CategoryId, pair: &NewWordPair) -> Value {
    json!({
        "user_id": user_id,
        "category_id": category_id.as_str(),
        "word1": pair.lang1.word,
        "pronunciation1": pair.lang1.pronunciation,
        "word2": pair.lang2.word,
        "pronunciation2": pair.lang2.pronunciation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn category_row_with_numeric_id_and_count() {
        let row: CategoryRow = serde_json::from_str(
            r#"{"id": 17, "user_id": "u1", "name": "Travel", "description": null,
                "lang1": "English", "lang2": "French",
                "created_at": "2024-03-01T10:00:00.250+00:00",
                "updated_at": "2024-03-02T10:00:00+00:00",
                "words": [{"count": 3}]}"#,
        )
        .unwrap();
        let category = Category::from(row);
        assert_eq!(category.id.as_str(), "17");
        assert_eq!(category.description, "");
        assert_eq!(category.word_count, 3);
        assert_eq!(category.created_at, 1_709_287_200_250);
        assert!(category.updated_at > category.created_at);
    }

    #[test]
    fn word_row_fills_missing_pronunciations() {
        let row: WordRow = serde_json::from_str(
            r#"{"id": "w-1", "category_id": 17, "word1": "hello", "pronunciation1": null,
                "word2": "bonjour", "created_at": "2024-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        let word = WordPair::from(row);
        assert_eq!(word.category_id.as_str(), "17");
        assert_eq!(word.lang1, WordSide::new("hello", ""));
        assert_eq!(word.lang2.pronunciation, "");
    }

    #[test]
    fn update_body_contains_only_changed_fields() {
        let update = CategoryUpdate {
            language_pair: Some(LanguagePair::new("Polish", "German")),
            ..CategoryUpdate::default()
        };
        let body = category_update_body(&update, "2024-03-01T10:00:00Z");
        assert_eq!(
            body,
            json!({"updated_at": "2024-03-01T10:00:00Z", "lang1": "Polish", "lang2": "German"})
        );
    }

    #[test]
    fn boolean_id_is_rejected() {
        let result = serde_json::from_str::<WordRow>(
            r#"{"id": true, "category_id": 1, "word1": "a", "word2": "b"}"#,
        );
        assert!(result.is_err());
    }
}

//! Category model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Opaque category identifier.
///
/// Locally created categories use UUID v7 strings; remote ids are kept
/// verbatim in whatever form the server assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Create a new unique category ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CategoryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("category id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<String> for CategoryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Display labels for the two sides of every word pair in a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub lang1: String,
    pub lang2: String,
}

impl LanguagePair {
    pub fn new(lang1: impl Into<String>, lang2: impl Into<String>) -> Self {
        Self {
            lang1: lang1.into(),
            lang2: lang2.into(),
        }
    }
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self::new("Language 1", "Language 2")
    }
}

/// A named grouping of word pairs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,
    /// Display name, unique per owner
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Labels for the two word sides
    pub language_pair: LanguagePair,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Cached number of word pairs referencing this category
    pub word_count: usize,
}

/// Partial update applied by `update_category`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_pair: Option<LanguagePair>,
}

impl CategoryUpdate {
    /// Whether the update would change nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.language_pair.is_none()
    }

    /// Trim text fields and reject an empty replacement name.
    pub fn normalized(&self) -> Result<Self> {
        let name = match self.name.as_deref() {
            Some(name) => Some(normalize_category_name(name)?),
            None => None,
        };
        Ok(Self {
            name,
            description: self
                .description
                .as_deref()
                .map(|description| description.trim().to_string()),
            language_pair: self.language_pair.clone(),
        })
    }

    /// Apply this update on top of an existing category
    pub fn apply_to(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            category.description.clone_from(description);
        }
        if let Some(language_pair) = &self.language_pair {
            category.language_pair = language_pair.clone();
        }
    }
}

/// Trim a category name, rejecting names that are empty after trimming.
pub fn normalize_category_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(Error::Validation("category name cannot be empty".into()))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_category() -> Category {
        Category {
            id: CategoryId::new(),
            name: "Travel".to_string(),
            description: String::new(),
            language_pair: LanguagePair::new("English", "French"),
            created_at: 1,
            updated_at: 1,
            word_count: 0,
        }
    }

    #[test]
    fn test_category_id_unique() {
        assert_ne!(CategoryId::new(), CategoryId::new());
    }

    #[test]
    fn test_category_id_parse_rejects_blank() {
        assert!("  ".parse::<CategoryId>().is_err());
        let parsed: CategoryId = " 42 ".parse().unwrap();
        assert_eq!(parsed.as_str(), "42");
    }

    #[test]
    fn test_default_language_pair_labels() {
        let pair = LanguagePair::default();
        assert_eq!(pair.lang1, "Language 1");
        assert_eq!(pair.lang2, "Language 2");
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut category = sample_category();
        let update = CategoryUpdate {
            description: Some("Phrases for trips".to_string()),
            ..CategoryUpdate::default()
        };
        update.apply_to(&mut category);
        assert_eq!(category.name, "Travel");
        assert_eq!(category.description, "Phrases for trips");
    }

    #[test]
    fn test_update_normalized_rejects_blank_name() {
        let update = CategoryUpdate {
            name: Some("   ".to_string()),
            ..CategoryUpdate::default()
        };
        assert!(matches!(update.normalized(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_update_serialization_skips_missing_fields() {
        let update = CategoryUpdate {
            name: Some("Food".to_string()),
            ..CategoryUpdate::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"name":"Food"}"#);
    }
}

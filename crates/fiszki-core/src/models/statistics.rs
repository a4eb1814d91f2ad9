//! Aggregate counts across categories

use serde::{Deserialize, Serialize};

use super::{Category, CategoryId};

/// Per-category word total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub id: CategoryId,
    pub name: String,
    pub word_count: usize,
}

/// Totals reported by `get_statistics`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_categories: usize,
    pub total_words: usize,
    pub categories: Vec<CategoryStats>,
}

impl Statistics {
    /// Summarise a category listing using each category's cached count
    #[must_use]
    pub fn from_categories(categories: &[Category]) -> Self {
        Self {
            total_categories: categories.len(),
            total_words: categories.iter().map(|category| category.word_count).sum(),
            categories: categories
                .iter()
                .map(|category| CategoryStats {
                    id: category.id.clone(),
                    name: category.name.clone(),
                    word_count: category.word_count,
                })
                .collect(),
        }
    }
}

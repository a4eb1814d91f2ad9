//! Data models for fiszki

mod category;
mod settings;
mod snapshot;
mod statistics;
mod word;

pub use category::{normalize_category_name, Category, CategoryId, CategoryUpdate, LanguagePair};
pub use settings::{SyncMode, SyncSettings, DEFAULT_AUTO_SYNC_INTERVAL};
pub use snapshot::{CategorySnapshot, SnapshotCategory, SNAPSHOT_VERSION};
pub use statistics::{CategoryStats, Statistics};
pub use word::{validate_pairs, NewWordPair, WordId, WordPair, WordSide};

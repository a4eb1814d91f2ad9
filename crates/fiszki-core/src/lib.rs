//! fiszki-core - Core library for Fiszki
//!
//! This crate contains the flashcard models, the local libSQL store, the
//! Supabase remote store and the offline sync layer used by the Fiszki CLI.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{
    Category, CategoryId, CategorySnapshot, CategoryUpdate, LanguagePair, NewWordPair,
    Statistics, SyncMode, SyncSettings, WordId, WordPair, WordSide,
};
pub use services::LocalStore;
pub use store::{FlashcardStore, MirrorStore};
pub use sync::{SyncCoordinator, SyncStatus};

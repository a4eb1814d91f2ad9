//! libSQL persistence for the local store

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{new_word, LibSqlFlashcardRepository};

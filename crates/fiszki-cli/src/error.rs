use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fiszki_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Category not found: {0}")]
    CategoryNotFound(String),
    #[error("{0}")]
    AmbiguousCategory(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Cloud sync is not configured. Run `fiszki config init --supabase-url <URL> --supabase-anon-key <KEY>` or set SUPABASE_URL and SUPABASE_ANON_KEY."
    )]
    SyncNotConfigured,
}

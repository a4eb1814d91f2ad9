//! Error types for fiszki-core

use thiserror::Error;

/// Result type alias using fiszki-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fiszki-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Entity absent from the store that was asked
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation, e.g. a duplicate category name
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transient remote failure (no connectivity, timeout, server hiccup)
    #[error("Network error: {0}")]
    Network(String),

    /// The remote store authoritatively refused the operation
    #[error("Rejected by remote: {0}")]
    Rejected(String),

    /// Invalid input caught before reaching any store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Full resync refused to rebuild because queued writes are still pending
    #[error("Sync incomplete: {pending} queued operation(s) could not be replayed")]
    SyncIncomplete {
        /// Entries left in the queue after the drain
        pending: usize,
    },
}

impl Error {
    /// Whether the error is a transient remote failure worth retrying later.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_transient() {
        assert!(Error::Network("timeout".into()).is_network());
        assert!(!Error::Rejected("forbidden".into()).is_network());
        assert!(!Error::Conflict("name".into()).is_network());
    }

    #[test]
    fn sync_incomplete_reports_pending_count() {
        let message = Error::SyncIncomplete { pending: 3 }.to_string();
        assert!(message.contains('3'));
    }
}

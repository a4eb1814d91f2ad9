//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::{Path, PathBuf};

use super::migrations;

/// Database wrapper for a local libSQL file
pub struct Database {
    // Owns the handle the connection was opened from.
    _db: LibSqlDatabase,
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::from_parts(db, Some(path)).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_parts(db, None).await
    }

    async fn from_parts(db: LibSqlDatabase, path: Option<PathBuf>) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self {
            _db: db,
            conn,
            path,
        };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` pragmas
    async fn configure(&self) -> Result<()> {
        // In-memory databases refuse WAL; that is fine.
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Filesystem location, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(db.path().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_file_enables_foreign_keys() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("fiszki.db");
        let db = Database::open(&db_path).await.unwrap();
        assert_eq!(db.path(), Some(db_path.as_path()));

        let mut rows = db
            .connection()
            .query("PRAGMA foreign_keys", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let enabled: i64 = row.get(0).unwrap();
        assert_eq!(enabled, 1);
    }
}

// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management for room archives.
//!
//! Each room opens its own archive file once and keeps the handle for the
//! room's lifetime. Queries are serialized through tokio-rusqlite's single
//! background thread, which is plenty for a read-only workload.

use tokio_rusqlite::Connection;
use tracing::debug;

use whosaid_core::WhosaidError;

/// Handle to one room's archive database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens the archive at `path` and verifies it looks like a chat export
    /// (the `messages` table must exist).
    pub async fn open(path: &str) -> Result<Self, WhosaidError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(|conn| {
            conn.execute_batch("PRAGMA query_only = ON;")?;
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'messages'",
            )?;
            if !stmt.exists([])? {
                return Err(rusqlite::Error::InvalidQuery);
            }
            Ok(())
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(rusqlite::Error::InvalidQuery) => {
                WhosaidError::Archive {
                    source: "archive is missing the messages table".into(),
                }
            }
            other => map_tr_err(other),
        })?;

        debug!(path, "archive opened");
        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Maps a tokio-rusqlite error into the shared archive fault variant.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> WhosaidError {
    WhosaidError::Archive {
        source: Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_rejects_non_archive_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.db");
        // A fresh SQLite file with no tables is not a chat export.
        rusqlite::Connection::open(&path).unwrap();

        let result = Database::open(path.to_str().unwrap()).await;
        assert!(matches!(result, Err(WhosaidError::Archive { .. })));
    }

    #[tokio::test]
    async fn open_accepts_archive_with_messages_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE messages (id TEXT PRIMARY KEY);")
                .unwrap();
        }

        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}

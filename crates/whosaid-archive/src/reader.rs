// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed queries over a chat-export archive.
//!
//! Eligibility rules, applied identically everywhere: a message must have
//! non-blank content and its author must not be a bot (a missing
//! participant row counts as non-bot, the author just won't resolve).

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use whosaid_core::{
    ArchiveMessage, ArchiveReader, Attachment, Choice, ContextSnippet, MessageContext,
    WhosaidError,
};

use crate::database::{map_tr_err, Database};

/// How many answer choices a question offers, including the true author.
const CHOICE_COUNT: usize = 4;

/// SQL expression for a participant's display name: nickname, else name,
/// else "Unknown".
const DISPLAY_NAME_EXPR: &str =
    "COALESCE(NULLIF(TRIM(p.nickname), ''), NULLIF(TRIM(p.name), ''), 'Unknown')";

/// SQL expression for a participant's full name: `name#discriminator` when
/// both are present, else the bare name.
const FULL_NAME_EXPR: &str = "CASE \
     WHEN p.name IS NOT NULL AND p.discriminator IS NOT NULL \
     THEN p.name || '#' || p.discriminator \
     ELSE p.name END";

/// SQLite-backed implementation of [`ArchiveReader`].
pub struct SqliteArchive {
    db: Database,
}

impl SqliteArchive {
    /// Opens the archive at `path`.
    pub async fn open(path: &str) -> Result<Self, WhosaidError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }
}

#[async_trait]
impl ArchiveReader for SqliteArchive {
    async fn fetch_message_by_id(
        &self,
        message_id: &str,
    ) -> Result<Option<ArchiveMessage>, WhosaidError> {
        if message_id.trim().is_empty() {
            return Ok(None);
        }
        let message_id = message_id.to_string();
        self.db
            .connection()
            .call(move |conn| Ok(load_message(conn, &message_id)?))
            .await
            .map_err(map_tr_err)
    }

    async fn fetch_eligible_message_ids(&self) -> Result<Vec<String>, WhosaidError> {
        let ids = self
            .db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT m.id
                     FROM messages m
                     LEFT JOIN participants p ON p.id = m.author_id
                     WHERE m.content IS NOT NULL
                       AND TRIM(m.content) <> ''
                       AND (p.is_bot IS NULL OR p.is_bot = 0)",
                )?;
                let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;
                let mut ids = Vec::new();
                for row in rows {
                    if let Some(id) = row? {
                        if !id.trim().is_empty() {
                            ids.push(id);
                        }
                    }
                }
                Ok(ids)
            })
            .await
            .map_err(map_tr_err)?;
        debug!(count = ids.len(), "enumerated eligible messages");
        Ok(ids)
    }

    async fn fetch_context(&self, message_id: &str) -> Result<MessageContext, WhosaidError> {
        if message_id.trim().is_empty() {
            return Ok(MessageContext::default());
        }
        let message_id = message_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let before = load_adjacent(conn, &message_id, true)?;
                let after = load_adjacent(conn, &message_id, false)?;
                Ok(MessageContext { before, after })
            })
            .await
            .map_err(map_tr_err)
    }
}

fn load_message(
    conn: &Connection,
    message_id: &str,
) -> Result<Option<ArchiveMessage>, rusqlite::Error> {
    let sql = format!(
        "SELECT m.id, m.content, m.author_id, m.timestamp,
                {DISPLAY_NAME_EXPR} AS display_name,
                {FULL_NAME_EXPR} AS full_name
         FROM messages m
         LEFT JOIN participants p ON p.id = m.author_id
         WHERE m.id = ?1
           AND m.content IS NOT NULL
           AND TRIM(m.content) <> ''
           AND (p.is_bot IS NULL OR p.is_bot = 0)"
    );

    let row = conn
        .query_row(&sql, params![message_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })
        .optional()?;

    let Some((id, content, author_id, timestamp, display_name, full_name)) = row else {
        return Ok(None);
    };

    let attachments = load_attachments(conn, &id)?;
    let embeds = load_embeds(conn, &id)?;
    let choices = build_choices(conn, author_id.as_deref())?;

    Ok(Some(ArchiveMessage {
        id,
        content: clean_content(content),
        timestamp,
        display_name,
        full_name,
        attachments,
        embeds,
        author_id,
        choices,
    }))
}

/// Builds the shuffled choice list: the true author (when it resolves to a
/// non-bot participant) plus random distractors, deduplicated and capped at
/// [`CHOICE_COUNT`]. The author is never dropped by the cap.
fn build_choices(
    conn: &Connection,
    author_id: Option<&str>,
) -> Result<Vec<Choice>, rusqlite::Error> {
    let author_choice = match author_id {
        Some(id) => load_participant_choice(conn, id)?,
        None => None,
    };

    let mut unique: Vec<Choice> = Vec::new();
    if let Some(author) = &author_choice {
        unique.push(author.clone());
    }

    let needed = CHOICE_COUNT.saturating_sub(unique.len());
    if needed > 0 {
        // Over-fetch so duplicates of the author still leave enough.
        for distractor in load_distractors(conn, author_id, (needed * 3) as i64)? {
            if unique.len() >= CHOICE_COUNT {
                break;
            }
            if unique
                .iter()
                .all(|c| c.participant_id != distractor.participant_id)
            {
                unique.push(distractor);
            }
        }
    }

    unique.shuffle(&mut rand::thread_rng());
    Ok(unique)
}

fn load_participant_choice(
    conn: &Connection,
    participant_id: &str,
) -> Result<Option<Choice>, rusqlite::Error> {
    if participant_id.trim().is_empty() {
        return Ok(None);
    }
    let sql = format!(
        "SELECT p.id, {DISPLAY_NAME_EXPR} AS display_name, {FULL_NAME_EXPR} AS full_name
         FROM participants p
         WHERE p.id = ?1
           AND (p.is_bot IS NULL OR p.is_bot = 0)"
    );
    conn.query_row(&sql, params![participant_id], |row| {
        Ok(Choice {
            participant_id: row.get(0)?,
            display_name: row.get(1)?,
            full_name: row.get(2)?,
        })
    })
    .optional()
}

fn load_distractors(
    conn: &Connection,
    author_id: Option<&str>,
    limit: i64,
) -> Result<Vec<Choice>, rusqlite::Error> {
    let sql = format!(
        "SELECT p.id, {DISPLAY_NAME_EXPR} AS display_name, {FULL_NAME_EXPR} AS full_name
         FROM participants p
         WHERE p.id != ?1
           AND (p.is_bot IS NULL OR p.is_bot = 0)
         ORDER BY RANDOM()
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![author_id.unwrap_or(""), limit.max(0)], |row| {
        Ok(Choice {
            participant_id: row.get(0)?,
            display_name: row.get(1)?,
            full_name: row.get(2)?,
        })
    })?;
    rows.collect()
}

fn load_attachments(
    conn: &Connection,
    message_id: &str,
) -> Result<Vec<Attachment>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT url, file_name FROM attachments WHERE message_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![message_id], |row| {
        Ok(Attachment {
            url: row.get(0)?,
            file_name: row.get(1)?,
        })
    })?;
    rows.collect()
}

fn load_embeds(conn: &Connection, message_id: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt =
        conn.prepare("SELECT raw_json FROM embeds WHERE message_id = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![message_id], |row| row.get::<_, Option<String>>(0))?;
    let mut embeds = Vec::new();
    for row in rows {
        if let Some(raw) = row? {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                embeds.push(trimmed.to_string());
            }
        }
    }
    Ok(embeds)
}

fn load_adjacent(
    conn: &Connection,
    message_id: &str,
    before: bool,
) -> Result<Option<ContextSnippet>, rusqlite::Error> {
    let (comparator, direction) = if before { ("<", "DESC") } else { (">", "ASC") };
    let sql = format!(
        "SELECT m.id, m.content, m.timestamp, {DISPLAY_NAME_EXPR} AS display_name
         FROM messages m
         LEFT JOIN participants p ON p.id = m.author_id
         WHERE m.timestamp IS NOT NULL
           AND m.timestamp {comparator} (SELECT timestamp FROM messages WHERE id = ?1)
         ORDER BY m.timestamp {direction}
         LIMIT 1"
    );
    conn.query_row(&sql, params![message_id], |row| {
        Ok(ContextSnippet {
            id: row.get(0)?,
            content: row.get::<_, Option<String>>(1)?,
            timestamp: row.get(2)?,
            display_name: row.get(3)?,
        })
    })
    .optional()
    .map(|snippet| {
        snippet.map(|mut s| {
            s.content = clean_content(s.content);
            s
        })
    })
}

/// Trims and collapses internal whitespace runs to single spaces.
fn clean_content(content: Option<String>) -> Option<String> {
    content.map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    async fn archive_with_fixture() -> (SqliteArchive, TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE participants (
                     id TEXT PRIMARY KEY, name TEXT, discriminator TEXT,
                     nickname TEXT, color TEXT, is_bot INTEGER, avatar_url TEXT);
                 CREATE TABLE messages (
                     id TEXT PRIMARY KEY, content TEXT, author_id TEXT, timestamp TEXT);
                 CREATE TABLE attachments (
                     message_id TEXT, url TEXT, file_name TEXT);
                 CREATE TABLE embeds (
                     id INTEGER PRIMARY KEY, message_id TEXT, raw_json TEXT);

                 INSERT INTO participants VALUES
                     ('p1', 'alice', '1234', 'Ali', NULL, 0, NULL),
                     ('p2', 'bob', NULL, '', NULL, 0, NULL),
                     ('p3', 'carol', '9999', NULL, NULL, 0, NULL),
                     ('p4', 'dave', NULL, NULL, NULL, 0, NULL),
                     ('p5', 'evilbot', '0001', NULL, NULL, 1, NULL);

                 INSERT INTO messages VALUES
                     ('m1', 'first  message   here', 'p1', '2024-05-01T10:00:00Z'),
                     ('m2', 'second message', 'p2', '2024-05-01T10:01:00Z'),
                     ('m3', 'third message', 'p3', '2024-05-01T10:02:00Z'),
                     ('m4', '   ', 'p1', '2024-05-01T10:03:00Z'),
                     ('m5', 'beep boop', 'p5', '2024-05-01T10:04:00Z');

                 INSERT INTO attachments VALUES
                     ('m1', 'https://cdn.example/a.png', 'a.png');
                 INSERT INTO embeds (message_id, raw_json) VALUES
                     ('m1', '{\"title\": \"an embed\"}'),
                     ('m1', '  ');",
            )
            .unwrap();
        }
        let archive = SqliteArchive::open(path.to_str().unwrap()).await.unwrap();
        (archive, dir)
    }

    #[tokio::test]
    async fn fetch_message_resolves_author_and_choices() {
        let (archive, _dir) = archive_with_fixture().await;
        let msg = archive.fetch_message_by_id("m1").await.unwrap().unwrap();

        assert_eq!(msg.id, "m1");
        assert_eq!(msg.content.as_deref(), Some("first message here"));
        assert_eq!(msg.display_name.as_deref(), Some("Ali"));
        assert_eq!(msg.full_name.as_deref(), Some("alice#1234"));
        assert_eq!(msg.author_id.as_deref(), Some("p1"));
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.embeds, vec!["{\"title\": \"an embed\"}".to_string()]);

        // The author is always among the choices; the bot never is.
        assert!(msg.choices.iter().any(|c| c.participant_id == "p1"));
        assert!(msg.choices.iter().all(|c| c.participant_id != "p5"));
        assert!(msg.choices.len() <= CHOICE_COUNT);
        assert!(msg.is_askable());
    }

    #[tokio::test]
    async fn fetch_message_choices_are_unique() {
        let (archive, _dir) = archive_with_fixture().await;
        let msg = archive.fetch_message_by_id("m2").await.unwrap().unwrap();
        let mut ids: Vec<_> = msg.choices.iter().map(|c| c.participant_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), msg.choices.len());
    }

    #[tokio::test]
    async fn fetch_message_display_name_falls_back_to_name() {
        let (archive, _dir) = archive_with_fixture().await;
        // p2 has a blank nickname and no discriminator.
        let msg = archive.fetch_message_by_id("m2").await.unwrap().unwrap();
        assert_eq!(msg.display_name.as_deref(), Some("bob"));
        assert_eq!(msg.full_name.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn fetch_message_skips_bots_and_blank_content() {
        let (archive, _dir) = archive_with_fixture().await;
        assert!(archive.fetch_message_by_id("m4").await.unwrap().is_none());
        assert!(archive.fetch_message_by_id("m5").await.unwrap().is_none());
        assert!(archive.fetch_message_by_id("nope").await.unwrap().is_none());
        assert!(archive.fetch_message_by_id("  ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eligible_ids_exclude_bots_and_blanks() {
        let (archive, _dir) = archive_with_fixture().await;
        let mut ids = archive.fetch_eligible_message_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn context_returns_timestamp_neighbors() {
        let (archive, _dir) = archive_with_fixture().await;
        let ctx = archive.fetch_context("m2").await.unwrap();
        assert_eq!(ctx.before.as_ref().map(|s| s.id.as_str()), Some("m1"));
        assert_eq!(ctx.after.as_ref().map(|s| s.id.as_str()), Some("m3"));
        assert_eq!(
            ctx.before.unwrap().content.as_deref(),
            Some("first message here")
        );
    }

    #[tokio::test]
    async fn context_at_archive_edge_has_missing_side() {
        let (archive, _dir) = archive_with_fixture().await;
        let ctx = archive.fetch_context("m1").await.unwrap();
        assert!(ctx.before.is_none());
        assert_eq!(ctx.after.as_ref().map(|s| s.id.as_str()), Some("m2"));
    }

    #[tokio::test]
    async fn context_for_blank_id_is_empty() {
        let (archive, _dir) = archive_with_fixture().await;
        let ctx = archive.fetch_context("").await.unwrap();
        assert!(ctx.before.is_none());
        assert!(ctx.after.is_none());
    }
}

// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide room registry.
//!
//! Creating a room materializes a copy of the uploaded archive under the
//! rooms directory, opens it, enumerates the eligible messages, and
//! registers the room under a freshly generated id. Registration is
//! insert-if-absent so an id collision (36^10 keyspace, but still) is
//! detected rather than silently overwriting a live room.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;

use whosaid_archive::SqliteArchive;
use whosaid_core::{ArchiveReader, WhosaidError};

use crate::config::GameConfig;
use crate::room::Room;

const ROOM_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ROOM_ID_LENGTH: usize = 10;
const MAX_ROOM_NAME_LENGTH: usize = 40;

/// Uploaded archives above this size are rejected before touching disk.
pub const MAX_ARCHIVE_BYTES: usize = 25 * 1024 * 1024;

/// The id and resolved display name of a newly created room.
#[derive(Debug, Clone)]
pub struct RoomCreation {
    pub room_id: String,
    pub display_name: String,
}

/// Registry of every live room, keyed by room id.
pub struct RoomManager {
    storage_dir: PathBuf,
    config: GameConfig,
    rooms: DashMap<String, Arc<Room>>,
    rng: Mutex<StdRng>,
}

impl RoomManager {
    /// Creates the manager and its rooms directory.
    pub async fn new(storage_dir: PathBuf, config: GameConfig) -> Result<Self, WhosaidError> {
        Self::with_rng(storage_dir, config, StdRng::from_entropy()).await
    }

    /// Like [`RoomManager::new`] but with a caller-supplied RNG so tests
    /// can pin room-id generation.
    pub async fn with_rng(
        storage_dir: PathBuf,
        config: GameConfig,
        rng: StdRng,
    ) -> Result<Self, WhosaidError> {
        tokio::fs::create_dir_all(&storage_dir).await?;
        Ok(Self {
            storage_dir,
            config,
            rooms: DashMap::new(),
            rng: Mutex::new(rng),
        })
    }

    /// Creates a room from uploaded archive bytes.
    pub async fn create_room(
        &self,
        display_name: Option<&str>,
        archive_bytes: &[u8],
    ) -> Result<RoomCreation, WhosaidError> {
        if archive_bytes.len() > MAX_ARCHIVE_BYTES {
            return Err(WhosaidError::ArchiveTooLarge {
                limit: MAX_ARCHIVE_BYTES,
            });
        }
        let room_id = self.generate_room_id();
        let target = self.archive_path(&room_id);
        tokio::fs::write(&target, archive_bytes).await?;
        self.register_room(room_id, display_name, &target).await
    }

    /// Creates a room from an archive file on disk, copying it into the
    /// rooms directory first.
    pub async fn create_room_from_path(
        &self,
        display_name: Option<&str>,
        archive_path: &Path,
    ) -> Result<RoomCreation, WhosaidError> {
        let room_id = self.generate_room_id();
        let target = self.archive_path(&room_id);
        tokio::fs::copy(archive_path, &target).await?;
        self.register_room(room_id, display_name, &target).await
    }

    /// Looks up a room by id. Ids are matched case-insensitively but must
    /// have the fixed 10-char lowercase base36 shape.
    pub fn room(&self, room_id: &str) -> Option<Arc<Room>> {
        let normalized = room_id.trim().to_ascii_lowercase();
        if !is_valid_room_id(&normalized) {
            return None;
        }
        self.rooms.get(&normalized).map(|entry| Arc::clone(entry.value()))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    async fn register_room(
        &self,
        room_id: String,
        display_name: Option<&str>,
        archive_path: &Path,
    ) -> Result<RoomCreation, WhosaidError> {
        let path_str = archive_path.to_string_lossy().to_string();
        let archive: Arc<dyn ArchiveReader> = Arc::new(SqliteArchive::open(&path_str).await?);
        let message_ids = archive.fetch_eligible_message_ids().await?;
        if message_ids.is_empty() {
            return Err(WhosaidError::NoEligibleMessages);
        }

        let resolved_name = display_name
            .and_then(sanitize_room_name)
            .unwrap_or_else(|| format!("Room {room_id}"));

        let room = Arc::new(Room::new(
            room_id.clone(),
            resolved_name.clone(),
            archive,
            message_ids,
            self.config.clone(),
        )?);

        match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(_) => Err(WhosaidError::RoomIdCollision(room_id)),
            Entry::Vacant(entry) => {
                entry.insert(room);
                info!(room_id, display_name = resolved_name, "room created");
                Ok(RoomCreation {
                    room_id,
                    display_name: resolved_name,
                })
            }
        }
    }

    fn archive_path(&self, room_id: &str) -> PathBuf {
        self.storage_dir.join(format!("{room_id}.db"))
    }

    fn generate_room_id(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        (0..ROOM_ID_LENGTH)
            .map(|_| ROOM_ID_ALPHABET[rng.gen_range(0..ROOM_ID_ALPHABET.len())] as char)
            .collect()
    }
}

fn is_valid_room_id(room_id: &str) -> bool {
    room_id.len() == ROOM_ID_LENGTH
        && room_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Same character rules as usernames but capped at 40 chars; `None` when
/// nothing printable survives, so the caller falls back to "Room <id>".
fn sanitize_room_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let mut collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() > MAX_ROOM_NAME_LENGTH {
        collapsed.truncate(MAX_ROOM_NAME_LENGTH);
        collapsed = collapsed.trim_end().to_string();
    }
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_fixture_archive(path: &Path, with_messages: bool) {
        let conn = rusqlite::Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE participants (
                 id TEXT PRIMARY KEY, name TEXT, discriminator TEXT,
                 nickname TEXT, color TEXT, is_bot INTEGER, avatar_url TEXT);
             CREATE TABLE messages (
                 id TEXT PRIMARY KEY, content TEXT, author_id TEXT, timestamp TEXT);
             CREATE TABLE attachments (message_id TEXT, url TEXT, file_name TEXT);
             CREATE TABLE embeds (id INTEGER PRIMARY KEY, message_id TEXT, raw_json TEXT);",
        )
        .unwrap();
        if with_messages {
            conn.execute_batch(
                "INSERT INTO participants VALUES ('p1', 'alice', NULL, NULL, NULL, 0, NULL);
                 INSERT INTO messages VALUES ('m1', 'hello there', 'p1', '2024-05-01T10:00:00Z');",
            )
            .unwrap();
        }
    }

    async fn manager(storage: PathBuf) -> RoomManager {
        RoomManager::with_rng(storage, GameConfig::default(), StdRng::seed_from_u64(99))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_room_from_path_registers_and_copies() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.db");
        write_fixture_archive(&source, true);

        let manager = manager(dir.path().join("rooms")).await;
        let created = manager
            .create_room_from_path(Some("My  Archive!"), &source)
            .await
            .unwrap();

        assert!(is_valid_room_id(&created.room_id));
        assert_eq!(created.display_name, "My Archive");
        assert!(dir
            .path()
            .join("rooms")
            .join(format!("{}.db", created.room_id))
            .exists());

        let room = manager.room(&created.room_id).unwrap();
        assert_eq!(room.id(), created.room_id);
    }

    #[tokio::test]
    async fn create_room_from_bytes() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.db");
        write_fixture_archive(&source, true);
        let bytes = std::fs::read(&source).unwrap();

        let manager = manager(dir.path().join("rooms")).await;
        let created = manager.create_room(None, &bytes).await.unwrap();
        assert_eq!(created.display_name, format!("Room {}", created.room_id));
        assert_eq!(manager.room_count(), 1);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path().join("rooms")).await;
        let blob = vec![0u8; MAX_ARCHIVE_BYTES + 1];
        assert!(matches!(
            manager.create_room(None, &blob).await,
            Err(WhosaidError::ArchiveTooLarge { .. })
        ));
        assert_eq!(manager.room_count(), 0);
    }

    #[tokio::test]
    async fn archive_without_eligible_messages_fails_creation() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("empty.db");
        write_fixture_archive(&source, false);

        let manager = manager(dir.path().join("rooms")).await;
        assert!(matches!(
            manager.create_room_from_path(None, &source).await,
            Err(WhosaidError::NoEligibleMessages)
        ));
        assert_eq!(manager.room_count(), 0);
    }

    #[tokio::test]
    async fn room_lookup_validates_id_shape() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.db");
        write_fixture_archive(&source, true);

        let manager = manager(dir.path().join("rooms")).await;
        let created = manager.create_room_from_path(None, &source).await.unwrap();

        // Case-insensitive match on a well-formed id.
        assert!(manager.room(&created.room_id.to_ascii_uppercase()).is_some());
        assert!(manager.room(&format!(" {} ", created.room_id)).is_some());

        assert!(manager.room("short").is_none());
        assert!(manager.room("UNKNOWN-ID!").is_none());
        assert!(manager.room("zzzzzzzzzz").is_none());
    }

    #[tokio::test]
    async fn seeded_rng_generates_deterministic_ids() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.db");
        write_fixture_archive(&source, true);

        let a = manager(dir.path().join("rooms-a")).await;
        let b = manager(dir.path().join("rooms-b")).await;
        let id_a = a.create_room_from_path(None, &source).await.unwrap().room_id;
        let id_b = b.create_room_from_path(None, &source).await.unwrap().room_id;
        assert_eq!(id_a, id_b);
    }

    #[test]
    fn room_name_sanitization() {
        assert_eq!(sanitize_room_name("General Chat"), Some("General Chat".to_string()));
        assert_eq!(sanitize_room_name("a   b\tc"), Some("a b c".to_string()));
        assert_eq!(sanitize_room_name("<script>"), Some("script".to_string()));
        assert_eq!(sanitize_room_name("!!!"), None);
        assert_eq!(sanitize_room_name(""), None);
        let long = "x".repeat(50);
        assert_eq!(sanitize_room_name(&long).unwrap().len(), 40);
    }
}

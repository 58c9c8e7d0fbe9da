// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rooms and the player sessions inside them.
//!
//! A room is immutable except for its player map, which only grows: a
//! session is created on a player's first request and reused for the
//! room's lifetime.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use whosaid_core::{ArchiveReader, WhosaidError};

use crate::config::GameConfig;
use crate::deck::MessageDeck;
use crate::engine::GameEngine;
use crate::scoreboard::{ScoreSnapshot, Scoreboard};

const MAX_USERNAME_LENGTH: usize = 32;

/// One player's presence in a room: their name, score, and engine.
pub struct PlayerSession {
    username: String,
    scoreboard: Arc<Scoreboard>,
    engine: GameEngine,
}

impl PlayerSession {
    fn new(
        username: String,
        archive: Arc<dyn ArchiveReader>,
        deck: MessageDeck,
        config: GameConfig,
    ) -> Self {
        let scoreboard = Arc::new(Scoreboard::new());
        let engine = GameEngine::new(archive, deck, Arc::clone(&scoreboard), config);
        Self {
            username,
            scoreboard,
            engine,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }
}

/// One leaderboard row.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub username: String,
    pub score: ScoreSnapshot,
}

/// A named collection of player sessions sharing one archive and one set
/// of scoring parameters.
pub struct Room {
    id: String,
    display_name: String,
    archive: Arc<dyn ArchiveReader>,
    message_ids: Vec<String>,
    config: GameConfig,
    players: DashMap<String, Arc<PlayerSession>>,
}

impl Room {
    /// Builds a room over an already-opened archive. Fails when the
    /// eligible id set is empty; every deck in this room draws from it.
    pub fn new(
        id: String,
        display_name: String,
        archive: Arc<dyn ArchiveReader>,
        message_ids: Vec<String>,
        config: GameConfig,
    ) -> Result<Self, WhosaidError> {
        if message_ids.is_empty() {
            return Err(WhosaidError::NoEligibleMessages);
        }
        Ok(Self {
            id,
            display_name,
            archive,
            message_ids,
            config,
            players: DashMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the session for the normalized username, creating it on
    /// first touch. The entry lock makes concurrent first requests agree
    /// on a single session.
    pub fn get_or_create_player(&self, username: &str) -> Result<Arc<PlayerSession>, WhosaidError> {
        let normalized = normalize_username(username);
        match self.players.entry(normalized.clone()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let deck = MessageDeck::new(self.message_ids.clone())?;
                let session = Arc::new(PlayerSession::new(
                    normalized,
                    Arc::clone(&self.archive),
                    deck,
                    self.config.clone(),
                ));
                entry.insert(Arc::clone(&session));
                Ok(session)
            }
        }
    }

    /// Snapshot of every player's score, highest total first. Tie order
    /// follows map iteration and is not otherwise defined.
    pub fn leaderboard(&self) -> Vec<PlayerRecord> {
        let mut records: Vec<PlayerRecord> = self
            .players
            .iter()
            .map(|entry| PlayerRecord {
                username: entry.value().username().to_string(),
                score: entry.value().scoreboard().snapshot(),
            })
            .collect();
        records.sort_by(|a, b| b.score.total_points.cmp(&a.score.total_points));
        records
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

/// Strips a username down to `[A-Za-z0-9 _-]`, collapses whitespace runs,
/// caps it at 32 chars, and falls back to "Guest" when nothing is left.
pub fn normalize_username(username: &str) -> String {
    let cleaned: String = username
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let mut collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() > MAX_USERNAME_LENGTH {
        collapsed.truncate(MAX_USERNAME_LENGTH);
        collapsed = collapsed.trim_end().to_string();
    }
    if collapsed.is_empty() {
        "Guest".to_string()
    } else {
        collapsed
    }
}

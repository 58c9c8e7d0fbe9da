// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session and game engine for the whosaid trivia server.
//!
//! One [`RoomManager`] owns every [`Room`]; a room owns one shared archive
//! reader and one [`PlayerSession`] per normalized username; each session
//! owns its [`Scoreboard`] and a [`GameEngine`] that drives the per-question
//! lifecycle (issue, guess, forfeit, expire, context unlock). All state is
//! in-memory for the process lifetime.

pub mod config;
pub mod deck;
pub mod engine;
pub mod manager;
pub mod question;
pub mod room;
pub mod scoreboard;

pub use config::GameConfig;
pub use deck::MessageDeck;
pub use engine::{
    ContextResponse, ContextUnlockOutcome, GameEngine, GuessOutcome, GuessResponse,
    QuestionResponse,
};
pub use manager::{RoomCreation, RoomManager};
pub use room::{PlayerRecord, PlayerSession, Room};
pub use scoreboard::{ScoreChange, ScoreSnapshot, Scoreboard};

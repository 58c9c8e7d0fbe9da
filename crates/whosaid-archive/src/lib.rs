// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite archive reader for the whosaid trivia server.
//!
//! Reads the database produced by the chat-export importer (tables:
//! `messages`, `participants`, `attachments`, `embeds`) and implements the
//! [`whosaid_core::ArchiveReader`] trait over it. All queries run on
//! tokio-rusqlite's background thread; the archive is never written.

pub mod database;
pub mod reader;

pub use database::Database;
pub use reader::SqliteArchive;

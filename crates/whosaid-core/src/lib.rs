// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared types for the whosaid trivia server.
//!
//! This crate holds the pieces every other crate agrees on: the error type,
//! the archive data model (messages, choices, context snippets), and the
//! [`ArchiveReader`] trait that separates the game engine from whatever
//! backs the message archive.

pub mod error;
pub mod traits;
pub mod types;

pub use error::WhosaidError;
pub use traits::ArchiveReader;
pub use types::*;

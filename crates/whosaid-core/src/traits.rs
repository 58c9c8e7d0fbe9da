// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archive reader trait, the seam between the game engine and the message
//! store backing a room.

use async_trait::async_trait;

use crate::error::WhosaidError;
use crate::types::{ArchiveMessage, MessageContext};

/// Read-only access to one room's message archive.
///
/// The game engine treats the archive as an external collaborator: slow,
/// fallible, and never mutated. Implementations must be safe to call from
/// many concurrent player sessions.
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    /// Resolves a message id to its content, author, and candidate choices.
    ///
    /// Returns `Ok(None)` when the id does not exist or the row is not
    /// eligible (bot author, empty content). Errors only on archive faults.
    async fn fetch_message_by_id(
        &self,
        message_id: &str,
    ) -> Result<Option<ArchiveMessage>, WhosaidError>;

    /// Enumerates every eligible message id. Called once, at room creation.
    async fn fetch_eligible_message_ids(&self) -> Result<Vec<String>, WhosaidError>;

    /// Fetches the messages immediately before and after the given one.
    async fn fetch_context(&self, message_id: &str) -> Result<MessageContext, WhosaidError>;
}

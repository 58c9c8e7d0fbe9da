// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archive data model shared between the reader, the game engine, and the
//! gateway.
//!
//! Field names serialize in camelCase to match the wire shapes the front
//! end consumes.

use serde::{Deserialize, Serialize};

/// One message sampled from a room's archive, ready to be turned into a
/// question.
///
/// `choices` is pre-shuffled and holds at most four unique participants.
/// When `author_id` resolves to a real participant, that participant is
/// guaranteed to be among the choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMessage {
    pub id: String,
    /// Whitespace-normalized message text.
    pub content: Option<String>,
    pub timestamp: Option<String>,
    /// Author nickname, falling back to name, falling back to "Unknown".
    pub display_name: Option<String>,
    /// `name#discriminator` when both are present, else the bare name.
    pub full_name: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Raw embed JSON blobs, verbatim from the export.
    pub embeds: Vec<String>,
    /// The true author's participant id, if the author resolved.
    pub author_id: Option<String>,
    pub choices: Vec<Choice>,
}

/// One answer option offered to the player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub participant_id: String,
    pub display_name: Option<String>,
    pub full_name: Option<String>,
}

/// A file attached to an archived message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: Option<String>,
    pub file_name: Option<String>,
}

/// One neighboring message shown when context is unlocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnippet {
    pub id: String,
    pub content: Option<String>,
    pub timestamp: Option<String>,
    pub display_name: Option<String>,
}

/// The messages immediately before and after a question's source message.
///
/// Either side is `None` when the source message sits at the edge of the
/// archive. An all-`None` value means "no context available", which is
/// distinct from a fetch that was never attempted (the engine tracks that
/// separately).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContext {
    pub before: Option<ContextSnippet>,
    pub after: Option<ContextSnippet>,
}

impl ArchiveMessage {
    /// Whether this message can be issued as a question: the true author
    /// must resolve and must appear among the offered choices.
    pub fn is_askable(&self) -> bool {
        match &self.author_id {
            Some(author) => {
                !self.choices.is_empty()
                    && self.choices.iter().any(|c| &c.participant_id == author)
            }
            None => false,
        }
    }
}

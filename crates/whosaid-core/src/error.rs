// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the whosaid trivia server.

use thiserror::Error;

/// The primary error type used across the archive reader, game core, and
/// gateway.
///
/// Business outcomes like "question not found" or "insufficient funds" are
/// not errors; the game crate models those as explicit outcome enums. This
/// type covers faults: broken archives, I/O failures, and bad construction.
#[derive(Debug, Error)]
pub enum WhosaidError {
    /// Configuration errors (invalid arguments, unusable paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Archive access errors (database open, query failure).
    #[error("archive error: {source}")]
    Archive {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An uploaded or referenced archive contains no eligible messages.
    #[error("archive has no eligible messages")]
    NoEligibleMessages,

    /// An uploaded archive is larger than the configured limit.
    #[error("archive exceeds the {limit} byte size limit")]
    ArchiveTooLarge { limit: usize },

    /// A message deck cannot be built from an empty id set.
    #[error("message deck requires at least one id")]
    EmptyDeck,

    /// A freshly generated room id collided with an existing room.
    #[error("room id collision: {0}")]
    RoomIdCollision(String),

    /// Filesystem errors while materializing room archives.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_error_displays_source() {
        let err = WhosaidError::Archive {
            source: "table messages is missing".into(),
        };
        assert_eq!(err.to_string(), "archive error: table messages is missing");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: WhosaidError = io.into();
        assert!(matches!(err, WhosaidError::Io(_)));
    }
}

// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The record of one issued, still-open question.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use whosaid_core::{ArchiveMessage, MessageContext};

/// Context-unlock bookkeeping for one question.
///
/// `charged_cost` is fixed at the first successful charge and reused for
/// every retry and re-fetch afterwards; the live total never re-prices an
/// unlock. `context` stays `None` when a fetch after a successful charge
/// failed, which is what makes the free retry path detectable.
#[derive(Debug, Default)]
pub(crate) struct UnlockState {
    pub unlocked: bool,
    pub context: Option<MessageContext>,
    pub charged_cost: i64,
}

/// One open question, exclusively owned by the engine that issued it.
///
/// The unlock cell sits behind an async mutex because `unlock_context`
/// runs a check-charge-fetch-write sequence across an archive read; holding
/// the cell for the whole sequence is what stops two concurrent unlocks of
/// the same question from double-charging.
pub struct QuestionState {
    message: ArchiveMessage,
    issued_at: Instant,
    pub(crate) unlock: Mutex<UnlockState>,
}

impl QuestionState {
    pub fn new(message: ArchiveMessage) -> Self {
        Self {
            message,
            issued_at: Instant::now(),
            unlock: Mutex::new(UnlockState::default()),
        }
    }

    pub fn message(&self) -> &ArchiveMessage {
        &self.message
    }

    /// Time since the question was issued (monotonic clock).
    pub fn age(&self) -> Duration {
        self.issued_at.elapsed()
    }

    pub fn is_expired(&self, expiry: Duration) -> bool {
        self.age() >= expiry
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, by: Duration) {
        self.issued_at -= by;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whosaid_core::ArchiveMessage;

    fn message() -> ArchiveMessage {
        ArchiveMessage {
            id: "m1".to_string(),
            content: Some("text".to_string()),
            timestamp: None,
            display_name: None,
            full_name: None,
            attachments: vec![],
            embeds: vec![],
            author_id: Some("p1".to_string()),
            choices: vec![],
        }
    }

    #[test]
    fn fresh_question_is_locked_and_young() {
        let q = QuestionState::new(message());
        assert!(q.age() < Duration::from_secs(1));
        assert!(!q.is_expired(Duration::from_secs(600)));
        let cell = q.unlock.try_lock().unwrap();
        assert!(!cell.unlocked);
        assert!(cell.context.is_none());
        assert_eq!(cell.charged_cost, 0);
    }

    #[test]
    fn backdated_question_expires() {
        let mut q = QuestionState::new(message());
        q.backdate(Duration::from_secs(601));
        assert!(q.is_expired(Duration::from_secs(600)));
        assert!(!q.is_expired(Duration::from_secs(3600)));
    }
}

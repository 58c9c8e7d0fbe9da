// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Question lifecycle and scoring economy for one player.
//!
//! A question moves open -> resolved (guess or forfeit) or open -> expired
//! (silent removal, no scoring). While open it may additionally have its
//! context unlocked. Resolution removes the question from the open map
//! first, so a second resolution of the same id is not-found by
//! construction.
//!
//! The unlock economy charges before fetching and refunds when the fetch
//! fails, so a player is never left paying for context that did not arrive.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use whosaid_core::{ArchiveMessage, ArchiveReader, MessageContext, WhosaidError};

use crate::config::GameConfig;
use crate::deck::MessageDeck;
use crate::question::QuestionState;
use crate::scoreboard::{ScoreSnapshot, Scoreboard};

/// A freshly issued question.
#[derive(Debug)]
pub struct QuestionResponse {
    pub question_id: String,
    pub message: ArchiveMessage,
    pub score: ScoreSnapshot,
}

/// The result of resolving a question, correct or not.
#[derive(Debug)]
pub struct GuessResponse {
    pub correct: bool,
    /// The true author's display name.
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub correct_choice_id: Option<String>,
    /// Points gained (positive) or lost (negative).
    pub awarded_points: i64,
    /// The time-decayed base the scoring used.
    pub base_points: f64,
    pub streak_multiplier: f64,
    pub elapsed_seconds: f64,
    pub score: ScoreSnapshot,
    /// Surrounding messages for the reveal; `None` on forfeits, empty when
    /// the best-effort fetch failed.
    pub context: Option<MessageContext>,
}

/// Outcome of a guess or forfeit.
#[derive(Debug)]
pub enum GuessOutcome {
    Success(Box<GuessResponse>),
    /// Unknown, already resolved, or expired question id.
    NotFound,
    /// Missing or blank choice id.
    InvalidRequest,
}

/// A successfully unlocked context payload.
#[derive(Debug)]
pub struct ContextResponse {
    /// What this unlock actually cost (0 for zero-point players; the
    /// original charge on cached re-fetches).
    pub cost: i64,
    pub context: MessageContext,
    pub score: ScoreSnapshot,
}

/// Outcome of a context unlock attempt.
#[derive(Debug)]
pub enum ContextUnlockOutcome {
    Success(ContextResponse),
    NotFound,
    /// The spend was refused; nothing changed.
    InsufficientFunds,
    /// The archive fetch failed; any charge was refunded and the question
    /// is still open and unpurchased, safe to retry.
    Failed(WhosaidError),
}

/// Orchestrates the question lifecycle for one player session.
pub struct GameEngine {
    archive: Arc<dyn ArchiveReader>,
    deck: MessageDeck,
    scoreboard: Arc<Scoreboard>,
    config: GameConfig,
    open_questions: DashMap<String, Arc<QuestionState>>,
}

impl GameEngine {
    pub fn new(
        archive: Arc<dyn ArchiveReader>,
        deck: MessageDeck,
        scoreboard: Arc<Scoreboard>,
        config: GameConfig,
    ) -> Self {
        Self {
            archive,
            deck,
            scoreboard,
            config,
            open_questions: DashMap::new(),
        }
    }

    /// Issues a new question from the deck.
    ///
    /// Draws at most one full deck cycle, skipping rows whose author does
    /// not resolve or whose choice set is missing the true author (guards
    /// against malformed archive rows). `Ok(None)` means the deck produced
    /// no usable message, not a fault; archive errors propagate.
    pub async fn prepare_question(&self) -> Result<Option<QuestionResponse>, WhosaidError> {
        self.prune_expired_questions();

        let attempts = self.deck.size();
        for _ in 0..attempts {
            let Some(message_id) = self.deck.next_id() else {
                break;
            };
            let Some(message) = self.archive.fetch_message_by_id(&message_id).await? else {
                continue;
            };
            if !message.is_askable() {
                debug!(message_id, "skipping message without a valid choice set");
                continue;
            }

            let question_id = Uuid::new_v4().to_string();
            self.open_questions
                .insert(question_id.clone(), Arc::new(QuestionState::new(message.clone())));
            debug!(question_id, message_id = message.id, "question issued");

            return Ok(Some(QuestionResponse {
                question_id,
                message,
                score: self.scoreboard.snapshot(),
            }));
        }

        Ok(None)
    }

    /// Scores a player's answer to an open question.
    pub async fn evaluate_guess(&self, question_id: &str, choice_id: Option<&str>) -> GuessOutcome {
        self.resolve(question_id, choice_id, false).await
    }

    /// Resolves a question as incorrect regardless of any submitted choice.
    pub async fn forfeit_question(&self, question_id: &str) -> GuessOutcome {
        self.resolve(question_id, None, true).await
    }

    /// Forfeits every open question; used at session teardown.
    pub async fn forfeit_outstanding_questions(&self) {
        let question_ids: Vec<String> = self
            .open_questions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for question_id in question_ids {
            self.resolve(&question_id, None, true).await;
        }
    }

    /// Silently drops questions older than the configured expiry. Unlike a
    /// forfeit this never touches the scoreboard.
    pub fn prune_expired_questions(&self) {
        let expiry = self.config.question_expiry;
        self.open_questions.retain(|question_id, state| {
            let keep = !state.is_expired(expiry);
            if !keep {
                debug!(question_id, "question expired");
            }
            keep
        });
    }

    async fn resolve(
        &self,
        question_id: &str,
        choice_id: Option<&str>,
        force_incorrect: bool,
    ) -> GuessOutcome {
        if !force_incorrect && choice_id.map_or(true, |c| c.trim().is_empty()) {
            return GuessOutcome::InvalidRequest;
        }

        self.prune_expired_questions();

        // Removal is the resolution: whichever caller wins the remove gets
        // to score, every other caller sees not-found.
        let Some((_, state)) = self.open_questions.remove(question_id) else {
            return GuessOutcome::NotFound;
        };

        let message = state.message();
        let correct = !force_incorrect
            && message
                .author_id
                .as_deref()
                .is_some_and(|author| choice_id == Some(author));

        let elapsed_seconds = state.age().as_secs_f64();
        let effective_base =
            (self.config.base_points - self.config.decay_per_second * elapsed_seconds).max(0.0);

        let change = if correct {
            self.scoreboard
                .apply_correct(effective_base, self.config.streak_bonus_step)
        } else {
            self.scoreboard.apply_incorrect(effective_base)
        };

        // Best effort: the reveal shows surrounding messages when we can
        // get them, but a broken archive never fails the guess.
        let context = if force_incorrect {
            None
        } else {
            match self.archive.fetch_context(&message.id).await {
                Ok(ctx) => Some(ctx),
                Err(error) => {
                    warn!(question_id, %error, "context fetch after guess failed");
                    Some(MessageContext::default())
                }
            }
        };

        debug!(
            question_id,
            correct,
            awarded = change.awarded_points,
            elapsed_seconds,
            "question resolved"
        );

        GuessOutcome::Success(Box::new(GuessResponse {
            correct,
            display_name: message.display_name.clone(),
            full_name: message.full_name.clone(),
            correct_choice_id: message.author_id.clone(),
            awarded_points: change.awarded_points,
            base_points: change.base_points,
            streak_multiplier: change.streak_multiplier,
            elapsed_seconds,
            score: change.snapshot,
            context,
        }))
    }

    /// Purchases (or re-fetches) the context for an open question.
    ///
    /// The whole check-charge-fetch-write sequence holds the question's
    /// unlock cell, so concurrent unlocks of the same question serialize
    /// and at most one of them is charged.
    pub async fn unlock_context(&self, question_id: &str) -> ContextUnlockOutcome {
        self.prune_expired_questions();

        let Some(state) = self
            .open_questions
            .get(question_id)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return ContextUnlockOutcome::NotFound;
        };

        let mut cell = state.unlock.lock().await;

        if cell.unlocked {
            if let Some(context) = cell.context.clone() {
                // Pure re-fetch at the original price; nothing is charged.
                return ContextUnlockOutcome::Success(ContextResponse {
                    cost: cell.charged_cost,
                    context,
                    score: self.scoreboard.snapshot(),
                });
            }
            // Charged earlier but the payload never arrived: retry the
            // fetch for free at the recorded cost.
            return match self.archive.fetch_context(&state.message().id).await {
                Ok(context) => {
                    cell.context = Some(context.clone());
                    ContextUnlockOutcome::Success(ContextResponse {
                        cost: cell.charged_cost,
                        context,
                        score: self.scoreboard.snapshot(),
                    })
                }
                Err(error) => ContextUnlockOutcome::Failed(error),
            };
        }

        let total = self.scoreboard.snapshot().total_points;
        let cost = context_cost(total, self.config.context_cost_fraction);
        let Some(score_after_spend) = self.scoreboard.spend_points(cost) else {
            return ContextUnlockOutcome::InsufficientFunds;
        };

        match self.archive.fetch_context(&state.message().id).await {
            Ok(context) => {
                cell.unlocked = true;
                cell.context = Some(context.clone());
                cell.charged_cost = cost;
                debug!(question_id, cost, "context unlocked");
                ContextUnlockOutcome::Success(ContextResponse {
                    cost,
                    context,
                    score: score_after_spend,
                })
            }
            Err(error) => {
                self.scoreboard.refund_points(cost);
                warn!(question_id, cost, %error, "context fetch failed, charge refunded");
                ContextUnlockOutcome::Failed(error)
            }
        }
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn open_question_count(&self) -> usize {
        self.open_questions.len()
    }

    #[cfg(test)]
    pub(crate) fn backdate_question(&self, question_id: &str, by: std::time::Duration) {
        let mut entry = self
            .open_questions
            .get_mut(question_id)
            .expect("question exists");
        Arc::get_mut(entry.value_mut())
            .expect("question not shared")
            .backdate(by);
    }
}

/// Context unlock price: ceil of the live total times the fraction, at
/// least 1 for any positive total, never more than the total. A zero-point
/// player pays 0.
fn context_cost(total_points: i64, fraction: f64) -> i64 {
    if total_points <= 0 {
        return 0;
    }
    let cost = (total_points as f64 * fraction).ceil() as i64;
    cost.max(1).min(total_points)
}

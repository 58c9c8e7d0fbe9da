// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoring parameters shared by every player session in a room.

use std::time::Duration;

/// Tunable scoring economy for a room.
///
/// The defaults match the classic game: a fresh question is worth 1000
/// points, decays by 25/s, each streak step adds 20% to the multiplier,
/// context costs 10% of the live total, and unanswered questions expire
/// after ten minutes.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Points a question is worth at the instant it is issued.
    pub base_points: f64,
    /// Points shaved off the base per second of thinking time.
    pub decay_per_second: f64,
    /// Multiplier increment per consecutive correct answer beyond the first.
    pub streak_bonus_step: f64,
    /// Fraction of the live total charged for a context unlock.
    pub context_cost_fraction: f64,
    /// How long an unanswered question stays open.
    pub question_expiry: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            base_points: 1000.0,
            decay_per_second: 25.0,
            streak_bonus_step: 0.2,
            context_cost_fraction: 0.10,
            question_expiry: Duration::from_secs(10 * 60),
        }
    }
}

// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One player's point total and streak counters.
//!
//! Every mutation goes through a method that takes the inner lock once, so
//! readers always observe a consistent (total, streak, best) triple.

use std::sync::Mutex;

use serde::Serialize;

/// A consistent view of one player's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSnapshot {
    pub total_points: i64,
    pub current_streak: u32,
    pub best_streak: u32,
}

/// The result of scoring one resolved question.
#[derive(Debug, Clone, Copy)]
pub struct ScoreChange {
    /// Points gained (positive) or lost (negative).
    pub awarded_points: i64,
    /// The decayed base the award was computed from.
    pub base_points: f64,
    /// Streak multiplier applied; 0.0 for an incorrect resolution.
    pub streak_multiplier: f64,
    /// The score after applying this change.
    pub snapshot: ScoreSnapshot,
}

#[derive(Debug, Default)]
struct Inner {
    total_points: i64,
    current_streak: u32,
    best_streak: u32,
}

/// Atomic score holder for one player session.
#[derive(Debug, Default)]
pub struct Scoreboard {
    inner: Mutex<Inner>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current (total, streak, best) triple.
    pub fn snapshot(&self) -> ScoreSnapshot {
        let inner = self.lock();
        Self::snapshot_of(&inner)
    }

    /// Scores a correct answer: bumps the streak, applies the streak
    /// multiplier `1 + step * (streak - 1)` to the decayed base, and adds
    /// the rounded award (never negative) to the total.
    pub fn apply_correct(&self, effective_base: f64, streak_step: f64) -> ScoreChange {
        let mut inner = self.lock();
        inner.current_streak += 1;
        if inner.current_streak > inner.best_streak {
            inner.best_streak = inner.current_streak;
        }
        let multiplier = 1.0 + streak_step * f64::from(inner.current_streak - 1);
        let awarded = ((effective_base * multiplier).round() as i64).max(0);
        inner.total_points += awarded;
        ScoreChange {
            awarded_points: awarded,
            base_points: effective_base,
            streak_multiplier: multiplier,
            snapshot: Self::snapshot_of(&inner),
        }
    }

    /// Scores an incorrect (or forfeited) answer: halves the total with
    /// integer floor and resets the current streak. The best streak keeps
    /// its high-water mark.
    pub fn apply_incorrect(&self, effective_base: f64) -> ScoreChange {
        let mut inner = self.lock();
        let before = inner.total_points;
        let after = before / 2;
        inner.total_points = after;
        inner.current_streak = 0;
        ScoreChange {
            awarded_points: -(before - after),
            base_points: effective_base,
            streak_multiplier: 0.0,
            snapshot: Self::snapshot_of(&inner),
        }
    }

    /// Deducts `cost` if affordable; refuses negative costs and overdrafts.
    /// This is the only gate on the context-purchase economy.
    pub fn spend_points(&self, cost: i64) -> Option<ScoreSnapshot> {
        let mut inner = self.lock();
        if cost < 0 || inner.total_points < cost {
            return None;
        }
        inner.total_points -= cost;
        Some(Self::snapshot_of(&inner))
    }

    /// Adds back a previously spent amount. Only used to undo a spend whose
    /// paired context fetch failed. Non-positive amounts are ignored.
    pub fn refund_points(&self, amount: i64) {
        if amount > 0 {
            let mut inner = self.lock();
            inner.total_points += amount;
        }
    }

    fn snapshot_of(inner: &Inner) -> ScoreSnapshot {
        ScoreSnapshot {
            total_points: inner.total_points,
            current_streak: inner.current_streak,
            best_streak: inner.best_streak,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // No code path panics while holding the lock, so a poisoned guard
        // still holds a consistent triple.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

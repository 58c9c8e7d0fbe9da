// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shuffled, repeating supply of message ids for one player.
//!
//! Every id in the full set is drawn exactly once per shuffle cycle; when
//! the queue runs dry the deck reshuffles and starts over.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use whosaid_core::WhosaidError;

struct Inner {
    queue: VecDeque<String>,
    rng: StdRng,
}

/// A per-player deck of message ids.
pub struct MessageDeck {
    all_ids: Vec<String>,
    inner: Mutex<Inner>,
}

impl MessageDeck {
    /// Builds a deck from the room's eligible ids, shuffled with an
    /// OS-seeded RNG. Fails on an empty id set.
    pub fn new(ids: Vec<String>) -> Result<Self, WhosaidError> {
        Self::with_rng(ids, StdRng::from_entropy())
    }

    /// Builds a deck with a caller-supplied RNG, so tests can pin the
    /// shuffle order.
    pub fn with_rng(ids: Vec<String>, mut rng: StdRng) -> Result<Self, WhosaidError> {
        if ids.is_empty() {
            return Err(WhosaidError::EmptyDeck);
        }
        let mut first_cycle = ids.clone();
        first_cycle.shuffle(&mut rng);
        Ok(Self {
            all_ids: ids,
            inner: Mutex::new(Inner {
                queue: first_cycle.into(),
                rng,
            }),
        })
    }

    /// Draws the next id, reshuffling the full set when the current cycle
    /// is exhausted.
    pub fn next_id(&self) -> Option<String> {
        let mut inner = self.lock();
        if inner.queue.is_empty() {
            let mut cycle = self.all_ids.clone();
            cycle.shuffle(&mut inner.rng);
            inner.queue = cycle.into();
        }
        inner.queue.pop_front()
    }

    /// Cardinality of the full id set; callers use this to bound retry
    /// loops over `next_id`.
    pub fn size(&self) -> usize {
        self.all_ids.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

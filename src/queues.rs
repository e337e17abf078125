//! The three card queues and their refill discipline.
//!
//! Queues hold card ids, not cards, and are rebuilt lazily: they start
//! empty, a `fill_*` call is a no-op while anything is queued, and
//! answering a card never edits them in place; the next refill simply
//! re-reads the deck.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::models::{Card, CardId, CardQueue, Due};

/// Holds the new, learning and review queues for one scheduler.
#[derive(Debug, Default)]
pub struct QueueManager {
    new_queue: Vec<CardId>,
    lrn_queue: Vec<CardId>,
    rev_queue: Vec<CardId>,
}

impl QueueManager {
    /// Queues new cards in creation order, capped at `limit`.
    pub fn fill_new(&mut self, cards: &[Card], limit: usize) {
        if !self.new_queue.is_empty() {
            return;
        }
        let mut ids: Vec<CardId> = cards
            .iter()
            .filter(|c| c.queue == CardQueue::New)
            .map(|c| c.id)
            .collect();
        ids.sort_unstable();
        ids.truncate(limit);
        // Stored highest-id first so the tail pop yields creation order.
        ids.reverse();
        self.new_queue = ids;
        log::debug!("filled new queue with {} cards", self.new_queue.len());
    }

    /// Queues learning cards due before `cutoff`, earliest first, capped at
    /// `limit`.
    pub fn fill_lrn(&mut self, cards: &[Card], cutoff: i64, limit: usize) {
        if !self.lrn_queue.is_empty() {
            return;
        }
        let mut entries: Vec<(i64, CardId)> = cards
            .iter()
            .filter_map(|c| match (c.queue, c.due) {
                (CardQueue::Learning, Due::Learning(at)) if at < cutoff => Some((at, c.id)),
                _ => None,
            })
            .collect();
        entries.sort_unstable();
        entries.truncate(limit);
        self.lrn_queue = entries.into_iter().rev().map(|(_, id)| id).collect();
        log::debug!("filled learning queue with {} cards", self.lrn_queue.len());
    }

    /// Queues review cards due on or before `today`, capped at `limit` and
    /// shuffled with a RNG seeded by `today`: the order is random within a
    /// day but reproducible across process restarts.
    pub fn fill_rev(&mut self, cards: &[Card], today: i64, limit: usize) {
        if !self.rev_queue.is_empty() {
            return;
        }
        let mut entries: Vec<(i64, CardId)> = cards
            .iter()
            .filter_map(|c| match (c.queue, c.due) {
                (CardQueue::Review, Due::Review(day)) if day <= today => Some((day, c.id)),
                _ => None,
            })
            .collect();
        entries.sort_unstable();
        entries.truncate(limit);
        let mut ids: Vec<CardId> = entries.into_iter().map(|(_, id)| id).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(today as u64);
        ids.shuffle(&mut rng);
        self.rev_queue = ids;
        log::debug!("filled review queue with {} cards", self.rev_queue.len());
    }

    pub fn pop_new(&mut self) -> Option<CardId> {
        self.new_queue.pop()
    }

    pub fn pop_lrn(&mut self) -> Option<CardId> {
        self.lrn_queue.pop()
    }

    pub fn pop_rev(&mut self) -> Option<CardId> {
        self.rev_queue.pop()
    }

    pub fn clear_new(&mut self) {
        self.new_queue.clear();
    }

    pub fn clear_lrn(&mut self) {
        self.lrn_queue.clear();
    }

    pub fn clear_rev(&mut self) {
        self.rev_queue.clear();
    }

    pub fn new_len(&self) -> usize {
        self.new_queue.len()
    }

    pub fn lrn_len(&self) -> usize {
        self.lrn_queue.len()
    }

    pub fn rev_len(&self) -> usize {
        self.rev_queue.len()
    }
}

//! Thread-safe collection of search results awaiting delivery.

use crate::core::types::{FileOutcome, SpecialHit};
use crossbeam_channel::{unbounded, Receiver, Sender};
use dashmap::DashSet;

/// Everything buffered at the moment of a drain.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Drained {
    /// Pending file outcomes, in no particular order
    pub outcomes: Vec<FileOutcome>,
    /// Special markers in first-seen order
    pub special_hits: Vec<SpecialHit>,
}

impl Drained {
    /// Whether nothing was buffered.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty() && self.special_hits.is_empty()
    }
}

/// Multi-producer sink for file outcomes and deduplicated special markers.
///
/// Producers never block. A marker is queued only by the producer whose
/// insertion into the seen-set succeeded, so each key is delivered once per
/// search no matter how many files carry it.
#[derive(Debug)]
pub struct ResultAggregator {
    outcome_tx: Sender<FileOutcome>,
    outcome_rx: Receiver<FileOutcome>,
    seen: DashSet<SpecialHit>,
    special_tx: Sender<SpecialHit>,
    special_rx: Receiver<SpecialHit>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        let (outcome_tx, outcome_rx) = unbounded();
        let (special_tx, special_rx) = unbounded();
        Self {
            outcome_tx,
            outcome_rx,
            seen: DashSet::new(),
            special_tx,
            special_rx,
        }
    }

    /// Buffer one file outcome.
    pub fn add(&self, outcome: FileOutcome) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.outcome_tx.send(outcome);
    }

    /// Record a special marker; returns `true` if it was seen for the first time.
    pub fn add_special(&self, key: SpecialHit) -> bool {
        if self.seen.contains(&key) || !self.seen.insert(key.clone()) {
            return false;
        }
        let _ = self.special_tx.send(key);
        true
    }

    /// Remove and return everything currently buffered.
    ///
    /// Items added while the drain runs end up either in this drain or in a
    /// later one.
    pub fn drain_all(&self) -> Drained {
        Drained {
            outcomes: self.outcome_rx.try_iter().collect(),
            special_hits: self.special_rx.try_iter().collect(),
        }
    }

    /// Forget all buffered items and seen markers.
    pub fn reset(&self) {
        self.drain_all();
        self.seen.clear();
    }
}

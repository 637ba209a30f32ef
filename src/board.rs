use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::entry::{CustomerId, Entry};
use crate::error::RankError;
use crate::skiplist::{NodeId, SkipList};
use crate::FastHashMap;

/// Largest score adjustment accepted by a single update.
pub const MAX_DELTA: Decimal = Decimal::ONE_THOUSAND;

/// One row of a range or neighbor reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankedCustomer {
    pub id: CustomerId,
    pub score: Decimal,
    pub rank: u64,
}

/// Score table, ordered index and node locator form one consistency
/// domain; a reader must never see the table updated without the matching
/// index mutation. A single lock over the whole tuple enforces that.
struct BoardInner {
    scores: FastHashMap<CustomerId, Decimal>,
    index: SkipList,
    nodes: FastHashMap<CustomerId, NodeId>,
}

/// Concurrent leaderboard: exact-decimal scores, O(log n) rank queries.
///
/// A customer is ranked exactly while its score is strictly positive.
/// Updates are one-shot adjustments; a score change always deletes the old
/// index node and inserts a fresh one, since the ordering key changed.
pub struct Leaderboard {
    inner: RwLock<BoardInner>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::with_index(SkipList::new())
    }

    /// Deterministic index shape for tests; observable behavior does not
    /// depend on the seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_index(SkipList::with_seed(seed))
    }

    fn with_index(index: SkipList) -> Self {
        Self {
            inner: RwLock::new(BoardInner {
                scores: FastHashMap::default(),
                index,
                nodes: FastHashMap::default(),
            }),
        }
    }

    /// Apply a one-shot adjustment and return the new total score.
    ///
    /// Atomic with respect to every other mutation and read: either the
    /// whole delete/write/insert sequence becomes visible or, on a
    /// rejected delta, nothing changed.
    pub fn update_score(&self, id: CustomerId, delta: Decimal) -> Result<Decimal, RankError> {
        if delta > MAX_DELTA || delta < -MAX_DELTA {
            return Err(RankError::DeltaOutOfRange { delta });
        }

        let mut inner = self.inner.write();
        let current = inner.scores.get(&id).copied().unwrap_or(Decimal::ZERO);
        let new_score = current + delta;

        let was_ranked = match inner.nodes.remove(&id) {
            Some(node) => {
                let old_entry = *inner.index.entry(node);
                inner.index.delete(&old_entry);
                true
            }
            None => false,
        };
        inner.scores.insert(id, new_score);
        let ranked = new_score > Decimal::ZERO;
        if ranked {
            let node = inner.index.insert(Entry::new(id, new_score));
            inner.nodes.insert(id, node);
        } else if was_ranked {
            trace!(id, %new_score, "customer dropped out of ranking");
        }

        debug!(id, %new_score, ranked, "score updated");
        Ok(new_score)
    }

    /// Customers at 1-based ranks `start..=end`, best first. Ranges past
    /// the end of the list saturate rather than fail.
    pub fn get_range(&self, start: u64, end: u64) -> Result<Vec<RankedCustomer>, RankError> {
        if start < 1 || end < start {
            return Err(RankError::InvalidRange { start, end });
        }

        let inner = self.inner.read();
        let mut out = Vec::new();
        let mut node = inner.index.get_by_rank(start);
        let mut rank = start;
        while let Some(n) = node {
            if rank > end {
                break;
            }
            let entry = inner.index.entry(n);
            out.push(RankedCustomer {
                id: entry.id,
                score: entry.score,
                rank,
            });
            node = inner.index.next(n);
            rank += 1;
        }
        Ok(out)
    }

    /// The customer plus up to `high` better-ranked and `low` worse-ranked
    /// neighbors, in ascending rank order. Windows reaching past either end
    /// of the list saturate; an unranked customer is `NotFound`.
    pub fn get_neighbors(
        &self,
        id: CustomerId,
        high: usize,
        low: usize,
    ) -> Result<Vec<RankedCustomer>, RankError> {
        let inner = self.inner.read();
        let node = match inner.nodes.get(&id) {
            Some(&n) => n,
            None => {
                trace!(id, "neighbor query for unranked customer");
                return Err(RankError::NotFound { id });
            }
        };
        let entry = *inner.index.entry(node);
        let rank = inner
            .index
            .rank_of(&entry)
            .expect("locator entry must be live in the index");

        let mut above = Vec::with_capacity(high.min(rank as usize - 1));
        let mut current = inner.index.prev(node);
        for step in 0..high as u64 {
            let n = match current {
                Some(n) => n,
                None => break,
            };
            let e = inner.index.entry(n);
            above.push(RankedCustomer {
                id: e.id,
                score: e.score,
                rank: rank - step - 1,
            });
            current = inner.index.prev(n);
        }
        above.reverse();

        let mut out = above;
        out.push(RankedCustomer {
            id,
            score: entry.score,
            rank,
        });

        let mut current = inner.index.next(node);
        for step in 0..low as u64 {
            let n = match current {
                Some(n) => n,
                None => break,
            };
            let e = inner.index.entry(n);
            out.push(RankedCustomer {
                id: e.id,
                score: e.score,
                rank: rank + step + 1,
            });
            current = inner.index.next(n);
        }
        Ok(out)
    }

    /// Number of currently ranked (score > 0) customers.
    pub fn total_count(&self) -> usize {
        self.inner.read().index.len()
    }

    /// Current stored score, including non-positive totals for customers
    /// that have dropped off the ranking.
    pub fn score(&self, id: CustomerId) -> Option<Decimal> {
        self.inner.read().scores.get(&id).copied()
    }

    /// True while the customer holds a live index node.
    pub fn contains(&self, id: CustomerId) -> bool {
        self.inner.read().nodes.contains_key(&id)
    }
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self::new()
    }
}

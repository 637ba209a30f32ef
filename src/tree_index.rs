//! Ordered-map backend without rank-span acceleration.
//!
//! Functionally equivalent to the skip list but rank lookups walk the
//! score buckets, so positional queries degrade to O(n). Kept as the
//! reference oracle for differential tests against [`crate::SkipList`].

use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::entry::CustomerId;
use crate::FastHashMap;

type Bucket = SmallVec<[CustomerId; 4]>;
type ScoreKey = Reverse<Decimal>;

#[derive(Default)]
pub struct TreeIndex {
    by_score: BTreeMap<ScoreKey, Bucket>,
    by_score_sizes: BTreeMap<ScoreKey, usize>,
    members: FastHashMap<CustomerId, Decimal>,
}

impl TreeIndex {
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[inline]
    pub fn score(&self, id: CustomerId) -> Option<Decimal> {
        self.members.get(&id).copied()
    }

    /// Insert or re-score a member. Returns true when the member is new.
    pub fn insert(&mut self, id: CustomerId, score: Decimal) -> bool {
        let is_new = match self.members.insert(id, score) {
            Some(old) if old == score => return false,
            Some(old) => {
                self.unlink(id, old);
                false
            }
            None => true,
        };
        let key = Reverse(score);
        let bucket = self.by_score.entry(key).or_default();
        match bucket.binary_search(&id) {
            Ok(_) => {}
            Err(pos) => {
                bucket.insert(pos, id);
                *self.by_score_sizes.entry(key).or_insert(0) += 1;
            }
        }
        is_new
    }

    pub fn remove(&mut self, id: CustomerId) -> bool {
        match self.members.remove(&id) {
            Some(score) => {
                self.unlink(id, score);
                true
            }
            None => false,
        }
    }

    fn unlink(&mut self, id: CustomerId, score: Decimal) {
        let key = Reverse(score);
        if let Some(bucket) = self.by_score.get_mut(&key) {
            if let Ok(pos) = bucket.binary_search(&id) {
                bucket.remove(pos);
            }
            if let Some(sz) = self.by_score_sizes.get_mut(&key) {
                *sz -= 1;
                if *sz == 0 {
                    self.by_score_sizes.remove(&key);
                }
            }
            if bucket.is_empty() {
                self.by_score.remove(&key);
            }
        }
    }

    /// 1-based rank, walking bucket sizes up to the member's score.
    pub fn rank_of(&self, id: CustomerId) -> Option<u64> {
        let key = Reverse(self.members.get(&id).copied()?);
        let bucket = self.by_score.get(&key)?;
        let pos = bucket.binary_search(&id).ok()?;
        let mut idx = 0u64;
        for sz in self.by_score_sizes.range(..key).map(|(_, sz)| *sz) {
            idx += sz as u64;
        }
        Some(idx + pos as u64 + 1)
    }

    /// Members at 1-based ranks `start..=end` in rank order, saturating at
    /// the end of the list.
    pub fn range(&self, start: u64, end: u64) -> Vec<(CustomerId, Decimal, u64)> {
        let mut out = Vec::new();
        let mut rank = 0u64;
        for (key, bucket) in &self.by_score {
            for &id in bucket {
                rank += 1;
                if rank > end {
                    return out;
                }
                if rank >= start {
                    out.push((id, key.0, rank));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescore_moves_member_between_buckets() {
        let mut idx = TreeIndex::default();
        assert!(idx.insert(1, Decimal::from(10)));
        assert!(idx.insert(2, Decimal::from(10)));
        assert!(!idx.insert(1, Decimal::from(30)));
        assert_eq!(idx.rank_of(1), Some(1));
        assert_eq!(idx.rank_of(2), Some(2));
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn bucket_sizes_track_buckets() {
        let mut idx = TreeIndex::default();
        for i in 0..20 {
            idx.insert(i, Decimal::from(i % 4));
        }
        for i in 0..20 {
            assert!(idx.remove(i));
        }
        assert!(idx.is_empty());
        assert!(idx.by_score.is_empty());
        assert!(idx.by_score_sizes.is_empty());
    }

    #[test]
    fn range_saturates() {
        let mut idx = TreeIndex::default();
        for i in 1..=5 {
            idx.insert(i, Decimal::from(i));
        }
        let out = idx.range(4, 100);
        let ids: Vec<_> = out.iter().map(|&(id, _, _)| id).collect();
        assert_eq!(ids, [2, 1]);
    }
}

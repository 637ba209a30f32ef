use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Customer identifier. Identity of an entry is the id alone.
pub type CustomerId = i64;

/// One ranked entry: a customer and the score it is ranked under.
///
/// The index order is score descending with id ascending as the tiebreak,
/// which makes the order strict: no two distinct ids ever compare equal,
/// so every live entry has a unique rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: CustomerId,
    pub score: Decimal,
}

impl Entry {
    #[inline]
    pub fn new(id: CustomerId, score: Decimal) -> Self {
        Self { id, score }
    }
}

impl Ord for Entry {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Entry {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_score_ranks_first() {
        let a = Entry::new(1, Decimal::from(700));
        let b = Entry::new(2, Decimal::from(500));
        assert!(a < b);
    }

    #[test]
    fn ties_break_by_id_ascending() {
        let a = Entry::new(3, Decimal::from(500));
        let b = Entry::new(7, Decimal::from(500));
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn exact_decimal_comparison() {
        let a = Entry::new(1, "0.1".parse().unwrap());
        let b = Entry::new(1, "0.10".parse().unwrap());
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }
}

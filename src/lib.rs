#![deny(clippy::uninlined_format_args)]
#![deny(clippy::to_string_in_format_args)]

//! Concurrent leaderboard core.
//!
//! Three pieces kept consistent under one lock: a score table (id to exact
//! decimal score), a span-augmented skip list ordering live entries by
//! (score desc, id asc), and a locator map from id to skip-list node for
//! O(1) re-location. [`Leaderboard`] is the only entry point; range and
//! neighbor queries are O(log n) expected plus output size.

mod board;
mod entry;
mod error;
mod skiplist;
pub mod tree_index;

pub use board::{Leaderboard, RankedCustomer, MAX_DELTA};
pub use entry::{CustomerId, Entry};
pub use error::RankError;
pub use skiplist::{NodeId, SkipList};

use rustc_hash::FxHashMap;

/// Hash map used for the id-keyed score and locator tables. Ids are not
/// attacker-controlled; FxHasher is acceptable.
pub type FastHashMap<K, V> = FxHashMap<K, V>;

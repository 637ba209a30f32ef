use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

use crate::entry::Entry;

const MAX_LEVEL: usize = 32;
const LEVEL_P: f64 = 0.25;

/// Opaque handle to a live node. Stays valid until the entry it was returned
/// for is deleted from the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Clone, Copy, Default)]
struct Link {
    forward: Option<NodeId>,
    /// Distance in bottom-level steps to `forward`. Summing spans along any
    /// head-to-node path yields the node's 1-based rank.
    span: u64,
}

struct Node {
    entry: Entry,
    links: SmallVec<[Link; 4]>,
    backward: Option<NodeId>,
}

impl Node {
    fn new(entry: Entry, level: usize) -> Self {
        Self {
            entry,
            links: (0..level).map(|_| Link::default()).collect(),
            backward: None,
        }
    }
}

/// Span-augmented skip list ordered by (score desc, id asc).
///
/// Nodes live in an index-addressed arena; deleted slots are tombstoned and
/// recycled through a free list, so handles never alias a different entry
/// while they are live. Slot 0 is the head sentinel.
pub struct SkipList {
    nodes: Vec<Option<Node>>,
    free_slots: Vec<u32>,
    tail: Option<NodeId>,
    level: usize,
    len: usize,
    rng: SmallRng,
}

impl SkipList {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Deterministic structure shape for tests. Query results are
    /// shape-independent either way.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        let head = Node {
            // Sentinel entry, never compared or returned.
            entry: Entry::new(0, rust_decimal::Decimal::ZERO),
            links: (0..MAX_LEVEL).map(|_| Link::default()).collect(),
            backward: None,
        };
        Self {
            nodes: vec![Some(head)],
            free_slots: Vec::new(),
            tail: None,
            level: 1,
            len: 0,
            rng,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn entry(&self, id: NodeId) -> &Entry {
        &self.node(id.0 as usize).entry
    }

    /// Level-0 successor, O(1).
    #[inline]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id.0 as usize).links[0].forward
    }

    /// Level-0 predecessor, O(1). None once the head sentinel is reached.
    #[inline]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id.0 as usize).backward
    }

    /// First node in rank order.
    #[inline]
    pub fn first(&self) -> Option<NodeId> {
        self.node(0).links[0].forward
    }

    #[inline]
    fn node(&self, idx: usize) -> &Node {
        self.nodes[idx].as_ref().expect("stale node slot")
    }

    #[inline]
    fn node_mut(&mut self, idx: usize) -> &mut Node {
        self.nodes[idx].as_mut().expect("stale node slot")
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.gen::<f64>() < LEVEL_P {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, entry: Entry, level: usize) -> NodeId {
        let node = Node::new(entry, level);
        if let Some(idx) = self.free_slots.pop() {
            self.nodes[idx as usize] = Some(node);
            NodeId(idx)
        } else {
            let idx = self.nodes.len();
            let idx: u32 = idx.try_into().expect("too many nodes in skip list");
            self.nodes.push(Some(node));
            NodeId(idx)
        }
    }

    fn free(&mut self, id: NodeId) {
        self.nodes[id.0 as usize] = None;
        self.free_slots.push(id.0);
    }

    /// Insert an entry and return its handle.
    ///
    /// The caller guarantees no live node currently holds this entry's id;
    /// the engine enforces that by deleting the old node first.
    pub fn insert(&mut self, entry: Entry) -> NodeId {
        let mut update = [0u32; MAX_LEVEL];
        let mut rank = [0u64; MAX_LEVEL];

        // Search phase: per-level predecessor plus the number of
        // bottom-level nodes skipped to reach it.
        let mut x = 0usize;
        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            loop {
                let link = self.node(x).links[i];
                match link.forward {
                    Some(f) if self.node(f.0 as usize).entry < entry => {
                        rank[i] += link.span;
                        x = f.0 as usize;
                    }
                    _ => break,
                }
            }
            update[i] = x as u32;
        }

        let new_level = self.random_level();
        if new_level > self.level {
            for i in self.level..new_level {
                rank[i] = 0;
                update[i] = 0;
                // Newly opened head level spans the whole list until spliced.
                self.node_mut(0).links[i].span = self.len as u64;
            }
            self.level = new_level;
        }

        let id = self.alloc(entry, new_level);
        for i in 0..new_level {
            let pred = update[i] as usize;
            let pred_link = self.node(pred).links[i];
            {
                let node = self.node_mut(id.0 as usize);
                node.links[i].forward = pred_link.forward;
                node.links[i].span = pred_link.span - (rank[0] - rank[i]);
            }
            let pred_node = self.node_mut(pred);
            pred_node.links[i].forward = Some(id);
            pred_node.links[i].span = (rank[0] - rank[i]) + 1;
        }

        // One more node now sits under every skip the new node does not own.
        for i in new_level..self.level {
            self.node_mut(update[i] as usize).links[i].span += 1;
        }

        let backward = if update[0] == 0 {
            None
        } else {
            Some(NodeId(update[0]))
        };
        self.node_mut(id.0 as usize).backward = backward;
        let forward = self.node(id.0 as usize).links[0].forward;
        match forward {
            Some(f) => self.node_mut(f.0 as usize).backward = Some(id),
            None => self.tail = Some(id),
        }

        self.len += 1;
        id
    }

    /// Delete the node holding exactly this entry. Silent no-op when absent;
    /// presence validation is the caller's job.
    pub fn delete(&mut self, entry: &Entry) {
        let mut update = [0u32; MAX_LEVEL];

        let mut x = 0usize;
        for i in (0..self.level).rev() {
            loop {
                let link = self.node(x).links[i];
                match link.forward {
                    Some(f) if self.node(f.0 as usize).entry < *entry => {
                        x = f.0 as usize;
                    }
                    _ => break,
                }
            }
            update[i] = x as u32;
        }

        let target = match self.node(x).links[0].forward {
            Some(f) if self.node(f.0 as usize).entry == *entry => f,
            _ => return,
        };

        for i in 0..self.level {
            let pred = update[i] as usize;
            if self.node(pred).links[i].forward == Some(target) {
                let absorbed = self.node(target.0 as usize).links[i];
                let pred_node = self.node_mut(pred);
                // Add before subtracting: a tail-position node carries span 0
                // and `absorbed.span - 1` alone would underflow.
                pred_node.links[i].span = pred_node.links[i].span + absorbed.span - 1;
                pred_node.links[i].forward = absorbed.forward;
            } else {
                self.node_mut(pred).links[i].span -= 1;
            }
        }

        let target_backward = self.node(target.0 as usize).backward;
        let target_forward = self.node(target.0 as usize).links[0].forward;
        match target_forward {
            Some(f) => self.node_mut(f.0 as usize).backward = target_backward,
            None => self.tail = target_backward,
        }

        while self.level > 1 && self.node(0).links[self.level - 1].forward.is_none() {
            self.level -= 1;
        }

        self.free(target);
        self.len -= 1;
    }

    /// Node at a 1-based rank. Rank 0 or beyond the list yields None.
    pub fn get_by_rank(&self, rank: u64) -> Option<NodeId> {
        if rank == 0 || rank > self.len as u64 {
            return None;
        }
        let mut traversed = 0u64;
        let mut x = 0usize;
        for i in (0..self.level).rev() {
            loop {
                let link = self.node(x).links[i];
                match link.forward {
                    Some(f) if traversed + link.span <= rank => {
                        traversed += link.span;
                        x = f.0 as usize;
                    }
                    _ => break,
                }
            }
        }
        debug_assert_eq!(traversed, rank);
        Some(NodeId(x as u32))
    }

    /// 1-based rank of exactly this entry, None when absent.
    pub fn rank_of(&self, entry: &Entry) -> Option<u64> {
        let mut rank = 0u64;
        let mut x = 0usize;
        for i in (0..self.level).rev() {
            loop {
                let link = self.node(x).links[i];
                match link.forward {
                    Some(f) if self.node(f.0 as usize).entry < *entry => {
                        rank += link.span;
                        x = f.0 as usize;
                    }
                    _ => break,
                }
            }
        }
        match self.node(x).links[0].forward {
            Some(f) if self.node(f.0 as usize).entry == *entry => Some(rank + 1),
            _ => None,
        }
    }

    /// Level-0 walk over all live entries in rank order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            current: self.first(),
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        // Rank via spans must agree with the level-0 position for
        // every node, and backward links must mirror forward links.
        let mut prev: Option<NodeId> = None;
        let mut pos = 0u64;
        let mut current = self.first();
        while let Some(id) = current {
            pos += 1;
            assert_eq!(self.rank_of(self.entry(id)), Some(pos));
            assert_eq!(self.get_by_rank(pos), Some(id));
            assert_eq!(self.prev(id), prev);
            if let Some(p) = prev {
                assert!(self.entry(p) < self.entry(id));
            }
            prev = current;
            current = self.next(id);
        }
        assert_eq!(pos, self.len as u64);
        assert_eq!(self.tail, prev);
        if self.level > 1 {
            assert!(self.node(0).links[self.level - 1].forward.is_some());
        }
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a> {
    list: &'a SkipList,
    current: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.list.next(id);
        Some(self.list.entry(id))
    }
}

//! Quadtree node representation.
//!
//! Nodes live in a [`crate::store::NodeStore`] arena and are referred to by
//! [`NodeId`] handles rather than pointers or `Rc`s -- the arena owns every
//! node and a node can only be reached by looking it up through the store
//! that created it.

use std::cell::Cell;

/// A handle into a [`crate::store::NodeStore`] arena.
///
/// `NodeId`s from different stores must never be mixed; nothing here
/// prevents that at the type level, the same way an index into the wrong
/// `Vec` is a logic error rather than a type error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The payload of a node: either a leaf holding four raw cell states, or a
/// branch holding four child handles.
///
/// A leaf has depth 0 and side length 2; a branch of depth `k` has side
/// length `2^(k+1)` and children of depth `k - 1`. This replaces the
/// original null-pointer-means-leaf sentinel with an explicit enum, which
/// plays more naturally with an arena of `NodeId`s than a `nw == null`
/// check would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeData {
    Leaf {
        nw: u8,
        ne: u8,
        sw: u8,
        se: u8,
    },
    Branch {
        nw: NodeId,
        ne: NodeId,
        sw: NodeId,
        se: NodeId,
    },
}

/// A cached advance result together with the generation count it is valid
/// for. Keying the cache on the exact generation count sidesteps having to
/// separately track "is this cache valid for the current step size" --
/// changing the step size simply produces a different key, and a stale
/// entry is left in place until the next garbage-collection sweep quietly
/// reclaims it.
pub type ResultCache = Cell<Option<(u64, NodeId)>>;

/// A single arena slot. `None` marks a freed slot awaiting reuse.
pub struct Node {
    pub data: NodeData,
    /// 0 for a leaf, `child.depth + 1` for a branch. Cached at construction
    /// time rather than recomputed by walking children on every query.
    pub depth: u32,
    /// Population of this subtree, memoized lazily and separately from
    /// `result` since it depends on the rule's notion of "alive" rather
    /// than on any generation count.
    pub(crate) population: Cell<Option<u64>>,
    pub(crate) result: ResultCache,
    /// Move-to-front hash-chain pointer used by the hash-consing table in
    /// [`crate::store::NodeStore`].
    pub(crate) chain_next: Cell<Option<NodeId>>,
}

impl Node {
    pub(crate) fn new(data: NodeData, depth: u32) -> Self {
        Self {
            data,
            depth,
            population: Cell::new(None),
            result: Cell::new(None),
            chain_next: Cell::new(None),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.data, NodeData::Leaf { .. })
    }
}

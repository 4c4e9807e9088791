//! The quadtree universe: the mutable root handle plus the geometric
//! operations (`expand`, `shrink`, `set_cell`, `get_cell`) that the step
//! driver and host application use to get cells in and out of the tree.
//!
//! Grounded on `src/automaton/space/ndtree/mod.rs`'s `NdTree` (the
//! expand-by-wrapping-opposite-corners trick, and centering the root on the
//! origin) generalized from its N-dimensional form down to the quadtree
//! case, and on `gollybase/ghashbase.cpp`'s `gsetbit`/`getcell` descent
//! arithmetic for addressing a cell by signed coordinate.

use crate::node::NodeId;
use crate::store::NodeStore;

/// The live quadtree root together with its depth. Coordinates are signed
/// and centered on the origin: a depth-`D` root covers
/// `[-(2^D), 2^D) x [-(2^D), 2^D)`.
pub struct Universe {
    root: NodeId,
    depth: u32,
}

impl Universe {
    pub fn new(store: &mut NodeStore) -> Self {
        let root = store.zero_node(1);
        Self { root, depth: 1 }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn set_root(&mut self, store: &NodeStore, root: NodeId) {
        self.depth = store.depth(root);
        self.root = root;
    }

    /// Half the side length: valid coordinates are `[-half, half)`.
    fn half_side(&self) -> i64 {
        1i64 << self.depth
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        let h = self.half_side();
        x >= -h && x < h && y >= -h && y < h
    }

    /// Doubles the universe's side length, keeping existing content
    /// centered, by wrapping each child's opposite corner in a border of
    /// background.
    pub fn expand(&mut self, store: &mut NodeStore) {
        let (nw, ne, sw, se) = store.children(self.root);
        let child_depth = self.depth - 1;
        let zero = store.zero_node(child_depth);
        let new_nw = store.find_branch(zero, zero, zero, nw);
        let new_ne = store.find_branch(zero, zero, ne, zero);
        let new_sw = store.find_branch(zero, sw, zero, zero);
        let new_se = store.find_branch(se, zero, zero, zero);
        self.root = store.find_branch(new_nw, new_ne, new_sw, new_se);
        self.depth += 1;
    }

    /// Expands until the universe is deep enough to contain `(x, y)` and to
    /// leave at least `min_depth` levels below the root (the caller's
    /// light-cone padding requirement for an upcoming step).
    pub fn expand_to(&mut self, store: &mut NodeStore, x: i64, y: i64, min_depth: u32) {
        while !self.contains(x, y) || self.depth < min_depth {
            self.expand(store);
        }
    }

    /// Shrinks by one level if the outermost ring of cells is entirely
    /// background, returning whether it did. Never shrinks below depth 1.
    pub fn shrink(&mut self, store: &mut NodeStore) -> bool {
        if self.depth <= 1 || !self.can_shrink(store) {
            return false;
        }
        self.root = store.centered_inner(self.root);
        self.depth -= 1;
        true
    }

    fn can_shrink(&self, store: &mut NodeStore) -> bool {
        let (nw, ne, sw, se) = store.children(self.root);
        let child_depth = self.depth - 1;
        if child_depth == 0 {
            // Children are leaves; only the inward cell may be nonzero.
            store.leaf_cell(nw, 0, 0) == 0
                && store.leaf_cell(nw, 1, 0) == 0
                && store.leaf_cell(nw, 0, 1) == 0
                && store.leaf_cell(ne, 0, 0) == 0
                && store.leaf_cell(ne, 1, 0) == 0
                && store.leaf_cell(ne, 1, 1) == 0
                && store.leaf_cell(sw, 0, 0) == 0
                && store.leaf_cell(sw, 0, 1) == 0
                && store.leaf_cell(sw, 1, 1) == 0
                && store.leaf_cell(se, 1, 0) == 0
                && store.leaf_cell(se, 0, 1) == 0
                && store.leaf_cell(se, 1, 1) == 0
        } else {
            let zero = store.zero_node(child_depth - 1);
            let (nw_nw, nw_ne, nw_sw, _) = store.children(nw);
            let (ne_nw, _, ne_sw, ne_se) = store.children(ne);
            let (sw_nw, sw_ne, _, sw_se) = store.children(sw);
            let (_, se_ne, se_sw, se_se) = store.children(se);
            nw_nw == zero
                && nw_ne == zero
                && nw_sw == zero
                && ne_nw == zero
                && ne_se == zero
                && sw_sw == zero
                && sw_se == zero
                && se_ne == zero
                && se_sw == zero
                && se_se == zero
        }
    }

    /// Reads a cell. Positions outside the current root are background.
    pub fn get_cell(&self, store: &NodeStore, x: i64, y: i64) -> u8 {
        if !self.contains(x, y) {
            return 0;
        }
        get_cell_rec(store, self.root, self.depth, x, y)
    }

    /// Writes a cell, expanding the universe first if needed.
    pub fn set_cell(&mut self, store: &mut NodeStore, x: i64, y: i64, state: u8) {
        self.expand_to(store, x, y, 1);
        self.root = set_cell_rec(store, self.root, self.depth, x, y, state);
    }
}

fn get_cell_rec(store: &NodeStore, node: NodeId, depth: u32, x: i64, y: i64) -> u8 {
    if depth == 0 {
        let col = if x >= 0 { 1 } else { 0 };
        let row = if y >= 0 { 1 } else { 0 };
        return store.leaf_cell(node, col, row);
    }
    let (nw, ne, sw, se) = store.children(node);
    let half = 1i64 << (depth - 1);
    let (child, nx, ny) = match (x >= 0, y >= 0) {
        (false, false) => (nw, x + half, y + half),
        (true, false) => (ne, x - half, y + half),
        (false, true) => (sw, x + half, y - half),
        (true, true) => (se, x - half, y - half),
    };
    get_cell_rec(store, child, depth - 1, nx, ny)
}


fn set_cell_rec(store: &mut NodeStore, node: NodeId, depth: u32, x: i64, y: i64, state: u8) -> NodeId {
    if depth == 0 {
        let (mut nw, mut ne, mut sw, mut se) = match store.data(node) {
            crate::node::NodeData::Leaf { nw, ne, sw, se } => (nw, ne, sw, se),
            _ => unreachable!(),
        };
        match (x >= 0, y >= 0) {
            (false, false) => nw = state,
            (true, false) => ne = state,
            (false, true) => sw = state,
            (true, true) => se = state,
        }
        return store.find_leaf(nw, ne, sw, se);
    }
    let (nw, ne, sw, se) = store.children(node);
    let half = 1i64 << (depth - 1);
    let (mut nw, mut ne, mut sw, mut se) = (nw, ne, sw, se);
    match (x >= 0, y >= 0) {
        (false, false) => nw = set_cell_rec(store, nw, depth - 1, x + half, y + half, state),
        (true, false) => ne = set_cell_rec(store, ne, depth - 1, x - half, y + half, state),
        (false, true) => sw = set_cell_rec(store, sw, depth - 1, x + half, y - half, state),
        (true, true) => se = set_cell_rec(store, se, depth - 1, x - half, y - half, state),
    }
    store.find_branch(nw, ne, sw, se)
}

//! The node arena: hash-consing table, canonical node lookup, and the
//! mark-and-sweep collector.
//!
//! Grounded on Golly's `find_ghnode`/`find_ghleaf` (hash-chain lookup with
//! move-to-front promotion, power-of-two resize at load factor 0.7) and on
//! the arena/handle design from the standalone `hashlife` reference crate
//! (`Vec<Cell>` + `usize` index instead of `Rc`-linked nodes), generalized
//! to an enum-tagged leaf/branch payload.

use crate::node::{Node, NodeData, NodeId};

const LOAD_FACTOR_NUM: usize = 7;
const LOAD_FACTOR_DEN: usize = 10;
const INITIAL_TABLE_BITS: u32 = 10;

fn hash_parts(a: u64, b: u64, c: u64, d: u64) -> u64 {
    // Golly's bit-reproducible chain-order hash: 65537*se + 257*sw + 17*ne + 5*nw.
    a.wrapping_mul(5)
        .wrapping_add(b.wrapping_mul(17))
        .wrapping_add(c.wrapping_mul(257))
        .wrapping_add(d.wrapping_mul(65537))
}

/// Owns every node reachable in a single simulation and canonicalizes
/// structurally-identical subtrees to the same [`NodeId`].
pub struct NodeStore {
    nodes: Vec<Option<Node>>,
    free_list: Vec<u32>,
    table: Vec<Option<NodeId>>,
    table_mask: u64,
    live_count: usize,
    /// `zero[depth]` is the canonical all-states-zero node of that depth,
    /// built lazily as deeper zero nodes are requested.
    zero: Vec<NodeId>,
}

impl NodeStore {
    pub fn new() -> Self {
        let table_len = 1usize << INITIAL_TABLE_BITS;
        let mut store = Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            table: vec![None; table_len],
            table_mask: (table_len - 1) as u64,
            live_count: 0,
            zero: Vec::new(),
        };
        let leaf_zero = store.find_leaf(0, 0, 0, 0);
        store.zero.push(leaf_zero);
        store
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.index()]
            .as_ref()
            .expect("NodeId referred to a freed slot")
    }

    pub fn depth(&self, id: NodeId) -> u32 {
        self.node(id).depth
    }

    pub fn data(&self, id: NodeId) -> NodeData {
        self.node(id).data
    }

    /// Side length of the square this node represents, as `2^(depth + 1)`.
    pub fn side_log2(&self, id: NodeId) -> u32 {
        self.depth(id) + 1
    }

    fn alloc(&mut self, data: NodeData, depth: u32) -> NodeId {
        let node = Node::new(data, depth);
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx as usize] = Some(node);
            NodeId(idx)
        } else {
            let idx = self.nodes.len() as u32;
            self.nodes.push(Some(node));
            NodeId(idx)
        }
    }

    fn lookup_or_insert(&mut self, hash: u64, data: NodeData, depth: u32) -> NodeId {
        let idx = (hash & self.table_mask) as usize;
        let mut prev: Option<NodeId> = None;
        let mut cur = self.table[idx];
        while let Some(id) = cur {
            if self.node(id).data == data {
                if let Some(prev_id) = prev {
                    // Move-to-front: unlink `id` and splice it in as the new head.
                    let next = self.node(id).chain_next.get();
                    self.node(prev_id).chain_next.set(next);
                    self.node(id).chain_next.set(self.table[idx]);
                    self.table[idx] = Some(id);
                }
                return id;
            }
            prev = cur;
            cur = self.node(id).chain_next.get();
        }
        let new_id = self.alloc(data, depth);
        self.node(new_id).chain_next.set(self.table[idx]);
        self.table[idx] = Some(new_id);
        self.live_count += 1;
        if self.live_count * LOAD_FACTOR_DEN > self.table.len() * LOAD_FACTOR_NUM {
            self.grow_table();
        }
        new_id
    }

    fn grow_table(&mut self) {
        let new_len = self.table.len() * 2;
        let mut new_table = vec![None; new_len];
        let new_mask = (new_len - 1) as u64;
        for i in 0..self.nodes.len() {
            let id = NodeId(i as u32);
            if self.nodes[i].is_none() {
                continue;
            }
            let hash = self.node_hash(id);
            let slot = (hash & new_mask) as usize;
            self.node(id).chain_next.set(new_table[slot]);
            new_table[slot] = Some(id);
        }
        self.table = new_table;
        self.table_mask = new_mask;
        log::debug!(
            "grew node-cons table to {} buckets ({} live nodes)",
            self.table.len(),
            self.live_count
        );
    }

    fn node_hash(&self, id: NodeId) -> u64 {
        match self.node(id).data {
            NodeData::Leaf { nw, ne, sw, se } => {
                hash_parts(nw as u64, ne as u64, sw as u64, se as u64)
            }
            NodeData::Branch { nw, ne, sw, se } => {
                hash_parts(nw.0 as u64, ne.0 as u64, sw.0 as u64, se.0 as u64)
            }
        }
    }

    pub fn find_leaf(&mut self, nw: u8, ne: u8, sw: u8, se: u8) -> NodeId {
        let hash = hash_parts(nw as u64, ne as u64, sw as u64, se as u64);
        self.lookup_or_insert(hash, NodeData::Leaf { nw, ne, sw, se }, 0)
    }

    pub fn find_branch(&mut self, nw: NodeId, ne: NodeId, sw: NodeId, se: NodeId) -> NodeId {
        let d = self.depth(nw);
        debug_assert_eq!(d, self.depth(ne));
        debug_assert_eq!(d, self.depth(sw));
        debug_assert_eq!(d, self.depth(se));
        let hash = hash_parts(nw.0 as u64, ne.0 as u64, sw.0 as u64, se.0 as u64);
        self.lookup_or_insert(hash, NodeData::Branch { nw, ne, sw, se }, d + 1)
    }

    /// The canonical all-zero node of the given depth, building successively
    /// deeper zero nodes as needed.
    pub fn zero_node(&mut self, depth: u32) -> NodeId {
        while (self.zero.len() as u32) <= depth {
            let prev = *self.zero.last().unwrap();
            let next = self.find_branch(prev, prev, prev, prev);
            self.zero.push(next);
        }
        self.zero[depth as usize]
    }

    pub fn is_zero(&mut self, id: NodeId) -> bool {
        id == self.zero_node(self.depth(id))
    }

    /// Children of a branch node. Panics if `id` is a leaf.
    pub fn children(&self, id: NodeId) -> (NodeId, NodeId, NodeId, NodeId) {
        match self.data(id) {
            NodeData::Branch { nw, ne, sw, se } => (nw, ne, sw, se),
            NodeData::Leaf { .. } => panic!("children() called on a leaf node"),
        }
    }

    /// Extracts the geometric center of a node one level down without
    /// advancing any generations: for a branch this is the inward corner
    /// cells of its four children; for a depth-1 branch (children are
    /// leaves) this pulls out the single inward cell of each leaf.
    pub fn centered_inner(&mut self, id: NodeId) -> NodeId {
        match self.data(id) {
            NodeData::Leaf { .. } => panic!("centered_inner() called on a leaf"),
            NodeData::Branch { nw, ne, sw, se } => match self.data(nw) {
                NodeData::Leaf { .. } => {
                    let nw_se = self.leaf_cell(nw, 1, 1);
                    let ne_sw = self.leaf_cell(ne, 0, 1);
                    let sw_ne = self.leaf_cell(sw, 1, 0);
                    let se_nw = self.leaf_cell(se, 0, 0);
                    self.find_leaf(nw_se, ne_sw, sw_ne, se_nw)
                }
                NodeData::Branch { .. } => {
                    let (_, _, _, nw_se) = self.children(nw);
                    let (_, _, ne_sw, _) = self.children(ne);
                    let (_, sw_ne, _, _) = self.children(sw);
                    let (se_nw, _, _, _) = self.children(se);
                    self.find_branch(nw_se, ne_sw, sw_ne, se_nw)
                }
            },
        }
    }

    /// Reads a single cell out of a leaf by its (col, row) position in the
    /// leaf's own 2x2 frame (0 = west/north, 1 = east/south).
    pub fn leaf_cell(&self, id: NodeId, col: u32, row: u32) -> u8 {
        match self.data(id) {
            NodeData::Leaf { nw, ne, sw, se } => match (col, row) {
                (0, 0) => nw,
                (1, 0) => ne,
                (0, 1) => sw,
                (1, 1) => se,
                _ => panic!("leaf coordinates out of range"),
            },
            NodeData::Branch { .. } => panic!("leaf_cell() called on a branch"),
        }
    }

    pub fn set_result(&self, id: NodeId, generations: u64, result: NodeId) {
        self.node(id).result.set(Some((generations, result)));
    }

    pub fn get_result(&self, id: NodeId, generations: u64) -> Option<NodeId> {
        match self.node(id).result.get() {
            Some((g, r)) if g == generations => Some(r),
            _ => None,
        }
    }

    /// Clears every cached advance result. Used when the rule changes,
    /// since cached results are meaningless under a different transition
    /// function.
    pub fn scrub_all_results(&self) {
        for slot in &self.nodes {
            if let Some(node) = slot {
                node.result.set(None);
            }
        }
    }

    /// Clears cached advance results that are not valid for `generations`.
    /// Used when the step size changes but the rule does not.
    pub fn scrub_stale_results(&self, generations: u64) {
        for slot in &self.nodes {
            if let Some(node) = slot {
                if let Some((g, _)) = node.result.get() {
                    if g != generations {
                        node.result.set(None);
                    }
                }
            }
        }
    }

    pub fn population_cached(&self, id: NodeId) -> Option<u64> {
        self.node(id).population.get()
    }

    pub fn set_population_cached(&self, id: NodeId, pop: u64) {
        self.node(id).population.set(Some(pop));
    }

    pub fn node_count(&self) -> usize {
        self.live_count
    }

    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Mark-and-sweep collection. `roots` are the node handles that must
    /// survive (typically the universe's current root plus any node held
    /// externally); everything unreachable from them is freed and its
    /// table slot unlinked.
    ///
    /// Mark bits live in a scratch `Vec<bool>` built fresh for each sweep
    /// rather than as a field stolen from the node's own storage, so that a
    /// GC pass never has to worry about corrupting live hash-chain state.
    pub fn collect(&mut self, roots: &[NodeId]) {
        let mut marked = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = roots.to_vec();
        stack.extend(self.zero.iter().copied());
        while let Some(id) = stack.pop() {
            if marked[id.index()] {
                continue;
            }
            marked[id.index()] = true;
            if let NodeData::Branch { nw, ne, sw, se } = self.data(id) {
                stack.push(nw);
                stack.push(ne);
                stack.push(sw);
                stack.push(se);
            }
        }

        let mut freed = 0usize;
        for i in 0..self.nodes.len() {
            if marked[i] {
                continue;
            }
            if self.nodes[i].is_some() {
                self.nodes[i] = None;
                self.free_list.push(i as u32);
                self.live_count -= 1;
                freed += 1;
            }
        }
        if freed > 0 {
            self.rebuild_chains();
            log::debug!("garbage-collected {} unreachable nodes", freed);
        }
    }

    fn rebuild_chains(&mut self) {
        for slot in self.table.iter_mut() {
            *slot = None;
        }
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_none() {
                continue;
            }
            let id = NodeId(i as u32);
            let hash = self.node_hash(id);
            let idx = (hash & self.table_mask) as usize;
            self.node(id).chain_next.set(self.table[idx]);
            self.table[idx] = Some(id);
        }
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_leaves_canonicalize_to_one_node() {
        let mut store = NodeStore::new();
        let a = store.find_leaf(1, 0, 1, 0);
        let b = store.find_leaf(1, 0, 1, 0);
        assert_eq!(a, b);
        let c = store.find_leaf(1, 0, 1, 1);
        assert_ne!(a, c);
    }

    #[test]
    fn identical_branches_canonicalize_to_one_node() {
        let mut store = NodeStore::new();
        let leaf = store.find_leaf(1, 0, 0, 0);
        let zero = store.zero_node(0);
        let a = store.find_branch(leaf, zero, zero, zero);
        let b = store.find_branch(leaf, zero, zero, zero);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_node_is_self_similar() {
        let mut store = NodeStore::new();
        let z2 = store.zero_node(2);
        let (nw, ne, sw, se) = store.children(z2);
        let z1 = store.zero_node(1);
        assert_eq!(nw, z1);
        assert_eq!(ne, z1);
        assert_eq!(sw, z1);
        assert_eq!(se, z1);
        assert!(store.is_zero(z2));
    }

    #[test]
    fn result_cache_is_keyed_on_exact_generation_count() {
        let mut store = NodeStore::new();
        let leaf = store.find_leaf(0, 0, 0, 0);
        store.set_result(leaf, 4, leaf);
        assert_eq!(store.get_result(leaf, 4), Some(leaf));
        assert_eq!(store.get_result(leaf, 8), None);
    }

    #[test]
    fn scrub_stale_results_only_drops_mismatched_generations() {
        let mut store = NodeStore::new();
        let a = store.find_leaf(1, 0, 0, 0);
        let b = store.find_leaf(0, 1, 0, 0);
        store.set_result(a, 4, a);
        store.set_result(b, 8, b);
        store.scrub_stale_results(4);
        assert_eq!(store.get_result(a, 4), Some(a));
        assert_eq!(store.get_result(b, 8), None);
    }

    #[test]
    fn collect_frees_unreachable_nodes_and_keeps_roots() {
        let mut store = NodeStore::new();
        let kept = store.find_leaf(1, 1, 1, 1);
        let _dropped = store.find_leaf(0, 0, 0, 1);
        let before = store.node_count();
        store.collect(&[kept]);
        assert!(store.node_count() < before);
        // The surviving node is still usable after the sweep rebuilds chains.
        assert_eq!(store.find_leaf(1, 1, 1, 1), kept);
    }
}

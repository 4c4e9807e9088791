//! RuleTree: a decision-diagram form of the same neighborhood-to-output
//! mapping that RuleTable stores flat. Each internal node branches on one of
//! the nine neighborhood positions; walking from the root through all nine
//! positions reaches a leaf holding the output state. This is the format
//! Golly writes out for large non-totalistic rules, since a tree shares
//! structure between neighborhoods that agree on their last few positions.

use crate::error::{EngineError, EngineResult};
use crate::rule::Rule;

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf(u8),
    Branch(Vec<usize>),
}

/// Order in which neighborhood positions are consumed walking down the
/// tree, matching Golly's `ruletreealgo` convention of ending on the
/// center cell.
const POSITION_ORDER: [usize; 9] = [0, 1, 2, 3, 5, 6, 7, 8, 4]; // nw,n,ne,w,e,sw,s,se,c

pub struct RuleTree {
    states: u32,
    rule_name: String,
    nodes: Vec<TreeNode>,
    root: usize,
}

impl RuleTree {
    pub fn new() -> Self {
        Self {
            states: 2,
            rule_name: String::new(),
            nodes: vec![TreeNode::Leaf(0)],
            root: 0,
        }
    }

    /// Loads a tree from Golly's `num_states`/`num_neighbors`/`num_nodes`
    /// header followed by one line per tree node: a leaf is a single
    /// number, a branch is `states` child indices (each either another
    /// node index or, encoded as `states + leaf_value`, a leaf literal).
    pub fn load_from_str(&mut self, rule_name: &str, text: &str) -> EngineResult<()> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or_else(|| EngineError::MacrocellParse {
            line: 1,
            message: "empty rule tree".to_string(),
        })?;
        let header_nums: Vec<u32> = header
            .split_whitespace()
            .map(|t| t.parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| EngineError::MacrocellParse {
                line: 1,
                message: "expected `num_states num_neighbors num_nodes`".to_string(),
            })?;
        if header_nums.len() != 3 {
            return Err(EngineError::MacrocellParse {
                line: 1,
                message: "expected exactly 3 header values".to_string(),
            });
        }
        let states = header_nums[0];
        let branching = header_nums[0] as usize;

        let mut nodes = Vec::new();
        for (i, line) in lines.enumerate() {
            let vals: Vec<i64> = line
                .split_whitespace()
                .map(|t| t.parse::<i64>())
                .collect::<Result<_, _>>()
                .map_err(|_| EngineError::MacrocellParse {
                    line: i + 2,
                    message: "expected integer node entries".to_string(),
                })?;
            if vals.len() == 1 {
                nodes.push(TreeNode::Leaf(vals[0] as u8));
            } else if vals.len() == branching {
                nodes.push(TreeNode::Branch(vals.iter().map(|&v| v as usize).collect()));
            } else {
                return Err(EngineError::MacrocellParse {
                    line: i + 2,
                    message: format!(
                        "node has {} entries, expected 1 (leaf) or {} (branch)",
                        vals.len(),
                        branching
                    ),
                });
            }
        }
        if nodes.is_empty() {
            return Err(EngineError::MacrocellParse {
                line: 2,
                message: "rule tree has no nodes".to_string(),
            });
        }
        self.root = nodes.len() - 1;
        self.nodes = nodes;
        self.states = states;
        self.rule_name = rule_name.to_string();
        Ok(())
    }

    fn eval(&self, neighbors: [u8; 9]) -> u8 {
        let mut idx = self.root;
        for &pos in &POSITION_ORDER {
            match &self.nodes[idx] {
                TreeNode::Leaf(v) => return *v,
                TreeNode::Branch(children) => {
                    idx = children[neighbors[pos] as usize % children.len()];
                }
            }
        }
        match &self.nodes[idx] {
            TreeNode::Leaf(v) => *v,
            TreeNode::Branch(_) => 0,
        }
    }
}

impl Default for RuleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for RuleTree {
    fn num_cell_states(&self) -> u32 {
        self.states
    }

    fn default_rule(&self) -> &str {
        ""
    }

    fn set_rule(&mut self, rule_string: &str) -> EngineResult<()> {
        self.rule_name = rule_string.to_string();
        Ok(())
    }

    fn get_rule(&self) -> String {
        self.rule_name.clone()
    }

    fn transition(
        &self,
        nw: u8,
        n: u8,
        ne: u8,
        w: u8,
        c: u8,
        e: u8,
        sw: u8,
        s: u8,
        se: u8,
    ) -> u8 {
        self.eval([nw, n, ne, w, c, e, sw, s, se])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tree_is_all_zero() {
        let t = RuleTree::new();
        assert_eq!(t.transition(1, 1, 1, 1, 1, 1, 1, 1, 1), 0);
    }

    #[test]
    fn loads_a_small_tree_and_evaluates_it() {
        let mut t = RuleTree::new();
        t.load_from_str("two-leaf", "2 9 3\n0\n1\n0 1\n").unwrap();
        assert_eq!(t.num_cell_states(), 2);
        // Root branches on nw alone; a live nw neighbor selects leaf 1.
        assert_eq!(t.transition(1, 0, 0, 0, 0, 0, 0, 0, 0), 1);
        assert_eq!(t.transition(0, 0, 0, 0, 0, 0, 0, 0, 0), 0);
    }

    #[test]
    fn rejects_bad_header() {
        let mut t = RuleTree::new();
        assert!(t.load_from_str("bad", "not a header\n").is_err());
    }
}

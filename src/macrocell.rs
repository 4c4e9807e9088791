//! Macrocell-style serialization: a compact textual encoding of a quadtree
//! as a topologically-ordered list of nodes, each referencing earlier
//! nodes by index.
//!
//! The two-pass writer (prescan to assign indices, then emit) and the
//! single-pass line-oriented reader follow the shape of Golly's native
//! `.mc` format and of the standalone `ca-formats` crate's `Macrocell`
//! iterator, but use a simplified line grammar suited to this engine's
//! depth model (depth-0 leaves, depth-`k` branches) rather than Golly's own
//! fixed "level 1 = 8x8 two-state block" convention -- see `DESIGN.md`.
//!
//! Format:
//! ```text
//! [M3] (engine-specific)
//! #R <rule string>
//! #G <generation>
//! <node line>
//! ...
//! ```
//! A leaf line is `L <nw> <ne> <sw> <se>` (raw cell states). A branch line
//! is `<depth> <nw> <ne> <sw> <se>` where each reference is a 1-based index
//! into the lines seen so far, or `0` for that depth's canonical
//! background node. The last line is the root.

use std::collections::HashMap;
use std::fmt::Write as _;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{EngineError, EngineResult};
use crate::node::{NodeData, NodeId};
use crate::store::NodeStore;

const HEADER: &str = "[M3] (engine-specific)";

lazy_static! {
    static ref HEADER_RE: Regex = Regex::new(r"^\[M\d+\]").unwrap();
}

pub struct MacrocellFile {
    pub rule: String,
    pub generation: String,
    pub root: NodeId,
}

/// Serializes `root` to macrocell text.
pub fn write(store: &NodeStore, root: NodeId, rule: &str, generation: &str) -> String {
    let mut index: HashMap<NodeId, u64> = HashMap::new();
    let mut order: Vec<NodeId> = Vec::new();
    let mut stack = vec![(root, false)];
    // Iterative post-order traversal: children are emitted before parents.
    while let Some((id, children_done)) = stack.pop() {
        if index.contains_key(&id) {
            continue;
        }
        if children_done {
            index.insert(id, order.len() as u64 + 1);
            order.push(id);
            continue;
        }
        stack.push((id, true));
        if let NodeData::Branch { nw, ne, sw, se } = store.data(id) {
            for child in [nw, ne, sw, se] {
                if !index.contains_key(&child) {
                    stack.push((child, false));
                }
            }
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", HEADER);
    let _ = writeln!(out, "#R {}", rule);
    let _ = writeln!(out, "#G {}", generation);
    for id in order {
        match store.data(id) {
            NodeData::Leaf { nw, ne, sw, se } => {
                let _ = writeln!(out, "L {} {} {} {}", nw, ne, sw, se);
            }
            NodeData::Branch { nw, ne, sw, se } => {
                let _ = writeln!(
                    out,
                    "{} {} {} {} {}",
                    store.depth(id),
                    index[&nw],
                    index[&ne],
                    index[&sw],
                    index[&se]
                );
            }
        }
    }
    out
}

/// Parses macrocell text, building nodes into `store`.
pub fn read(store: &mut NodeStore, text: &str) -> EngineResult<MacrocellFile> {
    let mut lines = text.lines().enumerate();
    let (_, header) = lines.next().ok_or_else(|| EngineError::MacrocellParse {
        line: 1,
        message: "empty file".to_string(),
    })?;
    if !HEADER_RE.is_match(header.trim_start()) {
        return Err(EngineError::MacrocellParse {
            line: 1,
            message: "missing [M...] header".to_string(),
        });
    }

    let mut rule = String::new();
    let mut generation = "0".to_string();
    let mut nodes: Vec<NodeId> = Vec::new();
    let mut saw_node_line = false;

    for (i, raw_line) in lines {
        let line = raw_line.trim();
        let lineno = i + 1;
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("#R") {
            if saw_node_line {
                return Err(EngineError::MacrocellParse {
                    line: lineno,
                    message: "#R must precede node data".to_string(),
                });
            }
            rule = rest.trim().to_string();
            continue;
        }
        if let Some(rest) = line.strip_prefix("#G") {
            if saw_node_line {
                return Err(EngineError::MacrocellParse {
                    line: lineno,
                    message: "#G must precede node data".to_string(),
                });
            }
            generation = rest.trim().to_string();
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            let _ = rest;
            continue; // unrecognized comment/frame directive, ignored
        }
        saw_node_line = true;
        if let Some(rest) = line.strip_prefix("L ") {
            let nums: Vec<u8> = rest
                .split_whitespace()
                .map(|t| t.parse::<u8>())
                .collect::<Result<_, _>>()
                .map_err(|_| EngineError::MacrocellParse {
                    line: lineno,
                    message: "expected 4 leaf cell states".to_string(),
                })?;
            if nums.len() != 4 {
                return Err(EngineError::MacrocellParse {
                    line: lineno,
                    message: "leaf line needs exactly 4 values".to_string(),
                });
            }
            let id = store.find_leaf(nums[0], nums[1], nums[2], nums[3]);
            nodes.push(id);
        } else {
            let nums: Vec<i64> = line
                .split_whitespace()
                .map(|t| t.parse::<i64>())
                .collect::<Result<_, _>>()
                .map_err(|_| EngineError::MacrocellParse {
                    line: lineno,
                    message: "expected `depth nw ne sw se`".to_string(),
                })?;
            if nums.len() != 5 {
                return Err(EngineError::MacrocellParse {
                    line: lineno,
                    message: "branch line needs exactly 5 values".to_string(),
                });
            }
            let depth = nums[0] as u32;
            if depth == 0 {
                return Err(EngineError::MacrocellParse {
                    line: lineno,
                    message: "branch line cannot have depth 0".to_string(),
                });
            }
            fn resolve(
                store: &mut NodeStore,
                nodes: &[NodeId],
                idx: i64,
                depth: u32,
                lineno: usize,
            ) -> EngineResult<NodeId> {
                if idx == 0 {
                    Ok(store.zero_node(depth - 1))
                } else if idx >= 1 && (idx as usize) <= nodes.len() {
                    Ok(nodes[(idx - 1) as usize])
                } else {
                    Err(EngineError::MacrocellParse {
                        line: lineno,
                        message: format!("node reference {} out of range", idx),
                    })
                }
            }
            let nw = resolve(store, &nodes, nums[1], depth, lineno)?;
            let ne = resolve(store, &nodes, nums[2], depth, lineno)?;
            let sw = resolve(store, &nodes, nums[3], depth, lineno)?;
            let se = resolve(store, &nodes, nums[4], depth, lineno)?;
            let id = store.find_branch(nw, ne, sw, se);
            nodes.push(id);
        }
    }

    let root = *nodes.last().ok_or_else(|| EngineError::MacrocellParse {
        line: 0,
        message: "file contains no nodes".to_string(),
    })?;

    Ok(MacrocellFile {
        rule,
        generation,
        root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_header() {
        let mut store = NodeStore::new();
        let err = read(&mut store, "not a header\nL 0 0 0 0\n").unwrap_err();
        assert!(matches!(err, EngineError::MacrocellParse { line: 1, .. }));
    }

    #[test]
    fn round_trips_a_single_leaf() {
        let mut store = NodeStore::new();
        let leaf = store.find_leaf(1, 0, 1, 0);
        let text = write(&store, leaf, "B3/S23/C2", "42");
        let mut store2 = NodeStore::new();
        let file = read(&mut store2, &text).unwrap();
        assert_eq!(file.rule, "B3/S23/C2");
        assert_eq!(file.generation, "42");
        assert_eq!(store2.data(file.root), store.data(leaf));
    }

    #[test]
    fn directives_after_node_data_are_rejected() {
        let mut store = NodeStore::new();
        let text = format!("{}\nL 0 0 0 0\n#R B3/S23\n", HEADER);
        let err = read(&mut store, &text).unwrap_err();
        assert!(matches!(err, EngineError::MacrocellParse { .. }));
    }

    #[test]
    fn zero_reference_resolves_to_that_depths_background_node() {
        let mut store = NodeStore::new();
        let text = format!("{}\n1 0 0 0 0\n", HEADER);
        let file = read(&mut store, &text).unwrap();
        assert_eq!(file.root, store.zero_node(1));
    }
}

//! Boundary queries: `find_edges` (the tight bounding box of all non-
//! background cells) and `fit` (a viewport rectangle that frames that box).
//!
//! Implemented as an explicit work-stack traversal rather than native
//! recursion: a pathological sparse pattern can be as deep as the universe
//! itself, and bounding-box computation has no need to hold more than one
//! stack frame's worth of state at a time, so trampolining it avoids ever
//! growing the native call stack with this traversal.

use crate::node::{NodeData, NodeId};
use crate::poller::{Interruptible, Poller};
use crate::store::NodeStore;

/// Inclusive bounding box in cell coordinates, or `None` for an empty
/// universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

struct Frame {
    node: NodeId,
    depth: u32,
    /// Coordinate of this node's northwest corner.
    x0: i64,
    y0: i64,
}

/// Finds the tight bounding box of every cell not equal to background
/// (state 0), or `None` if the universe is empty.
pub fn find_edges<P: Poller>(
    store: &mut NodeStore,
    root: NodeId,
    root_depth: u32,
    interrupt: &mut Interruptible<'_, P>,
) -> Option<BoundingBox> {
    let half = 1i64 << root_depth;
    let mut bbox: Option<BoundingBox> = None;
    let mut stack = vec![Frame {
        node: root,
        depth: root_depth,
        x0: -half,
        y0: -half,
    }];

    while let Some(frame) = stack.pop() {
        if interrupt.bail_if_calculating() {
            return bbox;
        }
        if store.is_zero(frame.node) {
            continue;
        }
        if frame.depth == 0 {
            match store.data(frame.node) {
                NodeData::Leaf { nw, ne, sw, se } => {
                    for (state, dx, dy) in [(nw, 0, 0), (ne, 1, 0), (sw, 0, 1), (se, 1, 1)] {
                        if state != 0 {
                            grow(&mut bbox, frame.x0 + dx, frame.y0 + dy);
                        }
                    }
                }
                NodeData::Branch { .. } => unreachable!(),
            }
            continue;
        }
        let side = 1i64 << frame.depth; // side length of each child
        let (nw, ne, sw, se) = store.children(frame.node);
        for (child, dx, dy) in [(nw, 0, 0), (ne, side, 0), (sw, 0, side), (se, side, side)] {
            stack.push(Frame {
                node: child,
                depth: frame.depth - 1,
                x0: frame.x0 + dx,
                y0: frame.y0 + dy,
            });
        }
    }
    bbox
}

fn grow(bbox: &mut Option<BoundingBox>, x: i64, y: i64) {
    *bbox = Some(match bbox {
        None => BoundingBox {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        },
        Some(b) => BoundingBox {
            min_x: b.min_x.min(x),
            min_y: b.min_y.min(y),
            max_x: b.max_x.max(x),
            max_y: b.max_y.max(y),
        },
    });
}

/// A viewport rectangle, in cell coordinates, large enough to frame the
/// given bounding box with a small margin, and never smaller than one
/// cell across.
pub fn fit(bbox: BoundingBox) -> BoundingBox {
    let margin_x = ((bbox.max_x - bbox.min_x + 1).max(1)) / 20 + 1;
    let margin_y = ((bbox.max_y - bbox.min_y + 1).max(1)) / 20 + 1;
    BoundingBox {
        min_x: bbox.min_x - margin_x,
        min_y: bbox.min_y - margin_y,
        max_x: bbox.max_x + margin_x,
        max_y: bbox.max_y + margin_y,
    }
}

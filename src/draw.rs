//! Draw traversal: visits every node that intersects a viewport rectangle
//! and reports its cells (or, for large all-background subtrees, skips
//! them outright) to a host-supplied renderer.
//!
//! Like `boundary`, this walks an explicit work stack instead of recursing
//! natively, since a zoomed-out view can intersect a path almost as deep as
//! the universe itself. Leaf cells are reported one at a time; a renderer
//! that wants run-length-encoded spans can coalesce adjacent same-state
//! cells on its own side of the trait.

use crate::boundary::BoundingBox;
use crate::node::{NodeData, NodeId};
use crate::poller::{Interruptible, Poller};
use crate::store::NodeStore;

/// Receives cells from a [`draw`] traversal.
pub trait Renderer {
    fn cell(&mut self, x: i64, y: i64, state: u8);
}

struct Frame {
    node: NodeId,
    depth: u32,
    x0: i64,
    y0: i64,
}

fn intersects(x0: i64, y0: i64, side: i64, view: BoundingBox) -> bool {
    x0 < view.max_x + 1 && x0 + side > view.min_x && y0 < view.max_y + 1 && y0 + side > view.min_y
}

/// Draws every non-background cell of `root` that falls within `viewport`.
pub fn draw<P: Poller, R: Renderer>(
    store: &mut NodeStore,
    root: NodeId,
    root_depth: u32,
    viewport: BoundingBox,
    renderer: &mut R,
    interrupt: &mut Interruptible<'_, P>,
) {
    let half = 1i64 << root_depth;
    let mut stack = vec![Frame {
        node: root,
        depth: root_depth,
        x0: -half,
        y0: -half,
    }];

    while let Some(frame) = stack.pop() {
        if interrupt.bail_if_calculating() {
            return;
        }
        let side = 1i64 << (frame.depth + 1);
        if !intersects(frame.x0, frame.y0, side, viewport) {
            continue;
        }
        if store.is_zero(frame.node) {
            continue;
        }
        if frame.depth == 0 {
            match store.data(frame.node) {
                NodeData::Leaf { nw, ne, sw, se } => {
                    for (state, dx, dy) in [(nw, 0, 0), (ne, 1, 0), (sw, 0, 1), (se, 1, 1)] {
                        if state != 0 {
                            let (x, y) = (frame.x0 + dx, frame.y0 + dy);
                            if x >= viewport.min_x
                                && x <= viewport.max_x
                                && y >= viewport.min_y
                                && y <= viewport.max_y
                            {
                                renderer.cell(x, y, state);
                            }
                        }
                    }
                }
                NodeData::Branch { .. } => unreachable!(),
            }
            continue;
        }
        let child_side = 1i64 << frame.depth;
        let (nw, ne, sw, se) = store.children(frame.node);
        for (child, dx, dy) in [
            (nw, 0, 0),
            (ne, child_side, 0),
            (sw, 0, child_side),
            (se, child_side, child_side),
        ] {
            stack.push(Frame {
                node: child,
                depth: frame.depth - 1,
                x0: frame.x0 + dx,
                y0: frame.y0 + dy,
            });
        }
    }
}

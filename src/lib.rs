//! A generalized multi-state hashlife engine.
//!
//! This crate memoizes a quadtree cellular-automaton simulation the way
//! Golly's `ghashbase` does: identical subtrees are hash-consed to the same
//! node, and advancing a node by some number of generations is cached on
//! that node so that repeated or self-similar regions of the universe are
//! computed once. The quadtree and stepping machinery know nothing about
//! what a cell state means; every rule family (`Generations`, the von
//! Neumann self-reproducing automata, `RuleTable`, `RuleTree`) plugs in
//! through the [`rule::Rule`] trait.
//!
//! [`engine::Engine`] is the entry point most callers want: it owns the
//! node arena, the live universe, and the active rule, and exposes
//! stepping, cell access, population counting, boundary queries, drawing,
//! and macrocell I/O as a single cohesive API.

pub mod boundary;
pub mod draw;
pub mod engine;
pub mod error;
pub mod macrocell;
pub mod node;
pub mod poller;
pub mod rule;
pub mod step;
pub mod store;
pub mod universe;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use node::NodeId;
pub use poller::{Poller, StepOutcome};

//! The engine facade: owns the node store, the universe, and the active
//! rule, and drives stepping, population counting, and I/O through the
//! lower-level modules.
//!
//! This is the ambient "put it all together" layer that a host application
//! actually talks to, analogous to how `Simulation<D>` sits on top of
//! `NdTree`/`NdTreeCache` in the teacher crate.

use num::BigUint;

use crate::boundary::{self, BoundingBox};
use crate::draw::{self, Renderer};
use crate::error::{EngineError, EngineResult};
use crate::macrocell;
use crate::node::{NodeData, NodeId};
use crate::poller::{Interruptible, NeverInterrupt, Poller, StepOutcome};
use crate::rule::loader::RuleLoader;
use crate::rule::Rule;
use crate::step;
use crate::store::NodeStore;
use crate::universe::Universe;

/// A generalized multi-state hashlife engine: a single universe stepped
/// under a single pluggable rule.
pub struct Engine {
    store: NodeStore,
    universe: Universe,
    rule: RuleLoader,
    /// log2(generations advanced per full step), i.e. the hyperspeed
    /// exponent. Changing this scrubs every cached result that was
    /// computed for a different generation count.
    step_log2: u32,
    generation: BigUint,
}

impl Engine {
    pub fn new() -> Self {
        let mut store = NodeStore::new();
        let universe = Universe::new(&mut store);
        Self {
            store,
            universe,
            rule: RuleLoader::new(),
            step_log2: 0,
            generation: BigUint::from(0u32),
        }
    }

    pub fn rule_string(&self) -> String {
        self.rule.get_rule()
    }

    /// Installs a new rule, invalidating every cached advance result (a
    /// cache entry computed under the old transition function is
    /// meaningless under a new one).
    pub fn set_rule(&mut self, rule_string: &str) -> EngineResult<()> {
        self.rule.set_rule(rule_string)?;
        self.store.scrub_all_results();
        Ok(())
    }

    pub fn load_rule_table(&mut self, rule_name: &str, text: &str) -> EngineResult<()> {
        self.rule.load_table(rule_name, text)?;
        self.store.scrub_all_results();
        Ok(())
    }

    pub fn load_rule_tree(&mut self, rule_name: &str, text: &str) -> EngineResult<()> {
        self.rule.load_tree(rule_name, text)?;
        self.store.scrub_all_results();
        Ok(())
    }

    /// Sets the log2 generations-per-step. Cached results for a different
    /// step size are scrubbed lazily rather than eagerly walking the whole
    /// arena here; `scrub_stale_results` runs just before the next step
    /// that actually needs the new size.
    pub fn set_step_log2(&mut self, step_log2: u32) {
        self.step_log2 = step_log2;
    }

    pub fn step_log2(&self) -> u32 {
        self.step_log2
    }

    pub fn generation(&self) -> &BigUint {
        &self.generation
    }

    pub fn set_generation(&mut self, generation: BigUint) {
        self.generation = generation;
    }

    pub fn max_cell_state(&self) -> u32 {
        self.rule.num_cell_states() - 1
    }

    pub fn get_cell(&self, x: i64, y: i64) -> u8 {
        self.universe.get_cell(&self.store, x, y)
    }

    pub fn set_cell(&mut self, x: i64, y: i64, state: u8) -> EngineResult<()> {
        let max = self.max_cell_state();
        if state as u32 > max {
            return Err(EngineError::InvalidCell {
                state: state as u32,
                max,
            });
        }
        self.universe.set_cell(&mut self.store, x, y, state);
        Ok(())
    }

    /// Advances the universe by `2^step_log2` generations, using `poller`
    /// for cooperative cancellation. An interrupted step leaves the
    /// universe exactly as it was: nothing computed along the way is ever
    /// entered into the result cache until the whole step completes.
    pub fn step<P: Poller>(&mut self, poller: &mut P) -> StepOutcome {
        let generations: u64 = 1u64 << self.step_log2;
        self.store.scrub_stale_results(generations);

        // Pad until the root has at least step_log2 + 2 levels of depth
        // below it, so the recursion's light-cone assumptions hold and the
        // result we read back is unaffected by the universe's own edge.
        let target_depth = self.step_log2 + 2;
        self.universe.expand_to(&mut self.store, 0, 0, target_depth);
        // One further ring of padding guarantees the advancing root's
        // center is never influenced by the artificial background edge.
        self.universe.expand(&mut self.store);

        let mut interrupt = Interruptible::new(poller);
        let root = self.universe.root();
        let advanced = step::advance(&mut self.store, &self.rule, root, generations, &mut interrupt);
        match advanced {
            Some(new_root) => {
                self.universe.set_root(&self.store, new_root);
                self.generation += generations;
                while self.universe.shrink(&mut self.store) {}
                StepOutcome::Completed { root: new_root }
            }
            None => StepOutcome::Interrupted,
        }
    }

    /// Runs the garbage collector, keeping only what's reachable from the
    /// current root.
    pub fn collect_garbage(&mut self) {
        self.store.collect(&[self.universe.root()]);
    }

    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    /// Total population (count of non-background cells), computed with a
    /// memoized post-order walk and returned as an arbitrary-precision
    /// integer since a large universe can vastly exceed `u64`.
    pub fn population(&mut self) -> BigUint {
        population_rec(&mut self.store, self.universe.root())
    }

    pub fn find_edges<P: Poller>(&mut self, poller: &mut P) -> Option<BoundingBox> {
        let mut interrupt = Interruptible::new(poller);
        boundary::find_edges(
            &mut self.store,
            self.universe.root(),
            self.universe.depth(),
            &mut interrupt,
        )
    }

    pub fn fit(&mut self) -> Option<BoundingBox> {
        self.find_edges(&mut NeverInterrupt).map(boundary::fit)
    }

    pub fn draw<P: Poller, R: Renderer>(
        &mut self,
        viewport: BoundingBox,
        renderer: &mut R,
        poller: &mut P,
    ) {
        let mut interrupt = Interruptible::new(poller);
        draw::draw(
            &mut self.store,
            self.universe.root(),
            self.universe.depth(),
            viewport,
            renderer,
            &mut interrupt,
        );
    }

    pub fn write_macrocell(&self) -> String {
        macrocell::write(
            &self.store,
            self.universe.root(),
            &self.rule.get_rule(),
            &self.generation.to_string(),
        )
    }

    pub fn read_macrocell(&mut self, text: &str) -> EngineResult<()> {
        let file = macrocell::read(&mut self.store, text)?;
        if !file.rule.is_empty() {
            self.set_rule(&file.rule)?;
        }
        self.universe.set_root(&self.store, file.root);
        self.generation = file
            .generation
            .parse()
            .unwrap_or_else(|_| BigUint::from(0u32));
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn population_rec(store: &mut NodeStore, id: NodeId) -> BigUint {
    if let Some(cached) = store.population_cached(id) {
        return BigUint::from(cached);
    }
    let pop = match store.data(id) {
        NodeData::Leaf { nw, ne, sw, se } => {
            [nw, ne, sw, se].iter().filter(|&&s| s != 0).count() as u64
        }
        NodeData::Branch { nw, ne, sw, se } => {
            let total = population_rec(store, nw)
                + population_rec(store, ne)
                + population_rec(store, sw)
                + population_rec(store, se);
            // Memoize only when it fits in a u64; for astronomically large
            // populations the BigUint itself is cheap enough to recompute
            // and not worth a second cache keyed by arbitrary precision.
            if let Some(small) = u64_from_biguint(&total) {
                store.set_population_cached(id, small);
            }
            return total;
        }
    };
    store.set_population_cached(id, pop);
    BigUint::from(pop)
}

fn u64_from_biguint(n: &BigUint) -> Option<u64> {
    use num::ToPrimitive;
    n.to_u64()
}

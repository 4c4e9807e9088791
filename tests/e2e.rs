//! End-to-end scenarios exercising the engine facade as a host application
//! would: load a rule, poke cells, step, and read results back out.

use std::collections::HashMap;

use hashlife_core::engine::Engine;
use hashlife_core::poller::{NeverInterrupt, StepOutcome};

fn set_cells(engine: &mut Engine, cells: &[(i64, i64)]) {
    for &(x, y) in cells {
        engine.set_cell(x, y, 1).unwrap();
    }
}

#[test]
fn generations_rule_canonicalizes() {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C3").unwrap();
    assert_eq!(engine.rule_string(), "23/3/3");
    assert_eq!(engine.max_cell_state(), 2);

    // The numeric survival/birth/states form names the same rule.
    engine.set_rule("23/3/3").unwrap();
    assert_eq!(engine.rule_string(), "23/3/3");

    // The spec's literal seed rule: survival first, then birth, then state
    // count, with no B/S/C prefixes at all.
    engine.set_rule("12/34/3").unwrap();
    assert_eq!(engine.rule_string(), "12/34/3");
    assert_eq!(engine.max_cell_state(), 2);

    set_cells(&mut engine, &[(0, 0)]);
    engine.set_step_log2(0);
    let outcome = engine.step(&mut NeverInterrupt);
    assert!(matches!(outcome, StepOutcome::Completed { .. }));
    assert_eq!(engine.population(), 1u32.into());
}

#[test]
fn generations_rejects_out_of_range_state() {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C3").unwrap();
    assert!(engine.set_cell(0, 0, 5).is_err());
}

/// A glider under plain Life (Generations with 2 states, B3/S23) should
/// translate by (1, 1) every 4 generations.
#[test]
fn hashlife_life_glider_advances() {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C2").unwrap();
    set_cells(&mut engine, &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
    engine.set_step_log2(2); // 4 generations per step

    let outcome = engine.step(&mut NeverInterrupt);
    assert!(matches!(outcome, StepOutcome::Completed { .. }));

    let expected = [(2, 1), (3, 2), (1, 3), (2, 3), (3, 3)];
    for &(x, y) in &expected {
        assert_eq!(engine.get_cell(x, y), 1, "expected alive at ({}, {})", x, y);
    }
    let population = engine.population();
    assert_eq!(population, 5u32.into());
}

#[test]
fn jvn29_default_rule_name_round_trips() {
    let mut engine = Engine::new();
    engine.set_rule("JvN29").unwrap();
    assert_eq!(engine.rule_string(), "JvN29");
    assert_eq!(engine.max_cell_state(), 28);
    // An entirely quiescent universe stays quiescent.
    engine.set_step_log2(3);
    let outcome = engine.step(&mut NeverInterrupt);
    assert!(matches!(outcome, StepOutcome::Completed { .. }));
    assert_eq!(engine.population(), 0u32.into());

    // Switching to Nobili32 keeps the same compressed ground state at 0.
    engine.set_rule("Nobili32").unwrap();
    assert_eq!(engine.max_cell_state(), 31);
    assert_eq!(engine.get_cell(0, 0), 0);
}

#[test]
fn hutton32_accepts_transmission_state() {
    let mut engine = Engine::new();
    engine.set_rule("Hutton32").unwrap();
    assert_eq!(engine.max_cell_state(), 31);
    engine.set_cell(0, 0, 9).unwrap(); // an ordinary-transmission state
    engine.set_step_log2(0);
    let outcome = engine.step(&mut NeverInterrupt);
    assert!(matches!(outcome, StepOutcome::Completed { .. }));
}

#[test]
fn rule_tree_round_trips_through_loader() {
    let mut engine = Engine::new();
    // A 2-state, 9-position tree whose root branches on the nw neighbor and
    // routes straight to a leaf either way.
    let tree_src = "\
2 9 3
0
1
0 1
";
    engine.load_rule_tree("always-off-or-on", tree_src).unwrap();
    assert_eq!(engine.rule_string(), "always-off-or-on");
    assert_eq!(engine.max_cell_state(), 1);

    // The tree branches on the nw neighbor alone: a live nw neighbor routes
    // straight to the leaf-1 branch regardless of the cell's own state.
    engine.set_cell(0, 0, 1).unwrap();
    engine.set_step_log2(0);
    engine.step(&mut NeverInterrupt);
    assert_eq!(engine.get_cell(1, 1), 1);
}

#[test]
fn macrocell_round_trips_a_glider() {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C2").unwrap();
    set_cells(&mut engine, &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);

    let text = engine.write_macrocell();
    assert!(text.starts_with("[M3]"));

    let mut reloaded = Engine::new();
    reloaded.read_macrocell(&text).unwrap();
    assert_eq!(reloaded.rule_string(), "23/3/2");
    for y in -2..4 {
        for x in -2..4 {
            assert_eq!(
                reloaded.get_cell(x, y),
                engine.get_cell(x, y),
                "mismatch at ({}, {})",
                x,
                y
            );
        }
    }
}

#[test]
fn garbage_collection_preserves_live_population() {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C2").unwrap();
    set_cells(&mut engine, &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
    let before = engine.population();
    engine.collect_garbage();
    let after = engine.population();
    assert_eq!(before, after);
}

#[test]
fn find_edges_and_fit_frame_a_single_cell() {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C2").unwrap();
    engine.set_cell(5, -3, 1).unwrap();
    let bbox = engine.find_edges(&mut NeverInterrupt).unwrap();
    assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (5, -3, 5, -3));
    let viewport = engine.fit().unwrap();
    assert!(viewport.min_x <= 5 && viewport.max_x >= 5);
    assert!(viewport.min_y <= -3 && viewport.max_y >= -3);
}

#[derive(Default)]
struct RecordingRenderer {
    cells: HashMap<(i64, i64), u8>,
}

impl hashlife_core::draw::Renderer for RecordingRenderer {
    fn cell(&mut self, x: i64, y: i64, state: u8) {
        self.cells.insert((x, y), state);
    }
}

#[test]
fn draw_reports_only_cells_in_viewport() {
    use hashlife_core::boundary::BoundingBox;

    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C2").unwrap();
    set_cells(&mut engine, &[(1, 0), (100, 100)]);

    let mut renderer = RecordingRenderer::default();
    let viewport = BoundingBox {
        min_x: -8,
        min_y: -8,
        max_x: 8,
        max_y: 8,
    };
    engine.draw(viewport, &mut renderer, &mut NeverInterrupt);

    assert_eq!(renderer.cells.get(&(1, 0)), Some(&1));
    assert!(!renderer.cells.contains_key(&(100, 100)));
}

#[test]
fn rule_table_applies_explicit_transition() {
    let mut engine = Engine::new();
    let table_src = "n_states:2\nneighborhood:Moore\nsymmetries:none\n1000000000\n";
    engine.load_rule_table("explicit-death", table_src).unwrap();
    engine.set_cell(0, 0, 1).unwrap();
    engine.set_step_log2(0);
    engine.step(&mut NeverInterrupt);
    assert_eq!(engine.get_cell(0, 0), 0);
}

#[test]
fn setting_rule_scrubs_cached_results() {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C2").unwrap();
    set_cells(&mut engine, &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
    engine.set_step_log2(0);
    engine.step(&mut NeverInterrupt);
    // Switching to a rule with no births or survivals kills everything,
    // and must not read a result cached under the old rule.
    engine.set_rule("B/S/C2").unwrap();
    engine.step(&mut NeverInterrupt);
    assert_eq!(engine.population(), 0u32.into());
}

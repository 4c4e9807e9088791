criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .sample_size(20)
        .measurement_time(std::time::Duration::from_secs(3));
    targets =
        stepping_a_glider_one_generation,
        stepping_a_glider_many_generations_hyperspeed,
        stepping_an_acorn_to_stability,
        population_of_a_large_sparse_pattern,
        repeated_hyperspeed_steps,
}

use hashlife_core::engine::Engine;
use hashlife_core::poller::NeverInterrupt;

fn glider_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C2").unwrap();
    for &(x, y) in &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)] {
        engine.set_cell(x, y, 1).unwrap();
    }
    engine
}

/// An r-pentomino-derived "acorn" methuselah: small, but takes thousands of
/// generations to stabilize, making it a reasonable stand-in for a workload
/// that exercises deep recursion without a huge initial population.
fn acorn_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C2").unwrap();
    for &(x, y) in &[
        (1, 0),
        (3, 1),
        (0, 2),
        (1, 2),
        (4, 2),
        (5, 2),
        (6, 2),
    ] {
        engine.set_cell(x, y, 1).unwrap();
    }
    engine
}

fn stepping_a_glider_one_generation(c: &mut criterion::Criterion) {
    c.bench_function("step a glider by 1 generation", |b| {
        b.iter_batched(
            glider_engine,
            |mut engine| {
                engine.set_step_log2(0);
                engine.step(&mut NeverInterrupt)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn stepping_a_glider_many_generations_hyperspeed(c: &mut criterion::Criterion) {
    c.bench_function("step a glider by 2^10 generations", |b| {
        b.iter_batched(
            glider_engine,
            |mut engine| {
                engine.set_step_log2(10);
                engine.step(&mut NeverInterrupt)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn stepping_an_acorn_to_stability(c: &mut criterion::Criterion) {
    c.bench_function("step an acorn methuselah 256 generations", |b| {
        b.iter_batched(
            acorn_engine,
            |mut engine| {
                engine.set_step_log2(0);
                for _ in 0..256 {
                    engine.step(&mut NeverInterrupt);
                }
                engine.population()
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn population_of_a_large_sparse_pattern(c: &mut criterion::Criterion) {
    let mut engine = Engine::new();
    engine.set_rule("B3/S23/C2").unwrap();
    for i in 0..64 {
        engine.set_cell(i * 100, i * 100, 1).unwrap();
    }
    c.bench_function("population of a sparse 64-cell pattern", |b| {
        b.iter(|| engine.population())
    });
}

fn repeated_hyperspeed_steps(c: &mut criterion::Criterion) {
    c.bench_function("8 successive hyperspeed steps of a glider", |b| {
        b.iter_batched(
            glider_engine,
            |mut engine| {
                engine.set_step_log2(4);
                for _ in 0..8 {
                    engine.step(&mut NeverInterrupt);
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

//! Simulation tick benchmarks
//!
//! Measures one full world advance at small office headcounts.
//!
//! Run with: cargo bench --bench tick

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use cubicle_royale::game::constants::food;
use cubicle_royale::game::simulation::{advance, random_spawn};
use cubicle_royale::game::state::{GameState, GameStatus, Player};
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

/// Create a playing world with the given number of randomly placed players
fn create_state_with_players(count: usize) -> GameState {
    let mut state = GameState::new();
    state.status = GameStatus::Playing;
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..food::TARGET_COUNT {
        state.spawn_food(&mut rng);
    }

    for i in 0..count {
        let (position, angle) = random_spawn(&state, &mut rng);
        state.add_player(Player::spawn(
            Uuid::new_v4(),
            format!("Player{}", i),
            "#3b82f6".to_string(),
            position,
            angle,
        ));
    }

    state
}

fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance");
    group.sample_size(50);

    for count in [2usize, 4, 8, 16] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("players", count), &count, |b, &count| {
            b.iter_batched(
                || (create_state_with_players(count), StdRng::seed_from_u64(7)),
                |(mut state, mut rng)| {
                    black_box(advance(&mut state, &mut rng));
                    state
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_advance);
criterion_main!(benches);

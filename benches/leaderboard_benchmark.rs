use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tap_arena::models::progress::leaderboard_order;
use tap_arena::models::rank::rank_for;
use tap_arena::models::{LeaderboardEntry, UserProgress};

/// Players with clustered scores so the user-ID tie-break is exercised.
fn players(count: u64) -> Vec<UserProgress> {
    let now = Utc::now();
    (0..count)
        .map(|id| {
            let mut progress = UserProgress::new_user(id, now);
            progress.set_points((id * 7919) % 50_000 / 10 * 10);
            progress
        })
        .collect()
}

fn benchmark_leaderboard(c: &mut Criterion) {
    let players = players(10_000);

    let mut group = c.benchmark_group("leaderboard");

    group.bench_function("sort_and_project_top_100", |b| {
        b.iter(|| {
            let mut sorted = black_box(&players).clone();
            sorted.sort_by(leaderboard_order);
            sorted
                .iter()
                .take(100)
                .map(LeaderboardEntry::from)
                .collect::<Vec<_>>()
        })
    });

    group.bench_function("rank_lookup", |b| {
        b.iter(|| {
            players
                .iter()
                .map(|p| rank_for(black_box(p.points)).multiplier)
                .sum::<u32>()
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_leaderboard);
criterion_main!(benches);

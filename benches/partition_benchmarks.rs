use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use team_forge::graph::{PreferenceGraph, build_graph};
use team_forge::partition::{PartitionConfig, partition};
use team_forge::player::PlayerId;
use team_forge::vote::{Vote, VoteKind};

/// Helper to fabricate a ledger for a roster of N players: a mix of mutual
/// pairs, one-directional pairs, exclusions, and solo votes keyed off the
/// voter's id.
fn synthetic_ledger(n_players: usize) -> (Vec<PlayerId>, Vec<Vote>) {
    let roster: Vec<PlayerId> = (1..=n_players as PlayerId).collect();
    let now = Utc::now();
    let mut votes = Vec::new();
    let mut vote_id = 0i64;
    let mut push = |player_id: PlayerId, kind: VoteKind| {
        vote_id += 1;
        votes.push(Vote {
            id: vote_id,
            player_id,
            tournament_id: 1,
            kind,
            cast_at: now,
        });
    };

    for pair in roster.chunks(2) {
        let [a, b] = *pair else { continue };
        match a % 12 {
            3 | 9 => {
                push(a, VoteKind::Pair { target: b });
                push(b, VoteKind::Pair { target: a });
            }
            7 => push(a, VoteKind::Exclude { target: b }),
            11 => push(a, VoteKind::Solo),
            _ => push(a, VoteKind::Pair { target: b }),
        }
    }
    (roster, votes)
}

fn graph_for(n_players: usize) -> PreferenceGraph {
    let (roster, votes) = synthetic_ledger(n_players);
    build_graph(1, &roster, &votes).expect("synthetic ledger builds")
}

/// Benchmark graph construction at increasing roster sizes
fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");
    for n_players in [32, 128, 512, 2048] {
        let (roster, votes) = synthetic_ledger(n_players);
        group.bench_with_input(
            BenchmarkId::from_parameter(n_players),
            &n_players,
            |b, _| {
                b.iter(|| build_graph(1, &roster, &votes).unwrap());
            },
        );
    }
    group.finish();
}

/// Benchmark partitioning at increasing roster sizes
fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    let config = PartitionConfig::new(4, 2);
    for n_players in [32, 128, 512, 2048] {
        let graph = graph_for(n_players);
        group.bench_with_input(
            BenchmarkId::from_parameter(n_players),
            &n_players,
            |b, _| {
                b.iter(|| partition(&graph, &config).unwrap());
            },
        );
    }
    group.finish();
}

/// Benchmark the full vote-to-teams pipeline
fn bench_full_pipeline(c: &mut Criterion) {
    let (roster, votes) = synthetic_ledger(256);
    let config = PartitionConfig::new(4, 2);
    c.bench_function("votes_to_teams_256", |b| {
        b.iter(|| {
            let graph = build_graph(1, &roster, &votes).unwrap();
            partition(&graph, &config).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_build_graph,
    bench_partition,
    bench_full_pipeline
);
criterion_main!(benches);

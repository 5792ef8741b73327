//! Property-based tests for graph construction and partitioning using
//! proptest.
//!
//! These tests verify the partitioner's invariants across randomly
//! generated vote ledgers: full coverage of the roster, capacity bounds,
//! hard-exclusion separation, bonded-unit co-location, and determinism.

use chrono::Utc;
use proptest::prelude::*;
use team_forge::graph::build_graph;
use team_forge::partition::{PartitionConfig, PartitionOutcome, partition};
use team_forge::player::PlayerId;
use team_forge::vote::{Vote, VoteKind};

#[derive(Debug, Clone, Copy)]
enum RawVote {
    None,
    Pair(usize),
    Exclude(usize),
    Solo,
}

// Strategy: per roster slot, an optional vote whose target is another slot.
fn ledger_strategy() -> impl Strategy<Value = (usize, usize, Vec<RawVote>)> {
    (4usize..24, 2usize..=5).prop_flat_map(|(roster, team_size)| {
        let slot = prop_oneof![
            2 => Just(RawVote::None),
            3 => (0..roster).prop_map(RawVote::Pair),
            2 => (0..roster).prop_map(RawVote::Exclude),
            1 => Just(RawVote::Solo),
        ];
        prop::collection::vec(slot, roster..=roster)
            .prop_map(move |votes| (roster, team_size, votes))
    })
}

fn materialize(raw: &[RawVote]) -> (Vec<PlayerId>, Vec<Vote>) {
    let roster: Vec<PlayerId> = (1..=raw.len() as PlayerId).collect();
    let now = Utc::now();
    let votes = raw
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| {
            let player_id = roster[i];
            let kind = match *raw {
                RawVote::None => return None,
                RawVote::Pair(t) if roster[t] != player_id => VoteKind::Pair { target: roster[t] },
                RawVote::Exclude(t) if roster[t] != player_id => {
                    VoteKind::Exclude { target: roster[t] }
                }
                // Self-targets never clear submission; skip them here too.
                RawVote::Pair(_) | RawVote::Exclude(_) => return None,
                RawVote::Solo => VoteKind::Solo,
            };
            Some(Vote {
                id: i as i64 + 1,
                player_id,
                tournament_id: 1,
                kind,
                cast_at: now,
            })
        })
        .collect();
    (roster, votes)
}

fn run(roster: &[PlayerId], votes: &[Vote], team_size: usize) -> PartitionOutcome {
    let graph = build_graph(1, roster, votes).expect("roster-closed votes must build");
    partition(&graph, &PartitionConfig::new(team_size, 2))
        .expect("mutual pairs never exceed a team of two")
}

proptest! {
    #[test]
    fn every_player_placed_exactly_once((roster_len, team_size, raw) in ledger_strategy()) {
        let (roster, votes) = materialize(&raw);
        let outcome = run(&roster, &votes, team_size);

        let mut placed: Vec<PlayerId> = outcome
            .teams
            .iter()
            .flat_map(|t| t.members.iter().copied())
            .collect();
        placed.sort_unstable();
        prop_assert_eq!(placed, roster, "roster of {} must be covered", roster_len);
    }

    #[test]
    fn capacity_is_never_exceeded((_, team_size, raw) in ledger_strategy()) {
        let (roster, votes) = materialize(&raw);
        let outcome = run(&roster, &votes, team_size);

        for team in &outcome.teams {
            prop_assert!(team.members.len() <= team_size);
        }
    }

    #[test]
    fn exclusions_separate_players((_, team_size, raw) in ledger_strategy()) {
        let (roster, votes) = materialize(&raw);
        let graph = build_graph(1, &roster, &votes).unwrap();
        let outcome = run(&roster, &votes, team_size);

        for &(a, b) in &graph.exclusions {
            let together = outcome
                .teams
                .iter()
                .any(|t| t.members.contains(&a) && t.members.contains(&b));
            prop_assert!(!together, "excluded pair ({}, {}) share a team", a, b);
        }
    }

    #[test]
    fn bonded_units_stay_together((_, team_size, raw) in ledger_strategy()) {
        let (roster, votes) = materialize(&raw);
        let graph = build_graph(1, &roster, &votes).unwrap();
        let outcome = run(&roster, &votes, team_size);

        for unit in &graph.bonded_units {
            let host = outcome
                .teams
                .iter()
                .find(|t| t.members.contains(&unit[0]))
                .expect("bonded player placed");
            for member in unit {
                prop_assert!(
                    host.members.contains(member),
                    "bonded unit {:?} split across teams",
                    unit
                );
            }
        }
    }

    #[test]
    fn partitioning_is_deterministic((_, team_size, raw) in ledger_strategy()) {
        let (roster, votes) = materialize(&raw);
        let first = run(&roster, &votes, team_size);
        let second = run(&roster, &votes, team_size);

        prop_assert_eq!(first.teams, second.teams);
        prop_assert_eq!(first.dropped_affinities, second.dropped_affinities);
    }
}

//! Deterministic greedy team partitioning.

use std::collections::BTreeMap;

use thiserror::Error;

use super::models::{PartitionConfig, PartitionOutcome, TeamPlan};
use crate::graph::PreferenceGraph;
use crate::player::PlayerId;

/// Partitioner errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    /// A bonded unit does not fit on any team. Mutual pairings are never
    /// split silently; this is reported before any team is planned.
    #[error("bonded unit of {} players {unit:?} exceeds team size {team_size}", .unit.len())]
    CapacityViolation {
        unit: Vec<PlayerId>,
        team_size: usize,
    },

    #[error("invalid partition config: {0}")]
    InvalidConfig(String),
}

/// Result type for partitioning
pub type PartitionResult<T> = Result<T, PartitionError>;

/// Partition the graph's players into numbered teams.
///
/// Pure and deterministic: no randomness, ties broken by ascending player
/// id throughout, so the same graph always yields byte-identical plans.
pub fn partition(
    graph: &PreferenceGraph,
    config: &PartitionConfig,
) -> PartitionResult<PartitionOutcome> {
    if config.team_size == 0 {
        return Err(PartitionError::InvalidConfig(
            "team size must be at least 1".to_string(),
        ));
    }
    if config.min_team_size > config.team_size {
        return Err(PartitionError::InvalidConfig(format!(
            "minimum team size {} exceeds team size {}",
            config.min_team_size, config.team_size
        )));
    }

    // Bonded units are placed whole or not at all, so oversized units fail
    // the whole run before any team exists.
    for unit in &graph.bonded_units {
        if unit.len() > config.team_size {
            return Err(PartitionError::CapacityViolation {
                unit: unit.clone(),
                team_size: config.team_size,
            });
        }
    }

    // Seed groups: one per bonded unit, one singleton per remaining node.
    let mut groups: Vec<Vec<PlayerId>> = graph.bonded_units.clone();
    let bonded_members: Vec<PlayerId> = graph.bonded_units.iter().flatten().copied().collect();
    for &node in &graph.nodes {
        if !bonded_members.contains(&node) {
            groups.push(vec![node]);
        }
    }
    let mut group_of: BTreeMap<PlayerId, usize> = BTreeMap::new();
    for (idx, group) in groups.iter().enumerate() {
        for &member in group {
            group_of.insert(member, idx);
        }
    }

    // Greedy affinity pass, highest weight first, ties by ascending ids.
    // An edge whose merge would co-locate an excluded pair or overflow a
    // team is dropped; mutual bonds are never broken to satisfy it.
    let mut edges = graph.affinities.clone();
    edges.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then(a.from.cmp(&b.from))
            .then(a.to.cmp(&b.to))
    });

    let mut dropped = Vec::new();
    for edge in edges {
        // Solo voters may be used as filler, but a soft edge never binds
        // them to a specific partner.
        if graph.solo.contains(&edge.from) || graph.solo.contains(&edge.to) {
            log::debug!(
                "ignoring pair preference {} -> {}: target prefers solo play",
                edge.from,
                edge.to
            );
            continue;
        }

        let (gu, gv) = (group_of[&edge.from], group_of[&edge.to]);
        if gu == gv {
            continue;
        }
        if groups[gu].len() + groups[gv].len() > config.team_size {
            log::debug!(
                "dropping pair preference {} -> {}: team size {} would be exceeded",
                edge.from,
                edge.to,
                config.team_size
            );
            dropped.push(edge);
            continue;
        }
        let conflict = groups[gu]
            .iter()
            .any(|&a| groups[gv].iter().any(|&b| graph.excluded(a, b)));
        if conflict {
            log::warn!(
                "dropping pair preference {} -> {}: crossed by an exclusion",
                edge.from,
                edge.to
            );
            dropped.push(edge);
            continue;
        }

        // Merge the higher-rooted group into the lower-rooted one.
        let (keep, fold) = if groups[gu][0] <= groups[gv][0] {
            (gu, gv)
        } else {
            (gv, gu)
        };
        let moved = std::mem::take(&mut groups[fold]);
        for &member in &moved {
            group_of.insert(member, keep);
        }
        groups[keep].extend(moved);
        groups[keep].sort_unstable();
    }

    // Groups of two or more become teams, ordered by smallest member.
    let mut teams: Vec<Vec<PlayerId>> = groups.iter().filter(|g| g.len() > 1).cloned().collect();
    teams.sort_by_key(|t| t[0]);

    // Everyone else fills remaining capacity round-robin: the least-filled
    // team with the smallest number wins, skipping teams an exclusion
    // forbids. A player no team can take opens a new one.
    let mut pool: Vec<PlayerId> = groups
        .iter()
        .filter(|g| g.len() == 1)
        .map(|g| g[0])
        .collect();
    pool.sort_unstable();

    for player in pool {
        let slot = (0..teams.len())
            .filter(|&i| {
                teams[i].len() < config.team_size && graph.compatible(&teams[i], player)
            })
            .min_by_key(|&i| (teams[i].len(), i));
        match slot {
            Some(i) => teams[i].push(player),
            None => teams.push(vec![player]),
        }
    }

    fold_trailing_team(graph, config, &mut teams);

    for team in &mut teams {
        team.sort_unstable();
    }
    let teams = teams
        .into_iter()
        .enumerate()
        .map(|(idx, members)| TeamPlan {
            number: (idx + 1) as u32,
            members,
        })
        .collect();

    Ok(PartitionOutcome {
        teams,
        dropped_affinities: dropped,
    })
}

/// Fold an undersized trailing team into the lowest-numbered teams with
/// spare capacity, exclusions permitting. All-or-nothing: when any member
/// cannot be rehomed the team is kept as-is.
fn fold_trailing_team(
    graph: &PreferenceGraph,
    config: &PartitionConfig,
    teams: &mut Vec<Vec<PlayerId>>,
) {
    if teams.len() < 2 {
        return;
    }
    let last = teams.last().map(Vec::len).unwrap_or_default();
    if last >= config.min_team_size {
        return;
    }

    let trailing = teams[teams.len() - 1].clone();
    let mut rehomed = teams[..teams.len() - 1].to_vec();
    for &member in &trailing {
        let slot = rehomed.iter().position(|team| {
            team.len() < config.team_size && graph.compatible(team, member)
        });
        match slot {
            Some(i) => rehomed[i].push(member),
            None => {
                log::warn!(
                    "keeping undersized trailing team {:?}: no compatible capacity for {}",
                    trailing,
                    member
                );
                return;
            }
        }
    }

    log::info!("folded undersized trailing team {trailing:?} into earlier teams");
    *teams = rehomed;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AffinityEdge, build_graph};
    use crate::vote::{Vote, VoteKind};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn vote(player: PlayerId, kind: VoteKind) -> Vote {
        Vote {
            id: player,
            player_id: player,
            tournament_id: 1,
            kind,
            cast_at: Utc::now(),
        }
    }

    fn graph_from(roster: &[PlayerId], votes: &[Vote]) -> PreferenceGraph {
        build_graph(1, roster, votes).unwrap()
    }

    #[test]
    fn test_mutual_pair_with_exclusion_and_solo() {
        // A,B mutually pair, C excludes B, D plays solo, teams of two.
        let graph = graph_from(
            &[1, 2, 3, 4],
            &[
                vote(1, VoteKind::Pair { target: 2 }),
                vote(2, VoteKind::Pair { target: 1 }),
                vote(3, VoteKind::Exclude { target: 2 }),
                vote(4, VoteKind::Solo),
            ],
        );
        let outcome = partition(&graph, &PartitionConfig::new(2, 2)).unwrap();
        assert_eq!(
            outcome.teams,
            vec![
                TeamPlan {
                    number: 1,
                    members: vec![1, 2]
                },
                TeamPlan {
                    number: 2,
                    members: vec![3, 4]
                },
            ]
        );
    }

    #[test]
    fn test_oversized_bonded_unit_fails_before_planning() {
        let graph = PreferenceGraph {
            tournament_id: 1,
            nodes: vec![1, 2, 3],
            bonded_units: vec![vec![1, 2, 3]],
            affinities: vec![],
            exclusions: BTreeSet::new(),
            solo: BTreeSet::new(),
        };
        assert_eq!(
            partition(&graph, &PartitionConfig::new(2, 2)),
            Err(PartitionError::CapacityViolation {
                unit: vec![1, 2, 3],
                team_size: 2
            })
        );
    }

    #[test]
    fn test_one_directional_chain_has_no_guarantees() {
        // A pairs B, B pairs C; nobody is guaranteed co-placement.
        let graph = graph_from(
            &[1, 2, 3],
            &[
                vote(1, VoteKind::Pair { target: 2 }),
                vote(2, VoteKind::Pair { target: 3 }),
            ],
        );

        // With room for three the chain happens to merge fully.
        let outcome = partition(&graph, &PartitionConfig::new(3, 1)).unwrap();
        assert_eq!(outcome.teams.len(), 1);
        assert_eq!(outcome.teams[0].members, vec![1, 2, 3]);

        // With teams of two the highest-priority edge wins and the rest is
        // round-robin fill.
        let outcome = partition(&graph, &PartitionConfig::new(2, 1)).unwrap();
        assert_eq!(outcome.teams[0].members, vec![1, 2]);
        assert_eq!(outcome.teams[1].members, vec![3]);
        assert_eq!(outcome.dropped_affinities.len(), 1);
    }

    #[test]
    fn test_exclusion_never_colocated_during_fill() {
        let graph = graph_from(&[1, 2, 3], &[vote(3, VoteKind::Exclude { target: 1 })]);
        let outcome = partition(&graph, &PartitionConfig::new(3, 1)).unwrap();
        let team_of_1 = outcome.team_of(1).unwrap().number;
        let team_of_3 = outcome.team_of(3).unwrap().number;
        assert_ne!(team_of_1, team_of_3);
    }

    #[test]
    fn test_affinity_crossing_exclusion_is_dropped() {
        // 1 and 2 bond; 3 pairs with 4, but 4's bonded partner situation is
        // simulated with a direct exclusion between 3 and 2.
        let graph = PreferenceGraph {
            tournament_id: 1,
            nodes: vec![1, 2, 3],
            bonded_units: vec![vec![1, 2]],
            affinities: vec![AffinityEdge {
                from: 3,
                to: 1,
                weight: 1,
            }],
            exclusions: [(2, 3)].into_iter().collect(),
            solo: BTreeSet::new(),
        };
        let outcome = partition(&graph, &PartitionConfig::new(3, 1)).unwrap();
        // The bond survives, the soft edge does not.
        assert_eq!(outcome.teams[0].members, vec![1, 2]);
        assert_eq!(outcome.dropped_affinities.len(), 1);
        assert!(outcome.team_of(3).is_some());
    }

    #[test]
    fn test_solo_voter_not_bound_by_incoming_affinity() {
        let graph = graph_from(
            &[1, 2, 3, 4],
            &[
                vote(1, VoteKind::Pair { target: 4 }),
                vote(4, VoteKind::Solo),
            ],
        );
        let outcome = partition(&graph, &PartitionConfig::new(2, 1)).unwrap();
        // No affinity merge happened; everyone was placed by the filler.
        assert!(outcome.teams.iter().all(|t| t.members.len() <= 2));
        assert_eq!(
            outcome
                .teams
                .iter()
                .map(|t| t.members.len())
                .sum::<usize>(),
            4
        );
    }

    #[test]
    fn test_undersized_trailing_team_is_folded() {
        let graph = PreferenceGraph {
            tournament_id: 1,
            nodes: vec![1, 2, 5, 6],
            bonded_units: vec![vec![1, 2]],
            affinities: vec![AffinityEdge {
                from: 5,
                to: 6,
                weight: 1,
            }],
            exclusions: BTreeSet::new(),
            solo: BTreeSet::new(),
        };
        // Teams of four with a minimum of three: the affinity pair {5,6}
        // would stand alone below minimum, so it folds into team one.
        let outcome = partition(&graph, &PartitionConfig::new(4, 3)).unwrap();
        assert_eq!(outcome.teams.len(), 1);
        assert_eq!(outcome.teams[0].members, vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_undersized_team_kept_when_fold_is_blocked() {
        let graph = graph_from(
            &[1, 2, 3],
            &[
                vote(1, VoteKind::Pair { target: 2 }),
                vote(2, VoteKind::Pair { target: 1 }),
                vote(3, VoteKind::Exclude { target: 1 }),
            ],
        );
        let outcome = partition(&graph, &PartitionConfig::new(3, 2)).unwrap();
        // 3 cannot join team one, so the trailing singleton stays.
        assert_eq!(outcome.teams.len(), 2);
        assert_eq!(outcome.teams[1].members, vec![3]);
    }

    #[test]
    fn test_partition_is_deterministic() {
        let graph = graph_from(
            &[1, 2, 3, 4, 5, 6, 7],
            &[
                vote(1, VoteKind::Pair { target: 2 }),
                vote(2, VoteKind::Pair { target: 1 }),
                vote(3, VoteKind::Pair { target: 1 }),
                vote(4, VoteKind::Exclude { target: 3 }),
                vote(5, VoteKind::Solo),
            ],
        );
        let config = PartitionConfig::new(3, 2);
        let first = partition(&graph, &config).unwrap();
        let second = partition(&graph, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let graph = graph_from(&[1], &[]);
        assert!(matches!(
            partition(&graph, &PartitionConfig::new(0, 0)),
            Err(PartitionError::InvalidConfig(_))
        ));
        assert!(matches!(
            partition(&graph, &PartitionConfig::new(2, 3)),
            Err(PartitionError::InvalidConfig(_))
        ));
    }
}

//! Preference graph construction from ledger votes.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::models::{AffinityEdge, PreferenceGraph, normalize};
use crate::player::PlayerId;
use crate::tournament::TournamentId;
use crate::vote::{Vote, VoteKind};

/// Graph builder errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A player holds both a PAIR and an EXCLUDE naming the same target.
    /// This cannot happen through the ledger's one-vote invariant, so it
    /// signals corrupted data; the build halts for organizer remediation.
    #[error("contradictory vote: player {player} both pairs with and excludes {target}")]
    ContradictoryVote { player: PlayerId, target: PlayerId },
}

/// Result type for graph construction
pub type GraphResult<T> = Result<T, GraphError>;

/// Build the preference graph for one tournament.
///
/// `roster` is the full enrolled player set (voters and auto-enrolled
/// non-voters); `votes` are the live ledger rows for the tournament. A vote
/// cast by or targeting a player who has since left the roster (banned or
/// deactivated after voting) is dropped with a warning, so moderation after
/// the voting window cannot block formation. When the ledger hands over
/// duplicate rows for one player, the latest cast wins, matching the
/// ledger's replacement semantics, unless the duplicates contradict each
/// other, which rejects the whole build.
pub fn build_graph(
    tournament_id: TournamentId,
    roster: &[PlayerId],
    votes: &[Vote],
) -> GraphResult<PreferenceGraph> {
    let nodes: BTreeSet<PlayerId> = roster.iter().copied().collect();

    // Latest vote per player, with contradiction detection across
    // duplicates.
    let mut by_player: BTreeMap<PlayerId, &Vote> = BTreeMap::new();
    for vote in votes {
        if !nodes.contains(&vote.player_id) {
            log::warn!(
                "dropping vote by player {} in tournament {tournament_id}: \
                 voter is no longer on the roster",
                vote.player_id
            );
            continue;
        }
        if let Some(target) = vote.kind.target()
            && !nodes.contains(&target)
        {
            log::warn!(
                "dropping vote by player {} in tournament {tournament_id}: \
                 target {target} is no longer on the roster",
                vote.player_id
            );
            continue;
        }

        if let Some(prior) = by_player.get(&vote.player_id) {
            if contradicts(prior.kind, vote.kind) {
                return Err(GraphError::ContradictoryVote {
                    player: vote.player_id,
                    target: vote.kind.target().unwrap_or_default(),
                });
            }
            if vote.cast_at >= prior.cast_at {
                by_player.insert(vote.player_id, vote);
            }
        } else {
            by_player.insert(vote.player_id, vote);
        }
    }

    let mut pair_targets: BTreeMap<PlayerId, PlayerId> = BTreeMap::new();
    let mut exclusions: BTreeSet<(PlayerId, PlayerId)> = BTreeSet::new();
    let mut solo: BTreeSet<PlayerId> = BTreeSet::new();

    for (&player, vote) in &by_player {
        match vote.kind {
            VoteKind::Pair { target } => {
                pair_targets.insert(player, target);
            }
            VoteKind::Exclude { target } => {
                exclusions.insert(normalize(player, target));
            }
            VoteKind::Solo => {
                solo.insert(player);
            }
        }
    }

    // Mutual pairs become bonded units via union-find; the remainder of the
    // pair votes become soft affinity edges.
    let mut uf = UnionFind::new(&nodes);
    let mut affinities: Vec<AffinityEdge> = Vec::new();
    for (&from, &to) in &pair_targets {
        if pair_targets.get(&to) == Some(&from) {
            uf.union(from, to);
        } else if exclusions.contains(&normalize(from, to)) {
            // The target excluded this voter. Hard constraints always win
            // over soft preferences; the conflicting edge is dropped, not
            // silently resolved.
            log::warn!(
                "dropping pair preference {from} -> {to}: crossed by an exclusion"
            );
        } else {
            affinities.push(AffinityEdge {
                from,
                to,
                weight: 1,
            });
        }
    }
    affinities.sort_by_key(|e| (e.from, e.to));

    let mut unit_map: BTreeMap<PlayerId, Vec<PlayerId>> = BTreeMap::new();
    for &node in &nodes {
        unit_map.entry(uf.find(node)).or_default().push(node);
    }
    let bonded_units: Vec<Vec<PlayerId>> = unit_map
        .into_values()
        .filter(|unit| unit.len() > 1)
        .collect();

    Ok(PreferenceGraph {
        tournament_id,
        nodes: nodes.into_iter().collect(),
        bonded_units,
        affinities,
        exclusions,
        solo,
    })
}

fn contradicts(a: VoteKind, b: VoteKind) -> bool {
    match (a, b) {
        (VoteKind::Pair { target: pt }, VoteKind::Exclude { target: et })
        | (VoteKind::Exclude { target: et }, VoteKind::Pair { target: pt }) => pt == et,
        _ => false,
    }
}

/// Path-compressing union-find over player ids.
struct UnionFind {
    parent: BTreeMap<PlayerId, PlayerId>,
}

impl UnionFind {
    fn new(nodes: &BTreeSet<PlayerId>) -> Self {
        Self {
            parent: nodes.iter().map(|&n| (n, n)).collect(),
        }
    }

    fn find(&mut self, node: PlayerId) -> PlayerId {
        let parent = self.parent[&node];
        if parent == node {
            return node;
        }
        let root = self.find(parent);
        self.parent.insert(node, root);
        root
    }

    fn union(&mut self, a: PlayerId, b: PlayerId) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller id becomes the root for determinism.
            let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent.insert(high, low);
        }
    }
}

//! Preference graph data models.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::tournament::TournamentId;

/// A soft, one-directional pairing preference.
///
/// Affinity edges only raise the chance of co-placement; they never
/// guarantee it, and they lose to every hard constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityEdge {
    pub from: PlayerId,
    pub to: PlayerId,
    pub weight: u32,
}

/// Directed preference graph for one tournament.
///
/// Ordered collections throughout so that downstream partitioning is
/// deterministic for identical ledger contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceGraph {
    pub tournament_id: TournamentId,
    /// Every enrolled player, voters and non-voters alike, ascending.
    pub nodes: Vec<PlayerId>,
    /// Maximal sets of players connected by mutual PAIR votes. Each unit is
    /// sorted ascending; units are ordered by their smallest member.
    pub bonded_units: Vec<Vec<PlayerId>>,
    /// One-directional pairing preferences, ordered by (from, to).
    pub affinities: Vec<AffinityEdge>,
    /// Hard constraints as normalized (low, high) pairs.
    pub exclusions: BTreeSet<(PlayerId, PlayerId)>,
    /// Players who asked to remain unpaired.
    pub solo: BTreeSet<PlayerId>,
}

impl PreferenceGraph {
    /// Whether a hard exclusion separates `a` and `b`.
    pub fn excluded(&self, a: PlayerId, b: PlayerId) -> bool {
        self.exclusions.contains(&normalize(a, b))
    }

    /// Whether `a` and `b` are free of exclusion constraints against each
    /// other's entire collections of `members`.
    pub fn compatible(&self, members: &[PlayerId], candidate: PlayerId) -> bool {
        members.iter().all(|&m| !self.excluded(m, candidate))
    }
}

/// Normalize an unordered player pair to (low, high).
pub(crate) fn normalize(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a <= b { (a, b) } else { (b, a) }
}

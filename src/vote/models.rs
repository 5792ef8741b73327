//! Vote data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::tournament::TournamentId;

/// Vote ID type
pub type VoteId = i64;

/// Player preference, as a tagged union.
///
/// `Pair` and `Exclude` statically require a target; `Solo` has none. This
/// closes the invalid states a free-form kind/target record would allow
/// (a solo vote with a target, a pair vote without one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VoteKind {
    /// Request to be placed on the same team as `target`.
    Pair { target: PlayerId },
    /// Hard constraint: never share a team with `target`.
    Exclude { target: PlayerId },
    /// Preference to remain unpaired. Solo voters may still be grouped with
    /// strangers to fill a team, but are never bound to a specific partner.
    Solo,
}

impl VoteKind {
    /// The named target, for preference kinds that carry one.
    pub fn target(&self) -> Option<PlayerId> {
        match self {
            VoteKind::Pair { target } | VoteKind::Exclude { target } => Some(*target),
            VoteKind::Solo => None,
        }
    }

    pub fn is_solo(&self) -> bool {
        matches!(self, VoteKind::Solo)
    }
}

impl std::fmt::Display for VoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteKind::Pair { .. } => write!(f, "pair"),
            VoteKind::Exclude { .. } => write!(f, "exclude"),
            VoteKind::Solo => write!(f, "solo"),
        }
    }
}

/// Vote model. At most one exists per player at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub player_id: PlayerId,
    pub tournament_id: TournamentId,
    pub kind: VoteKind,
    pub cast_at: DateTime<Utc>,
}

/// New vote payload for the store. Upserts on `player_id` alone, enforcing
/// the one-live-vote invariant.
#[derive(Debug, Clone)]
pub struct NewVote {
    pub player_id: PlayerId,
    pub tournament_id: TournamentId,
    pub kind: VoteKind,
    pub cast_at: DateTime<Utc>,
}

/// The `[opens_at, closes_at]` interval during which a tournament accepts
/// vote submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingWindow {
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl VotingWindow {
    pub fn new(opens_at: DateTime<Utc>, closes_at: DateTime<Utc>) -> Self {
        Self {
            opens_at,
            closes_at,
        }
    }

    /// Whether `at` falls inside the window (bounds inclusive).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.opens_at && at <= self.closes_at
    }
}

//! Vote ledger error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::player::{PlayerId, TeamId};
use crate::tournament::TournamentId;

/// Why a vote target was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetIssue {
    /// A player cannot pair with or exclude themselves
    SelfTarget,
    /// The target is banned
    Banned,
    /// The target is not enrolled in (or not eligible for) the tournament
    NotEligible,
}

impl std::fmt::Display for TargetIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetIssue::SelfTarget => write!(f, "target is the submitting player"),
            TargetIssue::Banned => write!(f, "target is banned"),
            TargetIssue::NotEligible => write!(f, "target is not eligible for this tournament"),
        }
    }
}

/// Vote ledger errors
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("voting window is not open for tournament {tournament_id}")]
    OutsideVotingWindow { tournament_id: TournamentId },

    #[error("invalid vote target {target}: {issue}")]
    InvalidTarget { target: PlayerId, issue: TargetIssue },

    #[error("player {player_id} already belongs to team {team_id} for this tournament")]
    PlayerAlreadyOnTeam {
        player_id: PlayerId,
        team_id: TeamId,
    },

    #[error("player {0} is not enrolled in this tournament")]
    NotEnrolled(PlayerId),

    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Result type for vote ledger operations
pub type VoteResult<T> = Result<T, VoteError>;

//! Tournament data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::vote::VotingWindow;

/// Tournament ID type
pub type TournamentId = i64;

/// Season ID type
pub type SeasonId = i64;

/// Match ID type
pub type MatchId = i64;

/// Tournament lifecycle phase.
///
/// Modeled as an explicit per-tournament field so multiple tournaments
/// progress independently; there is no ambient "current phase" anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentPhase {
    /// Being configured by an organizer
    Draft,
    /// Accepting preference votes
    VotingOpen,
    /// Voting done, teams not yet formed
    VotingClosed,
    /// Partition committed, fees not yet charged
    TeamsFormed,
    /// Fees charged, matches being recorded
    InProgress,
    /// Standings recorded, prizes paid; immutable from here
    Concluded,
    /// Abandoned; any charged fees compensated
    Cancelled,
}

impl TournamentPhase {
    /// Storage label for the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentPhase::Draft => "draft",
            TournamentPhase::VotingOpen => "voting_open",
            TournamentPhase::VotingClosed => "voting_closed",
            TournamentPhase::TeamsFormed => "teams_formed",
            TournamentPhase::InProgress => "in_progress",
            TournamentPhase::Concluded => "concluded",
            TournamentPhase::Cancelled => "cancelled",
        }
    }

    /// Parse a phase from its storage label.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "draft" => Some(TournamentPhase::Draft),
            "voting_open" => Some(TournamentPhase::VotingOpen),
            "voting_closed" => Some(TournamentPhase::VotingClosed),
            "teams_formed" => Some(TournamentPhase::TeamsFormed),
            "in_progress" => Some(TournamentPhase::InProgress),
            "concluded" => Some(TournamentPhase::Concluded),
            "cancelled" => Some(TournamentPhase::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TournamentPhase::Concluded | TournamentPhase::Cancelled)
    }

    /// Whether the phase machine permits `self -> next`.
    pub fn can_transition_to(self, next: TournamentPhase) -> bool {
        use TournamentPhase::*;
        match (self, next) {
            (Draft, VotingOpen)
            | (VotingOpen, VotingClosed)
            | (VotingClosed, TeamsFormed)
            | (TeamsFormed, InProgress)
            | (InProgress, Concluded) => true,
            // Cancellation is reachable from any non-terminal phase.
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for TournamentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tournament configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Tournament name
    pub name: String,
    /// Scheduled start date
    pub start_date: DateTime<Utc>,
    /// Entry fee per participant; must be set before voting opens
    pub entry_fee: Option<i64>,
    /// Maximum team size
    pub team_size: usize,
    /// Minimum viable team size for the partitioner's trailing-team fold
    pub min_team_size: usize,
    /// Optional season membership
    pub season_id: Option<SeasonId>,
    /// Optional banner image reference
    pub banner_url: Option<String>,
    /// Voting window bounds; must be set before voting opens
    pub voting_window: Option<VotingWindow>,
    /// Optional custom prize split, as fractions of the fee pool per
    /// position. Falls back to the standard split when absent.
    pub prize_split: Option<Vec<f64>>,
}

impl TournamentConfig {
    /// A minimal configuration with the given name, fee, and team size.
    pub fn new(name: impl Into<String>, entry_fee: i64, team_size: usize) -> Self {
        Self {
            name: name.into(),
            start_date: Utc::now(),
            entry_fee: Some(entry_fee),
            team_size,
            min_team_size: 2,
            season_id: None,
            banner_url: None,
            voting_window: None,
            prize_split: None,
        }
    }

    pub fn with_window(mut self, window: VotingWindow) -> Self {
        self.voting_window = Some(window);
        self
    }
}

/// Tournament model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub config: TournamentConfig,
    pub phase: TournamentPhase,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub concluded_at: Option<DateTime<Utc>>,
}

/// Season model: a named stretch of tournaments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Match model: a minimal record of a played round. No score or bracket
/// position is modeled; matches order by creation time only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A final standing submitted at conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: PlayerId,
    /// 1 = first place.
    pub position: u32,
}

/// Recorded tournament winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentWinner {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub position: u32,
    /// Prize credited for this standing, if any.
    pub prize: Option<i64>,
}

/// Prize structure over the entry-fee pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeStructure {
    /// Total fee pool
    pub total_pool: i64,
    /// Payouts by position (1st, 2nd, 3rd, ...)
    pub payouts: Vec<i64>,
}

impl PrizeStructure {
    /// Standard split for a given participant count:
    ///
    /// - up to 5 participants: winner takes all
    /// - 6-9: 60/40
    /// - 10+: 50/30/20
    pub fn standard(participants: usize, entry_fee: i64) -> Self {
        let total_pool = (participants as i64) * entry_fee;

        let payouts = match participants {
            0..=5 => vec![total_pool],
            6..=9 => vec![
                (total_pool as f64 * 0.60) as i64,
                (total_pool as f64 * 0.40) as i64,
            ],
            _ => vec![
                (total_pool as f64 * 0.50) as i64,
                (total_pool as f64 * 0.30) as i64,
                (total_pool as f64 * 0.20) as i64,
            ],
        };

        Self {
            total_pool,
            payouts,
        }
    }

    /// Custom split from per-position fractions of the pool.
    pub fn custom(total_pool: i64, fractions: &[f64]) -> Self {
        let payouts = fractions
            .iter()
            .map(|f| (total_pool as f64 * f) as i64)
            .collect();
        Self {
            total_pool,
            payouts,
        }
    }

    /// Payout for a 1-indexed position, if that position is in the money.
    pub fn payout_for_position(&self, position: u32) -> Option<i64> {
        if position == 0 {
            return None;
        }
        self.payouts.get(position as usize - 1).copied()
    }
}

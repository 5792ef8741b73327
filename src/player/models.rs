//! Player and team data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tournament::TournamentId;

/// Player ID type
pub type PlayerId = i64;

/// Owning user account ID type
pub type UserId = i64;

/// Team ID type
pub type TeamId = i64;

/// Skill category, four tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillTier {
    Bronze,
    Silver,
    Gold,
    Master,
}

impl std::fmt::Display for SkillTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkillTier::Bronze => write!(f, "bronze"),
            SkillTier::Silver => write!(f, "silver"),
            SkillTier::Gold => write!(f, "gold"),
            SkillTier::Master => write!(f, "master"),
        }
    }
}

impl SkillTier {
    /// Parse a tier from its storage label.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "bronze" => Some(SkillTier::Bronze),
            "silver" => Some(SkillTier::Silver),
            "gold" => Some(SkillTier::Gold),
            "master" => Some(SkillTier::Master),
            _ => None,
        }
    }
}

/// Player model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Owning user account. Exactly one user per player.
    pub user_id: UserId,
    pub display_name: String,
    pub skill_tier: SkillTier,
    /// Moderation flag. Banned players cannot be vote targets.
    pub banned: bool,
    /// Soft-delete flag. Players are deactivated, never removed.
    pub active: bool,
    /// Current team membership, if any.
    pub team_id: Option<TeamId>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Whether the player can participate in (or be targeted for) a tournament.
    pub fn is_eligible(&self) -> bool {
        self.active && !self.banned
    }
}

/// New player payload for the store
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub user_id: UserId,
    pub display_name: String,
    pub skill_tier: SkillTier,
    pub avatar_url: Option<String>,
}

/// Team model
///
/// Teams carry a sequential number scoped to their tournament. Membership is
/// append-only until the tournament starts; capacity never changes after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub tournament_id: Option<TournamentId>,
    /// Sequential number within the tournament, 1-indexed.
    pub number: u32,
    pub name: String,
    pub capacity: usize,
    pub members: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Remaining open slots on this team.
    pub fn spare_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.members.len())
    }
}

/// Per-player match statistics.
///
/// The win/loss ratio is always computed from the counters; it is never
/// stored as an independent column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl PlayerStats {
    /// Win ratio over decided games (draws excluded). Zero when no game has
    /// been decided yet.
    pub fn ratio(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(decided)
        }
    }
}

/// Outcome recorded against a player's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

//! Roster models: players, teams, and per-player statistics.
//!
//! Players are owned by exactly one user account and are never hard-deleted,
//! only deactivated. Teams are created exclusively by the partitioner during
//! team formation; their capacity is fixed at creation time.

pub mod models;

pub use models::{
    MatchOutcome, NewPlayer, Player, PlayerId, PlayerStats, SkillTier, Team, TeamId, UserId,
};

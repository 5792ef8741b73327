//! Partition data models.

use serde::{Deserialize, Serialize};

use crate::graph::AffinityEdge;
use crate::player::PlayerId;

/// Partitioner configuration, taken from the tournament configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Maximum team size.
    pub team_size: usize,
    /// A trailing team below this size is folded into earlier teams with
    /// spare capacity instead of being kept undersized.
    pub min_team_size: usize,
}

impl PartitionConfig {
    pub fn new(team_size: usize, min_team_size: usize) -> Self {
        Self {
            team_size,
            min_team_size,
        }
    }
}

/// One planned team, before persistence assigns row ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPlan {
    /// Sequential number within the tournament, 1-indexed.
    pub number: u32,
    /// Members, ascending by player id.
    pub members: Vec<PlayerId>,
}

/// Result of a partition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOutcome {
    /// Planned teams, ordered by number.
    pub teams: Vec<TeamPlan>,
    /// Soft affinity edges that had to be dropped because honoring them
    /// would have co-located an excluded pair or overflowed a team.
    pub dropped_affinities: Vec<AffinityEdge>,
}

impl PartitionOutcome {
    /// Locate the team a player was assigned to.
    pub fn team_of(&self, player: PlayerId) -> Option<&TeamPlan> {
        self.teams.iter().find(|t| t.members.contains(&player))
    }
}

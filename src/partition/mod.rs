//! Team partitioner.
//!
//! Consumes a [`PreferenceGraph`](crate::graph::PreferenceGraph) and
//! produces a partition of all enrolled players into numbered teams of at
//! most `team_size` members such that:
//!
//! - every bonded unit lands on exactly one team (a unit larger than the
//!   team size is a [`PartitionError::CapacityViolation`], reported before
//!   any team is planned);
//! - no excluded pair ever shares a team;
//! - satisfied soft affinity is maximized greedily, highest weight first,
//!   with ties broken by ascending player id;
//! - leftover players fill remaining capacity round-robin, smallest team
//!   first, and an undersized trailing team is folded away when possible.
//!
//! The partitioner is pure and fully deterministic: re-running it on the
//! same graph reproduces byte-identical plans.

pub mod models;
pub mod partitioner;

pub use models::{PartitionConfig, PartitionOutcome, TeamPlan};
pub use partitioner::{PartitionError, PartitionResult, partition};

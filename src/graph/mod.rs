//! Preference graph builder.
//!
//! Turns the vote ledger's contents for one tournament into a directed graph
//! of pairing and exclusion edges:
//!
//! - mutual PAIR votes (A→B and B→A) merge into a single bonded unit;
//! - a one-directional PAIR vote becomes a soft affinity edge;
//! - EXCLUDE votes become hard exclusion pairs;
//! - SOLO voters are flagged isolated nodes;
//! - enrolled non-voters become plain nodes, placed later by the filler.
//!
//! Votes cast by or targeting players no longer on the roster (banned or
//! deactivated after the voting window) are dropped with a warning rather
//! than failing the build.
//!
//! A PAIR and an EXCLUDE naming the same (voter, target) pair is a
//! data-integrity violation: the whole build is rejected with
//! [`GraphError::ContradictoryVote`] rather than guessed around.

pub mod builder;
pub mod models;

pub use builder::{GraphError, GraphResult, build_graph};
pub use models::{AffinityEdge, PreferenceGraph};

//! # Team Forge
//!
//! A tournament team-formation engine driven by player preference votes.
//!
//! This library provides a complete tournament lifecycle: players cast
//! pair, exclude, or solo votes during a voting window; a preference graph
//! is built from the ledger; a deterministic partitioner folds the graph
//! into capacity-bounded teams; and an append-only wallet ledger settles
//! entry fees and prize payouts.
//!
//! ## Lifecycle
//!
//! Tournaments move through a fixed phase machine:
//!
//! - **Draft**: Configuration and enrollment
//! - **VotingOpen**: Players submit preferences (one live vote per player)
//! - **VotingClosed**: The ledger is frozen for partitioning
//! - **TeamsFormed**: The partition is committed
//! - **InProgress**: Fees settled, matches recorded
//! - **Concluded**: Standings validated, prizes paid
//! - **Cancelled**: Reachable from any non-terminal phase; fees refunded
//!
//! ## Core Modules
//!
//! - [`vote`]: Vote ledger and submission rules
//! - [`graph`]: Preference graph construction (bonded units, affinities,
//!   exclusions)
//! - [`partition`]: Deterministic greedy team partitioner
//! - [`tournament`]: Phase machine and lifecycle controller
//! - [`wallet`]: Append-only wallet ledger with idempotent settlements
//! - [`db`]: Store traits, PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use team_forge::graph::build_graph;
//! use team_forge::partition::{PartitionConfig, partition};
//!
//! // Partition a voteless roster of four into teams of two.
//! let graph = build_graph(1, &[1, 2, 3, 4], &[]).unwrap();
//! let outcome = partition(&graph, &PartitionConfig::new(2, 2)).unwrap();
//! assert_eq!(outcome.teams.len(), 2);
//! ```

/// Store traits, connection pooling, and store implementations.
pub mod db;
pub use db::{Database, DatabaseConfig, InMemoryStore, PgStore, Store, StoreError};

/// Player, team, and statistics models.
pub mod player;
pub use player::{Player, PlayerId, SkillTier, Team, UserId};

/// Vote ledger and submission rules.
pub mod vote;
pub use vote::{VoteError, VoteKind, VoteLedger, VotingWindow};

/// Preference graph construction.
pub mod graph;
pub use graph::{PreferenceGraph, build_graph};

/// Deterministic team partitioner.
pub mod partition;
pub use partition::{PartitionConfig, PartitionError, partition};

/// Tournament phase machine and lifecycle controller.
pub mod tournament;
pub use tournament::{
    LifecycleController, LifecycleError, TournamentConfig, TournamentId, TournamentPhase,
};

/// Append-only wallet ledger.
pub mod wallet;
pub use wallet::{LedgerEntry, WalletError, WalletLedger};

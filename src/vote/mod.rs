//! Vote ledger: accepting, validating, and retiring preference submissions.
//!
//! During a tournament's voting window each player casts exactly one
//! preference: pair with a named teammate, exclude a named player, or play
//! unpaired. A player has at most one live vote at any time, globally;
//! casting again (for the same or a different tournament) replaces the prior
//! vote rather than duplicating it.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use team_forge::db::InMemoryStore;
//! use team_forge::vote::{VoteKind, VoteLedger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryStore::new());
//!     let ledger = VoteLedger::new(store);
//!
//!     // Player 1 asks to pair with player 2 in tournament 7.
//!     let vote = ledger.submit_vote(1, 7, VoteKind::Pair { target: 2 }).await?;
//!     println!("vote {} recorded at {}", vote.id, vote.cast_at);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ledger;
pub mod models;

pub use errors::{TargetIssue, VoteError, VoteResult};
pub use ledger::VoteLedger;
pub use models::{NewVote, Vote, VoteId, VoteKind, VotingWindow};

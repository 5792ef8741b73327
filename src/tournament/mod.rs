//! Tournament module for the team-formation lifecycle.
//!
//! This module provides tournament management functionality including:
//! - Tournament and season creation
//! - Player enrollment and the phase machine
//! - Team formation from the vote ledger
//! - Entry fee settlement and prize distribution
//! - Match recording and final standings
//!
//! ## Example
//!
//! ```no_run
//! use team_forge::tournament::{LifecycleController, TournamentConfig};
//! use team_forge::db::InMemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = LifecycleController::new(Arc::new(InMemoryStore::new()));
//!
//!     // A four-a-side tournament with a 100 credit entry fee
//!     let config = TournamentConfig::new("Friday Clash", 100, 4);
//!
//!     let tournament = controller.create_tournament(config).await?;
//!     println!("Created tournament: {}", tournament.id);
//!
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod models;
pub mod recorder;

pub use controller::{LifecycleController, LifecycleError, LifecycleResult, StartSummary};
pub use models::{
    Match, MatchId, PrizeStructure, Season, SeasonId, Standing, Tournament, TournamentConfig,
    TournamentId, TournamentPhase, TournamentWinner,
};
pub use recorder::validate_standings;

//! Vote ledger implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::errors::{TargetIssue, VoteError, VoteResult};
use super::models::{NewVote, Vote, VoteKind};
use crate::db::Store;
use crate::player::PlayerId;
use crate::tournament::{TournamentId, TournamentPhase};

/// Per-player async lock registry.
///
/// Submissions must be serialized per player so that two concurrent casts
/// cannot race to different outcomes. The registry hands out one mutex per
/// player id; the outer std mutex only guards the map itself.
#[derive(Default)]
struct PlayerLocks {
    inner: Mutex<HashMap<PlayerId, Arc<tokio::sync::Mutex<()>>>>,
}

impl PlayerLocks {
    fn for_player(&self, player_id: PlayerId) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(player_id).or_default().clone()
    }
}

/// Vote ledger
///
/// Accepts, validates, and retires preference submissions. Mutates nothing
/// beyond the vote rows themselves; teams and wallets are untouched at this
/// stage.
#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<dyn Store>,
    locks: Arc<PlayerLocks>,
}

impl VoteLedger {
    /// Create a new vote ledger over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: Arc::new(PlayerLocks::default()),
        }
    }

    /// Submit a preference for a tournament.
    ///
    /// Replaces any prior vote the player holds (at most one live vote per
    /// player, globally) and records the new one with a fresh timestamp.
    ///
    /// # Errors
    ///
    /// * `VoteError::OutsideVotingWindow` - the tournament is not accepting
    ///   votes right now
    /// * `VoteError::InvalidTarget` - the target is the submitter, banned,
    ///   or not enrolled in the same tournament
    /// * `VoteError::PlayerAlreadyOnTeam` - the submitter already belongs to
    ///   a formed team for this tournament
    pub async fn submit_vote(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        kind: VoteKind,
    ) -> VoteResult<Vote> {
        let lock = self.locks.for_player(player_id);
        let _guard = lock.lock().await;

        let tournament = self
            .store
            .get_tournament(tournament_id)
            .await?
            .ok_or(VoteError::TournamentNotFound(tournament_id))?;

        let now = Utc::now();
        let window_open = tournament.phase == TournamentPhase::VotingOpen
            && tournament
                .config
                .voting_window
                .is_some_and(|w| w.contains(now));
        if !window_open {
            return Err(VoteError::OutsideVotingWindow { tournament_id });
        }

        let participants = self.store.participants(tournament_id).await?;
        if !participants.contains(&player_id) {
            return Err(VoteError::NotEnrolled(player_id));
        }

        let player = self
            .store
            .get_player(player_id)
            .await?
            .ok_or(VoteError::PlayerNotFound(player_id))?;
        if !player.is_eligible() {
            return Err(VoteError::NotEnrolled(player_id));
        }

        if let Some(team) = self.store.team_for_player(tournament_id, player_id).await? {
            return Err(VoteError::PlayerAlreadyOnTeam {
                player_id,
                team_id: team.id,
            });
        }

        if let Some(target) = kind.target() {
            self.validate_target(player_id, target, &participants)
                .await?;
        }

        let vote = self
            .store
            .replace_vote(NewVote {
                player_id,
                tournament_id,
                kind,
                cast_at: now,
            })
            .await?;

        log::debug!(
            "player {} cast {} vote for tournament {}",
            player_id,
            kind,
            tournament_id
        );
        Ok(vote)
    }

    /// Close a tournament's voting window.
    ///
    /// Idempotent: closing an already-closed window is a no-op. After this
    /// the ledger rejects new submissions for the tournament.
    pub async fn close_window(&self, tournament_id: TournamentId) -> VoteResult<()> {
        let tournament = self
            .store
            .get_tournament(tournament_id)
            .await?
            .ok_or(VoteError::TournamentNotFound(tournament_id))?;

        match tournament.phase {
            TournamentPhase::VotingOpen => {
                let won = self
                    .store
                    .transition_phase(
                        tournament_id,
                        TournamentPhase::VotingOpen,
                        TournamentPhase::VotingClosed,
                    )
                    .await?;
                if won {
                    log::info!("closed voting window for tournament {tournament_id}");
                }
                // A concurrent caller closing the same window is still a
                // successful close.
                Ok(())
            }
            // Already past voting: nothing to do.
            TournamentPhase::VotingClosed
            | TournamentPhase::TeamsFormed
            | TournamentPhase::InProgress
            | TournamentPhase::Concluded => Ok(()),
            TournamentPhase::Draft | TournamentPhase::Cancelled => {
                Err(VoteError::OutsideVotingWindow { tournament_id })
            }
        }
    }

    /// All live votes for a tournament, ordered by player id.
    pub async fn votes_for(&self, tournament_id: TournamentId) -> VoteResult<Vec<Vote>> {
        let mut votes = self.store.votes_for_tournament(tournament_id).await?;
        votes.sort_by_key(|v| v.player_id);
        Ok(votes)
    }

    async fn validate_target(
        &self,
        player_id: PlayerId,
        target: PlayerId,
        participants: &[PlayerId],
    ) -> VoteResult<()> {
        if target == player_id {
            return Err(VoteError::InvalidTarget {
                target,
                issue: TargetIssue::SelfTarget,
            });
        }

        let Some(target_player) = self.store.get_player(target).await? else {
            return Err(VoteError::InvalidTarget {
                target,
                issue: TargetIssue::NotEligible,
            });
        };
        if target_player.banned {
            return Err(VoteError::InvalidTarget {
                target,
                issue: TargetIssue::Banned,
            });
        }
        if !target_player.active || !participants.contains(&target) {
            return Err(VoteError::InvalidTarget {
                target,
                issue: TargetIssue::NotEligible,
            });
        }

        Ok(())
    }
}

//! Tournament lifecycle controller.
//!
//! Drives the phase machine and its side effects: voting windows, team
//! formation, fee settlement, match recording, standings, and prize
//! payout. All transitions are safe to invoke concurrently; losers of a
//! phase race read back the committed result instead of recomputing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{
    Match, PrizeStructure, Season, Standing, Tournament, TournamentConfig, TournamentId,
    TournamentPhase, TournamentWinner,
};
use super::recorder::validate_standings;
use crate::db::{Store, StoreError};
use crate::graph::{GraphError, build_graph};
use crate::partition::{PartitionConfig, PartitionError, partition};
use crate::player::{MatchOutcome, PlayerId, Team, TeamId};
use crate::vote::{VoteError, VoteLedger};
use crate::wallet::{WalletError, WalletLedger};

/// How many phase compare-and-set races to retry during cancellation.
const MAX_TRANSITION_RETRIES: usize = 3;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("tournament not in correct phase: expected {expected}, got {actual}")]
    InvalidPhase {
        expected: TournamentPhase,
        actual: TournamentPhase,
    },

    #[error("voting window bounds must be set before voting opens")]
    MissingVotingWindow,

    #[error("entry fee must be set before voting opens")]
    MissingEntryFee,

    #[error("player {0} is banned or inactive")]
    PlayerNotEligible(PlayerId),

    #[error("player {0} is already enrolled")]
    AlreadyEnrolled(PlayerId),

    #[error("tournament {0} is concluded and immutable")]
    AlreadyConcluded(TournamentId),

    #[error("invalid standings: {0}")]
    InvalidStandings(String),

    #[error("conflicting concurrent transition on tournament {0}")]
    ConcurrentTransitionConflict(TournamentId),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Outcome of starting a tournament: who was charged and who had to be
/// dropped for lack of funds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartSummary {
    pub charged: Vec<PlayerId>,
    pub removed: Vec<PlayerId>,
}

/// Tournament lifecycle controller
#[derive(Clone)]
pub struct LifecycleController {
    store: Arc<dyn Store>,
    votes: VoteLedger,
    wallet: WalletLedger,
}

impl LifecycleController {
    /// Create a controller (and its vote and wallet ledgers) over a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            votes: VoteLedger::new(store.clone()),
            wallet: WalletLedger::new(store.clone()),
            store,
        }
    }

    /// The vote ledger sharing this controller's store.
    pub fn vote_ledger(&self) -> &VoteLedger {
        &self.votes
    }

    /// The wallet ledger sharing this controller's store.
    pub fn wallet(&self) -> &WalletLedger {
        &self.wallet
    }

    /// Create a tournament in `Draft`.
    pub async fn create_tournament(
        &self,
        config: TournamentConfig,
    ) -> LifecycleResult<Tournament> {
        let tournament = self.store.create_tournament(config).await?;
        log::info!(
            "created tournament {} '{}'",
            tournament.id,
            tournament.config.name
        );
        Ok(tournament)
    }

    /// Create a season for tournaments to attach to.
    pub async fn create_season(
        &self,
        name: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> LifecycleResult<Season> {
        Ok(self.store.create_season(name, starts_at, ends_at).await?)
    }

    /// Enroll a player while the tournament is still in `Draft` or
    /// `VotingOpen`.
    pub async fn enroll_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> LifecycleResult<()> {
        let tournament = self.get(tournament_id).await?;
        match tournament.phase {
            TournamentPhase::Draft | TournamentPhase::VotingOpen => {}
            actual => {
                return Err(LifecycleError::InvalidPhase {
                    expected: TournamentPhase::VotingOpen,
                    actual,
                });
            }
        }

        let player = self
            .store
            .get_player(player_id)
            .await?
            .ok_or(LifecycleError::PlayerNotFound(player_id))?;
        if !player.is_eligible() {
            return Err(LifecycleError::PlayerNotEligible(player_id));
        }

        if !self.store.add_participant(tournament_id, player_id).await? {
            return Err(LifecycleError::AlreadyEnrolled(player_id));
        }
        Ok(())
    }

    /// Open the voting window: `Draft -> VotingOpen`.
    ///
    /// Requires fee and window bounds to be configured. Nothing is charged
    /// at this point.
    pub async fn open_voting(&self, tournament_id: TournamentId) -> LifecycleResult<()> {
        let tournament = self.get(tournament_id).await?;
        match tournament.phase {
            TournamentPhase::Draft => {}
            // Someone already opened it.
            TournamentPhase::VotingOpen => return Ok(()),
            actual => {
                return Err(LifecycleError::InvalidPhase {
                    expected: TournamentPhase::Draft,
                    actual,
                });
            }
        }
        if tournament.config.voting_window.is_none() {
            return Err(LifecycleError::MissingVotingWindow);
        }
        if tournament.config.entry_fee.is_none() {
            return Err(LifecycleError::MissingEntryFee);
        }

        let won = self
            .store
            .transition_phase(
                tournament_id,
                TournamentPhase::Draft,
                TournamentPhase::VotingOpen,
            )
            .await?;
        if won {
            log::info!("opened voting for tournament {tournament_id}");
            return Ok(());
        }
        // Lost the race; fine as long as the winner opened voting too.
        match self.get(tournament_id).await?.phase {
            TournamentPhase::VotingOpen => Ok(()),
            _ => Err(LifecycleError::ConcurrentTransitionConflict(tournament_id)),
        }
    }

    /// Close the voting window: `VotingOpen -> VotingClosed`. Idempotent.
    pub async fn close_voting(&self, tournament_id: TournamentId) -> LifecycleResult<()> {
        Ok(self.votes.close_window(tournament_id).await?)
    }

    /// Form teams from the vote ledger: `VotingClosed -> TeamsFormed`.
    ///
    /// Runs the graph builder and the partitioner, then persists the whole
    /// partition atomically. On a builder or partitioner error the
    /// tournament stays in `VotingClosed` and the error is surfaced
    /// verbatim for organizer remediation; nothing is auto-resolved.
    ///
    /// Safe to call concurrently and re-runnable: a caller that loses the
    /// phase race (or calls again after formation) gets the committed
    /// team set back rather than a recomputation.
    pub async fn form_teams(&self, tournament_id: TournamentId) -> LifecycleResult<Vec<Team>> {
        let tournament = self.get(tournament_id).await?;
        match tournament.phase {
            TournamentPhase::VotingClosed => {}
            TournamentPhase::TeamsFormed
            | TournamentPhase::InProgress
            | TournamentPhase::Concluded => {
                return Ok(self.store.teams_for_tournament(tournament_id).await?);
            }
            actual => {
                return Err(LifecycleError::InvalidPhase {
                    expected: TournamentPhase::VotingClosed,
                    actual,
                });
            }
        }

        let roster = self.eligible_roster(tournament_id).await?;
        let votes = self.store.votes_for_tournament(tournament_id).await?;
        let graph = build_graph(tournament_id, &roster, &votes)?;
        let config = PartitionConfig::new(
            tournament.config.team_size,
            tournament.config.min_team_size,
        );
        let outcome = partition(&graph, &config)?;

        match self
            .store
            .persist_partition(tournament_id, &outcome.teams, tournament.config.team_size)
            .await
        {
            Ok(teams) => {
                log::info!(
                    "formed {} teams for tournament {} ({} soft preferences dropped)",
                    teams.len(),
                    tournament_id,
                    outcome.dropped_affinities.len()
                );
                Ok(teams)
            }
            Err(StoreError::Conflict) => {
                log::info!(
                    "concurrent team formation on tournament {tournament_id}; returning committed result"
                );
                Ok(self.store.teams_for_tournament(tournament_id).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Start the tournament: `TeamsFormed -> InProgress`.
    ///
    /// Charges each participant's entry fee as an append-only wallet debit,
    /// in ascending player order. A player whose debit fails with
    /// `InsufficientBalance` is removed from their team and only the
    /// vacated team is repaired; unaffected teams are never disturbed. Any
    /// other settlement failure unwinds the debits already made and leaves
    /// the tournament in `TeamsFormed`.
    pub async fn start_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> LifecycleResult<StartSummary> {
        let tournament = self.get(tournament_id).await?;
        if tournament.phase != TournamentPhase::TeamsFormed {
            if tournament.phase == TournamentPhase::InProgress {
                return Ok(StartSummary::default());
            }
            return Err(LifecycleError::InvalidPhase {
                expected: TournamentPhase::TeamsFormed,
                actual: tournament.phase,
            });
        }

        let fee = tournament.config.entry_fee.unwrap_or(0);
        let mut summary = StartSummary::default();

        if fee > 0 {
            let teams = self.store.teams_for_tournament(tournament_id).await?;
            let mut seats: Vec<(PlayerId, TeamId)> = teams
                .iter()
                .flat_map(|t| t.members.iter().map(|&m| (m, t.id)))
                .collect();
            seats.sort_unstable();

            for (player_id, team_id) in seats {
                let player = self
                    .store
                    .get_player(player_id)
                    .await?
                    .ok_or(LifecycleError::PlayerNotFound(player_id))?;
                let key = format!("fee_{tournament_id}_{player_id}");
                match self
                    .wallet
                    .debit_entry_fee(player.user_id, tournament_id, fee, key)
                    .await
                {
                    Ok(_) => summary.charged.push(player_id),
                    Err(WalletError::InsufficientBalance {
                        available,
                        required,
                        ..
                    }) => {
                        log::warn!(
                            "dropping player {player_id} from tournament {tournament_id}: \
                             fee {required} exceeds balance {available}"
                        );
                        self.store.remove_member(team_id, player_id).await?;
                        summary.removed.push(player_id);
                    }
                    Err(e) => {
                        self.unwind_fees(tournament_id, &summary.charged).await;
                        return Err(e.into());
                    }
                }
            }

            if !summary.removed.is_empty() {
                self.repair_vacated_teams(tournament_id, &tournament.config)
                    .await?;
            }
        }

        let won = self
            .store
            .transition_phase(
                tournament_id,
                TournamentPhase::TeamsFormed,
                TournamentPhase::InProgress,
            )
            .await?;
        if !won && self.get(tournament_id).await?.phase != TournamentPhase::InProgress {
            return Err(LifecycleError::ConcurrentTransitionConflict(tournament_id));
        }

        log::info!(
            "started tournament {} ({} charged, {} removed)",
            tournament_id,
            summary.charged.len(),
            summary.removed.len()
        );
        Ok(summary)
    }

    /// Append a match record while the tournament is in progress.
    pub async fn record_match(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> LifecycleResult<Match> {
        let tournament = self.get(tournament_id).await?;
        if tournament.phase != TournamentPhase::InProgress {
            return Err(LifecycleError::InvalidPhase {
                expected: TournamentPhase::InProgress,
                actual: tournament.phase,
            });
        }
        Ok(self.store.append_match(tournament_id, name).await?)
    }

    /// Conclude the tournament: `InProgress -> Concluded`.
    ///
    /// Standings must cover positions `1..=N` exactly; otherwise
    /// `InvalidStandings` and no wallet credit is issued. On success the
    /// winners are persisted with the phase atomically, prizes are credited
    /// (idempotently, so retries never double-pay), statistics are updated,
    /// and the tournament's votes are retired.
    pub async fn conclude_tournament(
        &self,
        tournament_id: TournamentId,
        standings: &[Standing],
    ) -> LifecycleResult<Vec<TournamentWinner>> {
        let tournament = self.get(tournament_id).await?;
        match tournament.phase {
            TournamentPhase::InProgress => {}
            TournamentPhase::Concluded => {
                // Idempotent read-back; settlement keys make the credit
                // pass below safe to repeat.
                let winners = self.store.winners_for_tournament(tournament_id).await?;
                self.settle_prizes(tournament_id, &winners).await?;
                return Ok(winners);
            }
            actual => {
                return Err(LifecycleError::InvalidPhase {
                    expected: TournamentPhase::InProgress,
                    actual,
                });
            }
        }

        validate_standings(standings).map_err(LifecycleError::InvalidStandings)?;
        let participants = self.store.participants(tournament_id).await?;
        for standing in standings {
            if !participants.contains(&standing.player_id) {
                return Err(LifecycleError::InvalidStandings(format!(
                    "player {} is not a participant",
                    standing.player_id
                )));
            }
        }

        let fee = tournament.config.entry_fee.unwrap_or(0);
        let paid = self.wallet.fee_debits_for(tournament_id).await?;
        let pool = (paid.len() as i64) * fee;
        let prizes = match &tournament.config.prize_split {
            Some(fractions) => PrizeStructure::custom(pool, fractions),
            None => PrizeStructure::standard(paid.len(), fee),
        };

        let mut winners: Vec<TournamentWinner> = standings
            .iter()
            .map(|s| TournamentWinner {
                tournament_id,
                player_id: s.player_id,
                position: s.position,
                prize: prizes.payout_for_position(s.position).filter(|&p| p > 0),
            })
            .collect();
        winners.sort_by_key(|w| w.position);

        match self.store.persist_standings(tournament_id, &winners).await {
            Ok(()) => {}
            Err(StoreError::Conflict) => {
                let current = self.get(tournament_id).await?;
                if current.phase == TournamentPhase::Concluded {
                    let winners = self.store.winners_for_tournament(tournament_id).await?;
                    self.settle_prizes(tournament_id, &winners).await?;
                    return Ok(winners);
                }
                return Err(LifecycleError::ConcurrentTransitionConflict(tournament_id));
            }
            Err(e) => return Err(e.into()),
        }

        self.settle_prizes(tournament_id, &winners).await?;
        for winner in &winners {
            let outcome = if winner.position == 1 {
                MatchOutcome::Win
            } else {
                MatchOutcome::Loss
            };
            self.store.record_result(winner.player_id, outcome).await?;
        }
        self.store.clear_votes(tournament_id).await?;

        log::info!(
            "concluded tournament {} with {} standings",
            tournament_id,
            winners.len()
        );
        Ok(winners)
    }

    /// Cancel the tournament from any non-terminal phase.
    ///
    /// Fees already charged are reversed with compensating credit entries;
    /// the ledger itself is never edited. Cancelling an already-cancelled
    /// tournament is a no-op.
    pub async fn cancel_tournament(&self, tournament_id: TournamentId) -> LifecycleResult<()> {
        for _ in 0..MAX_TRANSITION_RETRIES {
            let tournament = self.get(tournament_id).await?;
            match tournament.phase {
                TournamentPhase::Cancelled => return Ok(()),
                TournamentPhase::Concluded => {
                    return Err(LifecycleError::AlreadyConcluded(tournament_id));
                }
                phase => {
                    let won = self
                        .store
                        .transition_phase(tournament_id, phase, TournamentPhase::Cancelled)
                        .await?;
                    if !won {
                        continue;
                    }
                    for entry in self.wallet.fee_debits_for(tournament_id).await? {
                        self.wallet
                            .refund_entry_fee(
                                entry.user_id,
                                tournament_id,
                                entry.amount.abs(),
                                format!("refund_{tournament_id}_{}", entry.id),
                            )
                            .await?;
                    }
                    log::info!("cancelled tournament {tournament_id}");
                    return Ok(());
                }
            }
        }
        Err(LifecycleError::ConcurrentTransitionConflict(tournament_id))
    }

    /// Fetch a tournament or fail.
    pub async fn get(&self, tournament_id: TournamentId) -> LifecycleResult<Tournament> {
        self.store
            .get_tournament(tournament_id)
            .await?
            .ok_or(LifecycleError::TournamentNotFound(tournament_id))
    }

    /// Teams formed for a tournament, ordered by number.
    pub async fn teams(&self, tournament_id: TournamentId) -> LifecycleResult<Vec<Team>> {
        Ok(self.store.teams_for_tournament(tournament_id).await?)
    }

    /// Matches recorded for a tournament, in creation order.
    pub async fn matches(&self, tournament_id: TournamentId) -> LifecycleResult<Vec<Match>> {
        Ok(self.store.matches_for_tournament(tournament_id).await?)
    }

    /// Recorded winners, ordered by position.
    pub async fn winners(
        &self,
        tournament_id: TournamentId,
    ) -> LifecycleResult<Vec<TournamentWinner>> {
        Ok(self.store.winners_for_tournament(tournament_id).await?)
    }

    /// Enrolled players still eligible to be placed on a team.
    async fn eligible_roster(
        &self,
        tournament_id: TournamentId,
    ) -> LifecycleResult<Vec<PlayerId>> {
        let mut roster = Vec::new();
        for player_id in self.store.participants(tournament_id).await? {
            let player = self
                .store
                .get_player(player_id)
                .await?
                .ok_or(LifecycleError::PlayerNotFound(player_id))?;
            if player.is_eligible() {
                roster.push(player_id);
            } else {
                log::warn!(
                    "excluding player {player_id} from tournament {tournament_id}: no longer eligible"
                );
            }
        }
        roster.sort_unstable();
        Ok(roster)
    }

    /// Credit every winner's prize. Idempotency keys coalesce repeats.
    async fn settle_prizes(
        &self,
        tournament_id: TournamentId,
        winners: &[TournamentWinner],
    ) -> LifecycleResult<()> {
        for winner in winners {
            let Some(prize) = winner.prize else { continue };
            let player = self
                .store
                .get_player(winner.player_id)
                .await?
                .ok_or(LifecycleError::PlayerNotFound(winner.player_id))?;
            self.wallet
                .credit_prize(
                    player.user_id,
                    tournament_id,
                    prize,
                    format!("prize_{tournament_id}_{}", winner.player_id),
                )
                .await?;
        }
        Ok(())
    }

    /// Best-effort compensation when fee settlement aborts mid-way: the
    /// transition is reported as not-happened, so debits already written
    /// get matching refund entries.
    async fn unwind_fees(&self, tournament_id: TournamentId, charged: &[PlayerId]) {
        for &player_id in charged {
            let Ok(Some(player)) = self.store.get_player(player_id).await else {
                log::error!("cannot unwind fee for missing player {player_id}");
                continue;
            };
            let Ok(Some(fee_entry)) = self
                .store
                .entry_by_key(&format!("fee_{tournament_id}_{player_id}"))
                .await
            else {
                continue;
            };
            if let Err(e) = self
                .wallet
                .refund_entry_fee(
                    player.user_id,
                    tournament_id,
                    fee_entry.amount.abs(),
                    format!("fee_unwind_{tournament_id}_{player_id}"),
                )
                .await
            {
                log::error!(
                    "failed to unwind fee for player {player_id} on tournament {tournament_id}: {e}"
                );
            }
        }
    }

    /// Repair only the teams a defaulting player vacated: fold members of
    /// now-undersized teams into the lowest-numbered teams with compatible
    /// spare capacity, then drop emptied teams. Everything else stays put.
    async fn repair_vacated_teams(
        &self,
        tournament_id: TournamentId,
        config: &TournamentConfig,
    ) -> LifecycleResult<()> {
        let roster = self.eligible_roster(tournament_id).await?;
        let votes = self.store.votes_for_tournament(tournament_id).await?;
        let graph = build_graph(tournament_id, &roster, &votes)?;

        let teams = self.store.teams_for_tournament(tournament_id).await?;
        let undersized: Vec<TeamId> = teams
            .iter()
            .filter(|t| t.members.len() < config.min_team_size)
            .map(|t| t.id)
            .collect();

        for team_id in undersized {
            loop {
                let teams = self.store.teams_for_tournament(tournament_id).await?;
                let Some(team) = teams.iter().find(|t| t.id == team_id) else {
                    break;
                };
                if team.members.len() >= config.min_team_size {
                    break;
                }
                let Some(&member) = team.members.iter().min() else {
                    self.store.delete_team(team_id).await?;
                    log::info!("removed emptied team {team_id} on tournament {tournament_id}");
                    break;
                };
                let dest = teams
                    .iter()
                    .filter(|t| {
                        t.id != team_id
                            && t.spare_capacity() > 0
                            && graph.compatible(&t.members, member)
                    })
                    .min_by_key(|t| t.number);
                match dest {
                    Some(dest) => {
                        self.store.move_member(team_id, dest.id, member).await?;
                        log::info!(
                            "rehomed player {} from team {} to team {}",
                            member,
                            team_id,
                            dest.id
                        );
                    }
                    None => {
                        log::warn!(
                            "keeping undersized team {team_id}: no compatible capacity for {member}"
                        );
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

//! In-memory store for tests and examples.
//!
//! Implements the full [`Store`](super::repository::Store) surface over a
//! single mutex-guarded state map, with the same optimistic-concurrency
//! semantics as the PostgreSQL store: phase transitions compare-and-set,
//! batch writes land all-or-nothing, and wallet appends conflict when the
//! expected predecessor entry is stale.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::repository::{
    MatchStore, PlayerStore, StoreError, StoreResult, TeamStore, TournamentStore, VoteStore,
    WalletStore, WinnerStore,
};
use crate::partition::TeamPlan;
use crate::player::{MatchOutcome, NewPlayer, Player, PlayerId, PlayerStats, Team, TeamId, UserId};
use crate::tournament::{
    Match, Season, SeasonId, Tournament, TournamentConfig, TournamentId, TournamentPhase,
    TournamentWinner,
};
use crate::vote::{NewVote, Vote};
use crate::wallet::{EntryId, EntryKind, LedgerEntry, NewLedgerEntry};

#[derive(Default)]
struct State {
    players: HashMap<PlayerId, Player>,
    stats: HashMap<PlayerId, PlayerStats>,
    tournaments: HashMap<TournamentId, Tournament>,
    participants: HashMap<TournamentId, BTreeSet<PlayerId>>,
    seasons: HashMap<SeasonId, Season>,
    votes: Vec<Vote>,
    teams: HashMap<TeamId, Team>,
    matches: Vec<Match>,
    winners: HashMap<TournamentId, Vec<TournamentWinner>>,
    entries: Vec<LedgerEntry>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn cas_phase(
        &mut self,
        tournament_id: TournamentId,
        from: TournamentPhase,
        to: TournamentPhase,
    ) -> bool {
        let Some(tournament) = self.tournaments.get_mut(&tournament_id) else {
            return false;
        };
        if tournament.phase != from {
            return false;
        }
        tournament.phase = to;
        match to {
            TournamentPhase::InProgress => tournament.started_at = Some(Utc::now()),
            TournamentPhase::Concluded => tournament.concluded_at = Some(Utc::now()),
            _ => {}
        }
        true
    }
}

/// In-memory [`Store`](super::repository::Store) implementation
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PlayerStore for InMemoryStore {
    async fn create_player(&self, new: NewPlayer) -> StoreResult<Player> {
        let mut state = self.lock();
        let id = state.next_id();
        let player = Player {
            id,
            user_id: new.user_id,
            display_name: new.display_name,
            skill_tier: new.skill_tier,
            banned: false,
            active: true,
            team_id: None,
            avatar_url: new.avatar_url,
            created_at: Utc::now(),
        };
        state.players.insert(id, player.clone());
        Ok(player)
    }

    async fn get_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>> {
        Ok(self.lock().players.get(&player_id).cloned())
    }

    async fn set_banned(&self, player_id: PlayerId, banned: bool) -> StoreResult<()> {
        if let Some(player) = self.lock().players.get_mut(&player_id) {
            player.banned = banned;
        }
        Ok(())
    }

    async fn deactivate_player(&self, player_id: PlayerId) -> StoreResult<()> {
        if let Some(player) = self.lock().players.get_mut(&player_id) {
            player.active = false;
        }
        Ok(())
    }

    async fn get_stats(&self, player_id: PlayerId) -> StoreResult<PlayerStats> {
        Ok(self
            .lock()
            .stats
            .get(&player_id)
            .cloned()
            .unwrap_or(PlayerStats {
                player_id,
                wins: 0,
                losses: 0,
                draws: 0,
            }))
    }

    async fn record_result(&self, player_id: PlayerId, outcome: MatchOutcome) -> StoreResult<()> {
        let mut state = self.lock();
        let stats = state.stats.entry(player_id).or_insert(PlayerStats {
            player_id,
            wins: 0,
            losses: 0,
            draws: 0,
        });
        match outcome {
            MatchOutcome::Win => stats.wins += 1,
            MatchOutcome::Loss => stats.losses += 1,
            MatchOutcome::Draw => stats.draws += 1,
        }
        Ok(())
    }
}

#[async_trait]
impl VoteStore for InMemoryStore {
    async fn replace_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        let mut state = self.lock();
        // One live vote per player, across every tournament.
        state.votes.retain(|v| v.player_id != vote.player_id);
        let recorded = Vote {
            id: state.next_id(),
            player_id: vote.player_id,
            tournament_id: vote.tournament_id,
            kind: vote.kind,
            cast_at: vote.cast_at,
        };
        state.votes.push(recorded.clone());
        Ok(recorded)
    }

    async fn votes_for_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Vote>> {
        let mut votes: Vec<Vote> = self
            .lock()
            .votes
            .iter()
            .filter(|v| v.tournament_id == tournament_id)
            .cloned()
            .collect();
        votes.sort_by_key(|v| v.player_id);
        Ok(votes)
    }

    async fn clear_votes(&self, tournament_id: TournamentId) -> StoreResult<()> {
        self.lock()
            .votes
            .retain(|v| v.tournament_id != tournament_id);
        Ok(())
    }
}

#[async_trait]
impl TournamentStore for InMemoryStore {
    async fn create_tournament(&self, config: TournamentConfig) -> StoreResult<Tournament> {
        let mut state = self.lock();
        let tournament = Tournament {
            id: state.next_id(),
            config,
            phase: TournamentPhase::Draft,
            created_at: Utc::now(),
            started_at: None,
            concluded_at: None,
        };
        state.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        Ok(self.lock().tournaments.get(&tournament_id).cloned())
    }

    async fn transition_phase(
        &self,
        tournament_id: TournamentId,
        from: TournamentPhase,
        to: TournamentPhase,
    ) -> StoreResult<bool> {
        Ok(self.lock().cas_phase(tournament_id, from, to))
    }

    async fn add_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        Ok(self
            .lock()
            .participants
            .entry(tournament_id)
            .or_default()
            .insert(player_id))
    }

    async fn participants(&self, tournament_id: TournamentId) -> StoreResult<Vec<PlayerId>> {
        Ok(self
            .lock()
            .participants
            .get(&tournament_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn create_season(
        &self,
        name: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> StoreResult<Season> {
        let mut state = self.lock();
        let season = Season {
            id: state.next_id(),
            name: name.to_string(),
            starts_at,
            ends_at,
        };
        state.seasons.insert(season.id, season.clone());
        Ok(season)
    }
}

#[async_trait]
impl TeamStore for InMemoryStore {
    async fn persist_partition(
        &self,
        tournament_id: TournamentId,
        plans: &[TeamPlan],
        capacity: usize,
    ) -> StoreResult<Vec<Team>> {
        let mut state = self.lock();
        if !state.cas_phase(
            tournament_id,
            TournamentPhase::VotingClosed,
            TournamentPhase::TeamsFormed,
        ) {
            return Err(StoreError::Conflict);
        }

        let mut teams = Vec::with_capacity(plans.len());
        for plan in plans {
            let id = state.next_id();
            let team = Team {
                id,
                tournament_id: Some(tournament_id),
                number: plan.number,
                name: format!("Team {}", plan.number),
                capacity,
                members: plan.members.clone(),
                created_at: Utc::now(),
            };
            for &member in &plan.members {
                if let Some(player) = state.players.get_mut(&member) {
                    player.team_id = Some(id);
                }
            }
            state.teams.insert(id, team.clone());
            teams.push(team);
        }
        Ok(teams)
    }

    async fn teams_for_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Team>> {
        let mut teams: Vec<Team> = self
            .lock()
            .teams
            .values()
            .filter(|t| t.tournament_id == Some(tournament_id))
            .cloned()
            .collect();
        teams.sort_by_key(|t| t.number);
        Ok(teams)
    }

    async fn team_for_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<Option<Team>> {
        Ok(self
            .lock()
            .teams
            .values()
            .find(|t| t.tournament_id == Some(tournament_id) && t.members.contains(&player_id))
            .cloned())
    }

    async fn remove_member(&self, team_id: TeamId, player_id: PlayerId) -> StoreResult<()> {
        let mut state = self.lock();
        if let Some(team) = state.teams.get_mut(&team_id) {
            team.members.retain(|&m| m != player_id);
        }
        if let Some(player) = state.players.get_mut(&player_id) {
            if player.team_id == Some(team_id) {
                player.team_id = None;
            }
        }
        Ok(())
    }

    async fn move_member(
        &self,
        from_team: TeamId,
        to_team: TeamId,
        player_id: PlayerId,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        if let Some(team) = state.teams.get_mut(&from_team) {
            team.members.retain(|&m| m != player_id);
        }
        if let Some(team) = state.teams.get_mut(&to_team) {
            team.members.push(player_id);
            team.members.sort_unstable();
        }
        if let Some(player) = state.players.get_mut(&player_id) {
            player.team_id = Some(to_team);
        }
        Ok(())
    }

    async fn delete_team(&self, team_id: TeamId) -> StoreResult<()> {
        let mut state = self.lock();
        if let Some(team) = state.teams.remove(&team_id) {
            for member in team.members {
                if let Some(player) = state.players.get_mut(&member) {
                    if player.team_id == Some(team_id) {
                        player.team_id = None;
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn append_match(&self, tournament_id: TournamentId, name: &str) -> StoreResult<Match> {
        let mut state = self.lock();
        let recorded = Match {
            id: state.next_id(),
            tournament_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.matches.push(recorded.clone());
        Ok(recorded)
    }

    async fn matches_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Match>> {
        Ok(self
            .lock()
            .matches
            .iter()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WinnerStore for InMemoryStore {
    async fn persist_standings(
        &self,
        tournament_id: TournamentId,
        winners: &[TournamentWinner],
    ) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.cas_phase(
            tournament_id,
            TournamentPhase::InProgress,
            TournamentPhase::Concluded,
        ) {
            return Err(StoreError::Conflict);
        }
        state.winners.insert(tournament_id, winners.to_vec());
        Ok(())
    }

    async fn winners_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<TournamentWinner>> {
        let mut winners = self
            .lock()
            .winners
            .get(&tournament_id)
            .cloned()
            .unwrap_or_default();
        winners.sort_by_key(|w| w.position);
        Ok(winners)
    }
}

#[async_trait]
impl WalletStore for InMemoryStore {
    async fn append_entry(
        &self,
        entry: NewLedgerEntry,
        prev: Option<EntryId>,
        balance_after: i64,
    ) -> StoreResult<LedgerEntry> {
        let mut state = self.lock();
        if let Some(existing) = state
            .entries
            .iter()
            .find(|e| e.idempotency_key == entry.idempotency_key)
        {
            return Ok(existing.clone());
        }
        let last = state
            .entries
            .iter()
            .filter(|e| e.user_id == entry.user_id)
            .map(|e| e.id)
            .max();
        if last != prev {
            return Err(StoreError::Conflict);
        }
        let recorded = LedgerEntry {
            id: state.next_id(),
            user_id: entry.user_id,
            tournament_id: entry.tournament_id,
            amount: entry.amount,
            balance_after,
            direction: entry.direction,
            kind: entry.kind,
            idempotency_key: entry.idempotency_key,
            description: entry.description,
            created_at: Utc::now(),
        };
        state.entries.push(recorded.clone());
        Ok(recorded)
    }

    async fn last_entry(&self, user_id: UserId) -> StoreResult<Option<LedgerEntry>> {
        Ok(self
            .lock()
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .max_by_key(|e| e.id)
            .cloned())
    }

    async fn entry_by_key(&self, idempotency_key: &str) -> StoreResult<Option<LedgerEntry>> {
        Ok(self
            .lock()
            .entries
            .iter()
            .find(|e| e.idempotency_key == idempotency_key)
            .cloned())
    }

    async fn entries_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self
            .lock()
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.id));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn entries_for_tournament(
        &self,
        tournament_id: TournamentId,
        kind: EntryKind,
    ) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self
            .lock()
            .entries
            .iter()
            .filter(|e| e.tournament_id == Some(tournament_id) && e.kind == kind)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::SkillTier;
    use crate::wallet::EntryDirection;

    fn new_player(name: &str) -> NewPlayer {
        NewPlayer {
            user_id: 1,
            display_name: name.to_string(),
            skill_tier: SkillTier::Silver,
            avatar_url: None,
        }
    }

    fn fee_entry(user_id: UserId, key: &str) -> NewLedgerEntry {
        NewLedgerEntry {
            user_id,
            tournament_id: Some(7),
            amount: -50,
            direction: EntryDirection::Debit,
            kind: EntryKind::EntryFee,
            idempotency_key: key.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn create_and_fetch_player() {
        let store = InMemoryStore::new();
        let player = store.create_player(new_player("alice")).await.unwrap();
        assert!(player.active);
        assert!(!player.banned);

        let fetched = store.get_player(player.id).await.unwrap().unwrap();
        assert_eq!(fetched.display_name, "alice");

        assert!(store.get_player(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_result_accumulates() {
        let store = InMemoryStore::new();
        let player = store.create_player(new_player("bob")).await.unwrap();

        store
            .record_result(player.id, MatchOutcome::Win)
            .await
            .unwrap();
        store
            .record_result(player.id, MatchOutcome::Win)
            .await
            .unwrap();
        store
            .record_result(player.id, MatchOutcome::Loss)
            .await
            .unwrap();

        let stats = store.get_stats(player.id).await.unwrap();
        assert_eq!((stats.wins, stats.losses, stats.draws), (2, 1, 0));
    }

    #[tokio::test]
    async fn replace_vote_retires_prior_vote_globally() {
        let store = InMemoryStore::new();
        let first = store
            .replace_vote(NewVote {
                player_id: 1,
                tournament_id: 10,
                kind: crate::vote::VoteKind::Solo,
                cast_at: Utc::now(),
            })
            .await
            .unwrap();
        // Same player votes in a different tournament.
        store
            .replace_vote(NewVote {
                player_id: 1,
                tournament_id: 20,
                kind: crate::vote::VoteKind::Pair { target: 2 },
                cast_at: Utc::now(),
            })
            .await
            .unwrap();

        let old = store.votes_for_tournament(10).await.unwrap();
        assert!(old.is_empty(), "vote {} should be retired", first.id);
        assert_eq!(store.votes_for_tournament(20).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transition_phase_is_compare_and_set() {
        let store = InMemoryStore::new();
        let t = store
            .create_tournament(TournamentConfig::new("Weekly", 100, 4))
            .await
            .unwrap();

        assert!(
            store
                .transition_phase(t.id, TournamentPhase::Draft, TournamentPhase::VotingOpen)
                .await
                .unwrap()
        );
        // Stale expectation loses.
        assert!(
            !store
                .transition_phase(t.id, TournamentPhase::Draft, TournamentPhase::VotingOpen)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn persist_partition_conflicts_outside_voting_closed() {
        let store = InMemoryStore::new();
        let t = store
            .create_tournament(TournamentConfig::new("Weekly", 100, 4))
            .await
            .unwrap();

        let plans = vec![TeamPlan {
            number: 1,
            members: vec![1, 2],
        }];
        let err = store.persist_partition(t.id, &plans, 4).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn append_entry_checks_predecessor() {
        let store = InMemoryStore::new();
        let first = store
            .append_entry(fee_entry(1, "k1"), None, -50)
            .await
            .unwrap();

        // Stale predecessor conflicts.
        let err = store
            .append_entry(fee_entry(1, "k2"), None, -100)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        // Correct predecessor lands.
        store
            .append_entry(fee_entry(1, "k2"), Some(first.id), -100)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn append_entry_replays_idempotency_key() {
        let store = InMemoryStore::new();
        let first = store
            .append_entry(fee_entry(1, "k1"), None, -50)
            .await
            .unwrap();
        let replay = store
            .append_entry(fee_entry(1, "k1"), Some(first.id), -999)
            .await
            .unwrap();
        assert_eq!(replay.id, first.id);
        assert_eq!(replay.balance_after, -50);
    }
}

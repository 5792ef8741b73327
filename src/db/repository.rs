//! Store trait definitions for testability and dependency injection.
//!
//! This module provides trait-based abstractions over the persistence
//! operations the engines need, enabling tests to run against the
//! in-memory store while production uses PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use thiserror::Error;

use crate::partition::TeamPlan;
use crate::player::{
    MatchOutcome, NewPlayer, Player, PlayerId, PlayerStats, SkillTier, Team, TeamId, UserId,
};
use crate::tournament::{
    Match, Season, Tournament, TournamentConfig, TournamentId, TournamentPhase, TournamentWinner,
};
use crate::vote::{NewVote, Vote, VoteKind, VotingWindow};
use crate::wallet::{EntryDirection, EntryId, EntryKind, LedgerEntry, NewLedgerEntry};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// An optimistic write lost its race; the caller may retry or read back
    /// the committed state.
    #[error("optimistic concurrency conflict")]
    Conflict,

    /// A stored row failed to decode into a domain value.
    #[error("stored data invalid: {0}")]
    Corrupted(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Player persistence operations
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Create a new player profile.
    async fn create_player(&self, new: NewPlayer) -> StoreResult<Player>;

    /// Fetch a player by id.
    async fn get_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>>;

    /// Set or clear a player's ban flag.
    async fn set_banned(&self, player_id: PlayerId, banned: bool) -> StoreResult<()>;

    /// Soft-delete a player. Historical records keep referencing them.
    async fn deactivate_player(&self, player_id: PlayerId) -> StoreResult<()>;

    /// Lifetime statistics for a player; zeroed when none recorded yet.
    async fn get_stats(&self, player_id: PlayerId) -> StoreResult<PlayerStats>;

    /// Increment a player's win/loss/draw counters.
    async fn record_result(&self, player_id: PlayerId, outcome: MatchOutcome) -> StoreResult<()>;
}

/// Vote persistence operations
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Record a vote, first retiring any prior vote the player holds
    /// anywhere. At most one live vote per player, across all tournaments.
    async fn replace_vote(&self, vote: NewVote) -> StoreResult<Vote>;

    /// All live votes for a tournament.
    async fn votes_for_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Vote>>;

    /// Retire all of a tournament's votes.
    async fn clear_votes(&self, tournament_id: TournamentId) -> StoreResult<()>;
}

/// Tournament and season persistence operations
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Create a tournament in the `Draft` phase.
    async fn create_tournament(&self, config: TournamentConfig) -> StoreResult<Tournament>;

    /// Fetch a tournament by id.
    async fn get_tournament(&self, tournament_id: TournamentId)
    -> StoreResult<Option<Tournament>>;

    /// Compare-and-set phase transition. Returns `false` when the current
    /// phase no longer matches `from`; the caller decides how to recover.
    async fn transition_phase(
        &self,
        tournament_id: TournamentId,
        from: TournamentPhase,
        to: TournamentPhase,
    ) -> StoreResult<bool>;

    /// Enroll a player. Returns `false` when already enrolled.
    async fn add_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool>;

    /// Enrolled players, ascending by id.
    async fn participants(&self, tournament_id: TournamentId) -> StoreResult<Vec<PlayerId>>;

    /// Create a season.
    async fn create_season(
        &self,
        name: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> StoreResult<Season>;
}

/// Team persistence operations
#[async_trait]
pub trait TeamStore: Send + Sync {
    /// Persist a whole partition atomically together with the
    /// `VotingClosed -> TeamsFormed` transition. Fails with
    /// [`StoreError::Conflict`] when another caller committed first, in
    /// which case no team row is written.
    async fn persist_partition(
        &self,
        tournament_id: TournamentId,
        plans: &[TeamPlan],
        capacity: usize,
    ) -> StoreResult<Vec<Team>>;

    /// Teams for a tournament, ascending by number.
    async fn teams_for_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Team>>;

    /// The team a player sits on in a tournament, if any.
    async fn team_for_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<Option<Team>>;

    /// Remove a player from a team.
    async fn remove_member(&self, team_id: TeamId, player_id: PlayerId) -> StoreResult<()>;

    /// Move a player between two teams of the same tournament.
    async fn move_member(
        &self,
        from_team: TeamId,
        to_team: TeamId,
        player_id: PlayerId,
    ) -> StoreResult<()>;

    /// Delete an emptied team.
    async fn delete_team(&self, team_id: TeamId) -> StoreResult<()>;
}

/// Match persistence operations
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Append a match record.
    async fn append_match(&self, tournament_id: TournamentId, name: &str) -> StoreResult<Match>;

    /// Matches for a tournament in creation order.
    async fn matches_for_tournament(&self, tournament_id: TournamentId)
    -> StoreResult<Vec<Match>>;
}

/// Winner persistence operations
#[async_trait]
pub trait WinnerStore: Send + Sync {
    /// Persist final standings atomically together with the
    /// `InProgress -> Concluded` transition. Fails with
    /// [`StoreError::Conflict`] when another caller committed first.
    async fn persist_standings(
        &self,
        tournament_id: TournamentId,
        winners: &[TournamentWinner],
    ) -> StoreResult<()>;

    /// Recorded winners, ascending by position.
    async fn winners_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<TournamentWinner>>;
}

/// Wallet persistence operations
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Append a ledger entry, guarded by an optimistic check: `prev` must
    /// still be the account's latest entry id or the append fails with
    /// [`StoreError::Conflict`]. Appending a key that already exists also
    /// conflicts; the caller replays via [`WalletStore::entry_by_key`].
    async fn append_entry(
        &self,
        entry: NewLedgerEntry,
        prev: Option<EntryId>,
        balance_after: i64,
    ) -> StoreResult<LedgerEntry>;

    /// The account's most recent entry.
    async fn last_entry(&self, user_id: UserId) -> StoreResult<Option<LedgerEntry>>;

    /// Look up an entry by idempotency key.
    async fn entry_by_key(&self, idempotency_key: &str) -> StoreResult<Option<LedgerEntry>>;

    /// Transaction history, most recent first.
    async fn entries_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> StoreResult<Vec<LedgerEntry>>;

    /// Entries of one kind recorded against a tournament, oldest first.
    async fn entries_for_tournament(
        &self,
        tournament_id: TournamentId,
        kind: EntryKind,
    ) -> StoreResult<Vec<LedgerEntry>>;
}

/// The combined persistence surface the engines hold as `Arc<dyn Store>`.
pub trait Store:
    PlayerStore + VoteStore + TournamentStore + TeamStore + MatchStore + WinnerStore + WalletStore
{
}

impl<T> Store for T where
    T: PlayerStore + VoteStore + TournamentStore + TeamStore + MatchStore + WinnerStore + WalletStore
{
}

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Default PostgreSQL implementation of [`Store`]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_player(r: &PgRow) -> StoreResult<Player> {
    let tier: String = r.get("skill_tier");
    Ok(Player {
        id: r.get("id"),
        user_id: r.get("user_id"),
        display_name: r.get("display_name"),
        skill_tier: SkillTier::parse(&tier)
            .ok_or_else(|| StoreError::Corrupted(format!("unknown skill tier '{tier}'")))?,
        banned: r.get("banned"),
        active: r.get("active"),
        team_id: r.get("team_id"),
        avatar_url: r.get("avatar_url"),
        created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

fn map_tournament(r: &PgRow) -> StoreResult<Tournament> {
    let phase: String = r.get("phase");
    let opens_at: Option<chrono::NaiveDateTime> = r.get("voting_opens_at");
    let closes_at: Option<chrono::NaiveDateTime> = r.get("voting_closes_at");
    let voting_window = match (opens_at, closes_at) {
        (Some(opens_at), Some(closes_at)) => Some(VotingWindow {
            opens_at: opens_at.and_utc(),
            closes_at: closes_at.and_utc(),
        }),
        _ => None,
    };
    let prize_split = r
        .get::<Option<String>, _>("prize_split")
        .map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| StoreError::Corrupted(format!("bad prize split: {e}")))
        })
        .transpose()?;

    Ok(Tournament {
        id: r.get("id"),
        config: TournamentConfig {
            name: r.get("name"),
            start_date: r.get::<chrono::NaiveDateTime, _>("start_date").and_utc(),
            entry_fee: r.get("entry_fee"),
            team_size: r.get::<i32, _>("team_size") as usize,
            min_team_size: r.get::<i32, _>("min_team_size") as usize,
            season_id: r.get("season_id"),
            banner_url: r.get("banner_url"),
            voting_window,
            prize_split,
        },
        phase: TournamentPhase::parse(&phase)
            .ok_or_else(|| StoreError::Corrupted(format!("unknown phase '{phase}'")))?,
        created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        started_at: r
            .get::<Option<chrono::NaiveDateTime>, _>("started_at")
            .map(|dt| dt.and_utc()),
        concluded_at: r
            .get::<Option<chrono::NaiveDateTime>, _>("concluded_at")
            .map(|dt| dt.and_utc()),
    })
}

fn map_vote(r: &PgRow) -> StoreResult<Vote> {
    let kind: String = r.get("kind");
    let target: Option<PlayerId> = r.get("target");
    let kind = match (kind.as_str(), target) {
        ("pair", Some(target)) => VoteKind::Pair { target },
        ("exclude", Some(target)) => VoteKind::Exclude { target },
        ("solo", None) => VoteKind::Solo,
        (kind, target) => {
            return Err(StoreError::Corrupted(format!(
                "bad vote row: kind '{kind}', target {target:?}"
            )));
        }
    };
    Ok(Vote {
        id: r.get("id"),
        player_id: r.get("player_id"),
        tournament_id: r.get("tournament_id"),
        kind,
        cast_at: r.get::<chrono::NaiveDateTime, _>("cast_at").and_utc(),
    })
}

fn map_entry(r: &PgRow) -> StoreResult<LedgerEntry> {
    let direction: String = r.get("direction");
    let kind: String = r.get("kind");
    Ok(LedgerEntry {
        id: r.get("id"),
        user_id: r.get("user_id"),
        tournament_id: r.get("tournament_id"),
        amount: r.get("amount"),
        balance_after: r.get("balance_after"),
        direction: match direction.as_str() {
            "debit" => EntryDirection::Debit,
            "credit" => EntryDirection::Credit,
            other => {
                return Err(StoreError::Corrupted(format!(
                    "unknown entry direction '{other}'"
                )));
            }
        },
        kind: EntryKind::parse(&kind)
            .ok_or_else(|| StoreError::Corrupted(format!("unknown entry kind '{kind}'")))?,
        idempotency_key: r.get("idempotency_key"),
        description: r.get("description"),
        created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

async fn fetch_team(
    tx: impl sqlx::PgExecutor<'_> + Copy,
    team_id: TeamId,
) -> StoreResult<Option<Team>> {
    let row = sqlx::query(
        "SELECT id, tournament_id, number, name, capacity, created_at FROM teams WHERE id = $1",
    )
    .bind(team_id)
    .fetch_optional(tx)
    .await?;
    let Some(r) = row else { return Ok(None) };

    let members: Vec<PlayerId> = sqlx::query(
        "SELECT player_id FROM team_members WHERE team_id = $1 ORDER BY player_id",
    )
    .bind(team_id)
    .fetch_all(tx)
    .await?
    .iter()
    .map(|m| m.get("player_id"))
    .collect();

    Ok(Some(Team {
        id: r.get("id"),
        tournament_id: r.get("tournament_id"),
        number: r.get::<i32, _>("number") as u32,
        name: r.get("name"),
        capacity: r.get::<i32, _>("capacity") as usize,
        members,
        created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }))
}

async fn cas_phase(
    tx: &mut Transaction<'_, Postgres>,
    tournament_id: TournamentId,
    from: TournamentPhase,
    to: TournamentPhase,
) -> StoreResult<bool> {
    let result = sqlx::query(
        "UPDATE tournaments
         SET phase = $1,
             started_at = CASE WHEN $1 = 'in_progress' THEN NOW() ELSE started_at END,
             concluded_at = CASE WHEN $1 = 'concluded' THEN NOW() ELSE concluded_at END
         WHERE id = $2 AND phase = $3",
    )
    .bind(to.as_str())
    .bind(tournament_id)
    .bind(from.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl PlayerStore for PgStore {
    async fn create_player(&self, new: NewPlayer) -> StoreResult<Player> {
        let row = sqlx::query(
            "INSERT INTO players (user_id, display_name, skill_tier, avatar_url)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, display_name, skill_tier, banned, active, team_id,
                       avatar_url, created_at",
        )
        .bind(new.user_id)
        .bind(&new.display_name)
        .bind(new.skill_tier.to_string())
        .bind(&new.avatar_url)
        .fetch_one(&self.pool)
        .await?;
        map_player(&row)
    }

    async fn get_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>> {
        let row = sqlx::query(
            "SELECT id, user_id, display_name, skill_tier, banned, active, team_id,
                    avatar_url, created_at
             FROM players WHERE id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_player).transpose()
    }

    async fn set_banned(&self, player_id: PlayerId, banned: bool) -> StoreResult<()> {
        sqlx::query("UPDATE players SET banned = $1 WHERE id = $2")
            .bind(banned)
            .bind(player_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn deactivate_player(&self, player_id: PlayerId) -> StoreResult<()> {
        sqlx::query("UPDATE players SET active = FALSE WHERE id = $1")
            .bind(player_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_stats(&self, player_id: PlayerId) -> StoreResult<PlayerStats> {
        let row = sqlx::query(
            "SELECT wins, losses, draws FROM player_stats WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or(
            PlayerStats {
                player_id,
                wins: 0,
                losses: 0,
                draws: 0,
            },
            |r| PlayerStats {
                player_id,
                wins: r.get::<i32, _>("wins") as u32,
                losses: r.get::<i32, _>("losses") as u32,
                draws: r.get::<i32, _>("draws") as u32,
            },
        ))
    }

    async fn record_result(&self, player_id: PlayerId, outcome: MatchOutcome) -> StoreResult<()> {
        let (wins, losses, draws) = match outcome {
            MatchOutcome::Win => (1, 0, 0),
            MatchOutcome::Loss => (0, 1, 0),
            MatchOutcome::Draw => (0, 0, 1),
        };
        sqlx::query(
            "INSERT INTO player_stats (player_id, wins, losses, draws)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (player_id) DO UPDATE
             SET wins = player_stats.wins + $2,
                 losses = player_stats.losses + $3,
                 draws = player_stats.draws + $4",
        )
        .bind(player_id)
        .bind(wins)
        .bind(losses)
        .bind(draws)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VoteStore for PgStore {
    async fn replace_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        let mut tx = self.pool.begin().await?;
        // One live vote per player, across every tournament.
        sqlx::query("DELETE FROM votes WHERE player_id = $1")
            .bind(vote.player_id)
            .execute(&mut *tx)
            .await?;
        let (kind, target) = match vote.kind {
            VoteKind::Pair { target } => ("pair", Some(target)),
            VoteKind::Exclude { target } => ("exclude", Some(target)),
            VoteKind::Solo => ("solo", None),
        };
        let row = sqlx::query(
            "INSERT INTO votes (player_id, tournament_id, kind, target, cast_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, player_id, tournament_id, kind, target, cast_at",
        )
        .bind(vote.player_id)
        .bind(vote.tournament_id)
        .bind(kind)
        .bind(target)
        .bind(vote.cast_at.naive_utc())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        map_vote(&row)
    }

    async fn votes_for_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Vote>> {
        let rows = sqlx::query(
            "SELECT id, player_id, tournament_id, kind, target, cast_at
             FROM votes WHERE tournament_id = $1 ORDER BY player_id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_vote).collect()
    }

    async fn clear_votes(&self, tournament_id: TournamentId) -> StoreResult<()> {
        sqlx::query("DELETE FROM votes WHERE tournament_id = $1")
            .bind(tournament_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TournamentStore for PgStore {
    async fn create_tournament(&self, config: TournamentConfig) -> StoreResult<Tournament> {
        let prize_split = config
            .prize_split
            .as_ref()
            .map(|s| serde_json::to_string(s))
            .transpose()
            .map_err(|e| StoreError::Corrupted(format!("bad prize split: {e}")))?;
        let row = sqlx::query(
            "INSERT INTO tournaments
                 (name, start_date, entry_fee, team_size, min_team_size, season_id,
                  banner_url, voting_opens_at, voting_closes_at, prize_split, phase)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'draft')
             RETURNING id, name, start_date, entry_fee, team_size, min_team_size, season_id,
                       banner_url, voting_opens_at, voting_closes_at, prize_split, phase,
                       created_at, started_at, concluded_at",
        )
        .bind(&config.name)
        .bind(config.start_date.naive_utc())
        .bind(config.entry_fee)
        .bind(config.team_size as i32)
        .bind(config.min_team_size as i32)
        .bind(config.season_id)
        .bind(&config.banner_url)
        .bind(config.voting_window.map(|w| w.opens_at.naive_utc()))
        .bind(config.voting_window.map(|w| w.closes_at.naive_utc()))
        .bind(prize_split)
        .fetch_one(&self.pool)
        .await?;
        map_tournament(&row)
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(
            "SELECT id, name, start_date, entry_fee, team_size, min_team_size, season_id,
                    banner_url, voting_opens_at, voting_closes_at, prize_split, phase,
                    created_at, started_at, concluded_at
             FROM tournaments WHERE id = $1",
        )
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_tournament).transpose()
    }

    async fn transition_phase(
        &self,
        tournament_id: TournamentId,
        from: TournamentPhase,
        to: TournamentPhase,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let won = cas_phase(&mut tx, tournament_id, from, to).await?;
        tx.commit().await?;
        Ok(won)
    }

    async fn add_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO tournament_participants (tournament_id, player_id)
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(tournament_id)
        .bind(player_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn participants(&self, tournament_id: TournamentId) -> StoreResult<Vec<PlayerId>> {
        let rows = sqlx::query(
            "SELECT player_id FROM tournament_participants
             WHERE tournament_id = $1 ORDER BY player_id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get("player_id")).collect())
    }

    async fn create_season(
        &self,
        name: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> StoreResult<Season> {
        let row = sqlx::query(
            "INSERT INTO seasons (name, starts_at, ends_at) VALUES ($1, $2, $3)
             RETURNING id, name, starts_at, ends_at",
        )
        .bind(name)
        .bind(starts_at.naive_utc())
        .bind(ends_at.naive_utc())
        .fetch_one(&self.pool)
        .await?;
        Ok(Season {
            id: row.get("id"),
            name: row.get("name"),
            starts_at: row.get::<chrono::NaiveDateTime, _>("starts_at").and_utc(),
            ends_at: row.get::<chrono::NaiveDateTime, _>("ends_at").and_utc(),
        })
    }
}

#[async_trait]
impl TeamStore for PgStore {
    async fn persist_partition(
        &self,
        tournament_id: TournamentId,
        plans: &[TeamPlan],
        capacity: usize,
    ) -> StoreResult<Vec<Team>> {
        let mut tx = self.pool.begin().await?;
        let won = cas_phase(
            &mut tx,
            tournament_id,
            TournamentPhase::VotingClosed,
            TournamentPhase::TeamsFormed,
        )
        .await?;
        if !won {
            return Err(StoreError::Conflict);
        }

        let mut teams = Vec::with_capacity(plans.len());
        for plan in plans {
            let row = sqlx::query(
                "INSERT INTO teams (tournament_id, number, name, capacity)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, created_at",
            )
            .bind(tournament_id)
            .bind(plan.number as i32)
            .bind(format!("Team {}", plan.number))
            .bind(capacity as i32)
            .fetch_one(&mut *tx)
            .await?;
            let team_id: TeamId = row.get("id");

            for &member in &plan.members {
                sqlx::query("INSERT INTO team_members (team_id, player_id) VALUES ($1, $2)")
                    .bind(team_id)
                    .bind(member)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("UPDATE players SET team_id = $1 WHERE id = $2")
                    .bind(team_id)
                    .bind(member)
                    .execute(&mut *tx)
                    .await?;
            }

            teams.push(Team {
                id: team_id,
                tournament_id: Some(tournament_id),
                number: plan.number,
                name: format!("Team {}", plan.number),
                capacity,
                members: plan.members.clone(),
                created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            });
        }

        tx.commit().await?;
        Ok(teams)
    }

    async fn teams_for_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Team>> {
        let ids: Vec<TeamId> = sqlx::query(
            "SELECT id FROM teams WHERE tournament_id = $1 ORDER BY number",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| r.get("id"))
        .collect();

        let mut teams = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(team) = fetch_team(&self.pool, id).await? {
                teams.push(team);
            }
        }
        Ok(teams)
    }

    async fn team_for_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<Option<Team>> {
        let row = sqlx::query(
            "SELECT t.id FROM teams t
             JOIN team_members m ON m.team_id = t.id
             WHERE t.tournament_id = $1 AND m.player_id = $2",
        )
        .bind(tournament_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(r) => fetch_team(&self.pool, r.get("id")).await,
            None => Ok(None),
        }
    }

    async fn remove_member(&self, team_id: TeamId, player_id: PlayerId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND player_id = $2")
            .bind(team_id)
            .bind(player_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE players SET team_id = NULL WHERE id = $1 AND team_id = $2")
            .bind(player_id)
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn move_member(
        &self,
        from_team: TeamId,
        to_team: TeamId,
        player_id: PlayerId,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE team_members SET team_id = $1 WHERE team_id = $2 AND player_id = $3",
        )
        .bind(to_team)
        .bind(from_team)
        .bind(player_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE players SET team_id = $1 WHERE id = $2")
            .bind(to_team)
            .bind(player_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_team(&self, team_id: TeamId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE players SET team_id = NULL WHERE team_id = $1")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM team_members WHERE team_id = $1")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn append_match(&self, tournament_id: TournamentId, name: &str) -> StoreResult<Match> {
        let row = sqlx::query(
            "INSERT INTO matches (tournament_id, name) VALUES ($1, $2)
             RETURNING id, tournament_id, name, created_at",
        )
        .bind(tournament_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(Match {
            id: row.get("id"),
            tournament_id: row.get("tournament_id"),
            name: row.get("name"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        })
    }

    async fn matches_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query(
            "SELECT id, tournament_id, name, created_at
             FROM matches WHERE tournament_id = $1 ORDER BY id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| Match {
                id: r.get("id"),
                tournament_id: r.get("tournament_id"),
                name: r.get("name"),
                created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            })
            .collect())
    }
}

#[async_trait]
impl WinnerStore for PgStore {
    async fn persist_standings(
        &self,
        tournament_id: TournamentId,
        winners: &[TournamentWinner],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let won = cas_phase(
            &mut tx,
            tournament_id,
            TournamentPhase::InProgress,
            TournamentPhase::Concluded,
        )
        .await?;
        if !won {
            return Err(StoreError::Conflict);
        }
        for winner in winners {
            sqlx::query(
                "INSERT INTO tournament_winners (tournament_id, player_id, position, prize)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(tournament_id)
            .bind(winner.player_id)
            .bind(winner.position as i32)
            .bind(winner.prize)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn winners_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<TournamentWinner>> {
        let rows = sqlx::query(
            "SELECT tournament_id, player_id, position, prize
             FROM tournament_winners WHERE tournament_id = $1 ORDER BY position",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| TournamentWinner {
                tournament_id: r.get("tournament_id"),
                player_id: r.get("player_id"),
                position: r.get::<i32, _>("position") as u32,
                prize: r.get("prize"),
            })
            .collect())
    }
}

#[async_trait]
impl WalletStore for PgStore {
    async fn append_entry(
        &self,
        entry: NewLedgerEntry,
        prev: Option<EntryId>,
        balance_after: i64,
    ) -> StoreResult<LedgerEntry> {
        // The insert only lands when `prev` is still the account's latest
        // entry; a concurrent append makes the SELECT produce no row.
        let result = sqlx::query(
            "INSERT INTO wallet_entries
                 (user_id, tournament_id, amount, balance_after, direction, kind,
                  idempotency_key, description)
             SELECT $1, $2, $3, $4, $5, $6, $7, $8
             WHERE (SELECT MAX(id) FROM wallet_entries WHERE user_id = $1)
                   IS NOT DISTINCT FROM $9
             RETURNING id, user_id, tournament_id, amount, balance_after, direction, kind,
                       idempotency_key, description, created_at",
        )
        .bind(entry.user_id)
        .bind(entry.tournament_id)
        .bind(entry.amount)
        .bind(balance_after)
        .bind(entry.direction.to_string())
        .bind(entry.kind.to_string())
        .bind(&entry.idempotency_key)
        .bind(&entry.description)
        .bind(prev)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => map_entry(&row),
            Ok(None) => Err(StoreError::Conflict),
            // A replayed idempotency key trips the unique index; surface it
            // as a conflict so the ledger re-reads by key.
            Err(e)
                if e.as_database_error()
                    .and_then(|d| d.code())
                    .is_some_and(|c| c == UNIQUE_VIOLATION) =>
            {
                Err(StoreError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn last_entry(&self, user_id: UserId) -> StoreResult<Option<LedgerEntry>> {
        let row = sqlx::query(
            "SELECT id, user_id, tournament_id, amount, balance_after, direction, kind,
                    idempotency_key, description, created_at
             FROM wallet_entries WHERE user_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_entry).transpose()
    }

    async fn entry_by_key(&self, idempotency_key: &str) -> StoreResult<Option<LedgerEntry>> {
        let row = sqlx::query(
            "SELECT id, user_id, tournament_id, amount, balance_after, direction, kind,
                    idempotency_key, description, created_at
             FROM wallet_entries WHERE idempotency_key = $1",
        )
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_entry).transpose()
    }

    async fn entries_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT id, user_id, tournament_id, amount, balance_after, direction, kind,
                    idempotency_key, description, created_at
             FROM wallet_entries WHERE user_id = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_entry).collect()
    }

    async fn entries_for_tournament(
        &self,
        tournament_id: TournamentId,
        kind: EntryKind,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            "SELECT id, user_id, tournament_id, amount, balance_after, direction, kind,
                    idempotency_key, description, created_at
             FROM wallet_entries WHERE tournament_id = $1 AND kind = $2 ORDER BY id",
        )
        .bind(tournament_id)
        .bind(kind.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_entry).collect()
    }
}

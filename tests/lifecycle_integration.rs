//! Integration tests for the tournament lifecycle: fee settlement, match
//! recording, conclusion, and cancellation over the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use team_forge::db::{InMemoryStore, PlayerStore};
use team_forge::player::{NewPlayer, PlayerId, SkillTier, UserId};
use team_forge::tournament::{
    LifecycleController, LifecycleError, Standing, Tournament, TournamentConfig, TournamentPhase,
};
use team_forge::vote::VotingWindow;
use team_forge::wallet::unique_key;

const FEE: i64 = 100;

struct Harness {
    store: Arc<InMemoryStore>,
    controller: LifecycleController,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let controller = LifecycleController::new(store.clone());
        Self { store, controller }
    }

    async fn tournament(&self, team_size: usize) -> Tournament {
        let window = VotingWindow {
            opens_at: Utc::now() - Duration::hours(1),
            closes_at: Utc::now() + Duration::hours(1),
        };
        self.controller
            .create_tournament(
                TournamentConfig::new("Season Opener", FEE, team_size).with_window(window),
            )
            .await
            .expect("create tournament")
    }

    async fn enroll_players(&self, tournament_id: i64, count: usize) -> Vec<PlayerId> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let player = self
                .store
                .create_player(NewPlayer {
                    user_id: 1000 + i as i64,
                    display_name: format!("player{i}"),
                    skill_tier: SkillTier::Gold,
                    avatar_url: None,
                })
                .await
                .expect("create player");
            self.controller
                .enroll_player(tournament_id, player.id)
                .await
                .expect("enroll player");
            ids.push(player.id);
        }
        ids
    }

    async fn user_of(&self, player: PlayerId) -> UserId {
        self.store
            .get_player(player)
            .await
            .unwrap()
            .expect("player exists")
            .user_id
    }

    async fn fund(&self, player: PlayerId, amount: i64) {
        let user_id = self.user_of(player).await;
        self.controller
            .wallet()
            .credit_adjustment(user_id, amount, unique_key("seed"), None)
            .await
            .expect("fund account");
    }

    async fn balance_of(&self, player: PlayerId) -> i64 {
        let user_id = self.user_of(player).await;
        self.controller.wallet().balance(user_id).await.unwrap()
    }

    /// Drive a tournament to `TeamsFormed` with everyone funded.
    async fn formed(&self, team_size: usize, count: usize) -> (Tournament, Vec<PlayerId>) {
        let t = self.tournament(team_size).await;
        let players = self.enroll_players(t.id, count).await;
        for &p in &players {
            self.fund(p, 500).await;
        }
        self.controller.open_voting(t.id).await.unwrap();
        self.controller.close_voting(t.id).await.unwrap();
        self.controller.form_teams(t.id).await.unwrap();
        (t, players)
    }
}

fn standings_for(players: &[PlayerId]) -> Vec<Standing> {
    players
        .iter()
        .enumerate()
        .map(|(i, &player_id)| Standing {
            player_id,
            position: i as u32 + 1,
        })
        .collect()
}

#[tokio::test]
async fn open_voting_requires_window_and_fee() {
    let h = Harness::new();
    let no_window = h
        .controller
        .create_tournament(TournamentConfig::new("No Window", FEE, 2))
        .await
        .unwrap();
    let err = h.controller.open_voting(no_window.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::MissingVotingWindow));

    let window = VotingWindow {
        opens_at: Utc::now(),
        closes_at: Utc::now() + Duration::hours(1),
    };
    let mut config = TournamentConfig::new("No Fee", 0, 2).with_window(window);
    config.entry_fee = None;
    let no_fee = h.controller.create_tournament(config).await.unwrap();
    let err = h.controller.open_voting(no_fee.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::MissingEntryFee));
}

#[tokio::test]
async fn enrollment_closes_after_voting() {
    let h = Harness::new();
    let t = h.tournament(2).await;
    let p = h.enroll_players(t.id, 2).await;

    h.controller.open_voting(t.id).await.unwrap();
    let err = h.controller.enroll_player(t.id, p[0]).await.unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyEnrolled(_)));

    h.controller.close_voting(t.id).await.unwrap();

    let late = h
        .store
        .create_player(NewPlayer {
            user_id: 42,
            display_name: "latecomer".to_string(),
            skill_tier: SkillTier::Bronze,
            avatar_url: None,
        })
        .await
        .unwrap();
    let err = h.controller.enroll_player(t.id, late.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidPhase { .. }));
}

#[tokio::test]
async fn start_charges_every_seated_player() {
    let h = Harness::new();
    let (t, players) = h.formed(2, 4).await;

    let summary = h.controller.start_tournament(t.id).await.unwrap();
    assert_eq!(summary.charged.len(), 4);
    assert!(summary.removed.is_empty());

    for &p in &players {
        assert_eq!(h.balance_of(p).await, 400);
    }
    let current = h.controller.get(t.id).await.unwrap();
    assert_eq!(current.phase, TournamentPhase::InProgress);
    assert!(current.started_at.is_some());
}

#[tokio::test]
async fn start_drops_player_who_cannot_pay() {
    let h = Harness::new();
    let t = h.tournament(4).await;
    let players = h.enroll_players(t.id, 4).await;
    // Everyone funded except the last.
    for &p in &players[..3] {
        h.fund(p, 500).await;
    }
    h.controller.open_voting(t.id).await.unwrap();
    h.controller.close_voting(t.id).await.unwrap();
    h.controller.form_teams(t.id).await.unwrap();

    let summary = h.controller.start_tournament(t.id).await.unwrap();
    assert_eq!(summary.charged.len(), 3);
    assert_eq!(summary.removed, vec![players[3]]);

    let teams = h.controller.teams(t.id).await.unwrap();
    assert_eq!(teams.len(), 1);
    assert!(!teams[0].members.contains(&players[3]));
    assert_eq!(teams[0].members.len(), 3);
}

#[tokio::test]
async fn record_match_requires_in_progress() {
    let h = Harness::new();
    let (t, _) = h.formed(2, 4).await;

    let err = h.controller.record_match(t.id, "round 1").await.unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidPhase { .. }));

    h.controller.start_tournament(t.id).await.unwrap();
    h.controller.record_match(t.id, "round 1").await.unwrap();
    h.controller.record_match(t.id, "round 2").await.unwrap();

    let matches = h.controller.matches(t.id).await.unwrap();
    let names: Vec<&str> = matches.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["round 1", "round 2"]);
}

#[tokio::test]
async fn conclude_pays_winner_and_updates_stats() {
    let h = Harness::new();
    let (t, players) = h.formed(2, 4).await;
    h.controller.start_tournament(t.id).await.unwrap();

    let winners = h
        .controller
        .conclude_tournament(t.id, &standings_for(&players))
        .await
        .unwrap();

    // Four entrants at 100 each, winner takes the whole pool.
    assert_eq!(winners[0].player_id, players[0]);
    assert_eq!(winners[0].prize, Some(4 * FEE));
    assert_eq!(h.balance_of(players[0]).await, 500 - FEE + 4 * FEE);
    assert_eq!(h.balance_of(players[1]).await, 400);

    let stats = h.store.get_stats(players[0]).await.unwrap();
    assert_eq!(stats.wins, 1);
    let stats = h.store.get_stats(players[1]).await.unwrap();
    assert_eq!(stats.losses, 1);

    let current = h.controller.get(t.id).await.unwrap();
    assert_eq!(current.phase, TournamentPhase::Concluded);
    assert!(current.concluded_at.is_some());
}

#[tokio::test]
async fn conclude_is_idempotent() {
    let h = Harness::new();
    let (t, players) = h.formed(2, 4).await;
    h.controller.start_tournament(t.id).await.unwrap();

    let standings = standings_for(&players);
    let first = h.controller.conclude_tournament(t.id, &standings).await.unwrap();
    let second = h.controller.conclude_tournament(t.id, &standings).await.unwrap();
    assert_eq!(first, second);
    // No double payout.
    assert_eq!(h.balance_of(players[0]).await, 500 - FEE + 4 * FEE);
}

#[tokio::test]
async fn conclude_rejects_bad_standings_without_paying() {
    let h = Harness::new();
    let (t, players) = h.formed(2, 4).await;
    h.controller.start_tournament(t.id).await.unwrap();

    // Positions 1 and 3: not contiguous.
    let gapped = vec![
        Standing { player_id: players[0], position: 1 },
        Standing { player_id: players[1], position: 3 },
    ];
    let err = h.controller.conclude_tournament(t.id, &gapped).await.unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidStandings(_)));

    // Duplicate player.
    let duplicated = vec![
        Standing { player_id: players[0], position: 1 },
        Standing { player_id: players[0], position: 2 },
    ];
    let err = h.controller.conclude_tournament(t.id, &duplicated).await.unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidStandings(_)));

    let current = h.controller.get(t.id).await.unwrap();
    assert_eq!(current.phase, TournamentPhase::InProgress);
    assert_eq!(h.balance_of(players[0]).await, 400, "no prize credited");
}

#[tokio::test]
async fn cancel_refunds_fees_and_keeps_debits() {
    let h = Harness::new();
    let (t, players) = h.formed(2, 4).await;
    h.controller.start_tournament(t.id).await.unwrap();
    assert_eq!(h.balance_of(players[0]).await, 400);

    h.controller.cancel_tournament(t.id).await.unwrap();

    let current = h.controller.get(t.id).await.unwrap();
    assert_eq!(current.phase, TournamentPhase::Cancelled);
    for &p in &players {
        assert_eq!(h.balance_of(p).await, 500, "fee refunded");
    }
    // The original debit is still on the books next to its refund.
    let user_id = h.user_of(players[0]).await;
    let entries = h.controller.wallet().entries(user_id, 10).await.unwrap();
    assert_eq!(entries.len(), 3, "seed, fee, refund");

    // Cancelling again is a no-op.
    h.controller.cancel_tournament(t.id).await.unwrap();
    assert_eq!(h.balance_of(players[0]).await, 500);
}

#[tokio::test]
async fn cancel_before_start_refunds_nothing() {
    let h = Harness::new();
    let (t, players) = h.formed(2, 4).await;

    h.controller.cancel_tournament(t.id).await.unwrap();
    assert_eq!(h.balance_of(players[0]).await, 500, "nothing was charged");
}

#[tokio::test]
async fn concluded_tournament_cannot_be_cancelled() {
    let h = Harness::new();
    let (t, players) = h.formed(2, 4).await;
    h.controller.start_tournament(t.id).await.unwrap();
    h.controller
        .conclude_tournament(t.id, &standings_for(&players))
        .await
        .unwrap();

    let err = h.controller.cancel_tournament(t.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyConcluded(_)));
}

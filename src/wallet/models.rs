//! Wallet ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::player::UserId;
use crate::tournament::TournamentId;

/// Ledger entry ID type
pub type EntryId = i64;

/// Entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Debit,
    Credit,
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDirection::Debit => write!(f, "debit"),
            EntryDirection::Credit => write!(f, "credit"),
        }
    }
}

/// What a ledger entry settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Tournament registration fee (debit)
    EntryFee,
    /// Prize payout for a final standing (credit)
    PrizePayout,
    /// Compensating credit for a fee after cancellation
    FeeRefund,
    /// Manual correction by an operator
    Adjustment,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::EntryFee => write!(f, "entry_fee"),
            EntryKind::PrizePayout => write!(f, "prize_payout"),
            EntryKind::FeeRefund => write!(f, "fee_refund"),
            EntryKind::Adjustment => write!(f, "adjustment"),
        }
    }
}

impl EntryKind {
    /// Parse a kind from its storage label.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "entry_fee" => Some(EntryKind::EntryFee),
            "prize_payout" => Some(EntryKind::PrizePayout),
            "fee_refund" => Some(EntryKind::FeeRefund),
            "adjustment" => Some(EntryKind::Adjustment),
            _ => None,
        }
    }
}

/// One immutable ledger row.
///
/// `amount` is signed: negative for debits, positive for credits, so the
/// account balance is the plain sum of its entries. `balance_after` is a
/// per-entry audit snapshot, recomputable from the entries before it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub tournament_id: Option<TournamentId>,
    pub amount: i64,
    pub balance_after: i64,
    pub direction: EntryDirection,
    pub kind: EntryKind,
    pub idempotency_key: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New ledger entry payload for the store.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: UserId,
    pub tournament_id: Option<TournamentId>,
    pub amount: i64,
    pub direction: EntryDirection,
    pub kind: EntryKind,
    pub idempotency_key: String,
    pub description: Option<String>,
}

/// Generate a collision-resistant idempotency key for ad-hoc settlements.
///
/// Lifecycle settlements use deterministic keys (`fee_{tournament}_{player}`
/// and friends) so retries coalesce; this helper is for one-off adjustments.
pub fn unique_key(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_round_trip() {
        for kind in [
            EntryKind::EntryFee,
            EntryKind::PrizePayout,
            EntryKind::FeeRefund,
            EntryKind::Adjustment,
        ] {
            assert_eq!(EntryKind::parse(&kind.to_string()), Some(kind));
        }
        assert_eq!(EntryKind::parse("rake"), None);
    }

    #[test]
    fn test_direction_labels() {
        assert_eq!(EntryDirection::Debit.to_string(), "debit");
        assert_eq!(EntryDirection::Credit.to_string(), "credit");
    }

    #[test]
    fn test_unique_keys_differ() {
        assert_ne!(unique_key("adjust"), unique_key("adjust"));
    }
}

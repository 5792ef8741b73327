//! Append-only wallet ledger implementation.

use std::sync::Arc;

use super::errors::{WalletError, WalletResult};
use super::models::{EntryDirection, EntryKind, LedgerEntry, NewLedgerEntry};
use crate::db::{Store, StoreError};
use crate::player::UserId;
use crate::tournament::TournamentId;

/// How many optimistic append races to retry before giving up.
const MAX_APPEND_RETRIES: usize = 3;

/// Wallet ledger
///
/// All writes append; nothing is ever mutated in place. Appends to the same
/// account are serialized by an optimistic check against the account's
/// latest entry, retried a bounded number of times. Replaying an
/// idempotency key returns the already-recorded entry instead of writing a
/// duplicate.
#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<dyn Store>,
}

impl WalletLedger {
    /// Create a new wallet ledger over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Current balance: the sum of all recorded entries for the user.
    pub async fn balance(&self, user_id: UserId) -> WalletResult<i64> {
        Ok(self
            .store
            .last_entry(user_id)
            .await?
            .map_or(0, |entry| entry.balance_after))
    }

    /// Fold the full entry history into a balance. Equal to [`Self::balance`]
    /// by construction; used to audit the running projection against the
    /// entries themselves.
    pub async fn recompute_balance(&self, user_id: UserId) -> WalletResult<i64> {
        let entries = self.store.entries_for_user(user_id, usize::MAX).await?;
        Ok(entries.iter().map(|e| e.amount).sum())
    }

    /// Transaction history, most recent first.
    pub async fn entries(&self, user_id: UserId, limit: usize) -> WalletResult<Vec<LedgerEntry>> {
        Ok(self.store.entries_for_user(user_id, limit).await?)
    }

    /// Debit a tournament entry fee.
    ///
    /// # Errors
    ///
    /// * `WalletError::InsufficientBalance` - the account cannot cover the
    ///   fee; the caller decides how to recover (the lifecycle controller
    ///   vacates the player's team slot)
    pub async fn debit_entry_fee(
        &self,
        user_id: UserId,
        tournament_id: TournamentId,
        amount: i64,
        idempotency_key: String,
    ) -> WalletResult<LedgerEntry> {
        self.append(
            NewLedgerEntry {
                user_id,
                tournament_id: Some(tournament_id),
                amount: -amount,
                direction: EntryDirection::Debit,
                kind: EntryKind::EntryFee,
                idempotency_key,
                description: Some(format!("entry fee for tournament {tournament_id}")),
            },
            amount,
        )
        .await
    }

    /// Credit a prize payout for a final standing.
    pub async fn credit_prize(
        &self,
        user_id: UserId,
        tournament_id: TournamentId,
        amount: i64,
        idempotency_key: String,
    ) -> WalletResult<LedgerEntry> {
        self.append(
            NewLedgerEntry {
                user_id,
                tournament_id: Some(tournament_id),
                amount,
                direction: EntryDirection::Credit,
                kind: EntryKind::PrizePayout,
                idempotency_key,
                description: Some(format!("prize payout for tournament {tournament_id}")),
            },
            amount,
        )
        .await
    }

    /// Issue a compensating credit for a previously debited entry fee.
    ///
    /// Cancellation never edits the ledger; the original debit stays and a
    /// matching refund entry is appended next to it.
    pub async fn refund_entry_fee(
        &self,
        user_id: UserId,
        tournament_id: TournamentId,
        amount: i64,
        idempotency_key: String,
    ) -> WalletResult<LedgerEntry> {
        self.append(
            NewLedgerEntry {
                user_id,
                tournament_id: Some(tournament_id),
                amount,
                direction: EntryDirection::Credit,
                kind: EntryKind::FeeRefund,
                idempotency_key,
                description: Some(format!(
                    "entry fee refund for cancelled tournament {tournament_id}"
                )),
            },
            amount,
        )
        .await
    }

    /// Record an administrative balance adjustment as a credit.
    pub async fn credit_adjustment(
        &self,
        user_id: UserId,
        amount: i64,
        idempotency_key: String,
        description: Option<String>,
    ) -> WalletResult<LedgerEntry> {
        self.append(
            NewLedgerEntry {
                user_id,
                tournament_id: None,
                amount,
                direction: EntryDirection::Credit,
                kind: EntryKind::Adjustment,
                idempotency_key,
                description,
            },
            amount,
        )
        .await
    }

    /// All fee debits recorded against a tournament, for cancellation
    /// compensation.
    pub async fn fee_debits_for(
        &self,
        tournament_id: TournamentId,
    ) -> WalletResult<Vec<LedgerEntry>> {
        Ok(self
            .store
            .entries_for_tournament(tournament_id, EntryKind::EntryFee)
            .await?)
    }

    async fn append(&self, entry: NewLedgerEntry, magnitude: i64) -> WalletResult<LedgerEntry> {
        if magnitude <= 0 {
            return Err(WalletError::InvalidAmount(magnitude));
        }

        for _ in 0..MAX_APPEND_RETRIES {
            // Idempotent replay: the settlement already happened.
            if let Some(existing) = self
                .store
                .entry_by_key(&entry.idempotency_key)
                .await?
            {
                log::debug!(
                    "settlement {} already recorded as entry {}",
                    entry.idempotency_key,
                    existing.id
                );
                return Ok(existing);
            }

            let last = self.store.last_entry(entry.user_id).await?;
            let balance = last.as_ref().map_or(0, |e| e.balance_after);

            let balance_after = match entry.direction {
                EntryDirection::Debit => {
                    if balance < magnitude {
                        return Err(WalletError::InsufficientBalance {
                            user_id: entry.user_id,
                            available: balance,
                            required: magnitude,
                        });
                    }
                    balance - magnitude
                }
                EntryDirection::Credit => balance
                    .checked_add(magnitude)
                    .ok_or(WalletError::BalanceOverflow)?,
            };

            match self
                .store
                .append_entry(entry.clone(), last.map(|e| e.id), balance_after)
                .await
            {
                Ok(recorded) => return Ok(recorded),
                // Someone else appended first; recompute and retry.
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(WalletError::AppendContention(entry.user_id))
    }
}

//! Wallet ledger error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::player::UserId;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Not enough funds to cover a debit
    #[error(
        "insufficient balance for user {user_id}: available {available}, required {required}"
    )]
    InsufficientBalance {
        user_id: UserId,
        available: i64,
        required: i64,
    },

    /// Settlement amounts must be positive
    #[error("invalid settlement amount: {0}")]
    InvalidAmount(i64),

    /// Crediting would overflow the balance
    #[error("balance overflow")]
    BalanceOverflow,

    /// Concurrent appends to the same account kept colliding
    #[error("ledger append for user {0} lost repeated optimistic races")]
    AppendContention(UserId),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

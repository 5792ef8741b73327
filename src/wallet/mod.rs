//! Wallet module: the append-only settlement ledger.
//!
//! Every settlement (entry-fee debit, prize credit, cancellation refund)
//! is an immutable ledger entry. A user's balance is always the sum of
//! their entries; no entry is ever edited or deleted, which keeps the
//! ledger auditable end to end. Any stored balance column is a cached
//! projection, recomputable from the entries and never written
//! independently.
//!
//! Settlement calls carry idempotency keys, so retrying a fee debit or
//! prize credit after a failure can never double-charge or double-pay.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use team_forge::db::InMemoryStore;
//! use team_forge::wallet::WalletLedger;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = WalletLedger::new(Arc::new(InMemoryStore::new()));
//!
//!     let entry = ledger
//!         .debit_entry_fee(1, 7, 500, "fee_7_1".to_string())
//!         .await?;
//!     println!("balance after fee: {}", entry.balance_after);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ledger;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use ledger::WalletLedger;
pub use models::{EntryDirection, EntryId, EntryKind, LedgerEntry, NewLedgerEntry, unique_key};

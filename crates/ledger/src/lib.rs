//! Colend Ledger - Ownership root of all value
//!
//! Every balance change in Colend goes through this crate.
//!
//! # Key Types
//! - `Account`: Deposit and borrow balances of one owner
//! - `AccountLedger`: Arena of accounts plus per-asset totals
//! - `LedgerTransaction`: Ordered postings applied atomically
//! - `Book`: Which side of an account a posting touches (deposit or borrow)
//!
//! The ledger enforces non-negative balances and conservation of totals.
//! It does not know about prices or solvency.

pub mod account;
pub mod error;
pub mod ledger;
pub mod transaction;

pub use account::{Account, Book};
pub use error::LedgerError;
pub use ledger::{AccountLedger, AssetTotals};
pub use transaction::{LedgerTransaction, Posting};

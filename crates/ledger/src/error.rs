//! Ledger errors

use crate::account::Book;
use colend_core::{AccountId, Amount, AssetId};
use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient {book} balance for {account} in {asset}: available {available}, required {required}")]
    InsufficientBalance {
        account: AccountId,
        asset: AssetId,
        book: Book,
        available: Amount,
        required: Amount,
    },

    #[error("Insufficient liquidity in {asset}: available {available}, required {required}")]
    InsufficientLiquidity {
        asset: AssetId,
        available: Amount,
        required: Amount,
    },

    #[error("Arithmetic overflow while adjusting {asset}")]
    Overflow { asset: AssetId },

    #[error("Conservation violated for {asset} {book}: total {total}, sum of accounts {sum}")]
    ConservationViolated {
        asset: AssetId,
        book: Book,
        total: Amount,
        sum: Amount,
    },
}

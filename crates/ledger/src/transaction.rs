//! Ledger transactions - ordered postings committed as one unit

use crate::account::Book;
use colend_core::{AccountId, AssetId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single signed change to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Posting {
    /// Change an account's deposit or borrow balance (and the matching total)
    Balance {
        account: AccountId,
        asset: AssetId,
        book: Book,
        delta: Decimal,
    },
    /// Change the tokens held by the protocol for an asset
    Cash { asset: AssetId, delta: Decimal },
}

/// Ordered postings that either all apply or none do.
///
/// A liquidation is one transaction touching two accounts, so the
/// borrower's loss and the liquidator's gain are never observable apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    postings: Vec<Posting>,
}

impl LedgerTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a deposit-balance posting
    pub fn deposit(self, account: &AccountId, asset: &AssetId, delta: Decimal) -> Self {
        self.balance(account, asset, Book::Deposit, delta)
    }

    /// Add a borrow-balance posting
    pub fn borrow(self, account: &AccountId, asset: &AssetId, delta: Decimal) -> Self {
        self.balance(account, asset, Book::Borrow, delta)
    }

    pub fn balance(mut self, account: &AccountId, asset: &AssetId, book: Book, delta: Decimal) -> Self {
        self.push(Posting::Balance {
            account: account.clone(),
            asset: asset.clone(),
            book,
            delta,
        });
        self
    }

    /// Add a protocol cash posting
    pub fn cash(mut self, asset: &AssetId, delta: Decimal) -> Self {
        self.push(Posting::Cash {
            asset: asset.clone(),
            delta,
        });
        self
    }

    pub fn push(&mut self, posting: Posting) {
        // Zero deltas carry no information and would create empty accounts
        let is_zero = match &posting {
            Posting::Balance { delta, .. } | Posting::Cash { delta, .. } => delta.is_zero(),
        };
        if !is_zero {
            self.postings.push(posting);
        }
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Accounts touched by this transaction
    pub fn accounts(&self) -> BTreeSet<&AccountId> {
        self.postings
            .iter()
            .filter_map(|p| match p {
                Posting::Balance { account, .. } => Some(account),
                Posting::Cash { .. } => None,
            })
            .collect()
    }
}

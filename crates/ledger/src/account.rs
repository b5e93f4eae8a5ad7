//! Ledger Account - balances of a single owner

use colend_core::{AccountId, Amount, AssetId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum_macros::{Display, EnumString};

/// The two balance books every account keeps per asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Book {
    /// Supplied collateral owed back to the account
    Deposit,
    /// Outstanding debt including accrued interest
    Borrow,
}

/// Deposit and borrow balances of one owner.
///
/// Zero balances are not stored, so iterating a book yields exactly the
/// non-zero positions in asset-handle order. An account with both books
/// empty is vacuous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    deposits: BTreeMap<AssetId, Amount>,
    borrows: BTreeMap<AssetId, Amount>,
}

impl Account {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            deposits: BTreeMap::new(),
            borrows: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn deposit_balance(&self, asset: &AssetId) -> Amount {
        self.balance(Book::Deposit, asset)
    }

    pub fn borrow_balance(&self, asset: &AssetId) -> Amount {
        self.balance(Book::Borrow, asset)
    }

    pub fn balance(&self, book: Book, asset: &AssetId) -> Amount {
        self.book(book).get(asset).copied().unwrap_or(Amount::ZERO)
    }

    /// Non-zero deposits in asset-handle order
    pub fn deposits(&self) -> impl Iterator<Item = (&AssetId, &Amount)> {
        self.deposits.iter()
    }

    /// Non-zero borrows in asset-handle order
    pub fn borrows(&self) -> impl Iterator<Item = (&AssetId, &Amount)> {
        self.borrows.iter()
    }

    pub fn has_debt(&self) -> bool {
        !self.borrows.is_empty()
    }

    /// Every asset in which this account holds a non-zero balance
    pub fn assets_with_balance(&self) -> BTreeSet<AssetId> {
        self.deposits.keys().chain(self.borrows.keys()).cloned().collect()
    }

    pub fn is_vacuous(&self) -> bool {
        self.deposits.is_empty() && self.borrows.is_empty()
    }

    fn book(&self, book: Book) -> &BTreeMap<AssetId, Amount> {
        match book {
            Book::Deposit => &self.deposits,
            Book::Borrow => &self.borrows,
        }
    }

    pub(crate) fn set_balance(&mut self, book: Book, asset: &AssetId, amount: Amount) {
        let map = match book {
            Book::Deposit => &mut self.deposits,
            Book::Borrow => &mut self.borrows,
        };
        if amount.is_zero() {
            map.remove(asset);
        } else {
            map.insert(asset.clone(), amount);
        }
    }
}

//! Account ledger - the arena of accounts and per-asset totals

use colend_core::{AccountId, Amount, AssetId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::account::{Account, Book};
use crate::error::LedgerError;
use crate::transaction::{LedgerTransaction, Posting};

/// Aggregate balances of one asset across all accounts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTotals {
    pub total_deposited: Amount,
    pub total_borrowed: Amount,
    /// Tokens physically held by the protocol
    pub cash: Amount,
}

impl AssetTotals {
    fn total(&self, book: Book) -> Amount {
        match book {
            Book::Deposit => self.total_deposited,
            Book::Borrow => self.total_borrowed,
        }
    }

    fn total_mut(&mut self, book: Book) -> &mut Amount {
        match book {
            Book::Deposit => &mut self.total_deposited,
            Book::Borrow => &mut self.total_borrowed,
        }
    }

    /// Interest income retained by the protocol: `cash + borrowed - deposited`
    pub fn reserves(&self) -> Decimal {
        self.cash.value() + self.total_borrowed.value() - self.total_deposited.value()
    }
}

/// Working-state key used while validating a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    Balance(AccountId, AssetId, Book),
    Total(AssetId, Book),
    Cash(AssetId),
}

/// Per-account balances and per-asset totals.
///
/// Accounts live in an arena indexed by handle; nothing outside the ledger
/// holds a mutable reference to an account.
#[derive(Debug, Clone, Default)]
pub struct AccountLedger {
    accounts: Vec<Account>,
    index: HashMap<AccountId, usize>,
    totals: BTreeMap<AssetId, AssetTotals>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.index.get(id).map(|&slot| &self.accounts[slot])
    }

    /// Current state of an account, or a vacuous one if it was never created
    pub fn account_or_empty(&self, id: &AccountId) -> Account {
        self.account(id)
            .cloned()
            .unwrap_or_else(|| Account::new(id.clone()))
    }

    /// Accounts in creation order
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn totals(&self, asset: &AssetId) -> AssetTotals {
        self.totals.get(asset).copied().unwrap_or_default()
    }

    fn slot_or_create(&mut self, id: &AccountId) -> usize {
        if let Some(&slot) = self.index.get(id) {
            return slot;
        }
        let slot = self.accounts.len();
        self.accounts.push(Account::new(id.clone()));
        self.index.insert(id.clone(), slot);
        slot
    }

    // === Primitives ===

    /// Add `delta` to an account's deposit balance and the asset's total.
    ///
    /// Fails with `InsufficientBalance` if the result would be negative.
    pub fn adjust_deposit(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        delta: Decimal,
    ) -> Result<Amount, LedgerError> {
        self.adjust_balance(account, asset, Book::Deposit, delta)
    }

    /// Add `delta` to an account's borrow balance and the asset's total.
    ///
    /// Fails with `InsufficientBalance` if the result would be negative.
    pub fn adjust_borrow(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        delta: Decimal,
    ) -> Result<Amount, LedgerError> {
        self.adjust_balance(account, asset, Book::Borrow, delta)
    }

    /// Add `delta` to the protocol's cash for `asset`
    pub fn adjust_cash(&mut self, asset: &AssetId, delta: Decimal) -> Result<Amount, LedgerError> {
        let totals = self.totals(asset);
        let cash = apply_cash(totals.cash, delta, asset)?;
        self.totals.entry(asset.clone()).or_default().cash = cash;
        Ok(cash)
    }

    fn adjust_balance(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        book: Book,
        delta: Decimal,
    ) -> Result<Amount, LedgerError> {
        let current = self
            .account(account)
            .map(|a| a.balance(book, asset))
            .unwrap_or(Amount::ZERO);
        let balance = apply_balance(current, delta, account, asset, book)?;
        let total = apply_total(self.totals(asset).total(book), delta, asset, book)?;

        // Both checks passed; nothing below can fail
        let slot = self.slot_or_create(account);
        self.accounts[slot].set_balance(book, asset, balance);
        *self.totals.entry(asset.clone()).or_default().total_mut(book) = total;
        Ok(balance)
    }

    // === Transactions ===

    /// Check that every posting of `tx` can be applied in order
    pub fn validate(&self, tx: &LedgerTransaction) -> Result<(), LedgerError> {
        let mut working: HashMap<Slot, Amount> = HashMap::new();

        for posting in tx.postings() {
            match posting {
                Posting::Balance {
                    account,
                    asset,
                    book,
                    delta,
                } => {
                    let key = Slot::Balance(account.clone(), asset.clone(), *book);
                    let current = working.get(&key).copied().unwrap_or_else(|| {
                        self.account(account)
                            .map(|a| a.balance(*book, asset))
                            .unwrap_or(Amount::ZERO)
                    });
                    working.insert(key, apply_balance(current, *delta, account, asset, *book)?);

                    let key = Slot::Total(asset.clone(), *book);
                    let current = working
                        .get(&key)
                        .copied()
                        .unwrap_or_else(|| self.totals(asset).total(*book));
                    working.insert(key, apply_total(current, *delta, asset, *book)?);
                }
                Posting::Cash { asset, delta } => {
                    let key = Slot::Cash(asset.clone());
                    let current = working
                        .get(&key)
                        .copied()
                        .unwrap_or_else(|| self.totals(asset).cash);
                    working.insert(key, apply_cash(current, *delta, asset)?);
                }
            }
        }

        Ok(())
    }

    /// Apply `tx` atomically: either every posting lands or none does
    pub fn commit(&mut self, tx: &LedgerTransaction) -> Result<(), LedgerError> {
        self.validate(tx)?;

        for posting in tx.postings() {
            match posting {
                Posting::Balance {
                    account,
                    asset,
                    book,
                    delta,
                } => {
                    self.adjust_balance(account, asset, *book, *delta)?;
                }
                Posting::Cash { asset, delta } => {
                    self.adjust_cash(asset, *delta)?;
                }
            }
        }

        Ok(())
    }

    /// The state `account` would have after `tx`, without touching the ledger
    pub fn project(&self, account: &AccountId, tx: &LedgerTransaction) -> Result<Account, LedgerError> {
        let mut projected = self.account_or_empty(account);

        for posting in tx.postings() {
            if let Posting::Balance {
                account: target,
                asset,
                book,
                delta,
            } = posting
            {
                if target != account {
                    continue;
                }
                let current = projected.balance(*book, asset);
                let balance = apply_balance(current, *delta, account, asset, *book)?;
                projected.set_balance(*book, asset, balance);
            }
        }

        Ok(projected)
    }

    /// Accounts with a non-zero borrow balance in `asset`, in creation order
    pub fn borrowers_of(&self, asset: &AssetId) -> Vec<(AccountId, Amount)> {
        self.accounts
            .iter()
            .filter_map(|a| {
                let debt = a.borrow_balance(asset);
                (!debt.is_zero()).then(|| (a.id().clone(), debt))
            })
            .collect()
    }

    /// Verify that every per-asset total equals the sum of account balances
    pub fn audit(&self) -> Result<(), LedgerError> {
        let mut sums: BTreeMap<(AssetId, Book), Decimal> = BTreeMap::new();

        for account in &self.accounts {
            for (asset, amount) in account.deposits() {
                *sums.entry((asset.clone(), Book::Deposit)).or_default() += amount.value();
            }
            for (asset, amount) in account.borrows() {
                *sums.entry((asset.clone(), Book::Borrow)).or_default() += amount.value();
            }
        }

        for (asset, totals) in &self.totals {
            for book in [Book::Deposit, Book::Borrow] {
                let sum = sums.remove(&(asset.clone(), book)).unwrap_or_default();
                let total = totals.total(book);
                if total.value() != sum {
                    return Err(LedgerError::ConservationViolated {
                        asset: asset.clone(),
                        book,
                        total,
                        sum: Amount::new(sum).unwrap_or(Amount::ZERO),
                    });
                }
            }
        }

        // A balance in an asset that has no totals entry at all
        if let Some(((asset, book), sum)) = sums.into_iter().find(|(_, sum)| !sum.is_zero()) {
            return Err(LedgerError::ConservationViolated {
                asset,
                book,
                total: Amount::ZERO,
                sum: Amount::new(sum).unwrap_or(Amount::ZERO),
            });
        }

        Ok(())
    }
}

fn apply_balance(
    current: Amount,
    delta: Decimal,
    account: &AccountId,
    asset: &AssetId,
    book: Book,
) -> Result<Amount, LedgerError> {
    let next = current
        .value()
        .checked_add(delta)
        .ok_or_else(|| LedgerError::Overflow { asset: asset.clone() })?;

    Amount::new(next).map_err(|_| LedgerError::InsufficientBalance {
        account: account.clone(),
        asset: asset.clone(),
        book,
        available: current,
        required: Amount::new(delta.abs()).unwrap_or(Amount::ZERO),
    })
}

fn apply_total(current: Amount, delta: Decimal, asset: &AssetId, book: Book) -> Result<Amount, LedgerError> {
    let next = current
        .value()
        .checked_add(delta)
        .ok_or_else(|| LedgerError::Overflow { asset: asset.clone() })?;

    // Unreachable while account balances stay non-negative
    Amount::new(next).map_err(|_| LedgerError::ConservationViolated {
        asset: asset.clone(),
        book,
        total: current,
        sum: Amount::ZERO,
    })
}

fn apply_cash(current: Amount, delta: Decimal, asset: &AssetId) -> Result<Amount, LedgerError> {
    let next = current
        .value()
        .checked_add(delta)
        .ok_or_else(|| LedgerError::Overflow { asset: asset.clone() })?;

    Amount::new(next).map_err(|_| LedgerError::InsufficientLiquidity {
        asset: asset.clone(),
        available: current,
        required: Amount::new(delta.abs()).unwrap_or(Amount::ZERO),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn id(owner: &str) -> AccountId {
        AccountId::new(owner).unwrap()
    }

    fn asset(code: &str) -> AssetId {
        AssetId::new(code).unwrap()
    }

    #[test]
    fn test_first_deposit_creates_account() {
        let mut ledger = AccountLedger::new();
        assert!(ledger.account(&id("ALICE")).is_none());

        let balance = ledger.adjust_deposit(&id("ALICE"), &asset("WETH"), dec!(100)).unwrap();
        assert_eq!(balance, Amount::from_units(100));
        assert_eq!(ledger.totals(&asset("WETH")).total_deposited, Amount::from_units(100));
        assert_eq!(ledger.account_count(), 1);
    }

    #[test]
    fn test_negative_result_rejected_without_mutation() {
        let mut ledger = AccountLedger::new();
        ledger.adjust_deposit(&id("ALICE"), &asset("WETH"), dec!(50)).unwrap();

        let result = ledger.adjust_deposit(&id("ALICE"), &asset("WETH"), dec!(-51));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { book: Book::Deposit, .. })
        ));
        assert_eq!(
            ledger.account(&id("ALICE")).unwrap().deposit_balance(&asset("WETH")),
            Amount::from_units(50)
        );
        assert_eq!(ledger.totals(&asset("WETH")).total_deposited, Amount::from_units(50));
    }

    #[test]
    fn test_negative_delta_on_missing_account() {
        let mut ledger = AccountLedger::new();
        let result = ledger.adjust_borrow(&id("GHOST"), &asset("DAI"), dec!(-1));
        assert!(result.is_err());
        assert_eq!(ledger.account_count(), 0);
    }

    #[test]
    fn test_commit_is_all_or_nothing() {
        let mut ledger = AccountLedger::new();
        ledger.adjust_deposit(&id("ALICE"), &asset("WETH"), dec!(10)).unwrap();
        ledger.adjust_cash(&asset("WETH"), dec!(10)).unwrap();

        // Second posting overdraws cash, so the first must not land either
        let tx = LedgerTransaction::new()
            .deposit(&id("ALICE"), &asset("WETH"), dec!(-5))
            .cash(&asset("WETH"), dec!(-15));

        let result = ledger.commit(&tx);
        assert!(matches!(result, Err(LedgerError::InsufficientLiquidity { .. })));
        assert_eq!(
            ledger.account(&id("ALICE")).unwrap().deposit_balance(&asset("WETH")),
            Amount::from_units(10)
        );
    }

    #[test]
    fn test_validate_tracks_running_balance() {
        let mut ledger = AccountLedger::new();
        ledger.adjust_deposit(&id("ALICE"), &asset("WETH"), dec!(10)).unwrap();

        // Two withdrawals of 6 each exceed the balance only together
        let tx = LedgerTransaction::new()
            .deposit(&id("ALICE"), &asset("WETH"), dec!(-6))
            .deposit(&id("ALICE"), &asset("WETH"), dec!(-6));
        assert!(ledger.validate(&tx).is_err());
    }

    #[test]
    fn test_two_account_transfer() {
        let mut ledger = AccountLedger::new();
        ledger.adjust_deposit(&id("ALICE"), &asset("WETH"), dec!(10)).unwrap();

        let tx = LedgerTransaction::new()
            .deposit(&id("ALICE"), &asset("WETH"), dec!(-4))
            .deposit(&id("BOB"), &asset("WETH"), dec!(4));
        ledger.commit(&tx).unwrap();

        assert_eq!(ledger.account(&id("BOB")).unwrap().deposit_balance(&asset("WETH")), Amount::from_units(4));
        assert_eq!(ledger.totals(&asset("WETH")).total_deposited, Amount::from_units(10));
        ledger.audit().unwrap();
    }

    #[test]
    fn test_project_does_not_mutate() {
        let mut ledger = AccountLedger::new();
        ledger.adjust_deposit(&id("ALICE"), &asset("WETH"), dec!(10)).unwrap();

        let tx = LedgerTransaction::new()
            .borrow(&id("ALICE"), &asset("DAI"), dec!(3))
            .deposit(&id("BOB"), &asset("WETH"), dec!(1));
        let projected = ledger.project(&id("ALICE"), &tx).unwrap();

        assert_eq!(projected.borrow_balance(&asset("DAI")), Amount::from_units(3));
        assert_eq!(projected.deposit_balance(&asset("WETH")), Amount::from_units(10));
        assert!(!ledger.account(&id("ALICE")).unwrap().has_debt());
        assert!(ledger.account(&id("BOB")).is_none());
    }

    #[test]
    fn test_reserves() {
        let totals = AssetTotals {
            total_deposited: Amount::from_units(100),
            total_borrowed: Amount::from_units(42),
            cash: Amount::from_units(60),
        };
        assert_eq!(totals.reserves(), dec!(2));
    }

    #[test]
    fn test_borrowers_of() {
        let mut ledger = AccountLedger::new();
        ledger.adjust_borrow(&id("ALICE"), &asset("DAI"), dec!(5)).unwrap();
        ledger.adjust_deposit(&id("BOB"), &asset("DAI"), dec!(5)).unwrap();
        ledger.adjust_borrow(&id("CAROL"), &asset("DAI"), dec!(7)).unwrap();

        let borrowers = ledger.borrowers_of(&asset("DAI"));
        assert_eq!(
            borrowers,
            vec![(id("ALICE"), Amount::from_units(5)), (id("CAROL"), Amount::from_units(7))]
        );
    }
}

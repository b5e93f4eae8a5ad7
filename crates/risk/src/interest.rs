//! Interest Accrual Module
//!
//! Adds one period of interest to every outstanding borrow of an asset.
//! Interest is rounded down to whole units and capitalized into the
//! borrow balance, so `borrow_balance` always includes accrued interest.

use colend_core::{AccountId, Amount, AssetId};
use colend_ledger::{AccountLedger, LedgerTransaction};
use colend_registry::SupportedAsset;
use rust_decimal::Decimal;

use crate::error::RiskError;

/// Interest charged for one accrual period on one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestAccrual {
    pub asset: AssetId,
    /// Per-borrower interest, omitting borrowers whose interest rounds to zero
    pub charges: Vec<(AccountId, Amount)>,
    pub total: Amount,
    pub transaction: LedgerTransaction,
}

/// Interest accrual calculator
#[derive(Debug, Default, Clone, Copy)]
pub struct InterestCalculator;

impl InterestCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Interest on `principal` for one period at the asset's borrow rate
    pub fn calculate_interest(&self, asset: &SupportedAsset, principal: Amount) -> Result<Amount, RiskError> {
        let interest = asset
            .borrow_rate()
            .apply(principal.value())
            .ok_or_else(|| RiskError::Overflow(asset.id.clone()))?
            .floor();
        Ok(Amount::new(interest).unwrap_or(Amount::ZERO))
    }

    /// Build the accrual transaction for every borrower of `asset`
    pub fn accrue(&self, asset: &SupportedAsset, ledger: &AccountLedger) -> Result<InterestAccrual, RiskError> {
        let mut charges = Vec::new();
        let mut total = Decimal::ZERO;
        let mut transaction = LedgerTransaction::new();

        for (account, principal) in ledger.borrowers_of(&asset.id) {
            let interest = self.calculate_interest(asset, principal)?;
            if interest.is_zero() {
                continue;
            }
            total = total
                .checked_add(interest.value())
                .ok_or_else(|| RiskError::Overflow(asset.id.clone()))?;
            transaction = transaction.borrow(&account, &asset.id, interest.value());
            charges.push((account, interest));
        }

        Ok(InterestAccrual {
            asset: asset.id.clone(),
            charges,
            total: Amount::new(total).unwrap_or(Amount::ZERO),
            transaction,
        })
    }
}

//! Liquidation engine for undercollateralized accounts
//!
//! A liquidator repays part of a borrower's debt in one asset and receives
//! collateral worth the repaid value plus the seized asset's liquidation bonus.
//! Collateral comes from a single deposit per call: the one with the highest
//! market value. If that deposit cannot cover the full value it is seized
//! entirely and the result is flagged as a bonus shortfall.

use colend_core::{AccountId, Amount, AssetId};
use colend_ledger::{AccountLedger, LedgerTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::health::Position;
use crate::solvency::{value_of, SolvencyEngine};

/// Fully evaluated liquidation, ready to commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPlan {
    pub liquidator: AccountId,
    pub account: AccountId,
    /// Debt asset being repaid
    pub repay_asset: AssetId,
    pub repay_amount: Amount,
    /// `repay_amount * price * (1 + bonus of the seized asset)`, or just the
    /// repaid value when there was no collateral to seize
    pub seize_value: Decimal,
    /// None when the account had no collateral left
    pub seized_asset: Option<AssetId>,
    pub seized_amount: Amount,
    /// Market value of `seized_amount` at snapshot prices
    pub seized_value: Decimal,
    /// True when collateral ran out before covering `seize_value`
    pub bonus_shortfall: bool,
    /// Borrower position before the liquidation
    pub position_before: Position,
    /// Two-account transaction implementing the liquidation
    pub transaction: LedgerTransaction,
}

/// Stateless liquidation planner
#[derive(Debug, Default, Clone, Copy)]
pub struct LiquidationEngine;

impl LiquidationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate a liquidation request and build its transaction.
    ///
    /// Checks, in order: distinct parties, positive repay amount, registered
    /// debt asset, borrower strictly below health 1.0, repay amount within
    /// the borrower's debt.
    pub fn plan(
        &self,
        solvency: &SolvencyEngine<'_>,
        ledger: &AccountLedger,
        liquidator: &AccountId,
        account: &AccountId,
        repay_asset: &AssetId,
        repay_amount: Amount,
    ) -> Result<LiquidationPlan, RiskError> {
        if liquidator == account {
            return Err(RiskError::SelfLiquidation(account.clone()));
        }
        if repay_amount.is_zero() {
            return Err(RiskError::InvalidAmount("repay amount must be positive".to_string()));
        }

        solvency.registry().get(repay_asset)?;
        let borrower = ledger.account_or_empty(account);
        let position_before = solvency.assert_liquidatable(&borrower)?;

        let debt = borrower.borrow_balance(repay_asset);
        if repay_amount > debt {
            return Err(RiskError::ExceedsDebt {
                account: account.clone(),
                asset: repay_asset.clone(),
                debt,
                requested: repay_amount,
            });
        }

        let debt_price = solvency.prices().price(repay_asset)?;
        let repaid_value = value_of(repay_amount.value(), debt_price, repay_asset)?;

        let mut transaction = LedgerTransaction::new()
            .borrow(account, repay_asset, -repay_amount.value())
            .cash(repay_asset, repay_amount.value());

        let Some(target) = position_before.largest_collateral().cloned() else {
            tracing::warn!(account = %account, "Liquidation found no collateral to seize");
            return Ok(LiquidationPlan {
                liquidator: liquidator.clone(),
                account: account.clone(),
                repay_asset: repay_asset.clone(),
                repay_amount,
                seize_value: repaid_value,
                seized_asset: None,
                seized_amount: Amount::ZERO,
                seized_value: Decimal::ZERO,
                bonus_shortfall: true,
                position_before,
                transaction,
            });
        };

        // The bonus is the seized collateral's, not the debt asset's
        let seize_value = solvency
            .registry()
            .get(&target.asset)?
            .liquidation_bonus()
            .apply_bonus(repaid_value)
            .ok_or_else(|| RiskError::Overflow(target.asset.clone()))?;

        let (seized_amount, bonus_shortfall) = if target.market_value < seize_value {
            (target.amount, true)
        } else {
            (units_worth(seize_value, target.price, &target.asset)?.min(target.amount), false)
        };
        let seized_value = value_of(seized_amount.value(), target.price, &target.asset)?;

        transaction = transaction
            .deposit(account, &target.asset, -seized_amount.value())
            .deposit(liquidator, &target.asset, seized_amount.value());

        Ok(LiquidationPlan {
            liquidator: liquidator.clone(),
            account: account.clone(),
            repay_asset: repay_asset.clone(),
            repay_amount,
            seize_value,
            seized_asset: Some(target.asset),
            seized_amount,
            seized_value,
            bonus_shortfall,
            position_before,
            transaction,
        })
    }
}

/// Largest whole number of units whose value does not exceed `value`
fn units_worth(value: Decimal, price: Decimal, asset: &AssetId) -> Result<Amount, RiskError> {
    let exact = value
        .checked_div(price)
        .ok_or_else(|| RiskError::Overflow(asset.clone()))?;
    let invalid = || RiskError::InvalidAmount(format!("negative seize amount for {}", asset));
    let units = Amount::new(exact).map_err(|_| invalid())?.floor();

    // Division rounds at 28 digits; never hand out more than `value`
    if value_of(units.value(), price, asset)? > value {
        return units.checked_sub(&Amount::from_units(1)).ok_or_else(invalid);
    }
    Ok(units)
}

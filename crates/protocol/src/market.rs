//! Market - the synchronous lending state machine
//!
//! Owns the asset registry and the account ledger. Every mutating call is
//! split in two: a `prepare_*` method validates the request against one
//! [`PriceSnapshot`] and returns a [`Transition`] without touching state,
//! then [`Market::apply`] lands it. Callers publish the transition's event
//! between the two steps, so a rejected event leaves the market unchanged.

use colend_core::{AccountId, Amount, AssetId};
use colend_events::{EventDraft, EventKind};
use colend_ledger::{AccountLedger, AssetTotals, LedgerTransaction};
use colend_oracle::PriceSnapshot;
use colend_registry::{AssetParams, AssetRegistry, SupportedAsset};
use colend_risk::{HealthFactor, InterestCalculator, LiquidationEngine, Position, RiskError, SolvencyEngine};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;

use crate::error::ProtocolError;

/// State change produced by a successful `prepare_*` call
#[derive(Debug, Clone)]
pub enum Change {
    /// Balance movements
    Ledger(LedgerTransaction),
    /// Registry state to install (admin calls)
    Registry(AssetRegistry),
}

/// A validated operation waiting for its event to be published
#[derive(Debug, Clone)]
pub struct Transition<T = ()> {
    pub change: Change,
    pub event: EventDraft,
    pub output: T,
}

/// Outcome of a liquidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidationResult {
    /// Collateral asset taken from the borrower, if it had any
    pub seized_asset: Option<AssetId>,
    pub seized_amount: Amount,
    /// True when the seized collateral was worth less than repaid debt plus bonus
    pub bonus_shortfall: bool,
    pub repaid_amount: Amount,
    /// Borrower health after the liquidation
    pub health_after: HealthFactor,
}

/// Registry listing together with the asset's ledger totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub listing: SupportedAsset,
    pub totals: AssetTotals,
    pub reserves: Decimal,
}

#[derive(Debug, Clone)]
pub struct Market {
    registry: AssetRegistry,
    ledger: AccountLedger,
    liquidation: LiquidationEngine,
    interest: InterestCalculator,
}

impl Market {
    /// Genesis: an empty registry administered by `admin` and an empty ledger
    pub fn new(admin: AccountId) -> Self {
        Self {
            registry: AssetRegistry::new(admin),
            ledger: AccountLedger::new(),
            liquidation: LiquidationEngine::new(),
            interest: InterestCalculator::new(),
        }
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    pub fn asset_info(&self, asset: &AssetId) -> Result<AssetInfo, ProtocolError> {
        let listing = self.registry.get(asset)?.clone();
        let totals = self.ledger.totals(asset);
        Ok(AssetInfo {
            listing,
            reserves: totals.reserves(),
            totals,
        })
    }

    pub fn deposit_balance(&self, account: &AccountId, asset: &AssetId) -> Amount {
        self.ledger
            .account(account)
            .map(|a| a.deposit_balance(asset))
            .unwrap_or(Amount::ZERO)
    }

    pub fn borrow_balance(&self, account: &AccountId, asset: &AssetId) -> Amount {
        self.ledger
            .account(account)
            .map(|a| a.borrow_balance(asset))
            .unwrap_or(Amount::ZERO)
    }

    /// Assets an operation on `accounts` involving `asset` needs prices for
    pub fn price_scope(&self, accounts: &[&AccountId], asset: Option<&AssetId>) -> BTreeSet<AssetId> {
        let mut scope: BTreeSet<AssetId> = accounts
            .iter()
            .filter_map(|id| self.ledger.account(id))
            .flat_map(|a| a.assets_with_balance())
            .collect();
        scope.extend(asset.cloned());
        scope
    }

    // === Queries ===

    pub fn position(&self, account: &AccountId, prices: &PriceSnapshot) -> Result<Position, ProtocolError> {
        let solvency = SolvencyEngine::new(&self.registry, prices);
        Ok(solvency.position(&self.ledger.account_or_empty(account))?)
    }

    pub fn health(&self, account: &AccountId, prices: &PriceSnapshot) -> Result<HealthFactor, ProtocolError> {
        let solvency = SolvencyEngine::new(&self.registry, prices);
        Ok(solvency.compute_health(&self.ledger.account_or_empty(account))?)
    }

    /// Conservation check over the whole ledger
    pub fn audit(&self) -> Result<(), ProtocolError> {
        Ok(self.ledger.audit()?)
    }

    // === Administration ===

    pub fn prepare_register(
        &self,
        caller: &AccountId,
        asset: &AssetId,
        params: AssetParams,
    ) -> Result<Transition, ProtocolError> {
        let mut registry = self.registry.clone();
        let index = registry.register_asset(caller, asset.clone(), params)?.registration_index;

        let event = EventDraft::new(EventKind::AssetRegistered)
            .account(caller)
            .metadata("asset", json!(asset.as_str()))
            .metadata("registration_index", json!(index))
            .metadata("params", params_json(&params));
        Ok(Transition {
            change: Change::Registry(registry),
            event,
            output: (),
        })
    }

    pub fn prepare_update_parameters(
        &self,
        caller: &AccountId,
        asset: &AssetId,
        params: AssetParams,
    ) -> Result<Transition, ProtocolError> {
        let mut registry = self.registry.clone();
        registry.update_parameters(caller, asset, params)?;

        let event = EventDraft::new(EventKind::ParametersUpdated)
            .account(caller)
            .metadata("asset", json!(asset.as_str()))
            .metadata("params", params_json(&params));
        Ok(Transition {
            change: Change::Registry(registry),
            event,
            output: (),
        })
    }

    pub fn prepare_deactivate(&self, caller: &AccountId, asset: &AssetId) -> Result<Transition, ProtocolError> {
        let mut registry = self.registry.clone();
        registry.deactivate(caller, asset)?;

        let event = EventDraft::new(EventKind::AssetDeactivated)
            .account(caller)
            .metadata("asset", json!(asset.as_str()));
        Ok(Transition {
            change: Change::Registry(registry),
            event,
            output: (),
        })
    }

    /// Capitalize one period of interest into every borrow of `asset`.
    ///
    /// Not health-gated: accrual may leave accounts liquidatable.
    pub fn prepare_accrue_interest(
        &self,
        caller: &AccountId,
        asset: &AssetId,
    ) -> Result<Transition<Amount>, ProtocolError> {
        self.registry.authorize(caller)?;
        let listing = self.registry.get(asset)?;

        let accrual = self.interest.accrue(listing, &self.ledger)?;
        self.ledger.validate(&accrual.transaction)?;

        let event = EventDraft::new(EventKind::InterestAccrued)
            .account(caller)
            .leg(asset, accrual.total)
            .metadata("borrow_rate_bps", json!(listing.borrow_rate().get()))
            .metadata("borrowers", json!(accrual.charges.len()));
        Ok(Transition {
            change: Change::Ledger(accrual.transaction),
            event,
            output: accrual.total,
        })
    }

    // === Account operations ===

    /// Deposit never needs prices; health is reported when the snapshot allows
    pub fn prepare_deposit(
        &self,
        account: &AccountId,
        asset: &AssetId,
        amount: Amount,
        prices: &PriceSnapshot,
    ) -> Result<Transition, ProtocolError> {
        require_units(amount, "deposit amount")?;
        self.registry.require_active(asset)?;

        let tx = LedgerTransaction::new()
            .deposit(account, asset, amount.value())
            .cash(asset, amount.value());
        self.ledger.validate(&tx)?;

        let health = self.best_effort_health(account, &tx, prices)?;
        let event = EventDraft::new(EventKind::Deposit)
            .account(account)
            .leg(asset, amount)
            .health(health);
        Ok(Transition {
            change: Change::Ledger(tx),
            event,
            output: (),
        })
    }

    /// Withdraw is allowed from inactive assets; only the post-state health gates it
    pub fn prepare_withdraw(
        &self,
        account: &AccountId,
        asset: &AssetId,
        amount: Amount,
        prices: &PriceSnapshot,
    ) -> Result<Transition, ProtocolError> {
        require_units(amount, "withdraw amount")?;
        self.registry.get(asset)?;

        let tx = LedgerTransaction::new()
            .deposit(account, asset, -amount.value())
            .cash(asset, -amount.value());
        self.ledger.validate(&tx)?;

        let health = self.assert_healthy_after(account, &tx, prices)?;
        let event = EventDraft::new(EventKind::Withdraw)
            .account(account)
            .leg(asset, amount)
            .health(Some(health));
        Ok(Transition {
            change: Change::Ledger(tx),
            event,
            output: (),
        })
    }

    pub fn prepare_borrow(
        &self,
        account: &AccountId,
        asset: &AssetId,
        amount: Amount,
        prices: &PriceSnapshot,
    ) -> Result<Transition, ProtocolError> {
        require_units(amount, "borrow amount")?;
        self.registry.require_active(asset)?;

        let tx = LedgerTransaction::new()
            .borrow(account, asset, amount.value())
            .cash(asset, -amount.value());
        self.ledger.validate(&tx)?;

        let health = self.assert_healthy_after(account, &tx, prices)?;
        let event = EventDraft::new(EventKind::Borrow)
            .account(account)
            .leg(asset, amount)
            .health(Some(health));
        Ok(Transition {
            change: Change::Ledger(tx),
            event,
            output: (),
        })
    }

    pub fn prepare_repay(
        &self,
        account: &AccountId,
        asset: &AssetId,
        amount: Amount,
        prices: &PriceSnapshot,
    ) -> Result<Transition, ProtocolError> {
        require_units(amount, "repay amount")?;
        self.registry.get(asset)?;

        let debt = self.borrow_balance(account, asset);
        if amount > debt {
            return Err(RiskError::ExceedsDebt {
                account: account.clone(),
                asset: asset.clone(),
                debt,
                requested: amount,
            }
            .into());
        }

        let tx = LedgerTransaction::new()
            .borrow(account, asset, -amount.value())
            .cash(asset, amount.value());
        self.ledger.validate(&tx)?;

        let health = self.best_effort_health(account, &tx, prices)?;
        let event = EventDraft::new(EventKind::Repay)
            .account(account)
            .leg(asset, amount)
            .health(health);
        Ok(Transition {
            change: Change::Ledger(tx),
            event,
            output: (),
        })
    }

    /// Repay part of an unhealthy account's debt in exchange for collateral.
    ///
    /// The liquidator pays `repay_amount` of `asset` from outside the
    /// protocol and receives the seized collateral as a deposit.
    pub fn prepare_liquidate(
        &self,
        liquidator: &AccountId,
        account: &AccountId,
        asset: &AssetId,
        repay_amount: Amount,
        prices: &PriceSnapshot,
    ) -> Result<Transition<LiquidationResult>, ProtocolError> {
        require_units(repay_amount, "repay amount")?;

        let solvency = SolvencyEngine::new(&self.registry, prices);
        let plan = self
            .liquidation
            .plan(&solvency, &self.ledger, liquidator, account, asset, repay_amount)?;
        self.ledger.validate(&plan.transaction)?;

        let borrower_after = self.ledger.project(account, &plan.transaction)?;
        let health_after = solvency.compute_health(&borrower_after)?;

        let result = LiquidationResult {
            seized_asset: plan.seized_asset.clone(),
            seized_amount: plan.seized_amount,
            bonus_shortfall: plan.bonus_shortfall,
            repaid_amount: plan.repay_amount,
            health_after,
        };

        let mut event = EventDraft::new(EventKind::Liquidate)
            .account(account)
            .counterparty(liquidator)
            .leg(asset, plan.repay_amount);
        if let Some(seized) = &plan.seized_asset {
            event = event.leg(seized, plan.seized_amount);
        }
        let event = event
            .health(Some(health_after))
            .metadata("health_before", json!(plan.position_before.health))
            .metadata("seize_value", json!(plan.seize_value.to_string()))
            .metadata("seized_value", json!(plan.seized_value.to_string()))
            .metadata("bonus_shortfall", json!(plan.bonus_shortfall));

        Ok(Transition {
            change: Change::Ledger(plan.transaction),
            event,
            output: result,
        })
    }

    /// Land a prepared transition
    pub fn apply(&mut self, change: Change) -> Result<(), ProtocolError> {
        match change {
            Change::Ledger(tx) => self.ledger.commit(&tx)?,
            Change::Registry(registry) => self.registry = registry,
        }
        Ok(())
    }

    fn assert_healthy_after(
        &self,
        account: &AccountId,
        tx: &LedgerTransaction,
        prices: &PriceSnapshot,
    ) -> Result<HealthFactor, ProtocolError> {
        let projected = self.ledger.project(account, tx)?;
        let solvency = SolvencyEngine::new(&self.registry, prices);
        Ok(solvency.assert_healthy(&projected)?)
    }

    /// Post-state health, or None when some balance cannot be priced
    fn best_effort_health(
        &self,
        account: &AccountId,
        tx: &LedgerTransaction,
        prices: &PriceSnapshot,
    ) -> Result<Option<HealthFactor>, ProtocolError> {
        let projected = self.ledger.project(account, tx)?;
        let solvency = SolvencyEngine::new(&self.registry, prices);
        match solvency.compute_health(&projected) {
            Ok(health) => Ok(Some(health)),
            Err(RiskError::Price(e)) => {
                tracing::debug!(account = %account, error = %e, "Health not reported");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Public amounts are positive whole numbers of smallest units
fn require_units(amount: Amount, what: &str) -> Result<(), ProtocolError> {
    if amount.is_zero() {
        return Err(ProtocolError::InvalidParameter(format!("{what} must be positive")));
    }
    if !amount.is_whole() {
        return Err(ProtocolError::InvalidParameter(format!(
            "{what} must be a whole number of units, got {amount}"
        )));
    }
    Ok(())
}

fn params_json(params: &AssetParams) -> serde_json::Value {
    json!({
        "collateral_factor_bps": params.collateral_factor.get(),
        "liquidation_bonus_bps": params.liquidation_bonus.get(),
        "borrow_rate_bps": params.borrow_rate.get(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rust_decimal_macros::dec;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn asset(s: &str) -> AssetId {
        AssetId::new(s).unwrap()
    }

    fn run<T>(market: &mut Market, result: Result<Transition<T>, ProtocolError>) -> T {
        let transition = result.unwrap();
        market.apply(transition.change).unwrap();
        transition.output
    }

    /// X (cf 75%, bonus 5%) and Y (cf 0%), both priced at 1
    fn setup() -> (Market, PriceSnapshot) {
        let admin = id("ADMIN");
        let mut market = Market::new(admin.clone());
        let register_x = market.prepare_register(&admin, &asset("X"), AssetParams::new(7500, 500).unwrap());
        run(&mut market, register_x);
        let register_y = market.prepare_register(&admin, &asset("Y"), AssetParams::new(0, 0).unwrap());
        run(&mut market, register_y);

        let prices = PriceSnapshot::from_values([(asset("X"), dec!(1)), (asset("Y"), dec!(1))]);
        (market, prices)
    }

    #[test]
    fn test_prepare_does_not_mutate() {
        let (market, prices) = setup();
        let transition = market
            .prepare_deposit(&id("ALICE"), &asset("X"), Amount::from_units(100), &prices)
            .unwrap();

        assert_eq!(transition.event.kind, EventKind::Deposit);
        assert_eq!(market.deposit_balance(&id("ALICE"), &asset("X")), Amount::ZERO);
        assert_eq!(market.ledger().totals(&asset("X")).cash, Amount::ZERO);
    }

    #[test]
    fn test_deposit_then_borrow_at_limit() {
        let (mut market, prices) = setup();
        let alice = id("ALICE");
        let bob = id("BOB");

        let t = market.prepare_deposit(&bob, &asset("Y"), Amount::from_units(1000), &prices);
        run(&mut market, t);
        let t = market.prepare_deposit(&alice, &asset("X"), Amount::from_units(1000), &prices);
        run(&mut market, t);

        let t = market.prepare_borrow(&alice, &asset("Y"), Amount::from_units(750), &prices);
        run(&mut market, t);
        assert_eq!(market.health(&alice, &prices).unwrap(), HealthFactor::Finite(dec!(1)));

        let err = market
            .prepare_borrow(&alice, &asset("Y"), Amount::from_units(1), &prices)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientCollateral);
    }

    #[test]
    fn test_amount_validation() {
        let (market, prices) = setup();
        let alice = id("ALICE");

        let err = market
            .prepare_deposit(&alice, &asset("X"), Amount::ZERO, &prices)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let fractional = Amount::new(dec!(1.5)).unwrap();
        let err = market
            .prepare_deposit(&alice, &asset("X"), fractional, &prices)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_deposit_reports_no_health_without_prices() {
        let (market, _) = setup();
        let transition = market
            .prepare_deposit(&id("ALICE"), &asset("X"), Amount::from_units(10), &PriceSnapshot::from_values([]))
            .unwrap();
        assert_eq!(transition.event.health, None);
    }

    #[test]
    fn test_repay_more_than_debt() {
        let (mut market, prices) = setup();
        let alice = id("ALICE");

        let t = market.prepare_deposit(&id("BOB"), &asset("Y"), Amount::from_units(100), &prices);
        run(&mut market, t);
        let t = market.prepare_deposit(&alice, &asset("X"), Amount::from_units(100), &prices);
        run(&mut market, t);
        let t = market.prepare_borrow(&alice, &asset("Y"), Amount::from_units(10), &prices);
        run(&mut market, t);

        let err = market
            .prepare_repay(&alice, &asset("Y"), Amount::from_units(11), &prices)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExceedsDebt);
    }

    #[test]
    fn test_admin_changes_install_new_registry() {
        let (mut market, _) = setup();
        let t = market.prepare_deactivate(&id("ADMIN"), &asset("X"));
        run(&mut market, t);
        assert!(!market.registry().get(&asset("X")).unwrap().is_active);

        let err = market.prepare_deactivate(&id("MALLORY"), &asset("Y")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_asset_info_reports_totals() {
        let (mut market, prices) = setup();
        let t = market.prepare_deposit(&id("ALICE"), &asset("X"), Amount::from_units(40), &prices);
        run(&mut market, t);

        let info = market.asset_info(&asset("X")).unwrap();
        assert_eq!(info.totals.total_deposited, Amount::from_units(40));
        assert_eq!(info.totals.cash, Amount::from_units(40));
        assert_eq!(info.reserves, Decimal::ZERO);
        assert_eq!(info.listing.registration_index, 0);
    }
}

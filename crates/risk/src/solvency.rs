//! Solvency engine - values positions and gates mutations

use colend_core::AssetId;
use colend_ledger::Account;
use colend_oracle::PriceSnapshot;
use colend_registry::AssetRegistry;
use rust_decimal::Decimal;

use crate::error::RiskError;
use crate::health::{CollateralEntry, HealthFactor, Position};

/// Values accounts against one registry state and one price snapshot.
///
/// Callers hand it the *projected* account for deposit, withdraw, borrow and
/// repay, so the check always applies to the post-transition state.
pub struct SolvencyEngine<'a> {
    registry: &'a AssetRegistry,
    prices: &'a PriceSnapshot,
}

impl<'a> SolvencyEngine<'a> {
    pub fn new(registry: &'a AssetRegistry, prices: &'a PriceSnapshot) -> Self {
        Self { registry, prices }
    }

    pub fn registry(&self) -> &'a AssetRegistry {
        self.registry
    }

    pub fn prices(&self) -> &'a PriceSnapshot {
        self.prices
    }

    /// Value every non-zero balance of `account`.
    ///
    /// Fails with a price error if any balance cannot be priced.
    pub fn position(&self, account: &Account) -> Result<Position, RiskError> {
        let mut collateral = Vec::new();
        let mut total_collateral_value = Decimal::ZERO;
        let mut total_borrow_value = Decimal::ZERO;

        for (asset, amount) in account.deposits() {
            let listing = self.registry.get(asset)?;
            let price = self.prices.price(asset)?;
            let market_value = value_of(amount.value(), price, asset)?;
            let adjusted_value = listing
                .collateral_factor()
                .apply(market_value)
                .ok_or_else(|| RiskError::Overflow(asset.clone()))?;

            total_collateral_value = total_collateral_value
                .checked_add(adjusted_value)
                .ok_or_else(|| RiskError::Overflow(asset.clone()))?;
            collateral.push(CollateralEntry {
                asset: asset.clone(),
                amount: *amount,
                price,
                market_value,
                adjusted_value,
                registration_index: listing.registration_index,
            });
        }

        for (asset, amount) in account.borrows() {
            self.registry.get(asset)?;
            let price = self.prices.price(asset)?;
            total_borrow_value = total_borrow_value
                .checked_add(value_of(amount.value(), price, asset)?)
                .ok_or_else(|| RiskError::Overflow(asset.clone()))?;
        }

        collateral.sort_by_key(|c| c.registration_index);

        Ok(Position {
            total_collateral_value,
            total_borrow_value,
            health: HealthFactor::from_values(total_collateral_value, total_borrow_value),
            collateral,
        })
    }

    /// Health factor of `account`; `Infinite` when it has no debt.
    ///
    /// A debt-free account is not priced at all, so it stays queryable and
    /// withdrawable while its deposits' feeds are down.
    pub fn compute_health(&self, account: &Account) -> Result<HealthFactor, RiskError> {
        if !account.has_debt() {
            return Ok(HealthFactor::Infinite);
        }
        Ok(self.position(account)?.health)
    }

    /// Fail with `InsufficientCollateral` unless the account is healthy
    pub fn assert_healthy(&self, account: &Account) -> Result<HealthFactor, RiskError> {
        if !account.has_debt() {
            return Ok(HealthFactor::Infinite);
        }
        let position = self.position(account)?;
        if !position.is_healthy() {
            return Err(RiskError::InsufficientCollateral {
                account: account.id().clone(),
                collateral_value: position.total_collateral_value,
                borrow_value: position.total_borrow_value,
            });
        }
        Ok(position.health)
    }

    /// Fail with `AccountHealthy` unless health is strictly below 1.0
    pub fn assert_liquidatable(&self, account: &Account) -> Result<Position, RiskError> {
        let position = self.position(account)?;
        if !position.is_liquidatable() {
            return Err(RiskError::AccountHealthy {
                account: account.id().clone(),
                health: position.health,
            });
        }
        Ok(position)
    }
}

pub(crate) fn value_of(amount: Decimal, price: Decimal, asset: &AssetId) -> Result<Decimal, RiskError> {
    amount
        .checked_mul(price)
        .ok_or_else(|| RiskError::Overflow(asset.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use colend_core::AccountId;
    use colend_ledger::AccountLedger;
    use colend_oracle::OracleError;
    use colend_registry::AssetParams;
    use rust_decimal_macros::dec;

    fn id(owner: &str) -> AccountId {
        AccountId::new(owner).unwrap()
    }

    fn asset(code: &str) -> AssetId {
        AssetId::new(code).unwrap()
    }

    fn registry() -> AssetRegistry {
        let admin = id("ADMIN");
        let mut registry = AssetRegistry::new(admin.clone());
        registry
            .register_asset(&admin, asset("X"), AssetParams::new(7500, 500).unwrap())
            .unwrap();
        registry
            .register_asset(&admin, asset("Y"), AssetParams::new(0, 500).unwrap())
            .unwrap();
        registry
    }

    fn account(deposit_x: i64, borrow_y: i64) -> Account {
        let mut ledger = AccountLedger::new();
        ledger.adjust_deposit(&id("ALICE"), &asset("X"), Decimal::from(deposit_x)).unwrap();
        ledger.adjust_borrow(&id("ALICE"), &asset("Y"), Decimal::from(borrow_y)).unwrap();
        ledger.account_or_empty(&id("ALICE"))
    }

    #[test]
    fn test_collateral_discounted_by_factor() {
        let registry = registry();
        let prices = PriceSnapshot::from_values(vec![(asset("X"), dec!(1)), (asset("Y"), dec!(1))]);
        let engine = SolvencyEngine::new(&registry, &prices);

        let position = engine.position(&account(1000, 700)).unwrap();
        assert_eq!(position.total_collateral_value, dec!(750));
        assert_eq!(position.total_borrow_value, dec!(700));
        assert!(position.is_healthy());
        assert_eq!(position.health.value().unwrap().round_dp(3), dec!(1.071));
    }

    #[test]
    fn test_assert_healthy_rejects_breach() {
        let registry = registry();
        let prices = PriceSnapshot::from_values(vec![(asset("X"), dec!(1)), (asset("Y"), dec!(1))]);
        let engine = SolvencyEngine::new(&registry, &prices);

        let result = engine.assert_healthy(&account(1000, 760));
        assert!(matches!(result, Err(RiskError::InsufficientCollateral { .. })));
    }

    #[test]
    fn test_assert_liquidatable_at_exactly_one() {
        let registry = registry();
        let prices = PriceSnapshot::from_values(vec![(asset("X"), dec!(1)), (asset("Y"), dec!(1))]);
        let engine = SolvencyEngine::new(&registry, &prices);

        let result = engine.assert_liquidatable(&account(1000, 750));
        assert!(matches!(result, Err(RiskError::AccountHealthy { .. })));
        assert!(engine.assert_liquidatable(&account(1000, 751)).is_ok());
    }

    #[test]
    fn test_missing_price_fails_closed() {
        let registry = registry();
        let prices = PriceSnapshot::from_values(vec![(asset("X"), dec!(1))]);
        let engine = SolvencyEngine::new(&registry, &prices);

        let result = engine.compute_health(&account(1000, 1));
        assert!(matches!(result, Err(RiskError::Price(OracleError::Unavailable { .. }))));
    }

    #[test]
    fn test_no_debt_is_infinite() {
        let registry = registry();
        let prices = PriceSnapshot::from_values(vec![(asset("X"), dec!(1))]);
        let engine = SolvencyEngine::new(&registry, &prices);

        assert_eq!(engine.compute_health(&account(10, 0)).unwrap(), HealthFactor::Infinite);
    }

    #[test]
    fn test_no_debt_needs_no_prices() {
        let registry = registry();
        let prices = PriceSnapshot::from_values(Vec::<(AssetId, Decimal)>::new());
        let engine = SolvencyEngine::new(&registry, &prices);
        let lender = account(100, 0);

        assert_eq!(engine.compute_health(&lender).unwrap(), HealthFactor::Infinite);
        assert_eq!(engine.assert_healthy(&lender).unwrap(), HealthFactor::Infinite);
        // A full valuation still needs every price
        assert!(matches!(engine.position(&lender), Err(RiskError::Price(_))));
    }
}

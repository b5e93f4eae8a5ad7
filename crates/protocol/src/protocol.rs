//! Lending protocol facade - public entry points
//!
//! Flow of every mutating call:
//! Snapshot prices → Prepare (validate) → Seal event → Publish → Apply
//!
//! Prices are captured once per call, so every check inside an operation
//! sees the same quotes. Nothing is applied unless the sink accepted the event.

use chrono::Utc;
use colend_core::{AccountId, Amount, AssetId};
use colend_events::{EventSink, LendingEvent, GENESIS_HASH};
use colend_oracle::{PriceOracle, PriceSnapshot};
use colend_registry::AssetParams;
use colend_risk::{HealthFactor, Position};
use std::sync::Arc;

use crate::config::ProtocolConfig;
use crate::error::ProtocolError;
use crate::market::{AssetInfo, LiquidationResult, Market, Transition};

pub struct LendingProtocol {
    market: Market,
    oracle: Arc<dyn PriceOracle>,
    sink: Box<dyn EventSink>,
    config: ProtocolConfig,
    last_sequence: u64,
    last_hash: String,
}

impl LendingProtocol {
    /// Genesis: an empty market administered by `admin`
    pub fn new(
        admin: AccountId,
        oracle: Arc<dyn PriceOracle>,
        sink: Box<dyn EventSink>,
        config: ProtocolConfig,
    ) -> Self {
        Self {
            market: Market::new(admin),
            oracle,
            sink,
            config,
            last_sequence: 0,
            last_hash: GENESIS_HASH.to_string(),
        }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Sequence of the last published event (0 before the first)
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    // === Administration ===

    pub fn register_asset(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        collateral_factor_bps: u32,
        liquidation_bonus_bps: u32,
    ) -> Result<(), ProtocolError> {
        let prepared = AssetParams::new(collateral_factor_bps, liquidation_bonus_bps)
            .map_err(ProtocolError::from)
            .and_then(|params| self.market.prepare_register(caller, asset, params));
        self.finish("register_asset", prepared)
    }

    /// Register with a full parameter set, including the borrow rate
    pub fn register_with_params(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        params: AssetParams,
    ) -> Result<(), ProtocolError> {
        let prepared = self.market.prepare_register(caller, asset, params);
        self.finish("register_asset", prepared)
    }

    pub fn update_parameters(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        params: AssetParams,
    ) -> Result<(), ProtocolError> {
        let prepared = self.market.prepare_update_parameters(caller, asset, params);
        self.finish("update_parameters", prepared)
    }

    pub fn deactivate(&mut self, caller: &AccountId, asset: &AssetId) -> Result<(), ProtocolError> {
        let prepared = self.market.prepare_deactivate(caller, asset);
        self.finish("deactivate", prepared)
    }

    /// Charge one period of interest on `asset`; returns the total charged
    pub fn accrue_interest(&mut self, caller: &AccountId, asset: &AssetId) -> Result<Amount, ProtocolError> {
        let prepared = self.market.prepare_accrue_interest(caller, asset);
        self.finish("accrue_interest", prepared)
    }

    // === Account operations ===

    pub async fn deposit(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), ProtocolError> {
        let prices = self.snapshot(&[account], Some(asset)).await;
        let prepared = self.market.prepare_deposit(account, asset, amount, &prices);
        self.finish("deposit", prepared)
    }

    pub async fn withdraw(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), ProtocolError> {
        let prices = self.snapshot(&[account], Some(asset)).await;
        let prepared = self.market.prepare_withdraw(account, asset, amount, &prices);
        self.finish("withdraw", prepared)
    }

    pub async fn borrow(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), ProtocolError> {
        let prices = self.snapshot(&[account], Some(asset)).await;
        let prepared = self.market.prepare_borrow(account, asset, amount, &prices);
        self.finish("borrow", prepared)
    }

    pub async fn repay(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), ProtocolError> {
        let prices = self.snapshot(&[account], Some(asset)).await;
        let prepared = self.market.prepare_repay(account, asset, amount, &prices);
        self.finish("repay", prepared)
    }

    pub async fn liquidate(
        &mut self,
        liquidator: &AccountId,
        account: &AccountId,
        asset: &AssetId,
        repay_amount: Amount,
    ) -> Result<LiquidationResult, ProtocolError> {
        let prices = self.snapshot(&[account], Some(asset)).await;
        let prepared = self
            .market
            .prepare_liquidate(liquidator, account, asset, repay_amount, &prices);
        let result = self.finish("liquidate", prepared)?;

        tracing::info!(
            liquidator = %liquidator,
            account = %account,
            repaid = %result.repaid_amount,
            seized_asset = ?result.seized_asset,
            seized_amount = %result.seized_amount,
            bonus_shortfall = result.bonus_shortfall,
            health_after = %result.health_after,
            "Liquidation executed"
        );
        Ok(result)
    }

    // === Queries ===

    pub async fn get_health(&self, account: &AccountId) -> Result<HealthFactor, ProtocolError> {
        let prices = self.snapshot(&[account], None).await;
        self.market.health(account, &prices)
    }

    pub async fn position(&self, account: &AccountId) -> Result<Position, ProtocolError> {
        let prices = self.snapshot(&[account], None).await;
        self.market.position(account, &prices)
    }

    pub fn asset_info(&self, asset: &AssetId) -> Result<AssetInfo, ProtocolError> {
        self.market.asset_info(asset)
    }

    pub fn deposit_balance(&self, account: &AccountId, asset: &AssetId) -> Amount {
        self.market.deposit_balance(account, asset)
    }

    pub fn borrow_balance(&self, account: &AccountId, asset: &AssetId) -> Amount {
        self.market.borrow_balance(account, asset)
    }

    pub fn audit(&self) -> Result<(), ProtocolError> {
        self.market.audit()
    }

    // === Internals ===

    async fn snapshot(&self, accounts: &[&AccountId], asset: Option<&AssetId>) -> PriceSnapshot {
        let scope = self.market.price_scope(accounts, asset);
        PriceSnapshot::capture(self.oracle.as_ref(), scope, self.config.max_price_age()).await
    }

    /// Publish the event of a prepared transition, then apply it
    fn finish<T>(
        &mut self,
        operation: &'static str,
        prepared: Result<Transition<T>, ProtocolError>,
    ) -> Result<T, ProtocolError> {
        let transition = match prepared {
            Ok(transition) => transition,
            Err(e) => {
                tracing::warn!(operation, kind = %e.kind(), error = %e, "Operation rejected");
                return Err(e);
            }
        };

        let event = transition
            .event
            .seal(self.last_sequence + 1, &self.last_hash, Utc::now());
        if let Err(e) = self.sink.publish(&event) {
            tracing::warn!(operation, sequence = event.sequence, error = %e, "Event publish failed");
            return Err(e.into());
        }

        // The sink now holds this event, so the chain head moves even if apply fails.
        self.record(operation, &event);
        if let Err(e) = self.market.apply(transition.change) {
            tracing::error!(operation, sequence = event.sequence, error = %e, "Published event failed to apply");
            return Err(e);
        }
        Ok(transition.output)
    }

    fn record(&mut self, operation: &'static str, event: &LendingEvent) {
        self.last_sequence = event.sequence;
        self.last_hash = event.hash.clone();
        tracing::debug!(
            operation,
            sequence = event.sequence,
            account = ?event.account,
            "Operation committed"
        );
    }
}

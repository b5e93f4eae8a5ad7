//! Mock Oracle for testing
//!
//! Provides configurable fixed prices and injectable feed failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use colend_core::AssetId;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use crate::error::OracleError;
use crate::types::{Price, PriceOracle};

/// Mock Price Oracle for testing
///
/// Stores fixed prices that can be updated programmatically.
#[derive(Default)]
pub struct MockOracle {
    prices: RwLock<HashMap<AssetId, Price>>,
    failing: RwLock<HashSet<AssetId>>,
}

impl MockOracle {
    /// Create a new empty mock oracle
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a price observed now
    pub fn set_price(&self, asset: AssetId, value: Decimal) {
        self.set_price_at(asset, value, Utc::now());
    }

    /// Set a price with an explicit observation time (for staleness tests)
    pub fn set_price_at(&self, asset: AssetId, value: Decimal, as_of: DateTime<Utc>) {
        let price = Price::observed_at(asset.clone(), value, as_of, "mock");
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.insert(asset, price);
    }

    /// Remove a price (for asset-not-found errors)
    pub fn remove_price(&self, asset: &AssetId) {
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.remove(asset);
    }

    /// Make every lookup for `asset` fail until [`MockOracle::recover`] is called
    pub fn fail(&self, asset: AssetId) {
        let mut failing = self.failing.write().unwrap_or_else(PoisonError::into_inner);
        failing.insert(asset);
    }

    pub fn recover(&self, asset: &AssetId) {
        let mut failing = self.failing.write().unwrap_or_else(PoisonError::into_inner);
        failing.remove(asset);
    }

    /// Get number of configured prices
    pub fn price_count(&self) -> usize {
        self.prices.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn get_price(&self, asset: &AssetId) -> Result<Price, OracleError> {
        let failing = self.failing.read().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(asset) {
            return Err(OracleError::ConnectionFailed {
                source: format!("mock feed for {} is down", asset).into(),
            });
        }

        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        prices
            .get(asset)
            .cloned()
            .ok_or_else(|| OracleError::AssetNotFound {
                asset: asset.clone(),
            })
    }

    async fn supported_assets(&self) -> Vec<AssetId> {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        let mut assets: Vec<_> = prices.keys().cloned().collect();
        assets.sort();
        assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn asset(code: &str) -> AssetId {
        AssetId::new(code).unwrap()
    }

    #[tokio::test]
    async fn test_mock_oracle_set_price() {
        let oracle = MockOracle::new();

        assert!(oracle.get_price(&asset("DOGE")).await.is_err());

        oracle.set_price(asset("DOGE"), dec!(0.08));

        let price = oracle.get_price(&asset("DOGE")).await.unwrap();
        assert_eq!(price.value, dec!(0.08));
        assert_eq!(price.source, "mock");
    }

    #[tokio::test]
    async fn test_mock_oracle_asset_not_found() {
        let oracle = MockOracle::new();

        let result = oracle.get_price(&asset("UNKNOWN")).await;
        assert!(matches!(result, Err(OracleError::AssetNotFound { .. })));
    }

    #[tokio::test]
    async fn test_mock_oracle_failure_injection() {
        let oracle = MockOracle::new();
        oracle.set_price(asset("WETH"), dec!(3000));
        oracle.fail(asset("WETH"));

        let result = oracle.get_price(&asset("WETH")).await;
        assert!(matches!(result, Err(OracleError::ConnectionFailed { .. })));

        oracle.recover(&asset("WETH"));
        assert!(oracle.get_price(&asset("WETH")).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_oracle_supported_assets_sorted() {
        let oracle = MockOracle::new();
        oracle.set_price(asset("WETH"), dec!(3000));
        oracle.set_price(asset("DAI"), dec!(1));

        let assets = oracle.supported_assets().await;
        assert_eq!(assets, vec![asset("DAI"), asset("WETH")]);
        assert_eq!(oracle.price_count(), 2);
    }
}

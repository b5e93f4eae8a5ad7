//! Core oracle types

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use colend_core::AssetId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::OracleError;

/// Value of one smallest unit of an asset in the common unit of account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// The priced asset
    pub asset: AssetId,
    /// Price per smallest unit; must be positive to be usable
    pub value: Decimal,
    /// Freshness marker: when the feed observed this value
    pub as_of: DateTime<Utc>,
    /// Source of the price (e.g., "mock", "chainlink")
    pub source: String,
}

impl Price {
    /// Create a price observed now
    pub fn new(asset: AssetId, value: Decimal, source: impl Into<String>) -> Self {
        Self::observed_at(asset, value, Utc::now(), source)
    }

    /// Create a price with an explicit observation time
    pub fn observed_at(
        asset: AssetId,
        value: Decimal,
        as_of: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            asset,
            value,
            as_of,
            source: source.into(),
        }
    }

    /// Check if the price is older than `max_age` relative to `now`
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.as_of) > max_age
    }
}

/// Price Oracle trait - the injected price capability
///
/// Implementations can be:
/// - MockOracle: For testing with fixed prices
/// - Adapters over on-chain or exchange feeds living outside this workspace
///
/// An implementation signals failure with an error; it must never substitute
/// a default value.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Get the current price of one asset
    async fn get_price(&self, asset: &AssetId) -> Result<Price, OracleError>;

    /// Get prices for several assets at once
    async fn get_prices(&self, assets: &[AssetId]) -> Vec<Result<Price, OracleError>> {
        let mut results = Vec::with_capacity(assets.len());
        for asset in assets {
            results.push(self.get_price(asset).await);
        }
        results
    }

    /// Assets this feed can price
    async fn supported_assets(&self) -> Vec<AssetId>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_staleness() {
        let now = Utc::now();
        let asset = AssetId::new("WETH").unwrap();
        let price = Price::observed_at(asset, dec!(3000), now - Duration::seconds(120), "test");

        assert!(price.is_stale(Duration::seconds(60), now));
        assert!(!price.is_stale(Duration::seconds(120), now));
    }
}

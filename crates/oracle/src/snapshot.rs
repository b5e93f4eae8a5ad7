//! Point-in-time price snapshots
//!
//! One snapshot is taken per operation and every valuation inside that
//! operation reads from it. Nothing is re-fetched mid-operation.

use chrono::{DateTime, Duration, Utc};
use colend_core::AssetId;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::OracleError;
use crate::types::{Price, PriceOracle};

/// A captured quote for one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quote {
    /// Usable price
    Fresh(Price),
    /// The feed failed, returned a non-positive value, or was stale
    Unavailable { reason: String },
}

/// Immutable set of quotes captured at a single instant
#[derive(Debug, Clone)]
pub struct PriceSnapshot {
    taken_at: DateTime<Utc>,
    quotes: BTreeMap<AssetId, Quote>,
}

impl PriceSnapshot {
    /// Empty snapshot taken at `taken_at`
    pub fn empty(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            quotes: BTreeMap::new(),
        }
    }

    /// Build a snapshot from fixed `(asset, value)` pairs, all observed now.
    ///
    /// Values are still validated, so a non-positive value yields an
    /// unavailable quote.
    pub fn from_values(values: impl IntoIterator<Item = (AssetId, Decimal)>) -> Self {
        let mut snapshot = Self::empty(Utc::now());
        for (asset, value) in values {
            let price = Price::observed_at(asset, value, snapshot.taken_at, "fixed");
            snapshot.record(Ok(price), Duration::zero());
        }
        snapshot
    }

    /// Query the oracle once for every asset in `assets`.
    ///
    /// Duplicates are collapsed; failures are recorded as unavailable quotes
    /// rather than returned, so the caller only fails if it actually needs
    /// the missing price.
    pub async fn capture(
        oracle: &dyn PriceOracle,
        assets: impl IntoIterator<Item = AssetId>,
        max_age: Duration,
    ) -> Self {
        let wanted: Vec<AssetId> = assets.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let mut snapshot = Self::empty(Utc::now());

        let results = oracle.get_prices(&wanted).await;
        for (asset, result) in wanted.into_iter().zip(results) {
            match result {
                Ok(price) if price.asset == asset => snapshot.record(Ok(price), max_age),
                Ok(price) => snapshot.mark_unavailable(
                    asset,
                    format!("feed answered for {}", price.asset),
                ),
                Err(e) => {
                    tracing::warn!(asset = %asset, error = %e, "Price lookup failed");
                    snapshot.mark_unavailable(asset, e.to_string());
                }
            }
        }

        snapshot
    }

    fn record(&mut self, result: Result<Price, OracleError>, max_age: Duration) {
        match result {
            Ok(price) if price.value <= Decimal::ZERO => {
                let reason = format!("non-positive value {}", price.value);
                self.mark_unavailable(price.asset, reason);
            }
            Ok(price) if price.is_stale(max_age, self.taken_at) => {
                let reason = format!(
                    "stale since {} (max age {}s)",
                    price.as_of,
                    max_age.num_seconds()
                );
                self.mark_unavailable(price.asset, reason);
            }
            Ok(price) => {
                self.quotes.insert(price.asset.clone(), Quote::Fresh(price));
            }
            Err(e) => {
                if let Some(asset) = e.asset().cloned() {
                    self.mark_unavailable(asset, e.to_string());
                }
            }
        }
    }

    /// Record `asset` as unpriceable
    pub fn mark_unavailable(&mut self, asset: AssetId, reason: impl Into<String>) {
        self.quotes.insert(
            asset,
            Quote::Unavailable {
                reason: reason.into(),
            },
        );
    }

    /// Price of one smallest unit of `asset`, failing closed when unusable
    pub fn price(&self, asset: &AssetId) -> Result<Decimal, OracleError> {
        match self.quotes.get(asset) {
            Some(Quote::Fresh(price)) => Ok(price.value),
            Some(Quote::Unavailable { reason }) => Err(OracleError::Unavailable {
                asset: asset.clone(),
                reason: reason.clone(),
            }),
            None => Err(OracleError::Unavailable {
                asset: asset.clone(),
                reason: "not captured in snapshot".to_string(),
            }),
        }
    }

    pub fn quote(&self, asset: &AssetId) -> Option<&Quote> {
        self.quotes.get(asset)
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Assets with a usable quote
    pub fn priced_assets(&self) -> impl Iterator<Item = &AssetId> {
        self.quotes.iter().filter_map(|(asset, quote)| match quote {
            Quote::Fresh(_) => Some(asset),
            Quote::Unavailable { .. } => None,
        })
    }
}

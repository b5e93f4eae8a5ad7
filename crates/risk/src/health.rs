//! Position valuation and health factor

use colend_core::{Amount, AssetId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Ratio of risk-adjusted collateral value to borrow value.
///
/// `Infinite` means the account has no debt and is maximally healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthFactor {
    Finite(Decimal),
    Infinite,
}

impl HealthFactor {
    pub fn from_values(collateral_value: Decimal, borrow_value: Decimal) -> Self {
        if borrow_value.is_zero() {
            return HealthFactor::Infinite;
        }
        HealthFactor::Finite(
            collateral_value
                .checked_div(borrow_value)
                .unwrap_or(Decimal::MAX),
        )
    }

    /// The finite ratio, or None for an account without debt
    pub fn value(&self) -> Option<Decimal> {
        match self {
            HealthFactor::Finite(v) => Some(*v),
            HealthFactor::Infinite => None,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, HealthFactor::Infinite)
    }
}

impl PartialOrd for HealthFactor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HealthFactor {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (HealthFactor::Infinite, HealthFactor::Infinite) => Ordering::Equal,
            (HealthFactor::Infinite, HealthFactor::Finite(_)) => Ordering::Greater,
            (HealthFactor::Finite(_), HealthFactor::Infinite) => Ordering::Less,
            (HealthFactor::Finite(a), HealthFactor::Finite(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthFactor::Finite(v) => write!(f, "{}", v.round_dp(6)),
            HealthFactor::Infinite => f.write_str("inf"),
        }
    }
}

/// Valuation of one deposited asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralEntry {
    pub asset: AssetId,
    pub amount: Amount,
    pub price: Decimal,
    /// `amount * price`
    pub market_value: Decimal,
    /// `market_value * collateral_factor`
    pub adjusted_value: Decimal,
    pub registration_index: usize,
}

/// Derived snapshot of an account's solvency. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub total_collateral_value: Decimal,
    pub total_borrow_value: Decimal,
    pub health: HealthFactor,
    /// Deposits in registration order
    pub collateral: Vec<CollateralEntry>,
}

impl Position {
    /// Healthy iff collateral value covers borrow value.
    ///
    /// Compared directly rather than through the rounded ratio.
    pub fn is_healthy(&self) -> bool {
        self.health.is_infinite() || self.total_collateral_value >= self.total_borrow_value
    }

    /// Strictly below 1.0
    pub fn is_liquidatable(&self) -> bool {
        !self.is_healthy()
    }

    /// Deposit with the highest market value.
    ///
    /// Ties go to the earlier registered asset, then to the lower handle.
    pub fn largest_collateral(&self) -> Option<&CollateralEntry> {
        self.collateral.iter().min_by(|a, b| {
            b.market_value
                .cmp(&a.market_value)
                .then(a.registration_index.cmp(&b.registration_index))
                .then(a.asset.cmp(&b.asset))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(code: &str, market_value: Decimal, registration_index: usize) -> CollateralEntry {
        CollateralEntry {
            asset: AssetId::new(code).unwrap(),
            amount: Amount::from_units(1),
            price: market_value,
            market_value,
            adjusted_value: market_value,
            registration_index,
        }
    }

    #[test]
    fn test_health_factor_no_debt_is_infinite() {
        assert_eq!(HealthFactor::from_values(dec!(100), Decimal::ZERO), HealthFactor::Infinite);
        assert_eq!(HealthFactor::Infinite.to_string(), "inf");
    }

    #[test]
    fn test_health_factor_ordering() {
        let low = HealthFactor::Finite(dec!(0.5));
        let one = HealthFactor::Finite(Decimal::ONE);
        assert!(low < one);
        assert!(one < HealthFactor::Infinite);
    }

    #[test]
    fn test_exactly_one_is_healthy() {
        let position = Position {
            total_collateral_value: dec!(700),
            total_borrow_value: dec!(700),
            health: HealthFactor::from_values(dec!(700), dec!(700)),
            collateral: vec![],
        };
        assert!(position.is_healthy());
        assert!(!position.is_liquidatable());
        assert_eq!(position.health, HealthFactor::Finite(Decimal::ONE));
    }

    #[test]
    fn test_debt_free_position_is_healthy() {
        let position = Position {
            total_collateral_value: Decimal::ZERO,
            total_borrow_value: Decimal::ZERO,
            health: HealthFactor::Infinite,
            collateral: vec![],
        };
        assert!(position.health.is_infinite());
        assert!(position.is_healthy());
        assert!(!position.is_liquidatable());
    }

    #[test]
    fn test_largest_collateral_tie_break() {
        let position = Position {
            total_collateral_value: Decimal::ZERO,
            total_borrow_value: Decimal::ZERO,
            health: HealthFactor::Infinite,
            collateral: vec![entry("WBTC", dec!(50), 0), entry("WETH", dec!(80), 2), entry("DAI", dec!(80), 1)],
        };

        let largest = position.largest_collateral().unwrap();
        assert_eq!(largest.asset.as_str(), "DAI");
    }
}

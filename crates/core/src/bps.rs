//! Basis points - integer percentages scaled by 10_000

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Basis points out of range: {0} (max {max})", max = BasisPoints::MAX)]
pub struct BpsOutOfRange(pub u32);

/// A fraction expressed in basis points (1 bps = 0.01%).
///
/// # Invariant
/// The inner value is always within `0..=10_000`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BasisPoints(u32);

impl BasisPoints {
    /// 100%
    pub const MAX: u32 = 10_000;

    pub const ZERO: Self = Self(0);
    pub const ONE_HUNDRED_PERCENT: Self = Self(Self::MAX);

    pub fn new(bps: u32) -> Result<Self, BpsOutOfRange> {
        if bps > Self::MAX {
            Err(BpsOutOfRange(bps))
        } else {
            Ok(Self(bps))
        }
    }

    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Exact decimal fraction, e.g. 7500 bps -> 0.75
    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }

    /// `value * bps / 10_000`, exact in decimal arithmetic
    pub fn apply(&self, value: Decimal) -> Option<Decimal> {
        value.checked_mul(self.as_fraction())
    }

    /// `value * (1 + bps / 10_000)`
    pub fn apply_bonus(&self, value: Decimal) -> Option<Decimal> {
        value.checked_mul(Decimal::ONE + self.as_fraction())
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

impl TryFrom<u32> for BasisPoints {
    type Error = BpsOutOfRange;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BasisPoints> for u32 {
    fn from(bps: BasisPoints) -> Self {
        bps.0
    }
}

//! Supported asset records

use colend_core::{AssetId, BasisPoints};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Risk parameters of a supported asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParams {
    /// Share of the deposit value counted toward borrowing power
    pub collateral_factor: BasisPoints,
    /// Extra value a liquidator receives on top of the repaid debt
    pub liquidation_bonus: BasisPoints,
    /// Interest added to outstanding debt per accrual period
    #[serde(default)]
    pub borrow_rate: BasisPoints,
}

impl AssetParams {
    /// Validate raw basis point inputs.
    ///
    /// Borrow rate starts at zero; set it with [`AssetParams::with_borrow_rate`].
    pub fn new(collateral_factor_bps: u32, liquidation_bonus_bps: u32) -> Result<Self, RegistryError> {
        Ok(Self {
            collateral_factor: bps("collateral_factor_bps", collateral_factor_bps)?,
            liquidation_bonus: bps("liquidation_bonus_bps", liquidation_bonus_bps)?,
            borrow_rate: BasisPoints::ZERO,
        })
    }

    pub fn with_borrow_rate(mut self, borrow_rate_bps: u32) -> Result<Self, RegistryError> {
        self.borrow_rate = bps("borrow_rate_bps", borrow_rate_bps)?;
        Ok(self)
    }
}

fn bps(name: &'static str, value: u32) -> Result<BasisPoints, RegistryError> {
    BasisPoints::new(value).map_err(|_| RegistryError::InvalidParameter { name, value })
}

/// An asset the protocol accepts for deposit and borrow.
///
/// Never removed once registered; deactivation only blocks new deposits
/// and borrows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedAsset {
    pub id: AssetId,
    pub params: AssetParams,
    pub is_active: bool,
    /// Position in registration order, starting at 0
    pub registration_index: usize,
}

impl SupportedAsset {
    pub fn collateral_factor(&self) -> BasisPoints {
        self.params.collateral_factor
    }

    pub fn liquidation_bonus(&self) -> BasisPoints {
        self.params.liquidation_bonus
    }

    pub fn borrow_rate(&self) -> BasisPoints {
        self.params.borrow_rate
    }
}

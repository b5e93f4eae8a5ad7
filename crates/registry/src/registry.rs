//! Asset registry implementation

use colend_core::{AccountId, AssetId};
use std::collections::HashMap;

use crate::asset::{AssetParams, SupportedAsset};
use crate::error::RegistryError;

/// Registry of supported assets.
///
/// Assets are kept in registration order; lookups go through a handle index.
/// All reads are pure functions of the stored parameters.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    admin: AccountId,
    assets: Vec<SupportedAsset>,
    index: HashMap<AssetId, usize>,
}

impl AssetRegistry {
    /// Create an empty registry administered by `admin`
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            assets: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn admin(&self) -> &AccountId {
        &self.admin
    }

    /// Fail with `Unauthorized` unless `caller` is the admin
    pub fn authorize(&self, caller: &AccountId) -> Result<(), RegistryError> {
        if caller != &self.admin {
            return Err(RegistryError::Unauthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Register a new asset, making it eligible for deposit and borrow
    pub fn register_asset(
        &mut self,
        caller: &AccountId,
        asset: AssetId,
        params: AssetParams,
    ) -> Result<&SupportedAsset, RegistryError> {
        self.authorize(caller)?;

        if self.index.contains_key(&asset) {
            return Err(RegistryError::AlreadyRegistered(asset));
        }

        let registration_index = self.assets.len();
        self.index.insert(asset.clone(), registration_index);
        self.assets.push(SupportedAsset {
            id: asset,
            params,
            is_active: true,
            registration_index,
        });

        let registered = &self.assets[registration_index];
        tracing::info!(
            asset = %registered.id,
            collateral_factor = %registered.params.collateral_factor,
            liquidation_bonus = %registered.params.liquidation_bonus,
            "Asset registered"
        );
        Ok(registered)
    }

    /// Replace the risk parameters of a registered asset.
    ///
    /// Only affects positions evaluated after the call.
    pub fn update_parameters(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        params: AssetParams,
    ) -> Result<&SupportedAsset, RegistryError> {
        self.authorize(caller)?;
        let slot = self.slot(asset)?;

        let entry = &mut self.assets[slot];
        entry.params = params;
        tracing::info!(asset = %entry.id, params = ?entry.params, "Asset parameters updated");
        Ok(entry)
    }

    /// Block new deposits and borrows. Existing balances stay valid.
    pub fn deactivate(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
    ) -> Result<&SupportedAsset, RegistryError> {
        self.authorize(caller)?;
        let slot = self.slot(asset)?;

        let entry = &mut self.assets[slot];
        entry.is_active = false;
        tracing::info!(asset = %entry.id, "Asset deactivated");
        Ok(entry)
    }

    fn slot(&self, asset: &AssetId) -> Result<usize, RegistryError> {
        self.index
            .get(asset)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(asset.clone()))
    }

    /// Look up a registered asset (active or not)
    pub fn get(&self, asset: &AssetId) -> Result<&SupportedAsset, RegistryError> {
        Ok(&self.assets[self.slot(asset)?])
    }

    /// Look up an asset that accepts new deposits and borrows
    pub fn require_active(&self, asset: &AssetId) -> Result<&SupportedAsset, RegistryError> {
        let entry = self.get(asset)?;
        if !entry.is_active {
            return Err(RegistryError::Inactive(asset.clone()));
        }
        Ok(entry)
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.index.contains_key(asset)
    }

    /// Iterate assets in registration order
    pub fn iter(&self) -> impl Iterator<Item = &SupportedAsset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

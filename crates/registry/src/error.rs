//! Registry errors

use colend_core::{AccountId, AssetId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Asset already registered: {0}")]
    AlreadyRegistered(AssetId),

    #[error("Asset not registered: {0}")]
    NotFound(AssetId),

    #[error("Asset is inactive: {0}")]
    Inactive(AssetId),

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: u32 },

    #[error("{caller} is not the registry admin")]
    Unauthorized { caller: AccountId },
}

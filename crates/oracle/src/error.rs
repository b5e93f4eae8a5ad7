//! Oracle error types

use colend_core::AssetId;
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Error)]
pub enum OracleError {
    /// The feed has no price for this asset
    #[error("No price feed for {asset}")]
    AssetNotFound { asset: AssetId },

    /// Price data is older than the configured threshold
    #[error("Stale price for {asset}: last update was {as_of}, threshold is {threshold_secs}s")]
    StalePrice {
        asset: AssetId,
        as_of: String,
        threshold_secs: i64,
    },

    /// Price data is invalid
    #[error("Invalid price for {asset}: {reason}")]
    InvalidPrice { asset: AssetId, reason: String },

    /// A snapshot was asked for an asset it could not price
    #[error("Price unavailable for {asset}: {reason}")]
    Unavailable { asset: AssetId, reason: String },

    /// External oracle connection failed
    #[error("Oracle connection failed: {source}")]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl OracleError {
    /// The asset this error concerns, if any
    pub fn asset(&self) -> Option<&AssetId> {
        match self {
            OracleError::AssetNotFound { asset }
            | OracleError::StalePrice { asset, .. }
            | OracleError::InvalidPrice { asset, .. }
            | OracleError::Unavailable { asset, .. } => Some(asset),
            OracleError::ConnectionFailed { .. } => None,
        }
    }
}

//! Colend Asset Registry
//!
//! Tracks which assets are accepted as collateral and borrowable, and the
//! risk parameters that apply to them. The registry is an explicit value
//! created at genesis and mutated only through admin-gated calls.

pub mod asset;
pub mod error;
pub mod registry;

pub use asset::{AssetParams, SupportedAsset};
pub use error::RegistryError;
pub use registry::AssetRegistry;

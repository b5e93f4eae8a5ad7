//! Colend Core - Domain types
//!
//! This crate contains the fundamental types used across Colend:
//! - `Amount`: Non-negative decimal wrapper for token quantities
//! - `AssetId` / `AccountId`: Validated identity handles
//! - `BasisPoints`: Integer percentages (collateral factor, bonus, rates)

pub mod amount;
pub mod asset;
pub mod bps;

pub use amount::{Amount, AmountError};
pub use asset::{AccountId, AssetId, HandleError};
pub use bps::{BasisPoints, BpsOutOfRange};

//! Colend Risk Engines - Pre-commit gatekeepers
//!
//! Nothing in this crate mutates the ledger. Engines read the registry, a
//! price snapshot and (projected) account state, and either reject an
//! operation or hand back the ledger transaction that implements it.

pub mod error;
pub mod health;
pub mod interest;
pub mod liquidation;
pub mod solvency;

pub use error::RiskError;
pub use health::{CollateralEntry, HealthFactor, Position};
pub use interest::{InterestAccrual, InterestCalculator};
pub use liquidation::{LiquidationEngine, LiquidationPlan};
pub use solvency::SolvencyEngine;

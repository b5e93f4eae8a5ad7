//! Colend Price Oracle
//!
//! The lending core never computes prices. It consumes them through the
//! [`PriceOracle`] capability and freezes them into a [`PriceSnapshot`] at the
//! start of every operation. A quote that fails, is non-positive, or is stale
//! is unusable and every consumer must fail closed on it.

mod error;
mod mock;
mod snapshot;
mod types;

pub use error::OracleError;
pub use mock::MockOracle;
pub use snapshot::{PriceSnapshot, Quote};
pub use types::{Price, PriceOracle};

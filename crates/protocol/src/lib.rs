//! Colend Protocol - public entry points and CLI orchestrator
//!
//! [`Market`] is the synchronous state machine over the registry and the
//! ledger. [`LendingProtocol`] wraps it with price snapshots from a
//! [`colend_oracle::PriceOracle`] and event publication, and is what callers
//! (and the `colend` binary) use.

pub mod commands;
pub mod config;
pub mod error;
pub mod market;
pub mod protocol;

pub use config::ProtocolConfig;
pub use error::{ErrorKind, ProtocolError};
pub use market::{AssetInfo, Change, LiquidationResult, Market, Transition};
pub use protocol::LendingProtocol;

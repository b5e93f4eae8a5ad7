//! Protocol errors and the caller-facing error taxonomy

use colend_events::EventError;
use colend_ledger::LedgerError;
use colend_oracle::OracleError;
use colend_registry::RegistryError;
use colend_risk::RiskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Price(#[from] OracleError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error("Event sink rejected the operation: {0}")]
    Event(#[from] EventError),
}

/// Stable classification of every failure a public entry point can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    /// Asset unregistered, or inactive for new deposits and borrows
    NotFound,
    InsufficientBalance,
    InsufficientCollateral,
    AccountHealthy,
    ExceedsDebt,
    PriceUnavailable,
    InsufficientLiquidity,
    Unauthorized,
    Overflow,
    EventSink,
    InvariantViolation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            ProtocolError::Registry(e) => registry_kind(e),
            ProtocolError::Price(_) => ErrorKind::PriceUnavailable,
            ProtocolError::Ledger(e) => ledger_kind(e),
            ProtocolError::Risk(e) => risk_kind(e),
            ProtocolError::Event(_) => ErrorKind::EventSink,
        }
    }
}

fn registry_kind(error: &RegistryError) -> ErrorKind {
    match error {
        RegistryError::AlreadyRegistered(_) | RegistryError::InvalidParameter { .. } => {
            ErrorKind::InvalidParameter
        }
        RegistryError::NotFound(_) | RegistryError::Inactive(_) => ErrorKind::NotFound,
        RegistryError::Unauthorized { .. } => ErrorKind::Unauthorized,
    }
}

fn ledger_kind(error: &LedgerError) -> ErrorKind {
    match error {
        LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
        LedgerError::InsufficientLiquidity { .. } => ErrorKind::InsufficientLiquidity,
        LedgerError::Overflow { .. } => ErrorKind::Overflow,
        LedgerError::ConservationViolated { .. } => ErrorKind::InvariantViolation,
    }
}

fn risk_kind(error: &RiskError) -> ErrorKind {
    match error {
        RiskError::InsufficientCollateral { .. } => ErrorKind::InsufficientCollateral,
        RiskError::AccountHealthy { .. } => ErrorKind::AccountHealthy,
        RiskError::ExceedsDebt { .. } => ErrorKind::ExceedsDebt,
        RiskError::InvalidAmount(_) | RiskError::SelfLiquidation(_) => ErrorKind::InvalidParameter,
        RiskError::Overflow(_) => ErrorKind::Overflow,
        RiskError::Price(_) => ErrorKind::PriceUnavailable,
        RiskError::Registry(e) => registry_kind(e),
        RiskError::Ledger(e) => ledger_kind(e),
    }
}

//! Risk engine errors

use colend_core::{AccountId, Amount, AssetId};
use colend_ledger::LedgerError;
use colend_oracle::OracleError;
use colend_registry::RegistryError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::health::HealthFactor;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Insufficient collateral for {account}: collateral value {collateral_value}, borrow value {borrow_value}")]
    InsufficientCollateral {
        account: AccountId,
        collateral_value: Decimal,
        borrow_value: Decimal,
    },

    #[error("Account {account} is healthy (health factor {health}) and cannot be liquidated")]
    AccountHealthy {
        account: AccountId,
        health: HealthFactor,
    },

    #[error("Repay amount {requested} exceeds {account} debt of {debt} in {asset}")]
    ExceedsDebt {
        account: AccountId,
        asset: AssetId,
        debt: Amount,
        requested: Amount,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{0} cannot liquidate itself")]
    SelfLiquidation(AccountId),

    #[error("Arithmetic overflow while valuing {0}")]
    Overflow(AssetId),

    #[error(transparent)]
    Price(#[from] OracleError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

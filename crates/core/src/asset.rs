//! Identity handles for assets and accounts
//!
//! Both are short uppercase codes. Ordering is lexicographic and is used as
//! the final tie-break wherever iteration order must be deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing handles
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    #[error("Empty handle")]
    Empty,

    #[error("Handle too long (max {max} chars): {value}")]
    TooLong { value: String, max: usize },

    #[error("Invalid handle format: {0}")]
    InvalidFormat(String),
}

const MAX_ASSET_LEN: usize = 16;
const MAX_ACCOUNT_LEN: usize = 64;

fn normalize(raw: &str, max: usize, allow: impl Fn(char) -> bool) -> Result<String, HandleError> {
    let s = raw.trim().to_uppercase();

    if s.is_empty() {
        return Err(HandleError::Empty);
    }

    if s.len() > max {
        return Err(HandleError::TooLong { value: s, max });
    }

    if !s.chars().all(allow) {
        return Err(HandleError::InvalidFormat(s));
    }

    Ok(s)
}

/// Unique handle of a supported asset (e.g. `WETH`, `USDC`)
///
/// # Examples
/// ```
/// use colend_core::AssetId;
///
/// let usdc: AssetId = "usdc".parse().unwrap();
/// assert_eq!(usdc.as_str(), "USDC");
/// assert!("BTC-USD".parse::<AssetId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    /// Parse and normalize an asset handle
    pub fn new(code: impl AsRef<str>) -> Result<Self, HandleError> {
        normalize(code.as_ref(), MAX_ASSET_LEN, |c| c.is_ascii_alphanumeric()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Handle of an account owner (borrower, depositor, liquidator or admin)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Parse and normalize an account handle.
    ///
    /// Accepts alphanumerics plus `_` and `-`, so hex addresses and
    /// readable names both fit.
    pub fn new(owner: impl AsRef<str>) -> Result<Self, HandleError> {
        normalize(owner.as_ref(), MAX_ACCOUNT_LEN, |c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '-'
        })
        .map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! handle_impls {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = HandleError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = HandleError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$ty> for String {
            fn from(handle: $ty) -> Self {
                handle.0
            }
        }
    };
}

handle_impls!(AssetId);
handle_impls!(AccountId);

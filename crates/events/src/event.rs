//! Event records

use chrono::{DateTime, Utc};
use colend_core::{AccountId, Amount, AssetId};
use colend_risk::HealthFactor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

use crate::chain::calculate_event_hash;

/// Kind of state transition an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AssetRegistered,
    ParametersUpdated,
    AssetDeactivated,
    Deposit,
    Withdraw,
    Borrow,
    Repay,
    Liquidate,
    InterestAccrued,
}

/// An event before it is placed in the chain
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub kind: EventKind,
    pub account: Option<AccountId>,
    pub counterparty: Option<AccountId>,
    pub assets: Vec<AssetId>,
    pub amounts: Vec<Amount>,
    pub health: Option<HealthFactor>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EventDraft {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            account: None,
            counterparty: None,
            assets: Vec::new(),
            amounts: Vec::new(),
            health: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn account(mut self, account: &AccountId) -> Self {
        self.account = Some(account.clone());
        self
    }

    pub fn counterparty(mut self, counterparty: &AccountId) -> Self {
        self.counterparty = Some(counterparty.clone());
        self
    }

    /// Record an asset and the amount moved in it
    pub fn leg(mut self, asset: &AssetId, amount: Amount) -> Self {
        self.assets.push(asset.clone());
        self.amounts.push(amount);
        self
    }

    pub fn health(mut self, health: Option<HealthFactor>) -> Self {
        self.health = health;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Place the draft in the chain after `prev_hash`
    pub fn seal(self, sequence: u64, prev_hash: &str, timestamp: DateTime<Utc>) -> LendingEvent {
        let mut event = LendingEvent {
            sequence,
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
            timestamp,
            kind: self.kind,
            account: self.account,
            counterparty: self.counterparty,
            assets: self.assets,
            amounts: self.amounts,
            health: self.health,
            metadata: self.metadata,
        };
        event.hash = calculate_event_hash(&event);
        event
    }
}

/// A committed state transition, as seen by monitoring and indexers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingEvent {
    pub sequence: u64,
    pub prev_hash: String,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<AccountId>,
    pub assets: Vec<AssetId>,
    pub amounts: Vec<Amount>,
    /// Resulting health factor of `account`; None when it could not be priced
    pub health: Option<HealthFactor>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

//! Hash chain utilities for event log integrity

use sha2::{Digest, Sha256};

use crate::error::EventError;
use crate::event::LendingEvent;

/// `prev_hash` of the first event
pub const GENESIS_HASH: &str = "GENESIS";

/// Calculate SHA256 hash of event content (excluding the hash field itself).
///
/// Every field is length-prefixed so adjacent fields cannot run together.
/// Decimals are hashed normalized and unrounded.
pub fn calculate_event_hash(event: &LendingEvent) -> String {
    let mut hasher = Sha256::new();

    hasher.update(event.sequence.to_le_bytes());
    field(&mut hasher, event.prev_hash.as_bytes());
    field(&mut hasher, event.timestamp.to_rfc3339().as_bytes());
    field(&mut hasher, event.kind.to_string().as_bytes());

    for party in [&event.account, &event.counterparty] {
        field(&mut hasher, party.as_ref().map_or("", |id| id.as_str()).as_bytes());
    }

    hasher.update((event.assets.len() as u64).to_le_bytes());
    for (asset, amount) in event.assets.iter().zip(&event.amounts) {
        field(&mut hasher, asset.as_str().as_bytes());
        field(&mut hasher, amount.value().normalize().to_string().as_bytes());
    }

    let health = match &event.health {
        None => String::new(),
        Some(health) => match health.value() {
            Some(ratio) => ratio.normalize().to_string(),
            None => "inf".to_string(),
        },
    };
    field(&mut hasher, health.as_bytes());

    // BTreeMap iterates in key order
    hasher.update((event.metadata.len() as u64).to_le_bytes());
    for (key, value) in &event.metadata {
        field(&mut hasher, key.as_bytes());
        field(&mut hasher, value.to_string().as_bytes());
    }

    hex::encode(hasher.finalize())
}

fn field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Verify hash chain integrity
pub fn verify_chain(events: &[LendingEvent]) -> Result<(), EventError> {
    let mut prev_hash = GENESIS_HASH.to_string();
    let mut expected_sequence = events.first().map(|e| e.sequence).unwrap_or(1);

    for event in events {
        if event.sequence != expected_sequence {
            return Err(EventError::InvalidSequence {
                expected: expected_sequence,
                actual: event.sequence,
            });
        }

        if event.prev_hash != prev_hash {
            return Err(EventError::BrokenChain {
                sequence: event.sequence,
                expected: prev_hash,
                actual: event.prev_hash.clone(),
            });
        }

        let calculated = calculate_event_hash(event);
        if event.hash != calculated {
            return Err(EventError::BrokenChain {
                sequence: event.sequence,
                expected: calculated,
                actual: event.hash.clone(),
            });
        }

        prev_hash = event.hash.clone();
        expected_sequence += 1;
    }

    Ok(())
}

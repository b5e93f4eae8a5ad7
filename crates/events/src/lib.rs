//! Colend Events - operation log
//!
//! Every state-mutating call produces one [`LendingEvent`]. Events are
//! hash-chained so an external indexer can detect gaps or tampering, and are
//! handed to an [`EventSink`] before the ledger commits.

pub mod chain;
pub mod error;
pub mod event;
pub mod reader;
pub mod sink;
pub mod store;

pub use chain::{calculate_event_hash, verify_chain, GENESIS_HASH};
pub use error::EventError;
pub use event::{EventDraft, EventKind, LendingEvent};
pub use reader::EventReader;
pub use sink::{EventSink, MemorySink};
pub use store::EventStore;

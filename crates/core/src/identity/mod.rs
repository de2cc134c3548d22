//! Identity aggregates, repository, and snapshots.
//!
//! Each identity owns its cards, risk counters, and daily-spend
//! accumulators. All mutable state lives inside per-identity aggregates
//! behind the store; there are no process-wide mutable singletons.

pub mod error;
pub mod snapshot;
pub mod store;
pub mod types;

pub use error::IdentityError;
pub use snapshot::{CardSnapshot, IdentitySnapshot, SnapshotError};
pub use store::IdentityStore;
pub use types::Identity;

//! Deduplication state
//!
//! A JSON document mapping action-item fingerprints to the record of when and
//! how each item was handled, guarded by a marker-file lock.

pub mod lock;
pub mod store;

pub use lock::{LockError, StateLock, StateLockGuard};
pub use store::{evict_expired, StateError, StateMap, StateStore};

//! Device capability state
//!
//! - `store`: Capability registry trait and the in-memory store
//! - `sync`: Change-only mirroring of updates onto a store

pub mod store;
pub mod sync;

pub use store::{CapabilityStore, MemoryCapabilityStore};
pub use sync::sync_capabilities;

//! Charger polling
//!
//! - `scheduler`: Per-charger poll loop with a single-flight guard
//! - `manager`: Charger lifecycle (add, settings change, rename, remove)

pub mod manager;
pub mod scheduler;

pub use manager::{DeviceManager, ManagerError};
pub use scheduler::ChargerPoller;

//! Alfen charger integration
//!
//! - `client`: Session client (login, property fetch, logout)
//! - `properties`: Property ids and the capability mapping table

pub mod client;
pub mod properties;

pub use client::{ApiBody, AuthError, ChargerClient, RequestError};
pub use properties::{map_properties, PROPERTY_IDS};

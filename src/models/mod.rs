//! Data models for the Alfen charger poller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Charger settings
// ============================================================================

/// Connection settings for one charger.
///
/// A poll cycle works on an immutable snapshot of these; a settings change
/// only affects cycles that start afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Host (and optional port) of the charger, e.g. `192.168.1.40`
    pub address: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Path segment in front of `login`, `prop` and `logout`
    #[serde(default = "default_api_path")]
    pub api_path: String,
    /// Chargers ship self-signed certificates, so validation is off unless
    /// explicitly enabled.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_api_path() -> String {
    "api".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Charger API payloads
// ============================================================================

/// One property as returned by `GET /api/prop`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    #[serde(default)]
    pub access: i64,
    #[serde(rename = "type", default)]
    pub kind: i64,
    #[serde(default)]
    pub len: i64,
    #[serde(default)]
    pub cat: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertiesResponse {
    pub properties: Vec<PropertyRecord>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

// ============================================================================
// Capabilities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityValue::Number(n) => write!(f, "{}", n),
            CapabilityValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A value to mirror onto one capability. `None` means the charger
/// reported null, which is never written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityUpdate {
    pub capability_id: String,
    pub value: Option<CapabilityValue>,
}

/// Stored capability value with the time it was last written
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityEntry {
    pub value: Option<CapabilityValue>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Poll status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    Idle,
    Polling,
}

/// Result of one fire of the scheduler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Another cycle was still running
    Skipped,
    Completed { applied: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargerStatus {
    pub id: String,
    pub name: String,
    pub address: String,
    pub state: PollState,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<CycleOutcome>,
}

// ============================================================================
// Management API requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddChargerRequest {
    pub id: String,
    pub name: Option<String>,
    #[serde(flatten)]
    pub settings: DeviceSettings,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

//! Capability registry and device state store

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{CapabilityEntry, CapabilityValue};

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("failed to register capability {capability}: {reason}")]
    Register { capability: String, reason: String },

    #[error("failed to write capability {capability}: {reason}")]
    Write { capability: String, reason: String },
}

/// Host-side view of one device's capabilities
#[async_trait]
pub trait CapabilityStore: Send + Sync {
    async fn has_capability(&self, capability: &str) -> bool;

    async fn add_capability(&self, capability: &str) -> Result<(), CapabilityError>;

    /// Last written value, `None` if never written or not registered
    async fn capability_value(&self, capability: &str) -> Option<CapabilityValue>;

    async fn set_capability_value(
        &self,
        capability: &str,
        value: CapabilityValue,
    ) -> Result<(), CapabilityError>;
}

/// In-memory store, one per charger
#[derive(Default)]
pub struct MemoryCapabilityStore {
    entries: RwLock<BTreeMap<String, CapabilityEntry>>,
}

impl MemoryCapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> BTreeMap<String, CapabilityEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl CapabilityStore for MemoryCapabilityStore {
    async fn has_capability(&self, capability: &str) -> bool {
        self.entries.read().await.contains_key(capability)
    }

    async fn add_capability(&self, capability: &str) -> Result<(), CapabilityError> {
        self.entries
            .write()
            .await
            .entry(capability.to_string())
            .or_insert(CapabilityEntry {
                value: None,
                updated_at: None,
            });
        Ok(())
    }

    async fn capability_value(&self, capability: &str) -> Option<CapabilityValue> {
        self.entries
            .read()
            .await
            .get(capability)
            .and_then(|e| e.value.clone())
    }

    async fn set_capability_value(
        &self,
        capability: &str,
        value: CapabilityValue,
    ) -> Result<(), CapabilityError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(capability)
            .ok_or_else(|| CapabilityError::Write {
                capability: capability.to_string(),
                reason: "capability not registered".to_string(),
            })?;

        entry.value = Some(value);
        entry.updated_at = Some(Utc::now());
        Ok(())
    }
}

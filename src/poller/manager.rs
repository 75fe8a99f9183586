//! DeviceManager: one poller per charger, with the host lifecycle hooks
//!
//! Adding a charger spawns its poll task (first poll runs immediately);
//! settings changes take effect from the next cycle and trigger one right
//! away; removal aborts the task and drops the charger's capability state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::alfen::ChargerClient;
use crate::capability::MemoryCapabilityStore;
use crate::config::PollConfig;
use crate::models::{CapabilityEntry, ChargerStatus, CycleOutcome, DeviceSettings};
use crate::poller::ChargerPoller;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("charger {0} already exists")]
    AlreadyExists(String),

    #[error("charger {0} not found")]
    NotFound(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

struct ManagedCharger {
    poller: Arc<ChargerPoller>,
    store: Arc<MemoryCapabilityStore>,
    task: JoinHandle<()>,
}

pub struct DeviceManager {
    /// charger_id → running poller
    chargers: RwLock<HashMap<String, ManagedCharger>>,
    client: ChargerClient,
    interval: Duration,
}

impl DeviceManager {
    pub fn new(poll: PollConfig) -> Self {
        Self {
            chargers: RwLock::new(HashMap::new()),
            client: ChargerClient::new(Duration::from_secs(poll.request_timeout_secs)),
            interval: Duration::from_secs(poll.interval_secs),
        }
    }

    fn validate(settings: &DeviceSettings) -> Result<(), ManagerError> {
        ChargerClient::base_url(settings)
            .map(|_| ())
            .map_err(|e| ManagerError::InvalidSettings(e.to_string()))
    }

    /// Device init hook: register the charger and start polling it
    pub async fn add_charger(
        &self,
        id: &str,
        name: Option<String>,
        settings: DeviceSettings,
    ) -> Result<ChargerStatus, ManagerError> {
        if id.trim().is_empty() {
            return Err(ManagerError::InvalidSettings("id is empty".to_string()));
        }
        Self::validate(&settings)?;

        let mut chargers = self.chargers.write().await;
        if chargers.contains_key(id) {
            return Err(ManagerError::AlreadyExists(id.to_string()));
        }

        let store = Arc::new(MemoryCapabilityStore::new());
        let poller = Arc::new(ChargerPoller::new(
            id.to_string(),
            name.unwrap_or_else(|| id.to_string()),
            settings,
            self.client.clone(),
            store.clone(),
            self.interval,
        ));
        let task = tokio::spawn(poller.clone().run());
        let status = poller.status().await;

        chargers.insert(
            id.to_string(),
            ManagedCharger {
                poller,
                store,
                task,
            },
        );

        tracing::info!("[Manager] Charger {} added", id);
        Ok(status)
    }

    /// Settings-changed hook
    pub async fn update_settings(
        &self,
        id: &str,
        settings: DeviceSettings,
    ) -> Result<ChargerStatus, ManagerError> {
        Self::validate(&settings)?;
        let poller = self.poller(id).await?;

        poller.replace_settings(settings).await;
        tracing::info!("[Manager] Charger {} settings updated, polling now", id);

        poller.request_poll();

        Ok(poller.status().await)
    }

    /// Rename hook
    pub async fn rename(&self, id: &str, name: String) -> Result<ChargerStatus, ManagerError> {
        let poller = self.poller(id).await?;
        tracing::info!("[Manager] Charger {} renamed to {}", id, name);
        poller.rename(name).await;
        Ok(poller.status().await)
    }

    /// Deletion hook
    pub async fn remove_charger(&self, id: &str) -> Result<(), ManagerError> {
        let removed = self
            .chargers
            .write()
            .await
            .remove(id)
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;

        removed.task.abort();
        tracing::info!("[Manager] Charger {} removed", id);
        Ok(())
    }

    /// Manual poll; skipped if a cycle is already running
    pub async fn poll_now(&self, id: &str) -> Result<CycleOutcome, ManagerError> {
        let poller = self.poller(id).await?;
        Ok(poller.poll_once().await)
    }

    pub async fn status(&self, id: &str) -> Result<ChargerStatus, ManagerError> {
        Ok(self.poller(id).await?.status().await)
    }

    pub async fn list(&self) -> Vec<ChargerStatus> {
        let pollers: Vec<Arc<ChargerPoller>> = self
            .chargers
            .read()
            .await
            .values()
            .map(|c| c.poller.clone())
            .collect();

        let mut statuses = Vec::with_capacity(pollers.len());
        for poller in pollers {
            statuses.push(poller.status().await);
        }
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    pub async fn capabilities(
        &self,
        id: &str,
    ) -> Result<BTreeMap<String, CapabilityEntry>, ManagerError> {
        let store = self
            .chargers
            .read()
            .await
            .get(id)
            .map(|c| c.store.clone())
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;

        Ok(store.snapshot().await)
    }

    /// Stop every poll task and wait for them to wind down
    pub async fn shutdown(&self) {
        let drained: Vec<ManagedCharger> = self
            .chargers
            .write()
            .await
            .drain()
            .map(|(_, c)| c)
            .collect();

        let tasks: Vec<JoinHandle<()>> = drained
            .into_iter()
            .map(|c| {
                c.task.abort();
                c.task
            })
            .collect();

        let count = tasks.len();
        futures::future::join_all(tasks).await;
        tracing::info!("[Manager] Stopped {} pollers", count);
    }

    async fn poller(&self, id: &str) -> Result<Arc<ChargerPoller>, ManagerError> {
        self.chargers
            .read()
            .await
            .get(id)
            .map(|c| c.poller.clone())
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))
    }
}

//! ChargerPoller: periodic login → fetch → logout → map → sync for one charger
//!
//! Fires once at startup, then on a fixed interval or when a poll is
//! requested. Cycles never overlap: a fire that arrives while a cycle is
//! running is skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::{self, MissedTickBehavior};

use crate::alfen::{map_properties, ApiBody, AuthError, ChargerClient, RequestError, PROPERTY_IDS};
use crate::capability::{sync_capabilities, CapabilityStore};
use crate::models::{CapabilityUpdate, ChargerStatus, CycleOutcome, DeviceSettings, PollState};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("property fetch failed: {0}")]
    Fetch(#[from] RequestError),
}

struct PollStatus {
    name: String,
    state: PollState,
    last_poll_at: Option<DateTime<Utc>>,
    last_outcome: Option<CycleOutcome>,
}

pub struct ChargerPoller {
    id: String,
    settings: RwLock<Arc<DeviceSettings>>,
    client: ChargerClient,
    store: Arc<dyn CapabilityStore>,
    interval: Duration,
    cycle_lock: Mutex<()>,
    trigger: Notify,
    status: RwLock<PollStatus>,
}

impl ChargerPoller {
    pub fn new(
        id: String,
        name: String,
        settings: DeviceSettings,
        client: ChargerClient,
        store: Arc<dyn CapabilityStore>,
        interval: Duration,
    ) -> Self {
        Self {
            id,
            settings: RwLock::new(Arc::new(settings)),
            client,
            store,
            interval,
            cycle_lock: Mutex::new(()),
            trigger: Notify::new(),
            status: RwLock::new(PollStatus {
                name,
                state: PollState::Idle,
                last_poll_at: None,
                last_outcome: None,
            }),
        }
    }

    /// Poll immediately, then every `interval` or on request (runs until the
    /// task is aborted)
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            "[Poller] {} starting (interval: {}s)",
            self.id,
            self.interval.as_secs()
        );

        let mut timer = time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = timer.tick() => {}
                _ = self.trigger.notified() => {
                    tracing::debug!("[Poller] {} poll requested", self.id);
                }
            }
            self.poll_once().await;
        }
    }

    /// Ask the running poll loop for a cycle now
    pub fn request_poll(&self) {
        self.trigger.notify_one();
    }

    /// Run one cycle unless one is already in progress
    pub async fn poll_once(&self) -> CycleOutcome {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::debug!("[Poller] {} cycle still running, skipping", self.id);
            return CycleOutcome::Skipped;
        };

        self.status.write().await.state = PollState::Polling;

        let settings = self.settings.read().await.clone();
        let outcome = match self.run_cycle(&settings).await {
            Ok(applied) => {
                tracing::debug!("[Poller] {} cycle done, {} updates", self.id, applied.len());
                CycleOutcome::Completed {
                    applied: applied.len(),
                }
            }
            Err(e) => {
                tracing::warn!("[Poller] {} cycle failed: {}", self.id, e);
                CycleOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let mut status = self.status.write().await;
        status.state = PollState::Idle;
        status.last_poll_at = Some(Utc::now());
        status.last_outcome = Some(outcome.clone());

        outcome
    }

    async fn run_cycle(
        &self,
        settings: &DeviceSettings,
    ) -> Result<Vec<CapabilityUpdate>, PollError> {
        let session = self.client.login(settings).await?;

        let body = match session.fetch_properties(&PROPERTY_IDS).await {
            Ok(body) => body,
            Err(e) => {
                // Release the session on the charger before giving up
                if let Err(logout_err) = session.logout().await {
                    tracing::warn!("[Poller] {} logout failed: {}", self.id, logout_err);
                }
                return Err(e.into());
            }
        };

        if let Err(e) = session.logout().await {
            tracing::warn!("[Poller] {} logout failed: {}", self.id, e);
        }

        let records = match body {
            ApiBody::Properties(records) => records,
            ApiBody::Text(text) => {
                tracing::warn!(
                    "[Poller] {} returned a non-JSON body ({} bytes), nothing to map",
                    self.id,
                    text.len()
                );
                return Ok(Vec::new());
            }
        };

        let updates = map_properties(&records);
        Ok(sync_capabilities(&self.id, &updates, self.store.as_ref()).await)
    }

    /// Swap the settings used by cycles that start from now on
    pub async fn replace_settings(&self, settings: DeviceSettings) {
        *self.settings.write().await = Arc::new(settings);
    }

    pub async fn rename(&self, name: String) {
        self.status.write().await.name = name;
    }

    pub async fn status(&self) -> ChargerStatus {
        let address = self.settings.read().await.address.clone();
        let status = self.status.read().await;

        ChargerStatus {
            id: self.id.clone(),
            name: status.name.clone(),
            address,
            state: status.state,
            last_poll_at: status.last_poll_at,
            last_outcome: status.last_outcome.clone(),
        }
    }
}

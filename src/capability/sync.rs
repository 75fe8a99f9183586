//! Mirrors capability updates onto a store, writing only what changed

use crate::capability::store::CapabilityStore;
use crate::models::CapabilityUpdate;

/// Apply `updates` to `store` and return the ones actually written.
///
/// Each capability is handled on its own: a failed registration or write is
/// logged and the remaining updates still go through.
pub async fn sync_capabilities(
    device: &str,
    updates: &[CapabilityUpdate],
    store: &dyn CapabilityStore,
) -> Vec<CapabilityUpdate> {
    let mut applied = Vec::new();

    for update in updates {
        let capability = update.capability_id.as_str();

        if !store.has_capability(capability).await {
            match store.add_capability(capability).await {
                Ok(()) => tracing::info!("[Capability] {} registered {}", device, capability),
                Err(e) => {
                    tracing::error!("[Capability] {}: {}", device, e);
                    continue;
                }
            }
        }

        let Some(value) = update.value.clone() else {
            tracing::debug!("[Capability] {} {} is null, skipping", device, capability);
            continue;
        };

        if store.capability_value(capability).await.as_ref() == Some(&value) {
            tracing::debug!("[Capability] {} {} unchanged ({})", device, capability, value);
            continue;
        }

        match store.set_capability_value(capability, value.clone()).await {
            Ok(()) => {
                tracing::info!("[Capability] {} {} -> {}", device, capability, value);
                applied.push(update.clone());
            }
            Err(e) => {
                tracing::error!("[Capability] {}: {}", device, e);
            }
        }
    }

    applied
}

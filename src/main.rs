//! alfen-poller - Alfen EV charger poller
//!
//! Polls local Alfen chargers over their HTTPS JSON API and mirrors power,
//! energy, current, voltage and temperature readings onto per-charger
//! capability state, exposed through a small management API.

mod alfen;
mod api;
mod capability;
mod config;
mod error;
mod models;
mod poller;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::poller::DeviceManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alfen_poller=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting alfen-poller...");

    // Load configuration
    let config = config::Config::load()?;
    tracing::info!(
        "Configuration loaded ({} chargers, interval {}s)",
        config.chargers.len(),
        config.poll.interval_secs
    );

    let manager = Arc::new(DeviceManager::new(config.poll));

    // Chargers from config start polling right away
    for charger in config.chargers {
        if let Err(e) = manager
            .add_charger(&charger.id, charger.name, charger.settings)
            .await
        {
            tracing::warn!("Charger {} not started: {}", charger.id, e);
        }
    }

    let app = api::routes()
        .with_state(AppState {
            manager: manager.clone(),
        })
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown().await;
    tracing::info!("alfen-poller stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

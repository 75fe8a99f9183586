//! API module - HTTP handlers and routes

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::poller::DeviceManager;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DeviceManager>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Charger lifecycle
        .route(
            "/api/chargers",
            get(handlers::list_chargers).post(handlers::add_charger),
        )
        .route(
            "/api/chargers/:id",
            get(handlers::get_charger).delete(handlers::remove_charger),
        )
        .route("/api/chargers/:id/settings", put(handlers::update_settings))
        .route("/api/chargers/:id/name", put(handlers::rename_charger))
        // Mirrored state
        .route(
            "/api/chargers/:id/capabilities",
            get(handlers::get_capabilities),
        )
        .route("/api/chargers/:id/poll", post(handlers::poll_charger))
}

//! Charger handlers
//!
//! Lifecycle hooks (add, settings, rename, remove), status, mirrored
//! capabilities and manual polling.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::handlers::SuccessResponse;
use crate::api::AppState;
use crate::error::AppError;
use crate::models::{AddChargerRequest, DeviceSettings, RenameRequest};

/// GET /api/chargers - List chargers with their poll status
pub async fn list_chargers(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.list().await)
}

/// POST /api/chargers - Add a charger and start polling it
pub async fn add_charger(
    State(state): State<AppState>,
    Json(req): Json<AddChargerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = state
        .manager
        .add_charger(&req.id, req.name, req.settings)
        .await?;

    Ok((StatusCode::CREATED, Json(status)))
}

/// GET /api/chargers/:id
pub async fn get_charger(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.manager.status(&id).await?))
}

/// DELETE /api/chargers/:id
pub async fn remove_charger(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.manager.remove_charger(&id).await?;
    Ok(Json(SuccessResponse::new(format!("Charger {} removed", id))))
}

/// PUT /api/chargers/:id/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(settings): Json<DeviceSettings>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.manager.update_settings(&id, settings).await?))
}

/// PUT /api/chargers/:id/name
pub async fn rename_charger(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }

    Ok(Json(state.manager.rename(&id, name).await?))
}

/// GET /api/chargers/:id/capabilities
pub async fn get_capabilities(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.manager.capabilities(&id).await?))
}

/// POST /api/chargers/:id/poll - Run a cycle now (skipped if one is running)
pub async fn poll_charger(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.manager.poll_now(&id).await?))
}

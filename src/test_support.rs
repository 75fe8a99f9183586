//! In-process fake Alfen charger for tests
//!
//! Serves `login`, `prop` and `logout` over plain HTTP on an ephemeral port
//! and counts every call. `prop` only answers when the session cookie handed
//! out by `login` comes back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::alfen::client::ALFEN_CONTENT_TYPE;
use crate::models::DeviceSettings;

const SESSION_COOKIE: &str = "session=f00dcafe";

pub struct FakeChargerState {
    pub logins: AtomicUsize,
    pub fetches: AtomicUsize,
    pub logouts: AtomicUsize,
    pub login_status: AtomicU16,
    pub prop_status: AtomicU16,
    pub logout_status: AtomicU16,
    /// Delay before `prop` answers
    pub prop_delay_ms: AtomicU64,
    pub last_ids: Mutex<Option<String>>,
    pub logout_content_type: Mutex<Option<String>>,
    /// Content type and raw body served by `prop`
    pub prop_body: Mutex<(String, String)>,
}

impl Default for FakeChargerState {
    fn default() -> Self {
        Self {
            logins: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
            login_status: AtomicU16::new(200),
            prop_status: AtomicU16::new(200),
            logout_status: AtomicU16::new(200),
            prop_delay_ms: AtomicU64::new(0),
            last_ids: Mutex::new(None),
            logout_content_type: Mutex::new(None),
            prop_body: Mutex::new((
                ALFEN_CONTENT_TYPE.to_string(),
                default_properties().to_string(),
            )),
        }
    }
}

fn default_properties() -> Value {
    json!({
        "version": 2,
        "properties": [
            { "id": "2060_0", "access": 1, "type": 5, "len": 0, "cat": "generic", "value": 1 },
            { "id": "2221_3", "access": 1, "type": 8, "len": 0, "cat": "meter1", "value": 4.6 },
            { "id": "2221_4", "access": 1, "type": 8, "len": 0, "cat": "meter1", "value": 5.2 },
            { "id": "2221_5", "access": 1, "type": 8, "len": 0, "cat": "meter1", "value": 4.9 },
            { "id": "2221_A", "access": 1, "type": 8, "len": 0, "cat": "meter1", "value": 229.8 },
            { "id": "2221_16", "access": 1, "type": 8, "len": 0, "cat": "meter1", "value": 3412.46 },
            { "id": "2201_0", "access": 1, "type": 8, "len": 0, "cat": "temp", "value": 21.34 },
            { "id": "2221_22", "access": 1, "type": 8, "len": 0, "cat": "meter1", "value": 123456 },
            { "id": "2129_0", "access": 3, "type": 8, "len": 0, "cat": "generic", "value": 16 }
        ]
    })
}

pub struct FakeCharger {
    pub address: String,
    pub state: Arc<FakeChargerState>,
}

impl FakeCharger {
    pub async fn start() -> Self {
        let state = Arc::new(FakeChargerState::default());

        let app = Router::new()
            .route("/api/login", post(login))
            .route("/api/prop", get(prop))
            .route("/api/logout", post(logout))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { address, state }
    }

    pub fn settings(&self) -> DeviceSettings {
        DeviceSettings {
            address: self.address.clone(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            scheme: "http".to_string(),
            api_path: "api".to_string(),
            accept_invalid_certs: true,
        }
    }

    /// Serve `body` as-is from `prop` with the given content type
    pub fn set_prop_body(&self, content_type: &str, body: &str) {
        *self.state.prop_body.lock().unwrap() = (content_type.to_string(), body.to_string());
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.state.logins.load(Ordering::SeqCst),
            self.state.fetches.load(Ordering::SeqCst),
            self.state.logouts.load(Ordering::SeqCst),
        )
    }
}

fn status(code: &AtomicU16) -> StatusCode {
    StatusCode::from_u16(code.load(Ordering::SeqCst)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn login(
    State(state): State<Arc<FakeChargerState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.logins.fetch_add(1, Ordering::SeqCst);

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let credentials: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    if content_type != ALFEN_CONTENT_TYPE || credentials["username"] != "admin" {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let code = status(&state.login_status);
    if code != StatusCode::OK {
        return (code, "login failed").into_response();
    }

    (
        [(header::SET_COOKIE, format!("{}; Path=/", SESSION_COOKIE))],
        Json(json!({})),
    )
        .into_response()
}

async fn prop(
    State(state): State<Arc<FakeChargerState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.fetches.fetch_add(1, Ordering::SeqCst);
    let delay = state.prop_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    *state.last_ids.lock().unwrap() = query.get("ids").cloned();

    let has_session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|c| c.contains(SESSION_COOKIE))
        .unwrap_or(false);
    if !has_session {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let code = status(&state.prop_status);
    if code != StatusCode::OK {
        return code.into_response();
    }

    let (content_type, body) = state.prop_body.lock().unwrap().clone();
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

async fn logout(State(state): State<Arc<FakeChargerState>>, headers: HeaderMap) -> StatusCode {
    state.logouts.fetch_add(1, Ordering::SeqCst);
    *state.logout_content_type.lock().unwrap() = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    status(&state.logout_status)
}

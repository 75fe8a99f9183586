//! Alfen charger HTTP session client
//!
//! A `ChargerSession` lives for exactly one poll cycle: login, one property
//! fetch, logout. All requests of a session share one keep-alive connection
//! and carry the session cookie from a jar owned by that session, so nothing
//! leaks from one cycle into the next.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::models::{DeviceSettings, LoginRequest, PropertiesResponse, PropertyRecord};

/// Content type the charger expects on its JSON endpoints
pub const ALFEN_CONTENT_TYPE: &str = "alfen/json; charset=utf-8";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid charger address: {0}")]
    InvalidAddress(String),

    #[error("login rejected with status {0}")]
    Status(StatusCode),

    #[error("login response is not JSON: {0}")]
    Decode(String),

    #[error("login request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("{endpoint} response could not be decoded: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },

    #[error("{endpoint} request failed: {reason}")]
    Transport {
        endpoint: &'static str,
        reason: String,
    },
}

impl RequestError {
    fn transport(endpoint: &'static str, err: reqwest::Error) -> Self {
        RequestError::Transport {
            endpoint,
            reason: err.to_string(),
        }
    }
}

/// Body of a property fetch
#[derive(Debug, Clone)]
pub enum ApiBody {
    Properties(Vec<PropertyRecord>),
    /// Body that was neither declared nor parseable as a property list
    Text(String),
}

// ============================================================================
// Client
// ============================================================================

/// Opens sessions against chargers. Holds no per-charger state.
#[derive(Debug, Clone)]
pub struct ChargerClient {
    request_timeout: Duration,
}

impl ChargerClient {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Build the API base URL, e.g. `https://192.168.1.40/api/`
    pub fn base_url(settings: &DeviceSettings) -> Result<Url, AuthError> {
        let address = settings.address.trim().trim_end_matches('/');
        if address.is_empty() {
            return Err(AuthError::InvalidAddress("address is empty".to_string()));
        }

        let root = Url::parse(&format!("{}://{}/", settings.scheme, address))
            .map_err(|e| AuthError::InvalidAddress(format!("{}: {}", address, e)))?;

        let api_path = settings.api_path.trim_matches('/');
        if api_path.is_empty() {
            return Ok(root);
        }

        root.join(&format!("{}/", api_path))
            .map_err(|e| AuthError::InvalidAddress(format!("{}: {}", api_path, e)))
    }

    /// Log in and return the session used for the rest of the cycle
    pub async fn login(&self, settings: &DeviceSettings) -> Result<ChargerSession, AuthError> {
        let base = Self::base_url(settings)?;
        let jar = Arc::new(Jar::default());

        // One idle connection, HTTP/1 only: login, fetch and logout reuse the
        // same socket in order.
        let http = Client::builder()
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .cookie_provider(jar.clone())
            .pool_max_idle_per_host(1)
            .http1_only()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let url = endpoint(&base, "login");
        let body = LoginRequest {
            username: &settings.username,
            password: &settings.password,
        };

        let resp = http
            .post(url)
            .header(CONTENT_TYPE, ALFEN_CONTENT_TYPE)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            return Err(AuthError::Status(resp.status()));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        serde_json::from_str::<serde_json::Value>(&text)
            .map_err(|e| AuthError::Decode(e.to_string()))?;

        let session = ChargerSession { http, jar, base };
        if !session.has_session_cookie() {
            tracing::debug!(
                "[Alfen] {} set no session cookie, continuing on the open connection",
                settings.address
            );
        }

        tracing::debug!("[Alfen] Logged in to {}", settings.address);
        Ok(session)
    }
}

/// An authenticated session with one charger
pub struct ChargerSession {
    http: Client,
    jar: Arc<Jar>,
    base: Url,
}

impl std::fmt::Debug for ChargerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChargerSession")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl ChargerSession {
    /// Whether the charger handed out a session cookie at login
    pub fn has_session_cookie(&self) -> bool {
        self.jar.cookies(&self.base).is_some()
    }

    /// `GET prop?ids=...` for the given property ids
    pub async fn fetch_properties(&self, ids: &[&str]) -> Result<ApiBody, RequestError> {
        let mut url = endpoint(&self.base, "prop");
        // Commas stay literal; the charger does not decode %2C.
        url.set_query(Some(&format!("ids={}", ids.join(","))));

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RequestError::transport("prop", e))?;

        if resp.status() != StatusCode::OK {
            return Err(RequestError::Status {
                endpoint: "prop",
                status: resp.status(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = resp
            .text()
            .await
            .map_err(|e| RequestError::transport("prop", e))?;

        decode_properties(content_type.as_deref(), text)
    }

    /// `POST logout`. Consumes the session.
    pub async fn logout(self) -> Result<(), RequestError> {
        let resp = self
            .http
            .post(endpoint(&self.base, "logout"))
            .send()
            .await
            .map_err(|e| RequestError::transport("logout", e))?;

        if resp.status() != StatusCode::OK {
            return Err(RequestError::Status {
                endpoint: "logout",
                status: resp.status(),
            });
        }

        Ok(())
    }
}

fn endpoint(base: &Url, name: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(name);
    }
    url
}

/// Decode a property response. A JSON content type must parse; anything
/// else is parsed best-effort and otherwise kept as text.
fn decode_properties(content_type: Option<&str>, body: String) -> Result<ApiBody, RequestError> {
    let json_like = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);

    match serde_json::from_str::<PropertiesResponse>(&body) {
        Ok(parsed) => Ok(ApiBody::Properties(parsed.properties)),
        Err(e) if json_like => Err(RequestError::Decode {
            endpoint: "prop",
            reason: e.to_string(),
        }),
        Err(_) => Ok(ApiBody::Text(body)),
    }
}

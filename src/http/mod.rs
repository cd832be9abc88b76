use std::time::Duration;

use anyhow::{Context, Result};
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use axum::http::Method;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::CorsConfig;
use crate::csrf::{CSRF_TOKEN_HEADER, CsrfError};
use crate::ledger::LedgerError;
use crate::state::AppState;

mod csrf;
mod donors;

pub fn router(state: AppState, cors: &CorsConfig) -> Result<Router> {
    assert!(
        state.start_time.elapsed() < Duration::from_secs(86_400),
        "Application uptime exceeds 24 hours before router creation"
    );

    let cors = cors_layer(cors)?;

    let router = Router::new()
        .route("/health", get(health_live))
        .route("/health/ready", get(health_ready))
        .merge(donors::router())
        .merge(csrf::router())
        .layer(cors)
        .with_state(state);
    Ok(router)
}

// Credentialed CORS cannot use a wildcard origin; the allow-list comes
// from configuration.
fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let mut origins = Vec::with_capacity(config.allowed_origins.len());
    for origin in &config.allowed_origins {
        let value = HeaderValue::from_str(origin)
            .with_context(|| format!("Invalid CORS origin {origin}"))?;
        origins.push(value);
    }

    let layer = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static(CSRF_TOKEN_HEADER)])
        .max_age(Duration::from_secs(3600));
    Ok(layer)
}

async fn health_live(State(state): State<AppState>) -> Result<Json<HealthResponse>, HttpError> {
    let uptime = state.start_time.elapsed().as_secs();
    assert!(
        uptime <= 31_536_000,
        "Uptime exceeds one year without restart"
    );
    let response = HealthResponse {
        status: "live",
        uptime_seconds: uptime,
    };
    Ok(Json(response))
}

async fn health_ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, HttpError> {
    state
        .database
        .ping()
        .await
        .map_err(|err| HttpError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))?;

    let response = ReadyResponse {
        status: "ready",
        csrf_enabled: state.csrf.enabled(),
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
    csrf_enabled: bool,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: String) -> Self {
        assert!(status != StatusCode::OK, "Error status cannot be 200");
        assert!(!message.is_empty(), "Error message cannot be empty");
        Self { status, message }
    }
}

impl From<LedgerError> for HttpError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation { .. } => {
                HttpError::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            LedgerError::Storage(db_err) => {
                error!("Storage failure: {db_err}");
                HttpError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage unavailable".to_string(),
                )
            }
        }
    }
}

impl From<CsrfError> for HttpError {
    fn from(err: CsrfError) -> Self {
        HttpError::new(StatusCode::FORBIDDEN, err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        info!("HTTP error: {}", self.message);
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

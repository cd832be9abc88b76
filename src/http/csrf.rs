use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new().route("/csrf_token", get(issue_token))
}

#[derive(Debug, Serialize)]
struct CsrfTokenResponse {
    #[serde(rename = "csrfToken")]
    csrf_token: String,
}

/// Issues a fresh one-time token for the next mutating request.
async fn issue_token(
    State(state): State<AppState>,
) -> Result<Json<CsrfTokenResponse>, HttpError> {
    let token = state
        .csrf
        .issue()
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(Json(CsrfTokenResponse { csrf_token: token }))
}

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::csrf::CSRF_TOKEN_HEADER;
use crate::ledger::{NewContribution, SubmitOutcome};
use crate::models::donor::DonorView;
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add_donor", post(add_donor))
        .route("/list_donors", get(list_donors))
}

/// Contribution submission body. Wire names match the original service,
/// including the camelCase counter.
#[derive(Debug, Deserialize)]
struct AddDonorRequest {
    first_name: String,
    last_name: String,
    email: String,
    amount: f64,
    thoughts: String,
    date: String,
    publish_name: bool,
    /// Accepted for wire compatibility; the stored counter is
    /// server-maintained regardless of what the client sends.
    #[serde(rename = "contributionsCount", default)]
    contributions_count: Option<i32>,
}

#[derive(Debug, Serialize)]
struct AddDonorResponse {
    message: String,
    donor: DonorView,
}

async fn add_donor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AddDonorRequest>,
) -> Result<Json<AddDonorResponse>, HttpError> {
    let presented = headers
        .get(CSRF_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    state.csrf.validate(presented).await?;

    if request.contributions_count.unwrap_or(1) != 1 {
        debug!("Ignoring client-supplied contributionsCount");
    }

    let submission = NewContribution {
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        amount: request.amount,
        thoughts: request.thoughts,
        date: request.date,
        publish_name: request.publish_name,
    };

    let result = state.ledger.submit(submission).await?;
    let message = match result.outcome {
        SubmitOutcome::Created => "Donor added successfully",
        SubmitOutcome::Updated => "Donor contribution updated",
    };
    info!(
        "Contribution recorded: {} total over {} submissions",
        result.record.amount, result.record.contributions_count
    );

    Ok(Json(AddDonorResponse {
        message: message.to_string(),
        donor: DonorView::from(result.record),
    }))
}

async fn list_donors(
    State(state): State<AppState>,
) -> Result<Json<Vec<DonorView>>, HttpError> {
    let records = state.ledger.list().await?;
    let views = records.into_iter().map(DonorView::from).collect::<Vec<_>>();
    Ok(Json(views))
}

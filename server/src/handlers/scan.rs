use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::models::account::Credentials;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub event_id: String,
    pub ticket_id: String,
}

/// Every completed scan is a 200, whether or not the holder is admitted; the
/// outcome is in the payload.
pub async fn scan_ticket(
    State(engine): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;

    let outcome = engine
        .scan_ticket_as(&request.credentials, &request.event_id, &request.ticket_id)
        .await?;

    Ok(success(outcome, "Ticket scanned"))
}

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::models::account::Credentials;
use crate::utils::error::AppError;
use crate::utils::response::success_with_status;

#[derive(Debug, Deserialize)]
pub struct IssueTicketRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub event_id: String,
    pub holder_name: String,
    /// Plain file name for the PDF; defaults to `<ticket_id>.pdf`.
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Serialize)]
struct IssuedTicketPayload {
    ticket_id: String,
    event_id: String,
    expires_at: DateTime<Utc>,
    artifact_path: String,
}

pub async fn issue_ticket(
    State(engine): State<AppState>,
    payload: Result<Json<IssueTicketRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;

    let issued = engine
        .issue_ticket(
            &request.credentials,
            &request.event_id,
            &request.holder_name,
            request.filename.as_deref(),
        )
        .await?;

    let payload = IssuedTicketPayload {
        ticket_id: issued.ticket.id,
        event_id: issued.ticket.event_id,
        expires_at: issued.ticket.expires_at,
        artifact_path: issued.artifact_path.display().to_string(),
    };

    Ok(success_with_status(StatusCode::CREATED, payload, "Ticket issued"))
}

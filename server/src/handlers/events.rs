use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::models::account::Credentials;
use crate::models::event::NewEvent;
use crate::utils::error::AppError;
use crate::utils::response::success_with_status;

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(flatten)]
    pub event: NewEvent,
}

#[derive(Serialize)]
struct CreatedEvent {
    event_id: String,
}

pub async fn create_event(
    State(engine): State<AppState>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;

    let event = engine
        .create_event(&request.credentials, request.event)
        .await?;

    Ok(success_with_status(
        StatusCode::CREATED,
        CreatedEvent { event_id: event.id },
        "Event created",
    ))
}

use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use super::AppState;
use crate::utils::response::success;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    store_connected: bool,
}

pub async fn health_check(State(engine): State<AppState>) -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "qtick-api",
        store_connected: engine.store().is_connected(),
    };

    success(payload, "Health check successful")
}

use axum::middleware::map_response_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::security::security_headers;
use crate::config::{create_cors_layer, SecurityPolicy};
use crate::handlers::{create_event, health_check, issue_ticket, scan_ticket, AppState};

pub fn create_routes(engine: AppState) -> Router {
    create_routes_with_policy(engine, SecurityPolicy::from_env())
}

pub fn create_routes_with_policy(engine: AppState, policy: SecurityPolicy) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", post(create_event))
        .route("/tickets", post(issue_ticket))
        .route("/scan", post(scan_ticket))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer())
                .layer(map_response_with_state(policy, security_headers)),
        )
        .with_state(engine)
}

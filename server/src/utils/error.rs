use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::lifecycle::LifecycleError;
use crate::time_window::TimeWindowError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    /// The request was well-formed and authorized but the operation was
    /// refused by a business rule (window violation, unknown event).
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Ticket rendering error: {0}")]
    RenderError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Rejected(_) => StatusCode::OK,
            AppError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RenderError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Rejected(_) => "REJECTED",
            AppError::StoreError(_) => "STORE_ERROR",
            AppError::RenderError(_) => "RENDER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Rejected(msg) => {
                warn!(code = self.code(), message = %msg, "Request refused");
            }
            AppError::StoreError(msg) | AppError::RenderError(msg) => {
                error!(code = self.code(), message = %msg, "Internal error");
            }
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::MalformedInput(msg) => AppError::ValidationError(msg),
            LifecycleError::TimeWindow(e @ TimeWindowError::MalformedTimestamp(_)) => {
                AppError::ValidationError(e.to_string())
            }
            LifecycleError::TimeWindow(e) => AppError::Rejected(e.to_string()),
            LifecycleError::Unauthorized => AppError::AuthError("Invalid credentials".to_string()),
            LifecycleError::EventNotFound => AppError::Rejected("Event not found".to_string()),
            LifecycleError::Render(e) => AppError::RenderError(e.to_string()),
            LifecycleError::Store(e) => AppError::StoreError(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Rejected(msg) => msg.clone(),
            AppError::StoreError(_) => "A database error occurred".to_string(),
            AppError::RenderError(_) => "The ticket document could not be generated".to_string(),
        };

        error_response(code, public_message, None, status)
    }
}

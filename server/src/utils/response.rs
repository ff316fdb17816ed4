use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Envelope for every successful response, including scan outcomes that do
/// not admit the holder.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

pub fn success<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    success_with_status(StatusCode::OK, data, message)
}

pub fn success_with_status<T>(status: StatusCode, data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    let body = ApiResponse {
        success: true,
        data: Some(data),
        message: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ApiErrorBody {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    };

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_shape() {
        let body = ApiErrorResponse {
            success: false,
            error: ApiErrorBody {
                code: "REJECTED".to_string(),
                message: "Event not found".to_string(),
                details: None,
            },
        };

        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"success": false, "error": {"code": "REJECTED", "message": "Event not found"}})
        );
    }

    #[test]
    fn test_success_status() {
        assert_eq!(success(json!({"ok": 1}), "done").status(), StatusCode::OK);
        assert_eq!(
            success_with_status(StatusCode::CREATED, json!({}), "created").status(),
            StatusCode::CREATED
        );
    }
}

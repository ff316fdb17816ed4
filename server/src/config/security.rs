use axum::extract::State;
use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;
use std::env;

const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Headers stamped on every API response.
const API_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

#[derive(Debug, Clone, Copy)]
pub struct SecurityPolicy {
    include_hsts: bool,
}

impl SecurityPolicy {
    pub fn new(include_hsts: bool) -> Self {
        Self { include_hsts }
    }

    /// HSTS only makes sense behind TLS, so it is tied to `RUST_ENV=production`.
    pub fn from_env() -> Self {
        let is_production = env::var("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        if is_production {
            tracing::info!("Security: HSTS header enabled (production mode)");
        } else {
            tracing::info!("Security: HSTS header disabled (development mode)");
        }

        Self::new(is_production)
    }

    pub fn apply(&self, response: &mut Response) {
        let headers = response.headers_mut();
        for (name, value) in API_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        if self.include_hsts {
            headers.insert(
                HeaderName::from_static("strict-transport-security"),
                HeaderValue::from_static(HSTS_VALUE),
            );
        }
    }
}

/// Response middleware, used with `axum::middleware::map_response_with_state`.
pub async fn security_headers(State(policy): State<SecurityPolicy>, mut response: Response) -> Response {
    policy.apply(&mut response);
    response
}

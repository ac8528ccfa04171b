//! Shared response helpers for route modules
//!
//! Every endpoint returns JSON with permissive CORS headers; `OPTIONS`
//! preflights are a no-op 204.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::types::HearthError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Standard error payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

/// Map a domain error to its HTTP status and client code
pub fn error_status(err: &HearthError) -> (StatusCode, &'static str) {
    match err {
        HearthError::Auth(_) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR"),
        HearthError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        HearthError::Capacity(_) if err.is_circle_limit() => {
            (StatusCode::CONFLICT, "CIRCLE_LIMIT_REACHED")
        }
        HearthError::Capacity(_) => (StatusCode::CONFLICT, "CAPACITY"),
        HearthError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        HearthError::Billing(_) => (StatusCode::BAD_GATEWAY, "BILLING_ERROR"),
        HearthError::Http(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        HearthError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR"),
        HearthError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
    }
}

/// Render a domain error as a JSON response
pub fn error_response(err: &HearthError) -> Response<BoxBody> {
    let (status, code) = error_status(err);
    json_response(
        status,
        &ErrorResponse {
            error: err.to_string(),
            code: Some(code.to_string()),
        },
    )
}

/// Shorthand for a 503 when a backing service is absent (dev mode)
pub fn service_unavailable(what: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        &ErrorResponse {
            error: format!("{} not available", what),
            code: Some("SERVICE_UNAVAILABLE".into()),
        },
    )
}

/// Read and deserialize a JSON request body (bounded)
pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, HearthError> {
    let body = req
        .collect()
        .await
        .map_err(|e| HearthError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > 10240 {
        return Err(HearthError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| HearthError::Http(format!("Invalid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_limit_maps_to_conflict_with_sentinel_code() {
        let err = HearthError::circle_limit("plan allows 1 circle");
        let (status, code) = error_status(&err);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "CIRCLE_LIMIT_REACHED");
    }

    #[test]
    fn auth_maps_to_unauthorized() {
        let err = HearthError::Auth("missing bearer token".into());
        assert_eq!(error_status(&err).0, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn billing_maps_to_bad_gateway() {
        let err = HearthError::Billing("No such price".into());
        assert_eq!(error_status(&err).0, StatusCode::BAD_GATEWAY);
    }
}

//! Health, readiness, and version endpoints

use hyper::{Response, StatusCode};
use serde_json::json;
use std::sync::Arc;

use crate::routes::respond::{json_response, BoxBody};
use crate::server::AppState;

/// Liveness probe: 200 whenever the gateway is running
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &json!({
            "status": "ok",
            "node_id": state.args.node_id.to_string(),
        }),
    )
}

/// Readiness probe: 200 only when the database answers a ping
pub async fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    match &state.mongo {
        Some(mongo) => match mongo.ping().await {
            Ok(()) => json_response(StatusCode::OK, &json!({ "ready": true })),
            Err(e) => json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &json!({ "ready": false, "error": e.to_string() }),
            ),
        },
        None => json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({ "ready": false, "error": "database not configured" }),
        ),
    }
}

/// Version info for deployment verification
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

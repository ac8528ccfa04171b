//! HTTP routes for the circle read surface and the claim transition
//!
//! - GET  /circles                 - directory with derived state + banners
//! - GET  /circles/{id}/capacity   - capacity policy result
//! - POST /circles/{id}/claim      - claim a transfer-blocked circle

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::auth;
use crate::capacity;
use crate::circles::{self, ClaimOutcome};
use crate::db::schemas::{CircleDoc, PlanDoc, CIRCLE_COLLECTION, PLAN_COLLECTION};
use crate::routes::respond::{
    cors_preflight, error_response, json_response, service_unavailable, BoxBody, ErrorResponse,
};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimResponse {
    success: bool,
    circle_id: String,
    owner_id: String,
    /// Absent when the caller already owned the circle
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_owner: Option<String>,
}

/// Handle /circles/* requests. Returns None for paths outside this prefix.
pub async fn handle_circles_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if path != "/circles" && !path.starts_with("/circles/") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::GET, ["circles"]) => handle_directory(req, state).await,
        (&Method::GET, ["circles", circle_id, "capacity"]) => {
            let circle_id = circle_id.to_string();
            handle_capacity(req, state, &circle_id).await
        }
        (&Method::POST, ["circles", circle_id, "claim"]) => {
            let circle_id = circle_id.to_string();
            handle_claim(req, state, &circle_id).await
        }
        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Circle endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}

/// GET /circles
async fn handle_directory(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let user_id = match auth::authenticate(&state.jwt, &req) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let Some(ref mongo) = state.mongo else {
        return service_unavailable("Database");
    };

    match circles::build_views(mongo, &user_id).await {
        Ok(views) => json_response(StatusCode::OK, &views),
        Err(e) => error_response(&e),
    }
}

/// GET /circles/{id}/capacity
async fn handle_capacity(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    circle_id: &str,
) -> Response<BoxBody> {
    if let Err(e) = auth::authenticate(&state.jwt, &req) {
        return error_response(&e);
    }
    let Some(ref mongo) = state.mongo else {
        return service_unavailable("Database");
    };

    let result: Result<_, crate::types::HearthError> = async {
        let circles_coll = mongo.collection::<CircleDoc>(CIRCLE_COLLECTION).await?;
        let circle = circles_coll
            .find_one(doc! { "circle_id": circle_id })
            .await?
            .ok_or_else(|| {
                crate::types::HearthError::NotFound(format!("Circle {} not found", circle_id))
            })?;

        let plans = mongo.collection::<PlanDoc>(PLAN_COLLECTION).await?;
        let (plan, occupied) = tokio::try_join!(
            plans.find_one(doc! { "user_id": &circle.owner_id }),
            circles::occupied_seats(mongo, circle_id),
        )?;

        Ok(capacity::evaluate(plan.as_ref(), &circle, occupied))
    }
    .await;

    match result {
        Ok(cap) => json_response(StatusCode::OK, &cap),
        Err(e) => error_response(&e),
    }
}

/// POST /circles/{id}/claim
async fn handle_claim(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    circle_id: &str,
) -> Response<BoxBody> {
    let user_id = match auth::authenticate(&state.jwt, &req) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let Some(ref mongo) = state.mongo else {
        return service_unavailable("Database");
    };

    match circles::claim_circle(mongo, &user_id, circle_id).await {
        Ok(ClaimOutcome::Claimed { previous_owner }) => json_response(
            StatusCode::OK,
            &ClaimResponse {
                success: true,
                circle_id: circle_id.to_string(),
                owner_id: user_id,
                previous_owner: Some(previous_owner),
            },
        ),
        Ok(ClaimOutcome::AlreadyOwner) => json_response(
            StatusCode::OK,
            &ClaimResponse {
                success: true,
                circle_id: circle_id.to_string(),
                owner_id: user_id,
                previous_owner: None,
            },
        ),
        Err(e) => {
            warn!(circle = %circle_id, user = %user_id, error = %e, "Claim failed");
            error_response(&e)
        }
    }
}

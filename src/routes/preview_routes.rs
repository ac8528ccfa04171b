//! HTTP route for link previews
//!
//! - POST /preview/fetch-link-preview - fetch Open Graph metadata for a URL
//!
//! Degrades to an empty object on any fetch failure; the only error a
//! caller can see is a malformed request.

use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth;
use crate::routes::respond::{
    cors_preflight, error_response, json_response, parse_json_body, BoxBody, ErrorResponse,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
struct PreviewRequest {
    url: String,
}

/// Handle /preview/* requests. Returns None for paths outside this prefix.
pub async fn handle_preview_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/preview") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let response = match (method, path) {
        (&Method::POST, "/preview/fetch-link-preview") => handle_fetch(req, state).await,
        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Preview endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}

async fn handle_fetch(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    if let Err(e) = auth::authenticate(&state.jwt, &req) {
        return error_response(&e);
    }
    let body: PreviewRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if let Some(cached) = state.preview_cache.get(&body.url) {
        return json_response(StatusCode::OK, &cached);
    }

    let preview = state.preview_fetcher.fetch(&body.url).await;
    if !preview.is_empty() {
        state.preview_cache.insert(&body.url, preview.clone());
    }

    json_response(StatusCode::OK, &preview)
}

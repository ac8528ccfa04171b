//! Authentication for Hearth
//!
//! Bearer-token validation resolving requests to a user identity. Token
//! issuance and session management live in the identity service; this
//! crate only verifies.

pub mod jwt;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};

use hyper::Request;

use crate::types::{HearthError, Result};

/// Resolve a request's bearer token to the authenticated user id
pub fn authenticate<B>(jwt: &JwtValidator, req: &Request<B>) -> Result<String> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = extract_token_from_header(header)
        .ok_or_else(|| HearthError::Auth("Missing bearer token".into()))?;

    let result = jwt.verify_token(token);
    match result.claims {
        Some(claims) if result.valid => Ok(claims.sub),
        _ => Err(HearthError::Auth(format!(
            "Invalid token: {}",
            result.error.unwrap_or_else(|| "unknown".into())
        ))),
    }
}

//! Shared error and result types for Hearth

use thiserror::Error;

/// Sentinel substring carried by capacity failures on the claim path.
///
/// Clients match on this to show an upgrade prompt instead of a generic
/// error, so the exact spelling is part of the API surface.
pub const CIRCLE_LIMIT_SENTINEL: &str = "CIRCLE_LIMIT_REACHED";

/// Errors that can occur in Hearth
#[derive(Error, Debug)]
pub enum HearthError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// HTTP / request handling error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failure
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Upstream payment processor failure
    #[error("Billing error: {0}")]
    Billing(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// State conflict (e.g. circle already claimed, not claimable)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Plan quota would be exceeded. The message carries the
    /// `CIRCLE_LIMIT_REACHED` sentinel for client-side branching.
    #[error("{0}")]
    Capacity(String),
}

impl HearthError {
    /// Build a capacity error with the client-visible sentinel prefix
    pub fn circle_limit(detail: &str) -> Self {
        Self::Capacity(format!("{}: {}", CIRCLE_LIMIT_SENTINEL, detail))
    }

    /// Whether this error is the claim-path capacity violation
    pub fn is_circle_limit(&self) -> bool {
        matches!(self, Self::Capacity(msg) if msg.contains(CIRCLE_LIMIT_SENTINEL))
    }
}

impl From<std::io::Error> for HearthError {
    fn from(e: std::io::Error) -> Self {
        Self::Http(format!("I/O error: {}", e))
    }
}

impl From<reqwest::Error> for HearthError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(format!("Request error: {}", e))
    }
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, HearthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_limit_carries_sentinel() {
        let err = HearthError::circle_limit("plan allows 1 circle");
        assert!(err.to_string().contains(CIRCLE_LIMIT_SENTINEL));
        assert!(err.is_circle_limit());
    }

    #[test]
    fn other_capacity_messages_are_not_circle_limit() {
        let err = HearthError::Capacity("member quota exhausted".into());
        assert!(!err.is_circle_limit());
        let err = HearthError::Billing("no active subscription".into());
        assert!(!err.is_circle_limit());
    }
}

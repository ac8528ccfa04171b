//! Configuration for Hearth
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Hearth - circle lifecycle and billing gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "hearth")]
#[command(about = "Circle lifecycle and billing gateway for the Hearth circles service")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (starts without MongoDB/Stripe, accepts dev tokens)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "hearth")]
    pub mongodb_db: String,

    /// JWT secret for bearer token validation (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (used when minting service tokens)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Admin API key gating the scheduled cleanup endpoint
    #[arg(long, env = "API_KEY_ADMIN")]
    pub api_key_admin: Option<String>,

    /// Payment API secret key (required in production)
    #[arg(long, env = "STRIPE_SECRET_KEY")]
    pub stripe_secret_key: Option<String>,

    /// Payment API base URL (override for testing against a mock)
    #[arg(long, env = "STRIPE_API_BASE", default_value = "https://api.stripe.com")]
    pub stripe_api_base: String,

    /// Price id for the Family tier subscription
    #[arg(long, env = "STRIPE_PRICE_FAMILY", default_value = "price_family")]
    pub stripe_price_family: String,

    /// Price id for the Extended tier subscription
    #[arg(long, env = "STRIPE_PRICE_EXTENDED", default_value = "price_extended")]
    pub stripe_price_extended: String,

    /// Request timeout for payment API calls, in milliseconds
    #[arg(long, env = "STRIPE_TIMEOUT_MS", default_value = "15000")]
    pub stripe_timeout_ms: u64,

    /// Enable the in-process rescue-offer expiry sweep
    #[arg(long, env = "SWEEP_ENABLED", default_value = "true")]
    pub sweep_enabled: bool,

    /// Interval between rescue-offer expiry sweeps, in seconds
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "300")]
    pub sweep_interval_secs: u64,

    /// Link preview fetch timeout, in seconds
    #[arg(long, env = "PREVIEW_TIMEOUT_SECS", default_value = "5")]
    pub preview_timeout_secs: u64,

    /// Maximum bytes read from a link preview response body
    #[arg(long, env = "PREVIEW_MAX_BYTES", default_value = "51200")]
    pub preview_max_bytes: usize,

    /// Maximum entries held by the link preview cache
    #[arg(long, env = "PREVIEW_CACHE_ENTRIES", default_value = "1024")]
    pub preview_cache_entries: usize,

    /// Link preview cache entry TTL, in seconds
    #[arg(long, env = "PREVIEW_CACHE_TTL_SECS", default_value = "3600")]
    pub preview_cache_ttl_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate the configuration, rejecting inconsistent production setups
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.jwt_secret.as_deref().unwrap_or("").is_empty() {
                return Err("JWT_SECRET is required outside dev mode".into());
            }
            if self.stripe_secret_key.as_deref().unwrap_or("").is_empty() {
                return Err("STRIPE_SECRET_KEY is required outside dev mode".into());
            }
        }
        if self.stripe_price_family == self.stripe_price_extended {
            return Err("STRIPE_PRICE_FAMILY and STRIPE_PRICE_EXTENDED must differ".into());
        }
        if self.sweep_interval_secs == 0 {
            return Err("SWEEP_INTERVAL_SECS must be greater than zero".into());
        }
        if self.preview_max_bytes == 0 || self.preview_cache_entries == 0 {
            return Err("preview limits must be greater than zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_args() -> Args {
        Args::parse_from(["hearth", "--dev-mode"])
    }

    #[test]
    fn dev_mode_needs_no_secrets() {
        assert!(dev_args().validate().is_ok());
    }

    #[test]
    fn production_requires_secrets() {
        let args = Args::parse_from(["hearth"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from([
            "hearth",
            "--jwt-secret",
            "s3cret",
            "--stripe-secret-key",
            "sk_test_123",
        ]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn price_ids_must_differ() {
        let mut args = dev_args();
        args.stripe_price_family = "price_x".into();
        args.stripe_price_extended = "price_x".into();
        assert!(args.validate().is_err());
    }
}

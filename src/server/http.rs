//! HTTP server implementation
//!
//! hyper http1 with TokioIo for async handling; one task per connection,
//! routing by method and path prefix.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::JwtValidator;
use crate::billing::{PriceMap, StripeClient};
use crate::config::Args;
use crate::db::MongoClient;
use crate::preview::{self, PreviewCache, PreviewCacheConfig, PreviewFetcher};
use crate::routes;
use crate::routes::respond::{cors_preflight, json_response, BoxBody, ErrorResponse};
use crate::types::HearthError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Absent only in dev mode; endpoints needing it answer 503
    pub mongo: Option<MongoClient>,
    /// Absent only in dev mode; billing endpoints answer 503
    pub stripe: Option<StripeClient>,
    /// Bearer token validation
    pub jwt: JwtValidator,
    /// Configured price-id to tier mapping
    pub price_map: PriceMap,
    /// Outbound link-preview fetcher (bounded timeout and byte cap)
    pub preview_fetcher: PreviewFetcher,
    /// Bounded LRU cache for link previews
    pub preview_cache: Arc<PreviewCache>,
}

impl AppState {
    /// Create application state from configuration and connected services
    pub fn new(
        args: Args,
        mongo: Option<MongoClient>,
        stripe: Option<StripeClient>,
    ) -> Result<Self, HearthError> {
        let jwt = match args.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => {
                JwtValidator::new(secret, args.jwt_expiry_seconds)?
            }
            _ if args.dev_mode => {
                warn!("Dev mode: JWT signature validation disabled");
                JwtValidator::new_dev()
            }
            _ => return Err(HearthError::Config("JWT_SECRET is required".into())),
        };

        let price_map = PriceMap::from_args(&args);
        let preview_fetcher = PreviewFetcher::new(
            Duration::from_secs(args.preview_timeout_secs),
            args.preview_max_bytes,
        );
        let preview_cache = Arc::new(PreviewCache::new(PreviewCacheConfig {
            max_entries: args.preview_cache_entries,
            ttl: Duration::from_secs(args.preview_cache_ttl_secs),
        }));

        Ok(Self {
            args,
            mongo,
            stripe,
            jwt,
            price_map,
            preview_fetcher,
            preview_cache,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), HearthError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Hearth listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - relaxed authentication");
    }

    // Periodically prune expired link previews
    preview::spawn_cleanup_task(
        Arc::clone(&state.preview_cache),
        Duration::from_secs(60),
    );
    info!(
        "Preview cache enabled (max {} entries)",
        state.preview_cache.config().max_entries
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Prefix handlers consume the request when they match
    if path.starts_with("/billing") {
        if let Some(response) = routes::handle_billing_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found(&path));
    }
    if path == "/circles" || path.starts_with("/circles/") {
        if let Some(response) = routes::handle_circles_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found(&path));
    }
    if path.starts_with("/preview") {
        if let Some(response) = routes::handle_preview_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found(&path));
    }

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Readiness probe - 200 only if the database answers
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state)).await
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        (Method::OPTIONS, _) => cors_preflight(),

        _ => not_found(&path),
    };

    Ok(response)
}

fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("Not found: {}", path),
            code: None,
        },
    )
}

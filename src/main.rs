//! Hearth - circle lifecycle and billing gateway

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hearth::{
    billing::StripeClient,
    circles,
    config::Args,
    db::MongoClient,
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("hearth={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Hearth - circles gateway");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Payment API: {}", args.stripe_api_base);
    info!(
        "Sweep: {}",
        if args.sweep_enabled {
            format!("every {}s", args.sweep_interval_secs)
        } else {
            "disabled".to_string()
        }
    );
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, continuing without): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Payment API client (validate() guarantees the key outside dev mode)
    let stripe = args.stripe_secret_key.as_deref().map(|key| {
        StripeClient::new(
            key,
            &args.stripe_api_base,
            Duration::from_millis(args.stripe_timeout_ms),
        )
    });
    if stripe.is_none() {
        warn!("No payment API key (dev mode) - billing endpoints disabled");
    }

    let state = Arc::new(server::AppState::new(args.clone(), mongo, stripe)?);

    // Rescue offer expiry sweep
    if args.sweep_enabled {
        circles::spawn_sweep_task(
            Arc::clone(&state),
            Duration::from_secs(args.sweep_interval_secs),
        );
    } else {
        info!("Rescue offer sweep disabled");
    }

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}

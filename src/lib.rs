//! Hearth - circle lifecycle and billing gateway
//!
//! Hearth is the server-side core of a circles product: private groups of
//! family and friends sharing a feed, with subscription billing.
//!
//! ## Services
//!
//! - **Billing Bridge**: HTTP endpoints translating payment-processor
//!   events and user actions into plan-record updates
//! - **Ownership Transfer**: the read-only / transfer-block / rescue-offer
//!   lifecycle for circles whose owner lost entitlement
//! - **Capacity Policy**: plan-based member and circle quotas
//! - **Circle Directory**: the circles a user owns or belongs to, with
//!   derived state and banners
//! - **Link Preview**: bounded Open Graph fetching with an LRU cache

pub mod auth;
pub mod billing;
pub mod capacity;
pub mod circles;
pub mod config;
pub mod db;
pub mod preview;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{HearthError, Result};

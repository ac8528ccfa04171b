//! HTTP routes for Hearth

pub mod billing_routes;
pub mod circle_routes;
pub mod health;
pub mod preview_routes;
pub mod respond;

pub use billing_routes::handle_billing_request;
pub use circle_routes::handle_circles_request;
pub use health::{health_check, readiness_check, version_info};
pub use preview_routes::handle_preview_request;

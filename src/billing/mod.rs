//! Billing Bridge: payment API client and plan tier policy

pub mod plans;
pub mod stripe;

pub use plans::{PlanQuotas, PlanTier, PriceMap, EXTRA_MEMBERS_BUNDLE};
pub use stripe::{CheckoutSession, Invoice, Price, StripeClient, Subscription};

//! Payment API client
//!
//! Thin wrapper over the Stripe REST API: bearer secret key, form-encoded
//! request bodies, JSON responses. Every call is a single synchronous
//! request; failures surface as `HearthError::Billing` with the upstream
//! message so callers can return it verbatim.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::types::{HearthError, Result};

/// Checkout session modes we branch on
pub const MODE_SUBSCRIPTION: &str = "subscription";
pub const MODE_PAYMENT: &str = "payment";

// =============================================================================
// Wire types
// =============================================================================

/// A checkout session
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// "subscription" or "payment"
    pub mode: String,
    /// "paid", "unpaid", or "no_payment_required"
    pub payment_status: String,
    #[serde(default)]
    pub customer: Option<String>,
    /// Subscription created by a subscription-mode session
    #[serde(default)]
    pub subscription: Option<String>,
    /// Caller-supplied reference, set to the purchasing user id at session
    /// creation time
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Whether the session was completed by this user
    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.client_reference_id.as_deref() == Some(user_id)
            || self.metadata.get("user_id").map(String::as_str) == Some(user_id)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// A subscription with its items
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    /// Unix seconds
    pub current_period_end: i64,
    pub items: SubscriptionItemList,
}

impl Subscription {
    /// The single item this product model uses per subscription
    pub fn primary_item(&self) -> Result<&SubscriptionItem> {
        self.items
            .data
            .first()
            .ok_or_else(|| HearthError::Billing("Subscription has no items".into()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItemList {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub id: String,
    pub price: Price,
}

/// A price object
#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
    /// Amount in the smallest currency unit
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// An invoice (only used for upcoming-invoice previews)
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    /// Amount due in the smallest currency unit
    pub amount_due: i64,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ListResponse<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// Payment API client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    /// Create a new client with a bounded request timeout
    pub fn new(secret_key: &str, api_base: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        debug!(path = %path, "payment API GET");
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await
            .map_err(|e| HearthError::Billing(format!("Payment API request failed: {}", e)))?;
        Self::decode(resp).await
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        debug!(path = %path, "payment API POST");
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.secret_key)
            .form(params)
            .send()
            .await
            .map_err(|e| HearthError::Billing(format!("Payment API request failed: {}", e)))?;
        Self::decode(resp).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| HearthError::Billing(format!("Malformed payment API response: {}", e)));
        }

        // Surface the upstream message verbatim when the body carries one
        let message = match resp.json::<ApiErrorBody>().await {
            Ok(body) => body
                .error
                .message
                .unwrap_or_else(|| format!("Payment API error ({})", status)),
            Err(_) => format!("Payment API error ({})", status),
        };
        Err(HearthError::Billing(message))
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Retrieve a checkout session by id
    pub async fn get_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        self.get_json(&format!("checkout/sessions/{}", session_id), &[])
            .await
    }

    /// Retrieve a subscription by id
    pub async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription> {
        self.get_json(&format!("subscriptions/{}", subscription_id), &[])
            .await
    }

    /// Retrieve a price by id
    pub async fn get_price(&self, price_id: &str) -> Result<Price> {
        self.get_json(&format!("prices/{}", price_id), &[]).await
    }

    /// Find a customer's single active subscription
    pub async fn active_subscription(&self, customer_id: &str) -> Result<Subscription> {
        let list: ListResponse<Subscription> = self
            .get_json(
                "subscriptions",
                &[
                    ("customer".to_string(), customer_id.to_string()),
                    ("status".to_string(), "active".to_string()),
                    ("limit".to_string(), "1".to_string()),
                ],
            )
            .await?;

        list.data
            .into_iter()
            .next()
            .ok_or_else(|| HearthError::Billing("No active subscription".into()))
    }

    /// Switch a subscription item to a different price.
    ///
    /// `proration_behavior = "none"` changes the charge only at the next
    /// billing boundary, which is how scheduled downgrades (and their
    /// cancellation) avoid immediate invoices.
    pub async fn update_subscription_price(
        &self,
        subscription_id: &str,
        item_id: &str,
        price_id: &str,
        proration_behavior: &str,
    ) -> Result<Subscription> {
        self.post_form(
            &format!("subscriptions/{}", subscription_id),
            &[
                ("items[0][id]".to_string(), item_id.to_string()),
                ("items[0][price]".to_string(), price_id.to_string()),
                (
                    "proration_behavior".to_string(),
                    proration_behavior.to_string(),
                ),
            ],
        )
        .await
    }

    /// Set or clear a subscription's pending cancellation
    pub async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<Subscription> {
        self.post_form(
            &format!("subscriptions/{}", subscription_id),
            &[(
                "cancel_at_period_end".to_string(),
                cancel.to_string(),
            )],
        )
        .await
    }

    /// Preview the prorated charge for switching to `price_id` without
    /// committing the change
    pub async fn preview_price_change(
        &self,
        customer_id: &str,
        subscription_id: &str,
        item_id: &str,
        price_id: &str,
    ) -> Result<Invoice> {
        self.get_json(
            "invoices/upcoming",
            &[
                ("customer".to_string(), customer_id.to_string()),
                ("subscription".to_string(), subscription_id.to_string()),
                (
                    "subscription_items[0][id]".to_string(),
                    item_id.to_string(),
                ),
                (
                    "subscription_items[0][price]".to_string(),
                    price_id.to_string(),
                ),
                (
                    "subscription_proration_behavior".to_string(),
                    "always_invoice".to_string(),
                ),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ownership_checks_reference_and_metadata() {
        let mut session = CheckoutSession {
            id: "cs_1".into(),
            mode: MODE_SUBSCRIPTION.into(),
            payment_status: "paid".into(),
            customer: Some("cus_1".into()),
            subscription: Some("sub_1".into()),
            client_reference_id: Some("user-a".into()),
            metadata: HashMap::new(),
        };
        assert!(session.belongs_to("user-a"));
        assert!(!session.belongs_to("user-b"));

        session.client_reference_id = None;
        session.metadata.insert("user_id".into(), "user-b".into());
        assert!(session.belongs_to("user-b"));
        assert!(!session.belongs_to("user-a"));
    }

    #[test]
    fn unpaid_session_is_rejected() {
        let session = CheckoutSession {
            id: "cs_2".into(),
            mode: MODE_PAYMENT.into(),
            payment_status: "unpaid".into(),
            customer: None,
            subscription: None,
            client_reference_id: None,
            metadata: HashMap::new(),
        };
        assert!(!session.is_paid());
    }

    #[test]
    fn subscription_wire_format_parses() {
        let json = r#"{
            "id": "sub_1",
            "status": "active",
            "cancel_at_period_end": false,
            "current_period_end": 1767225600,
            "items": { "data": [ { "id": "si_1", "price": { "id": "price_ext_456", "unit_amount": 999 } } ] }
        }"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.primary_item().unwrap().price.id, "price_ext_456");
        assert_eq!(sub.current_period_end, 1767225600);
    }

    #[test]
    fn error_body_parses_message() {
        let json = r#"{ "error": { "type": "invalid_request_error", "message": "No such price" } }"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.error.message.as_deref(), Some("No such price"));
    }
}

//! HTTP routes for the Billing Bridge
//!
//! Serverless-style endpoints translating payment-processor events and
//! user actions into plan-record updates:
//!
//! - POST /billing/verify-checkout        - apply a paid checkout session
//! - POST /billing/downgrade-subscription - schedule a downgrade
//! - POST /billing/cancel-downgrade       - reverse a scheduled downgrade
//! - POST /billing/reactivate-subscription- clear a pending cancellation
//! - POST /billing/preview-upgrade        - prorated preview, no commit
//! - POST /billing/cleanup-rescue-offers  - rescue offer expiry sweep
//!
//! Consistency policy is synchronous all-or-nothing: a database failure
//! after the payment processor committed a change is logged and returned
//! as an error; the client is never told an unpersisted change succeeded.

use bson::doc;
use chrono::{TimeZone, Utc};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth;
use crate::billing::plans::{PlanTier, EXTRA_MEMBERS_BUNDLE};
use crate::billing::stripe::{StripeClient, MODE_PAYMENT, MODE_SUBSCRIPTION};
use crate::circles;
use crate::db::schemas::{
    CircleDoc, OfferStatus, PlanDoc, RescueOfferDoc, CIRCLE_COLLECTION, PLAN_COLLECTION,
    RESCUE_OFFER_COLLECTION,
};
use crate::db::MongoClient;
use crate::routes::respond::{
    cors_preflight, error_response, json_response, parse_json_body, service_unavailable, BoxBody,
    ErrorResponse,
};
use crate::server::AppState;
use crate::types::{HearthError, Result};

// =============================================================================
// Request/Response types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyCheckoutRequest {
    session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum VerifyCheckoutResponse {
    Subscription {
        r#type: &'static str,
        plan: String,
        max_circles: i32,
        max_members_per_circle: i32,
    },
    ExtraMembers {
        r#type: &'static str,
        circle_id: String,
        extra_members: i32,
    },
}

#[derive(Debug, Serialize)]
struct DowngradeResponse {
    success: bool,
    pending_plan: String,
    current_period_end: String,
}

#[derive(Debug, Serialize)]
struct CancelDowngradeResponse {
    success: bool,
    plan: String,
    current_period_end: String,
}

#[derive(Debug, Serialize)]
struct ReactivateResponse {
    success: bool,
    current_period_end: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewUpgradeRequest {
    price_id: String,
}

#[derive(Debug, Serialize)]
struct PreviewUpgradeResponse {
    prorated_amount: i64,
    new_monthly_price: i64,
    next_billing_date: String,
    plan_name: String,
}

#[derive(Debug, Serialize)]
struct CleanupResponse {
    expired: u64,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Handle /billing/* requests. Returns None for paths outside this prefix.
pub async fn handle_billing_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/billing") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (method, path.as_str()) {
        (&Method::POST, "/billing/verify-checkout") => handle_verify_checkout(req, state).await,
        (&Method::POST, "/billing/downgrade-subscription") => handle_downgrade(req, state).await,
        (&Method::POST, "/billing/cancel-downgrade") => handle_cancel_downgrade(req, state).await,
        (&Method::POST, "/billing/reactivate-subscription") => {
            handle_reactivate(req, state).await
        }
        (&Method::POST, "/billing/preview-upgrade") => handle_preview_upgrade(req, state).await,
        (&Method::POST, "/billing/cleanup-rescue-offers") => handle_cleanup(req, state).await,

        (_, "/billing/verify-checkout")
        | (_, "/billing/downgrade-subscription")
        | (_, "/billing/cancel-downgrade")
        | (_, "/billing/reactivate-subscription")
        | (_, "/billing/preview-upgrade")
        | (_, "/billing/cleanup-rescue-offers") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
                code: None,
            },
        ),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Billing endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}

// =============================================================================
// Helpers
// =============================================================================

fn rfc3339_from_unix(seconds: i64) -> String {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

/// Resolve the backing services every billing handler needs
fn backing<'a>(
    state: &'a AppState,
) -> std::result::Result<(&'a MongoClient, &'a StripeClient), Response<BoxBody>> {
    let Some(ref mongo) = state.mongo else {
        return Err(service_unavailable("Database"));
    };
    let Some(ref stripe) = state.stripe else {
        return Err(service_unavailable("Payment API"));
    };
    Ok((mongo, stripe))
}

/// Load the caller's plan record, requiring a linked payment customer
async fn plan_with_customer(mongo: &MongoClient, user_id: &str) -> Result<(PlanDoc, String)> {
    let plans = mongo.collection::<PlanDoc>(PLAN_COLLECTION).await?;
    let plan = plans
        .find_one(doc! { "user_id": user_id })
        .await?
        .ok_or_else(|| HearthError::Billing("No billing profile for this user".into()))?;
    let customer = plan
        .stripe_customer_id
        .clone()
        .ok_or_else(|| HearthError::Billing("No payment customer on record".into()))?;
    Ok((plan, customer))
}

/// Soft-delete the caller's open rescue offers, logging the count
async fn delete_open_offers(mongo: &MongoClient, user_id: &str) -> Result<u64> {
    let offers = mongo
        .collection::<RescueOfferDoc>(RESCUE_OFFER_COLLECTION)
        .await?;
    let removed = offers
        .soft_delete_many(doc! {
            "current_owner": user_id,
            "status": OfferStatus::Open.as_str(),
        })
        .await?;
    if removed > 0 {
        info!(user = %user_id, removed, "Open rescue offers withdrawn");
    }
    Ok(removed)
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /billing/verify-checkout
async fn handle_verify_checkout(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let user_id = match auth::authenticate(&state.jwt, &req) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let (mongo, stripe) = match backing(&state) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let body: VerifyCheckoutRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result = verify_checkout(&state, mongo, stripe, &user_id, &body.session_id).await;
    match result {
        Ok(resp) => json_response(StatusCode::OK, &resp),
        Err(e) => {
            warn!(user = %user_id, session = %body.session_id, error = %e, "verify-checkout failed");
            error_response(&e)
        }
    }
}

async fn verify_checkout(
    state: &AppState,
    mongo: &MongoClient,
    stripe: &StripeClient,
    user_id: &str,
    session_id: &str,
) -> Result<VerifyCheckoutResponse> {
    let session = stripe.get_checkout_session(session_id).await?;

    if !session.belongs_to(user_id) {
        return Err(HearthError::Auth(
            "Checkout session belongs to a different user".into(),
        ));
    }
    if !session.is_paid() {
        return Err(HearthError::Billing("Checkout session is not paid".into()));
    }

    match session.mode.as_str() {
        MODE_SUBSCRIPTION => {
            let subscription_id = session
                .subscription
                .as_deref()
                .ok_or_else(|| HearthError::Billing("Session has no subscription".into()))?;
            let subscription = stripe.get_subscription(subscription_id).await?;
            let price_id = &subscription.primary_item()?.price.id;
            let tier = state
                .price_map
                .tier_for_price(price_id)
                .ok_or_else(|| HearthError::Billing(format!("Unknown price {}", price_id)))?;
            let quotas = tier.quotas();

            let mut set = doc! {
                "user_id": user_id,
                "plan": tier.as_str(),
                "max_circles": quotas.max_circles,
                "max_members_per_circle": quotas.max_members_per_circle,
                "cancel_at_period_end": subscription.cancel_at_period_end,
                "current_period_end":
                    bson::DateTime::from_millis(subscription.current_period_end * 1000),
            };
            if let Some(ref customer) = session.customer {
                set.insert("stripe_customer_id", customer);
            }

            let plans = mongo.collection::<PlanDoc>(PLAN_COLLECTION).await?;
            plans
                .upsert_one(
                    doc! { "user_id": user_id },
                    doc! { "$set": set, "$unset": { "pending_plan": "" } },
                )
                .await?;

            info!(user = %user_id, plan = tier.as_str(), "Checkout verified: subscription applied");

            Ok(VerifyCheckoutResponse::Subscription {
                r#type: "subscription",
                plan: tier.as_str().to_string(),
                max_circles: quotas.max_circles,
                max_members_per_circle: quotas.max_members_per_circle,
            })
        }

        MODE_PAYMENT => {
            let circle_id = session
                .metadata
                .get("circle_id")
                .ok_or_else(|| HearthError::Billing("Session has no circle_id".into()))?;

            let circles_coll = mongo.collection::<CircleDoc>(CIRCLE_COLLECTION).await?;
            let updated = circles_coll
                .find_one_and_update(
                    doc! { "circle_id": circle_id },
                    doc! { "$inc": { "extra_members": EXTRA_MEMBERS_BUNDLE } },
                )
                .await?
                .ok_or_else(|| HearthError::NotFound(format!("Circle {} not found", circle_id)))?;

            info!(
                user = %user_id,
                circle = %circle_id,
                extra_members = updated.extra_members,
                "Checkout verified: extra member bundle applied"
            );

            Ok(VerifyCheckoutResponse::ExtraMembers {
                r#type: "extra_members",
                circle_id: circle_id.clone(),
                extra_members: updated.extra_members,
            })
        }

        other => Err(HearthError::Billing(format!(
            "Unsupported checkout mode {}",
            other
        ))),
    }
}

/// POST /billing/downgrade-subscription
async fn handle_downgrade(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let user_id = match auth::authenticate(&state.jwt, &req) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let (mongo, stripe) = match backing(&state) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    let result: Result<DowngradeResponse> = async {
        let (_, customer) = plan_with_customer(mongo, &user_id).await?;
        let subscription = stripe.active_subscription(&customer).await?;
        let item = subscription.primary_item()?;
        let family_price = state
            .price_map
            .price_for_tier(PlanTier::Family)
            .ok_or_else(|| HearthError::Config("Family price not configured".into()))?;

        // No proration: the price changes at the next billing boundary.
        let updated = stripe
            .update_subscription_price(&subscription.id, &item.id, family_price, "none")
            .await?;

        // Quotas stay untouched until the period ends; only the scheduled
        // change and its date are persisted. A DB failure here aborts the
        // response even though the payment side already switched.
        let plans = mongo.collection::<PlanDoc>(PLAN_COLLECTION).await?;
        plans
            .update_one(
                doc! { "user_id": &user_id },
                doc! { "$set": {
                    "pending_plan": PlanTier::Family.as_str(),
                    "current_period_end":
                        bson::DateTime::from_millis(updated.current_period_end * 1000),
                } },
            )
            .await
            .map_err(|e| {
                error!(user = %user_id, error = %e, "Plan record diverged from payment state");
                e
            })?;

        info!(user = %user_id, "Downgrade scheduled");
        Ok(DowngradeResponse {
            success: true,
            pending_plan: PlanTier::Family.as_str().to_string(),
            current_period_end: rfc3339_from_unix(updated.current_period_end),
        })
    }
    .await;

    match result {
        Ok(resp) => json_response(StatusCode::OK, &resp),
        Err(e) => error_response(&e),
    }
}

/// POST /billing/cancel-downgrade
async fn handle_cancel_downgrade(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let user_id = match auth::authenticate(&state.jwt, &req) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let (mongo, stripe) = match backing(&state) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    let result: Result<CancelDowngradeResponse> = async {
        let (_, customer) = plan_with_customer(mongo, &user_id).await?;
        let subscription = stripe.active_subscription(&customer).await?;
        let item = subscription.primary_item()?;
        let extended_price = state
            .price_map
            .price_for_tier(PlanTier::Extended)
            .ok_or_else(|| HearthError::Config("Extended price not configured".into()))?;

        // Restoring the higher tier before the boundary incurs no new
        // charge; the customer never left it.
        let updated = stripe
            .update_subscription_price(&subscription.id, &item.id, extended_price, "none")
            .await?;

        let quotas = PlanTier::Extended.quotas();
        let plans = mongo.collection::<PlanDoc>(PLAN_COLLECTION).await?;
        plans
            .update_one(
                doc! { "user_id": &user_id },
                doc! {
                    "$set": {
                        "plan": PlanTier::Extended.as_str(),
                        "max_circles": quotas.max_circles,
                        "max_members_per_circle": quotas.max_members_per_circle,
                        "current_period_end":
                            bson::DateTime::from_millis(updated.current_period_end * 1000),
                    },
                    "$unset": { "pending_plan": "" },
                },
            )
            .await
            .map_err(|e| {
                error!(user = %user_id, error = %e, "Plan record diverged from payment state");
                e
            })?;

        // Withdrawing the downgrade also withdraws the rescue offers it
        // created.
        delete_open_offers(mongo, &user_id).await?;

        info!(user = %user_id, "Downgrade cancelled");
        Ok(CancelDowngradeResponse {
            success: true,
            plan: PlanTier::Extended.as_str().to_string(),
            current_period_end: rfc3339_from_unix(updated.current_period_end),
        })
    }
    .await;

    match result {
        Ok(resp) => json_response(StatusCode::OK, &resp),
        Err(e) => error_response(&e),
    }
}

/// POST /billing/reactivate-subscription
async fn handle_reactivate(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let user_id = match auth::authenticate(&state.jwt, &req) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let (mongo, stripe) = match backing(&state) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    let result: Result<ReactivateResponse> = async {
        let (_, customer) = plan_with_customer(mongo, &user_id).await?;
        let subscription = stripe.active_subscription(&customer).await?;
        let updated = stripe
            .set_cancel_at_period_end(&subscription.id, false)
            .await?;

        let plans = mongo.collection::<PlanDoc>(PLAN_COLLECTION).await?;
        plans
            .update_one(
                doc! { "user_id": &user_id },
                doc! { "$set": { "cancel_at_period_end": false } },
            )
            .await
            .map_err(|e| {
                error!(user = %user_id, error = %e, "Plan record diverged from payment state");
                e
            })?;

        delete_open_offers(mongo, &user_id).await?;

        info!(user = %user_id, "Subscription reactivated");
        Ok(ReactivateResponse {
            success: true,
            current_period_end: rfc3339_from_unix(updated.current_period_end),
        })
    }
    .await;

    match result {
        Ok(resp) => json_response(StatusCode::OK, &resp),
        Err(e) => error_response(&e),
    }
}

/// POST /billing/preview-upgrade
async fn handle_preview_upgrade(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let user_id = match auth::authenticate(&state.jwt, &req) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let (mongo, stripe) = match backing(&state) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let body: PreviewUpgradeRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result: Result<PreviewUpgradeResponse> = async {
        let tier = state
            .price_map
            .tier_for_price(&body.price_id)
            .ok_or_else(|| HearthError::Billing(format!("Unknown price {}", body.price_id)))?;

        let (_, customer) = plan_with_customer(mongo, &user_id).await?;
        let subscription = stripe.active_subscription(&customer).await?;
        let item = subscription.primary_item()?;

        let (invoice, price) = tokio::try_join!(
            stripe.preview_price_change(&customer, &subscription.id, &item.id, &body.price_id),
            stripe.get_price(&body.price_id),
        )?;

        Ok(PreviewUpgradeResponse {
            prorated_amount: invoice.amount_due,
            new_monthly_price: price.unit_amount.unwrap_or(0),
            next_billing_date: rfc3339_from_unix(subscription.current_period_end),
            plan_name: tier.as_str().to_string(),
        })
    }
    .await;

    match result {
        Ok(resp) => json_response(StatusCode::OK, &resp),
        Err(e) => error_response(&e),
    }
}

/// POST /billing/cleanup-rescue-offers
///
/// Scheduled entry point for the expiry sweep; gated by the admin API key
/// when one is configured.
async fn handle_cleanup(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    if let Some(ref admin_key) = state.args.api_key_admin {
        let bearer = req
            .headers()
            .get(hyper::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));
        if bearer != Some(admin_key.as_str()) {
            return error_response(&HearthError::Auth("Admin key required".into()));
        }
    } else if !state.args.dev_mode {
        return error_response(&HearthError::Auth(
            "Cleanup endpoint requires API_KEY_ADMIN".into(),
        ));
    }

    let Some(ref mongo) = state.mongo else {
        return service_unavailable("Database");
    };

    match circles::expire_rescue_offers(mongo).await {
        Ok(expired) => json_response(StatusCode::OK, &CleanupResponse { expired }),
        Err(e) => error_response(&e),
    }
}

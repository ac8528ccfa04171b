//! Ownership claim transition
//!
//! Reassigns a transfer-blocked circle to a claiming member. The claim is
//! a single conditional update on the circle document, so exactly one of
//! any set of concurrent claimants wins; losers observe a conflict.

use bson::doc;
use tracing::{info, warn};

use crate::capacity;
use crate::db::schemas::{
    CircleDoc, NotificationDoc, OfferStatus, PlanDoc, RescueOfferDoc, CIRCLE_COLLECTION,
    PLAN_COLLECTION, RESCUE_OFFER_COLLECTION,
};
use crate::db::MongoClient;
use crate::services::notifier;
use crate::types::{HearthError, Result};

/// Result of a claim attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Ownership reassigned; the previous owner was notified
    Claimed { previous_owner: String },
    /// Caller already owns the circle; nothing changed, nobody notified
    AlreadyOwner,
}

/// Claim ownership of a transfer-blocked circle.
///
/// Preconditions: the caller is authenticated, is not the current owner,
/// and the circle has `transfer_block = true`. The caller's own circle
/// quota is enforced before the reassignment; violations carry the
/// `CIRCLE_LIMIT_REACHED` sentinel so clients can offer an upgrade instead
/// of a generic error. No failure is retried automatically.
pub async fn claim_circle(
    mongo: &MongoClient,
    claimant: &str,
    circle_id: &str,
) -> Result<ClaimOutcome> {
    let circles = mongo.collection::<CircleDoc>(CIRCLE_COLLECTION).await?;

    let circle = circles
        .find_one(doc! { "circle_id": circle_id })
        .await?
        .ok_or_else(|| HearthError::NotFound(format!("Circle {} not found", circle_id)))?;

    // Idempotent repeat: the claimant already owns it. Never re-notify.
    if circle.owner_id == claimant {
        return Ok(ClaimOutcome::AlreadyOwner);
    }

    if !circle.transfer_block {
        return Err(HearthError::Conflict(
            "Circle is not awaiting a new owner".into(),
        ));
    }

    // Enforce the claimant's circle quota before touching ownership
    let plans = mongo.collection::<PlanDoc>(PLAN_COLLECTION).await?;
    let (plan, owned_count) = tokio::try_join!(
        plans.find_one(doc! { "user_id": claimant }),
        circles.count(doc! { "owner_id": claimant }),
    )?;
    let allowed = capacity::max_circles(plan.as_ref());
    if owned_count as i64 >= allowed as i64 {
        return Err(HearthError::circle_limit(&format!(
            "your plan allows {} owned circle(s)",
            allowed
        )));
    }

    let previous_owner = circle.owner_id.clone();

    // The conditional filter is the serialization point: it only matches
    // while the circle is still transfer-blocked and owned by someone else.
    let updated = circles
        .find_one_and_update(
            doc! {
                "circle_id": circle_id,
                "transfer_block": true,
                "owner_id": { "$ne": claimant },
            },
            doc! { "$set": { "owner_id": claimant, "transfer_block": false } },
        )
        .await?;

    let Some(circle) = updated else {
        return Err(HearthError::Conflict(
            "Circle was claimed by another member".into(),
        ));
    };

    info!(
        circle = %circle_id,
        new_owner = %claimant,
        previous_owner = %previous_owner,
        "Circle ownership claimed"
    );

    // Retire any open rescue offers for this circle
    let offers = mongo
        .collection::<RescueOfferDoc>(RESCUE_OFFER_COLLECTION)
        .await?;
    offers
        .update_many(
            doc! { "circle_id": circle_id, "status": OfferStatus::Open.as_str() },
            doc! { "$set": { "status": OfferStatus::Claimed.as_str() } },
        )
        .await?;

    // Best-effort: a failed notification never rolls back the claim
    if let Err(e) = notifier::notify(
        mongo,
        NotificationDoc::ownership_claimed(&previous_owner, &circle.name, circle_id, claimant),
    )
    .await
    {
        warn!(circle = %circle_id, error = %e, "Failed to notify previous owner");
    }

    Ok(ClaimOutcome::Claimed { previous_owner })
}

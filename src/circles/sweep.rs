//! Rescue offer expiry sweep
//!
//! Expires open offers whose deadline passed and notifies the then-current
//! owner, once per offer. The sweep is not transactional across offers:
//! a partial run leaves some offers open, and the next run picks exactly
//! those up again because the query re-selects only `status = open`.

use bson::{doc, DateTime};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::db::schemas::{
    NotificationDoc, OfferStatus, RescueOfferDoc, RESCUE_OFFER_COLLECTION,
};
use crate::db::MongoClient;
use crate::services::notifier;
use crate::server::AppState;
use crate::types::Result;

/// Expire all open rescue offers past their deadline.
///
/// Returns the number of offers transitioned to `expired`. Safe to run
/// repeatedly and concurrently: the per-offer conditional update only
/// matches offers still open, so each eligible offer is expired (and its
/// owner notified) exactly once.
pub async fn expire_rescue_offers(mongo: &MongoClient) -> Result<u64> {
    let offers = mongo
        .collection::<RescueOfferDoc>(RESCUE_OFFER_COLLECTION)
        .await?;

    let now = DateTime::now();
    let eligible = offers
        .find_many(doc! {
            "status": OfferStatus::Open.as_str(),
            "deadline": { "$lt": now },
        })
        .await?;

    let mut expired = 0u64;
    for offer in eligible {
        let result = offers
            .update_one(
                doc! { "offer_id": &offer.offer_id, "status": OfferStatus::Open.as_str() },
                doc! { "$set": { "status": OfferStatus::Expired.as_str() } },
            )
            .await?;

        // Zero modifications means another sweep (or a claim) got here
        // first; skip the notification.
        if result.modified_count == 0 {
            continue;
        }
        expired += 1;

        if let Err(e) = notifier::notify(
            mongo,
            NotificationDoc::rescue_expired(&offer.current_owner, &offer.circle_id),
        )
        .await
        {
            warn!(
                offer = %offer.offer_id,
                error = %e,
                "Failed to notify owner of expired rescue offer"
            );
        }
    }

    if expired > 0 {
        info!(expired, "Rescue offer sweep completed");
    } else {
        debug!("Rescue offer sweep found nothing to expire");
    }

    Ok(expired)
}

/// Spawn the periodic expiry sweep
pub fn spawn_sweep_task(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let Some(ref mongo) = state.mongo else {
                debug!("Sweep skipped (no database)");
                continue;
            };
            if let Err(e) = expire_rescue_offers(mongo).await {
                error!(error = %e, "Rescue offer sweep failed");
            }
        }
    });
    info!("Rescue offer sweep task started");
}

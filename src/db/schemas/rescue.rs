//! Rescue offer schema
//!
//! A time-boxed opportunity for a circle's members to claim ownership
//! after the owner's entitlement lapsed. Offers are terminal once claimed
//! or expired; the expiry sweep is the only writer of `Expired`.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for rescue offers
pub const RESCUE_OFFER_COLLECTION: &str = "circle_rescue_offers";

/// Lifecycle status of a rescue offer
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    /// Awaiting a claimant
    #[default]
    Open,
    /// Deadline passed with no claimant (terminal)
    Expired,
    /// A member claimed ownership (terminal)
    Claimed,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Expired => "expired",
            Self::Claimed => "claimed",
        }
    }
}

/// Rescue offer document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RescueOfferDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable offer identifier
    pub offer_id: String,

    /// Circle awaiting a new owner
    pub circle_id: String,

    /// Owner whose entitlement lapsed (notified on expiry)
    pub current_owner: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: OfferStatus,

    /// Claim deadline; past-deadline open offers are expired by the sweep
    pub deadline: DateTime,
}

// `bson::DateTime` has no `Default` impl, so `Default` cannot be derived.
// This hand-written impl mirrors what the derive would produce, using the
// epoch-zero timestamp for `deadline` (callers always set it explicitly).
impl Default for RescueOfferDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            offer_id: String::default(),
            circle_id: String::default(),
            current_owner: String::default(),
            status: OfferStatus::default(),
            deadline: DateTime::from_millis(0),
        }
    }
}

impl RescueOfferDoc {
    /// Whether this offer is eligible for the expiry sweep at `now`
    pub fn is_expirable(&self, now: DateTime) -> bool {
        self.status == OfferStatus::Open && self.deadline < now
    }
}

impl IntoIndexes for RescueOfferDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "offer_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("offer_id_unique".to_string())
                        .build(),
                ),
            ),
            // Sweep query: open offers past their deadline
            (
                doc! { "status": 1, "deadline": 1 },
                Some(
                    IndexOptions::builder()
                        .name("status_deadline_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "current_owner": 1 },
                Some(
                    IndexOptions::builder()
                        .name("current_owner_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for RescueOfferDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(status: OfferStatus, deadline_ms: i64) -> RescueOfferDoc {
        RescueOfferDoc {
            offer_id: "offer-1".into(),
            circle_id: "C1".into(),
            current_owner: "user-a".into(),
            status,
            deadline: DateTime::from_millis(deadline_ms),
            ..Default::default()
        }
    }

    #[test]
    fn only_open_past_deadline_offers_are_expirable() {
        let now = DateTime::from_millis(10_000);
        assert!(offer(OfferStatus::Open, 9_999).is_expirable(now));
        assert!(!offer(OfferStatus::Open, 10_000).is_expirable(now));
        assert!(!offer(OfferStatus::Open, 10_001).is_expirable(now));
        assert!(!offer(OfferStatus::Expired, 9_999).is_expirable(now));
        assert!(!offer(OfferStatus::Claimed, 9_999).is_expirable(now));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&OfferStatus::Open).unwrap();
        assert_eq!(json, "\"open\"");
        let parsed: OfferStatus = serde_json::from_str("\"expired\"").unwrap();
        assert_eq!(parsed, OfferStatus::Expired);
    }
}

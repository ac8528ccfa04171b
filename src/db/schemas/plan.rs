//! Plan record schema
//!
//! One row per user carrying the subscription tier and its quotas.
//! Written exclusively by the Billing Bridge in response to payment
//! confirmations or cancellations.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::billing::plans::PlanTier;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for plan records
pub const PLAN_COLLECTION: &str = "user_plans";

/// Plan record document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PlanDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user id
    pub user_id: String,

    /// Plan tier name: "free", "family", or "extended"
    pub plan: String,

    /// Circles this user may own
    pub max_circles: i32,

    /// Base member seats per circle (owner included)
    pub max_members_per_circle: i32,

    /// Extra member seats applied plan-wide
    #[serde(default)]
    pub extra_members: i32,

    /// A scheduled downgrade, effective at `current_period_end`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_plan: Option<String>,

    /// Whether the subscription ends at the period boundary
    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// End of the current billing period
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime>,

    /// Payment-processor customer id backing this plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
}

impl PlanDoc {
    /// Create a plan record for a tier with its stock quotas
    pub fn for_tier(user_id: String, tier: PlanTier) -> Self {
        let quotas = tier.quotas();
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            plan: tier.as_str().to_string(),
            max_circles: quotas.max_circles,
            max_members_per_circle: quotas.max_members_per_circle,
            extra_members: 0,
            pending_plan: None,
            cancel_at_period_end: false,
            current_period_end: None,
            stripe_customer_id: None,
        }
    }

    /// The tier this record is on, defaulting to Free for unknown values
    pub fn tier(&self) -> PlanTier {
        PlanTier::parse(&self.plan).unwrap_or(PlanTier::Free)
    }
}

impl IntoIndexes for PlanDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("plan_user_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for PlanDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

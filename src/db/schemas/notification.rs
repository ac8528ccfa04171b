//! Notification schema
//!
//! Append-only; created as a side effect of ownership-claim and
//! rescue-expiry events. Never updated or deleted by this service.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for notifications
pub const NOTIFICATION_COLLECTION: &str = "notifications";

/// Notification document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct NotificationDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Recipient user id
    pub user_id: String,

    /// Type tag ("ownership_claimed", "rescue_expired", ...)
    pub kind: String,

    /// Short headline
    pub title: String,

    /// Body text
    pub message: String,

    /// Related circle, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_circle_id: Option<String>,

    /// Related user, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_user_id: Option<String>,

    /// Deep link for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl NotificationDoc {
    /// Notify a previous owner that their circle was claimed
    pub fn ownership_claimed(previous_owner: &str, circle_name: &str, circle_id: &str, new_owner: &str) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id: previous_owner.to_string(),
            kind: "ownership_claimed".to_string(),
            title: "Circle ownership transferred".to_string(),
            message: format!("Ownership of \"{}\" was claimed by another member.", circle_name),
            related_circle_id: Some(circle_id.to_string()),
            related_user_id: Some(new_owner.to_string()),
            link: Some(format!("/circles/{}", circle_id)),
        }
    }

    /// Notify an owner that a rescue offer expired unclaimed
    pub fn rescue_expired(owner: &str, circle_id: &str) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id: owner.to_string(),
            kind: "rescue_expired".to_string(),
            title: "Rescue offer expired".to_string(),
            message: "No member claimed your circle before the deadline. It stays read-only until you upgrade or transfer it.".to_string(),
            related_circle_id: Some(circle_id.to_string()),
            related_user_id: None,
            link: Some(format!("/circles/{}", circle_id)),
        }
    }
}

impl IntoIndexes for NotificationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("notification_user_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for NotificationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

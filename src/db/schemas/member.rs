//! Circle membership schema
//!
//! One row per (circle, member). The owner is not stored here; seat counts
//! add 1 for the owner on top of these rows.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for circle memberships
pub const MEMBER_COLLECTION: &str = "circle_members";

/// Membership document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MemberDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Circle this membership belongs to
    pub circle_id: String,

    /// Member's user id
    pub user_id: String,
}

impl MemberDoc {
    pub fn new(circle_id: String, user_id: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            circle_id,
            user_id,
        }
    }
}

impl IntoIndexes for MemberDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "circle_id": 1, "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("circle_member_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("member_user_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for MemberDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

//! Circle document schema
//!
//! A circle is a private group with exactly one owner at a time. The
//! Ownership Transfer Workflow is the only writer of `transfer_block` and
//! `owner_id`; the Billing Bridge is the only writer of `extra_members`.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for circles
pub const CIRCLE_COLLECTION: &str = "circles";

/// Circle document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CircleDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable circle identifier (exposed to clients)
    pub circle_id: String,

    /// Display name
    pub name: String,

    /// Current owner's user id
    pub owner_id: String,

    /// Extra member seats purchased for this circle (one-time bundles)
    #[serde(default)]
    pub extra_members: i32,

    /// Set when the owner's entitlement lapsed and the circle awaits a new
    /// owner; cleared by a successful claim
    #[serde(default)]
    pub transfer_block: bool,
}

impl CircleDoc {
    /// Create a new circle document
    pub fn new(circle_id: String, name: String, owner_id: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            circle_id,
            name,
            owner_id,
            extra_members: 0,
            transfer_block: false,
        }
    }
}

impl IntoIndexes for CircleDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "circle_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("circle_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "owner_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CircleDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

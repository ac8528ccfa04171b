//! Circle directory
//!
//! Loads the circles a user owns or belongs to. Read-only: never mutates
//! circle or plan rows. The owned-circles and membership queries run
//! concurrently and the merge deduplicates by circle id, so ordering
//! between the two is irrelevant.

use bson::{doc, DateTime};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::capacity;
use crate::circles::state::{banners_for, derive_state, Banner, CircleState};
use crate::db::schemas::{
    CircleDoc, MemberDoc, OfferStatus, PlanDoc, RescueOfferDoc, CIRCLE_COLLECTION,
    MEMBER_COLLECTION, PLAN_COLLECTION, RESCUE_OFFER_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::Result;

/// A circle as seen by one viewer, with its derived state and banners
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleView {
    pub circle_id: String,
    pub name: String,
    pub owner_id: String,
    pub extra_members: i32,
    #[serde(flatten)]
    pub state: CircleState,
    pub read_only: bool,
    pub viewer_is_owner: bool,
    pub banners: Vec<Banner>,
}

/// Load the circles a user owns or belongs to, deduplicated by circle id
/// and ordered by creation time
pub async fn load_for_user(mongo: &MongoClient, user_id: &str) -> Result<Vec<CircleDoc>> {
    let circles = mongo.collection::<CircleDoc>(CIRCLE_COLLECTION).await?;
    let members = mongo.collection::<MemberDoc>(MEMBER_COLLECTION).await?;

    let (owned, memberships) = tokio::try_join!(
        circles.find_many(doc! { "owner_id": user_id }),
        members.find_many(doc! { "user_id": user_id }),
    )?;

    let member_circle_ids: Vec<String> =
        memberships.into_iter().map(|m| m.circle_id).collect();

    let joined = if member_circle_ids.is_empty() {
        Vec::new()
    } else {
        circles
            .find_many(doc! { "circle_id": { "$in": &member_circle_ids } })
            .await?
    };

    let mut by_id: HashMap<String, CircleDoc> = HashMap::new();
    for circle in owned.into_iter().chain(joined) {
        by_id.entry(circle.circle_id.clone()).or_insert(circle);
    }

    let mut merged: Vec<CircleDoc> = by_id.into_values().collect();
    merged.sort_by_key(|c| c.metadata.created_at.unwrap_or(DateTime::MIN));
    Ok(merged)
}

/// Occupied seats for a circle: member rows + 1 for the owner
pub async fn occupied_seats(mongo: &MongoClient, circle_id: &str) -> Result<u32> {
    let members = mongo.collection::<MemberDoc>(MEMBER_COLLECTION).await?;
    let count = members.count(doc! { "circle_id": circle_id }).await?;
    Ok(count as u32 + 1)
}

/// The subset of a list of circle ids (in creation order) that fall beyond
/// the owner's circle quota and are therefore read-only
pub fn overflow_read_only(ordered_circle_ids: &[String], max_circles: i32) -> HashSet<String> {
    ordered_circle_ids
        .iter()
        .skip(max_circles.max(0) as usize)
        .cloned()
        .collect()
}

/// Circle ids owned by `owner_id` that the owner's plan no longer covers
pub async fn read_only_circle_ids(
    mongo: &MongoClient,
    owner_id: &str,
) -> Result<HashSet<String>> {
    let circles = mongo.collection::<CircleDoc>(CIRCLE_COLLECTION).await?;
    let plans = mongo.collection::<PlanDoc>(PLAN_COLLECTION).await?;

    let (mut owned, plan) = tokio::try_join!(
        circles.find_many(doc! { "owner_id": owner_id }),
        plans.find_one(doc! { "user_id": owner_id }),
    )?;

    owned.sort_by_key(|c| c.metadata.created_at.unwrap_or(DateTime::MIN));
    let ordered: Vec<String> = owned.into_iter().map(|c| c.circle_id).collect();
    Ok(overflow_read_only(&ordered, capacity::max_circles(plan.as_ref())))
}

/// Assemble the full directory view for a user: each circle with its
/// derived state and the banners this viewer should see
pub async fn build_views(mongo: &MongoClient, user_id: &str) -> Result<Vec<CircleView>> {
    let circles = load_for_user(mongo, user_id).await?;
    if circles.is_empty() {
        return Ok(Vec::new());
    }

    let circle_ids: Vec<String> = circles.iter().map(|c| c.circle_id.clone()).collect();

    // Open rescue offers for any of these circles
    let offers = mongo
        .collection::<RescueOfferDoc>(RESCUE_OFFER_COLLECTION)
        .await?
        .find_many(doc! {
            "circle_id": { "$in": &circle_ids },
            "status": OfferStatus::Open.as_str(),
        })
        .await?;
    let open_deadlines: HashMap<String, DateTime> = offers
        .into_iter()
        .map(|o| (o.circle_id, o.deadline))
        .collect();

    // Read-only predicate is per-owner (plan vs circle quota)
    let owners: HashSet<String> = circles.iter().map(|c| c.owner_id.clone()).collect();
    let mut read_only: HashSet<String> = HashSet::new();
    for owner in owners {
        read_only.extend(read_only_circle_ids(mongo, &owner).await?);
    }

    let views = circles
        .into_iter()
        .map(|circle| {
            let is_read_only = read_only.contains(&circle.circle_id);
            let state = derive_state(
                &circle,
                open_deadlines.get(&circle.circle_id).copied(),
                is_read_only,
            );
            let viewer_is_owner = circle.owner_id == user_id;
            let banners = banners_for(state, is_read_only, viewer_is_owner);
            CircleView {
                circle_id: circle.circle_id,
                name: circle.name,
                owner_id: circle.owner_id,
                extra_members: circle.extra_members,
                state,
                read_only: is_read_only,
                viewer_is_owner,
                banners,
            }
        })
        .collect();

    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circles_beyond_the_quota_are_read_only() {
        let ids = vec!["C1".to_string(), "C2".to_string(), "C3".to_string()];
        let overflow = overflow_read_only(&ids, 1);
        assert!(!overflow.contains("C1"));
        assert!(overflow.contains("C2"));
        assert!(overflow.contains("C3"));
    }

    #[test]
    fn quota_covering_all_circles_marks_none() {
        let ids = vec!["C1".to_string(), "C2".to_string()];
        assert!(overflow_read_only(&ids, 3).is_empty());
        assert!(overflow_read_only(&ids, 2).is_empty());
    }

    #[test]
    fn zero_or_negative_quota_marks_everything() {
        let ids = vec!["C1".to_string(), "C2".to_string()];
        assert_eq!(overflow_read_only(&ids, 0).len(), 2);
        assert_eq!(overflow_read_only(&ids, -1).len(), 2);
    }
}

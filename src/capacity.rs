//! Capacity policy
//!
//! Pure computation of whether a circle is within its member quota given
//! the owner's plan record and the circle's occupied seats. No side
//! effects; callers propagate their own lookup failures.

use serde::Serialize;

use crate::billing::plans::PlanTier;
use crate::db::schemas::{CircleDoc, PlanDoc};

/// Result of a capacity evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleCapacity {
    /// Occupied seats (members + 1 for the owner)
    pub current_count: u32,
    /// Effective member limit
    pub limit: u32,
    /// Whether the circle is at or over its limit
    pub is_full: bool,
}

/// Evaluate a circle's capacity.
///
/// The effective limit is the plan's base seats plus every extra seat that
/// applies: plan-wide extras and the circle's own purchased bundles. A
/// missing plan record means the Free tier.
pub fn evaluate(plan: Option<&PlanDoc>, circle: &CircleDoc, occupied_seats: u32) -> CircleCapacity {
    let (base, plan_extra) = match plan {
        Some(p) => (p.max_members_per_circle, p.extra_members),
        None => (PlanTier::Free.quotas().max_members_per_circle, 0),
    };

    let limit = (base.max(0) + plan_extra.max(0) + circle.extra_members.max(0)) as u32;

    CircleCapacity {
        current_count: occupied_seats,
        limit,
        is_full: occupied_seats >= limit,
    }
}

/// Circles a user may own under a plan (missing plan means Free)
pub fn max_circles(plan: Option<&PlanDoc>) -> i32 {
    match plan {
        Some(p) => p.max_circles.max(0),
        None => PlanTier::Free.quotas().max_circles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::plans::PlanTier;

    fn circle(extra: i32) -> CircleDoc {
        CircleDoc {
            circle_id: "C1".into(),
            name: "Family".into(),
            owner_id: "user-a".into(),
            extra_members: extra,
            ..Default::default()
        }
    }

    #[test]
    fn limit_is_base_plus_extras() {
        let mut plan = PlanDoc::for_tier("user-a".into(), PlanTier::Extended);
        plan.extra_members = 2;
        let cap = evaluate(Some(&plan), &circle(7), 10);
        assert_eq!(cap.limit, 35 + 2 + 7);
        assert_eq!(cap.current_count, 10);
        assert!(!cap.is_full);
    }

    #[test]
    fn missing_plan_defaults_to_free_limit_eight() {
        let cap = evaluate(None, &circle(0), 3);
        assert_eq!(cap.limit, 8);
        assert!(!cap.is_full);

        let cap = evaluate(None, &circle(0), 8);
        assert!(cap.is_full);
    }

    #[test]
    fn is_full_at_exactly_the_limit() {
        let plan = PlanDoc::for_tier("user-a".into(), PlanTier::Family);
        let cap = evaluate(Some(&plan), &circle(0), 15);
        assert!(cap.is_full);
        let cap = evaluate(Some(&plan), &circle(0), 14);
        assert!(!cap.is_full);
        let cap = evaluate(Some(&plan), &circle(0), 16);
        assert!(cap.is_full);
    }

    #[test]
    fn circle_bundle_raises_the_limit() {
        let plan = PlanDoc::for_tier("user-a".into(), PlanTier::Free);
        let full_without_bundle = evaluate(Some(&plan), &circle(0), 8);
        assert!(full_without_bundle.is_full);

        let with_bundle = evaluate(Some(&plan), &circle(7), 8);
        assert_eq!(with_bundle.limit, 15);
        assert!(!with_bundle.is_full);
    }

    #[test]
    fn max_circles_defaults_to_free() {
        assert_eq!(max_circles(None), 1);
        let plan = PlanDoc::for_tier("user-a".into(), PlanTier::Extended);
        assert_eq!(max_circles(Some(&plan)), 3);
    }
}

//! Lifecycle tests exercising the public crate surface: capacity policy,
//! state derivation, banner branching, and plan tier mapping.

use bson::DateTime;

use hearth::billing::plans::{PlanTier, EXTRA_MEMBERS_BUNDLE};
use hearth::capacity;
use hearth::circles::{banners_for, derive_state, BannerAction, BannerKind, CircleState};
use hearth::db::schemas::{CircleDoc, PlanDoc};

fn circle(extra_members: i32, transfer_block: bool) -> CircleDoc {
    CircleDoc {
        circle_id: "C1".into(),
        name: "The Lake House".into(),
        owner_id: "user-a".into(),
        extra_members,
        transfer_block,
        ..Default::default()
    }
}

#[test]
fn effective_limit_is_base_plus_extras_across_tiers() {
    for tier in [PlanTier::Free, PlanTier::Family, PlanTier::Extended] {
        let plan = PlanDoc::for_tier("user-a".into(), tier);
        let base = tier.quotas().max_members_per_circle;

        for extra in [0, EXTRA_MEMBERS_BUNDLE, 2 * EXTRA_MEMBERS_BUNDLE] {
            let cap = capacity::evaluate(Some(&plan), &circle(extra, false), 1);
            assert_eq!(cap.limit as i32, base + extra);
        }
    }
}

#[test]
fn is_full_exactly_at_the_boundary() {
    let plan = PlanDoc::for_tier("user-a".into(), PlanTier::Extended);
    let c = circle(0, false);
    assert!(!capacity::evaluate(Some(&plan), &c, 34).is_full);
    assert!(capacity::evaluate(Some(&plan), &c, 35).is_full);
    assert!(capacity::evaluate(Some(&plan), &c, 36).is_full);
}

#[test]
fn missing_plan_record_defaults_to_free() {
    let cap = capacity::evaluate(None, &circle(0, false), 8);
    assert_eq!(cap.limit, 8);
    assert!(cap.is_full);
}

#[test]
fn state_priority_rescue_then_transfer_then_read_only() {
    let deadline = DateTime::from_millis(42_000);

    let c = circle(0, true);
    assert_eq!(
        derive_state(&c, Some(deadline), true),
        CircleState::RescuePending { deadline }
    );
    assert_eq!(derive_state(&c, None, true), CircleState::TransferBlocked);

    let c = circle(0, false);
    assert_eq!(derive_state(&c, None, true), CircleState::ReadOnly);
    assert_eq!(derive_state(&c, None, false), CircleState::Active);
}

#[test]
fn owner_and_member_see_different_read_only_banners() {
    // Circle owned by A, flagged read-only, viewed by member B
    let member_view = banners_for(CircleState::ReadOnly, true, false);
    assert_eq!(member_view.len(), 1);
    assert_eq!(member_view[0].kind, BannerKind::ReadOnly);
    assert_eq!(member_view[0].action, None);

    // Same circle viewed by owner A: upgrade call-to-action
    let owner_view = banners_for(CircleState::ReadOnly, true, true);
    assert_eq!(owner_view[0].action, Some(BannerAction::Upgrade));
}

#[test]
fn transfer_banner_offers_claim_to_non_owners_only() {
    let member_view = banners_for(CircleState::TransferBlocked, false, false);
    assert_eq!(member_view.len(), 1);
    assert_eq!(member_view[0].action, Some(BannerAction::Claim));

    let owner_view = banners_for(CircleState::TransferBlocked, false, true);
    assert_eq!(owner_view[0].action, None);
}

#[test]
fn transfer_and_read_only_banners_render_together() {
    let views = banners_for(CircleState::TransferBlocked, true, false);
    assert_eq!(views.len(), 2);
    assert!(views.iter().any(|b| b.kind == BannerKind::ReadOnly));
    assert!(views.iter().any(|b| b.kind == BannerKind::Transfer));
}

#[test]
fn extended_tier_carries_the_contracted_quotas() {
    let plan = PlanDoc::for_tier("user-a".into(), PlanTier::Extended);
    assert_eq!(plan.plan, "extended");
    assert_eq!(plan.max_circles, 3);
    assert_eq!(plan.max_members_per_circle, 35);
    assert_eq!(plan.tier(), PlanTier::Extended);
}

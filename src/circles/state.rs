//! Circle state machine and banner derivation

use bson::DateTime;
use serde::Serialize;

use crate::db::schemas::CircleDoc;

/// One tagged lifecycle state per circle.
///
/// Derivation priority when the underlying facts overlap: an open rescue
/// offer wins over a bare transfer block, which wins over read-only, which
/// wins over active. A rescue-pending or transfer-blocked circle may still
/// independently be read-only; the banner view reflects both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CircleState {
    /// Normal operation
    Active,
    /// Owner's plan no longer covers this circle; writes externally blocked
    ReadOnly,
    /// Owner's entitlement lapsed; circle awaits a new owner
    TransferBlocked,
    /// An open rescue offer exists with a claim deadline
    RescuePending {
        #[serde(with = "bson::serde_helpers::bson_datetime_as_rfc3339_string")]
        deadline: DateTime,
    },
}

/// Derive a circle's state from the stored facts.
///
/// `open_offer_deadline` is the deadline of an open rescue offer, if one
/// exists; `read_only` is the plan-vs-quota predicate computed by the
/// directory.
pub fn derive_state(
    circle: &CircleDoc,
    open_offer_deadline: Option<DateTime>,
    read_only: bool,
) -> CircleState {
    if let Some(deadline) = open_offer_deadline {
        return CircleState::RescuePending { deadline };
    }
    if circle.transfer_block {
        return CircleState::TransferBlocked;
    }
    if read_only {
        return CircleState::ReadOnly;
    }
    CircleState::Active
}

// =============================================================================
// Banner view
// =============================================================================

/// Action a banner offers the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerAction {
    /// Owner-facing upgrade call-to-action
    Upgrade,
    /// Member-facing claim-ownership action
    Claim,
}

/// Banner category, for client styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    ReadOnly,
    Transfer,
}

/// A banner the client renders above a circle's feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    /// Hidden when `None` (e.g. the transfer banner for the current owner)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<BannerAction>,
}

/// Compute the banners for a circle as seen by one viewer.
///
/// The read-only banner text branches on whether the viewer is the owner;
/// the transfer banner shows for any transfer-blocked or rescue-pending
/// circle, with its claim action hidden for the current owner.
pub fn banners_for(state: CircleState, read_only: bool, viewer_is_owner: bool) -> Vec<Banner> {
    let mut banners = Vec::new();

    if read_only {
        banners.push(if viewer_is_owner {
            Banner {
                kind: BannerKind::ReadOnly,
                message: "This circle is read-only because it exceeds your plan. Upgrade to restore posting.".to_string(),
                action: Some(BannerAction::Upgrade),
            }
        } else {
            Banner {
                kind: BannerKind::ReadOnly,
                message: "This circle is read-only until its owner upgrades their plan.".to_string(),
                action: None,
            }
        });
    }

    match state {
        CircleState::TransferBlocked | CircleState::RescuePending { .. } => {
            banners.push(Banner {
                kind: BannerKind::Transfer,
                message: "This circle needs a new owner before posting can resume.".to_string(),
                action: if viewer_is_owner {
                    None
                } else {
                    Some(BannerAction::Claim)
                },
            });
        }
        CircleState::Active | CircleState::ReadOnly => {}
    }

    banners
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(transfer_block: bool) -> CircleDoc {
        CircleDoc {
            circle_id: "C1".into(),
            name: "Family".into(),
            owner_id: "user-a".into(),
            transfer_block,
            ..Default::default()
        }
    }

    #[test]
    fn rescue_pending_wins_over_everything() {
        let deadline = DateTime::from_millis(1_000);
        let state = derive_state(&circle(true), Some(deadline), true);
        assert_eq!(state, CircleState::RescuePending { deadline });
    }

    #[test]
    fn transfer_block_wins_over_read_only() {
        assert_eq!(
            derive_state(&circle(true), None, true),
            CircleState::TransferBlocked
        );
    }

    #[test]
    fn read_only_then_active() {
        assert_eq!(derive_state(&circle(false), None, true), CircleState::ReadOnly);
        assert_eq!(derive_state(&circle(false), None, false), CircleState::Active);
    }

    #[test]
    fn read_only_banner_branches_on_viewer() {
        // Circle owned by A, flagged read-only: B sees the non-owner
        // message, A sees the upgrade link.
        let owner_view = banners_for(CircleState::ReadOnly, true, true);
        assert_eq!(owner_view.len(), 1);
        assert_eq!(owner_view[0].action, Some(BannerAction::Upgrade));
        assert!(owner_view[0].message.contains("Upgrade"));

        let member_view = banners_for(CircleState::ReadOnly, true, false);
        assert_eq!(member_view.len(), 1);
        assert_eq!(member_view[0].action, None);
        assert!(member_view[0].message.contains("owner"));
    }

    #[test]
    fn transfer_banner_hides_claim_for_owner() {
        let owner_view = banners_for(CircleState::TransferBlocked, false, true);
        assert_eq!(owner_view.len(), 1);
        assert_eq!(owner_view[0].kind, BannerKind::Transfer);
        assert_eq!(owner_view[0].action, None);

        let member_view = banners_for(CircleState::TransferBlocked, false, false);
        assert_eq!(member_view[0].action, Some(BannerAction::Claim));
    }

    #[test]
    fn read_only_and_transfer_banners_stack() {
        let deadline = DateTime::from_millis(1_000);
        let both = banners_for(CircleState::RescuePending { deadline }, true, false);
        assert_eq!(both.len(), 2);
        assert_eq!(both[0].kind, BannerKind::ReadOnly);
        assert_eq!(both[1].kind, BannerKind::Transfer);
    }

    #[test]
    fn active_circle_shows_no_banners() {
        assert!(banners_for(CircleState::Active, false, true).is_empty());
    }
}

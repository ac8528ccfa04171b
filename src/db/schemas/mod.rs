//! Document schemas for the Hearth collections

pub mod circle;
pub mod member;
pub mod metadata;
pub mod notification;
pub mod plan;
pub mod rescue;

pub use circle::{CircleDoc, CIRCLE_COLLECTION};
pub use member::{MemberDoc, MEMBER_COLLECTION};
pub use metadata::Metadata;
pub use notification::{NotificationDoc, NOTIFICATION_COLLECTION};
pub use plan::{PlanDoc, PLAN_COLLECTION};
pub use rescue::{OfferStatus, RescueOfferDoc, RESCUE_OFFER_COLLECTION};

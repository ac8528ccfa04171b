//! Circle lifecycle: state machine, directory, ownership transfer, expiry sweep
//!
//! Each circle resolves to one tagged lifecycle state with an explicit
//! priority, and the banner view derives from that state plus the viewer.
//! Keeping the state tagged (rather than as independent boolean flags)
//! pins down how the transfer and read-only conditions interact.

pub mod directory;
pub mod state;
pub mod sweep;
pub mod transfer;

pub use directory::{build_views, load_for_user, occupied_seats, read_only_circle_ids, CircleView};
pub use state::{banners_for, derive_state, Banner, BannerAction, BannerKind, CircleState};
pub use sweep::{expire_rescue_offers, spawn_sweep_task};
pub use transfer::{claim_circle, ClaimOutcome};

//! Plan tiers and their entitlement quotas
//!
//! Tier quotas are fixed; the mapping from payment-API price ids to tiers
//! comes from configuration so environments can use their own price objects.

use serde::{Deserialize, Serialize};

use crate::config::Args;

/// Member seats added by one extra-members bundle purchase
pub const EXTRA_MEMBERS_BUNDLE: i32 = 7;

/// Entitlement quotas for a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanQuotas {
    /// Circles the user may own
    pub max_circles: i32,
    /// Base member seats per circle, owner included
    pub max_members_per_circle: i32,
}

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Family,
    Extended,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Family => "family",
            Self::Extended => "extended",
        }
    }

    /// Parse a stored tier name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "family" => Some(Self::Family),
            "extended" => Some(Self::Extended),
            _ => None,
        }
    }

    /// Stock quotas for this tier
    pub fn quotas(&self) -> PlanQuotas {
        match self {
            Self::Free => PlanQuotas {
                max_circles: 1,
                max_members_per_circle: 8,
            },
            Self::Family => PlanQuotas {
                max_circles: 1,
                max_members_per_circle: 15,
            },
            Self::Extended => PlanQuotas {
                max_circles: 3,
                max_members_per_circle: 35,
            },
        }
    }
}

/// Configured mapping between payment-API price ids and tiers
#[derive(Debug, Clone)]
pub struct PriceMap {
    family: String,
    extended: String,
}

impl PriceMap {
    pub fn from_args(args: &Args) -> Self {
        Self {
            family: args.stripe_price_family.clone(),
            extended: args.stripe_price_extended.clone(),
        }
    }

    /// Resolve a price id to its tier
    pub fn tier_for_price(&self, price_id: &str) -> Option<PlanTier> {
        if price_id == self.family {
            Some(PlanTier::Family)
        } else if price_id == self.extended {
            Some(PlanTier::Extended)
        } else {
            None
        }
    }

    /// Resolve a paid tier to its price id (Free has no price)
    pub fn price_for_tier(&self, tier: PlanTier) -> Option<&str> {
        match tier {
            PlanTier::Free => None,
            PlanTier::Family => Some(&self.family),
            PlanTier::Extended => Some(&self.extended),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> PriceMap {
        PriceMap {
            family: "price_fam_123".into(),
            extended: "price_ext_456".into(),
        }
    }

    #[test]
    fn extended_tier_quotas() {
        let q = PlanTier::Extended.quotas();
        assert_eq!(q.max_circles, 3);
        assert_eq!(q.max_members_per_circle, 35);
    }

    #[test]
    fn free_tier_limit_is_eight() {
        assert_eq!(PlanTier::Free.quotas().max_members_per_circle, 8);
        assert_eq!(PlanTier::Free.quotas().max_circles, 1);
    }

    #[test]
    fn price_mapping_round_trips() {
        let map = map();
        assert_eq!(map.tier_for_price("price_fam_123"), Some(PlanTier::Family));
        assert_eq!(map.tier_for_price("price_ext_456"), Some(PlanTier::Extended));
        assert_eq!(map.tier_for_price("price_unknown"), None);
        assert_eq!(map.price_for_tier(PlanTier::Extended), Some("price_ext_456"));
        assert_eq!(map.price_for_tier(PlanTier::Free), None);
    }

    #[test]
    fn tier_names_parse() {
        assert_eq!(PlanTier::parse("extended"), Some(PlanTier::Extended));
        assert_eq!(PlanTier::parse("premium"), None);
        assert_eq!(PlanTier::Family.as_str(), "family");
    }

    #[test]
    fn bundle_size_is_seven() {
        assert_eq!(EXTRA_MEMBERS_BUNDLE, 7);
    }
}

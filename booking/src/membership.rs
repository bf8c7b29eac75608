//! Membership tiers, discounts and benefits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Membership tier, ordered by rank (Guest lowest)
///
/// Discounts never decrease as rank increases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MembershipTier {
    /// Walk-up customer without a membership
    #[default]
    Guest = 0,
    /// Entry membership
    Basic = 1,
    /// Mid-tier membership
    Premium = 2,
    /// Upper-tier membership
    Platinum = 3,
    /// Unlimited bay time
    Elite = 4,
}

impl MembershipTier {
    /// All tiers, lowest rank first
    pub const ALL: [Self; 5] = [
        Self::Guest,
        Self::Basic,
        Self::Premium,
        Self::Platinum,
        Self::Elite,
    ];

    /// Rank of the tier (0 for Guest)
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Discount on bay time, in percent
    #[must_use]
    pub const fn discount_percent(self) -> u8 {
        match self {
            Self::Guest => 0,
            Self::Basic => 15,
            Self::Premium => 20,
            Self::Platinum => 25,
            Self::Elite => 100,
        }
    }

    /// Whether the customer holds any paid membership
    #[must_use]
    pub const fn is_member(self) -> bool {
        !matches!(self, Self::Guest)
    }

    /// Human-readable tier name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Guest => "Guest",
            Self::Basic => "Basic",
            Self::Premium => "Premium",
            Self::Platinum => "Platinum",
            Self::Elite => "Elite",
        }
    }

    /// Benefits that come with the tier
    #[must_use]
    pub const fn benefits(self) -> &'static [&'static str] {
        match self {
            Self::Guest => &["Standard bay rates", "Book up to 2 days ahead"],
            Self::Basic => &[
                "15% off bay time",
                "Book up to 5 days ahead",
                "Member events",
            ],
            Self::Premium => &[
                "20% off bay time",
                "Book up to 7 days ahead",
                "Free club rental",
                "Member events",
            ],
            Self::Platinum => &[
                "25% off bay time",
                "Book up to 14 days ahead",
                "Free club rental",
                "Two guest passes per month",
                "Member events",
            ],
            Self::Elite => &[
                "Unlimited bay time",
                "Book up to 30 days ahead",
                "Personal locker",
                "Unlimited guest passes",
                "Member events",
            ],
        }
    }
}

impl fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A customer's membership: a tier plus the card details if they have one
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Tier held
    pub tier: MembershipTier,
    /// Card number, absent for guests
    pub member_number: Option<String>,
    /// Date the membership started
    pub joined: Option<NaiveDate>,
}

impl Membership {
    /// A customer without membership
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            tier: MembershipTier::Guest,
            member_number: None,
            joined: None,
        }
    }

    /// A card-holding member
    #[must_use]
    pub fn member(tier: MembershipTier, member_number: impl Into<String>, joined: NaiveDate) -> Self {
        Self {
            tier,
            member_number: Some(member_number.into()),
            joined: Some(joined),
        }
    }

    /// Discount the membership grants, in percent
    #[must_use]
    pub const fn discount_percent(&self) -> u8 {
        self.tier.discount_percent()
    }

    /// Tier to record on a session; `None` for guests
    #[must_use]
    pub const fn session_tier(&self) -> Option<MembershipTier> {
        if self.tier.is_member() {
            Some(self.tier)
        } else {
            None
        }
    }
}

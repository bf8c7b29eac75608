//! Time-of-day pricing tiers and price quotes.
//!
//! A bay-hour is priced by the tier its start hour falls in:
//!
//! | Tier      | Hours        | Base rate |
//! |-----------|--------------|-----------|
//! | Morning   | [6, 12)      | $36       |
//! | Afternoon | [12, 17)     | $48       |
//! | Evening   | [17, 22)     | $60       |
//! | Night     | [22, 6)      | $30       |
//!
//! Membership discounts apply to the base rate; a quarter of the
//! discounted total is due as deposit.

use crate::membership::MembershipTier;
use crate::types::Money;
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Share of the effective price due as deposit, in percent
pub const DEPOSIT_PERCENT: u8 = 25;

/// Discount printed as the member price on every time slot, in percent
pub const MEMBER_PRICE_DISCOUNT_PERCENT: u8 = 15;

/// Time-of-day pricing bracket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PricingTier {
    /// 6 AM to noon
    Morning,
    /// Noon to 5 PM
    Afternoon,
    /// 5 PM to 10 PM
    Evening,
    /// 10 PM to 6 AM
    Night,
}

impl PricingTier {
    /// All tiers in the order of the day
    pub const ALL: [Self; 4] = [Self::Morning, Self::Afternoon, Self::Evening, Self::Night];

    /// Base hourly rate
    #[must_use]
    pub const fn base_rate(self) -> Money {
        match self {
            Self::Morning => Money::from_dollars(36),
            Self::Afternoon => Money::from_dollars(48),
            Self::Evening => Money::from_dollars(60),
            Self::Night => Money::from_dollars(30),
        }
    }

    /// Hourly rate printed as the member price
    #[must_use]
    pub const fn member_rate(self) -> Money {
        self.base_rate()
            .apply_percent_off(MEMBER_PRICE_DISCOUNT_PERCENT)
    }

    /// First hour of the tier (inclusive)
    #[must_use]
    pub const fn start_hour(self) -> u32 {
        match self {
            Self::Morning => 6,
            Self::Afternoon => 12,
            Self::Evening => 17,
            Self::Night => 22,
        }
    }

    /// Hour the tier ends (exclusive)
    #[must_use]
    pub const fn end_hour(self) -> u32 {
        match self {
            Self::Morning => 12,
            Self::Afternoon => 17,
            Self::Evening => 22,
            Self::Night => 6,
        }
    }

    /// The tier in effect at a wall-clock hour; hours wrap modulo 24
    #[must_use]
    pub const fn for_hour(hour: u32) -> Self {
        match hour % 24 {
            6..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// The tier in effect at an instant, read on the facility's local clock
    #[must_use]
    pub fn at(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::for_hour(instant.with_timezone(&offset).hour())
    }

    /// Human-readable name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Evening => "Evening",
            Self::Night => "Night",
        }
    }

    /// Hour range text, e.g. "12 PM - 5 PM"
    #[must_use]
    pub fn hours_text(self) -> String {
        format!(
            "{} - {}",
            hour_text(self.start_hour()),
            hour_text(self.end_hour())
        )
    }
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

fn hour_text(hour: u32) -> String {
    let suffix = if hour % 24 < 12 { "AM" } else { "PM" };
    let twelve = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{twelve} {suffix}")
}

/// A priced booking: base price, membership discount, total and deposit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Price before discount
    pub base: Money,
    /// Discount percentage applied
    pub discount_percent: u8,
    /// Amount taken off the base price
    pub discount: Money,
    /// Price to pay
    pub effective: Money,
    /// Amount due up front
    pub deposit: Money,
}

impl Quote {
    /// Quote a base price under a discount percentage
    #[must_use]
    pub const fn from_base(base: Money, discount_percent: u8) -> Self {
        let effective = base.apply_percent_off(discount_percent);
        Self {
            base,
            discount_percent,
            discount: base.saturating_sub(effective),
            effective,
            deposit: effective.percent_of(DEPOSIT_PERCENT),
        }
    }

    /// One bay-hour in `tier` for a customer holding `membership`
    #[must_use]
    pub const fn hourly(tier: PricingTier, membership: MembershipTier) -> Self {
        Self::from_base(tier.base_rate(), membership.discount_percent())
    }

    /// `hours` bay-hours in `tier` for a customer holding `membership`
    #[must_use]
    pub const fn for_hours(tier: PricingTier, membership: MembershipTier, hours: u32) -> Self {
        Self::from_base(
            tier.base_rate().times(hours as u64),
            membership.discount_percent(),
        )
    }
}

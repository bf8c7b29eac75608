//! Bookable time slots.

use crate::pricing::PricingTier;
use crate::types::Money;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// Most players allowed in one bay
pub const MAX_PLAYERS: u8 = 6;

/// Errors building a time slot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// The slot ends at or before it starts
    #[error("slot ends at {end} which is not after its start {start}")]
    EmptyRange {
        /// Requested start
        start: DateTime<Utc>,
        /// Requested end
        end: DateTime<Utc>,
    },
}

/// A bookable window on the facility schedule
///
/// Slots are values: the builder methods return a new slot rather than
/// editing one in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    price: Money,
    tier: PricingTier,
    member_price: Option<Money>,
    promotion_percent: Option<u8>,
    max_players: u8,
    deposit_required: bool,
}

impl TimeSlot {
    /// A slot priced at the tier's base rate
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::EmptyRange`] if `end` is not after `start`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tier: PricingTier,
    ) -> Result<Self, SlotError> {
        if end <= start {
            return Err(SlotError::EmptyRange { start, end });
        }
        Ok(Self {
            start,
            end,
            price: tier.base_rate(),
            tier,
            member_price: None,
            promotion_percent: None,
            max_players: MAX_PLAYERS,
            deposit_required: false,
        })
    }

    /// Same slot with a member price
    #[must_use]
    pub const fn with_member_price(mut self, price: Money) -> Self {
        self.member_price = Some(price);
        self
    }

    /// Same slot with a promotional discount, capped at 100%
    #[must_use]
    pub fn with_promotion(mut self, percent: u8) -> Self {
        self.promotion_percent = Some(percent.min(100));
        self
    }

    /// Same slot with a player cap
    #[must_use]
    pub fn with_max_players(mut self, players: u8) -> Self {
        self.max_players = players.clamp(1, MAX_PLAYERS);
        self
    }

    /// Same slot with the deposit requirement set
    #[must_use]
    pub const fn with_deposit_required(mut self, required: bool) -> Self {
        self.deposit_required = required;
        self
    }

    /// Price the customer pays
    ///
    /// The member price wins when present and any promotion is ignored;
    /// otherwise the promotion comes off the base price.
    #[must_use]
    pub const fn effective_price(&self) -> Money {
        match (self.member_price, self.promotion_percent) {
            (Some(member), _) => member,
            (None, Some(percent)) => self.price.apply_percent_off(percent),
            (None, None) => self.price,
        }
    }

    /// Slot start
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Slot end
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Base price
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }

    /// Pricing tier
    #[must_use]
    pub const fn tier(&self) -> PricingTier {
        self.tier
    }

    /// Member price, if one is printed
    #[must_use]
    pub const fn member_price(&self) -> Option<Money> {
        self.member_price
    }

    /// Promotional discount, if any
    #[must_use]
    pub const fn promotion_percent(&self) -> Option<u8> {
        self.promotion_percent
    }

    /// Most players allowed
    #[must_use]
    pub const fn max_players(&self) -> u8 {
        self.max_players
    }

    /// Whether a deposit must be paid to hold the slot
    #[must_use]
    pub const fn deposit_required(&self) -> bool {
        self.deposit_required
    }

    /// Slot length
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Whether `instant` falls inside `[start, end)`
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Start time on the local clock, e.g. "2:00 PM"
    #[must_use]
    pub fn label(&self, offset: FixedOffset) -> String {
        self.start
            .with_timezone(&offset)
            .format("%-I:%M %p")
            .to_string()
    }

    /// The hourly slots of a local calendar day
    ///
    /// One slot per start hour in `hours`, read on the local clock. Each
    /// slot carries its tier and the 15% member price. Evening slots
    /// require a deposit.
    #[must_use]
    pub fn generate_day(date: NaiveDate, offset: FixedOffset, hours: Range<u32>) -> Vec<Self> {
        hours
            .filter_map(|hour| {
                let local = date.and_hms_opt(hour, 0, 0)?;
                let start = offset.from_local_datetime(&local).single()?.to_utc();
                let tier = PricingTier::for_hour(hour);
                Self::new(start, start + TimeDelta::hours(1), tier)
                    .ok()
                    .map(|slot| {
                        slot.with_member_price(tier.member_rate())
                            .with_deposit_required(tier == PricingTier::Evening)
                    })
            })
            .collect()
    }
}

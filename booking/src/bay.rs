//! Bay occupancy records and the mock occupancy simulation.

use crate::membership::MembershipTier;
use crate::types::{BayId, SessionId};
use bayline_core::RandomSource;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chance that a simulated flip happens on a bay's turn
pub const FLIP_PROBABILITY: f64 = 0.5;

const MOCK_CUSTOMERS: [&str; 8] = [
    "Jordan Reyes",
    "Sam Whitaker",
    "Priya Natarajan",
    "Alex Chen",
    "Morgan Blake",
    "Taylor Okafor",
    "Casey Lindqvist",
    "Riley Duarte",
];

const LOCATIONS: [&str; 3] = ["Lower Deck", "Upper Deck", "VIP Lounge"];

/// Errors changing a bay's occupancy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BayError {
    /// The bay already hosts a real session
    #[error("{0} is occupied")]
    Occupied(BayId),
    /// The bay is out of service
    #[error("{0} is under maintenance")]
    UnderMaintenance(BayId),
}

/// Who is in (or next in) a bay
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BayBooking {
    /// Session holding the bay; `None` for simulated occupancy
    pub session_id: Option<SessionId>,
    /// Customer name shown on the board
    pub customer_name: String,
    /// Customer's membership tier
    pub membership: MembershipTier,
    /// Planned end of the booking
    pub until: Option<DateTime<Utc>>,
}

impl BayBooking {
    /// Occupancy for a real customer session
    #[must_use]
    pub fn for_session(
        session_id: SessionId,
        customer_name: impl Into<String>,
        membership: MembershipTier,
        until: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: Some(session_id),
            customer_name: customer_name.into(),
            membership,
            until: Some(until),
        }
    }

    /// Whether the booking stands for a real session rather than mock data
    #[must_use]
    pub const fn is_session(&self) -> bool {
        self.session_id.is_some()
    }

    fn mock(rng: &dyn RandomSource, now: DateTime<Utc>) -> Self {
        let customer = MOCK_CUSTOMERS[rng.next_below(MOCK_CUSTOMERS.len())];
        let membership = MembershipTier::ALL[rng.next_below(MembershipTier::ALL.len())];
        let hours = 1 + i64::try_from(rng.next_below(3)).unwrap_or(0);
        Self {
            session_id: None,
            customer_name: customer.to_string(),
            membership,
            until: Some(now + TimeDelta::hours(hours)),
        }
    }
}

/// Live status of one bay
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BayStatus {
    /// Bay identity
    pub id: BayId,
    /// Display name
    pub name: String,
    /// Where in the facility the bay is
    pub location: String,
    /// Free to take a customer
    pub is_available: bool,
    /// Who is in the bay now
    pub current_booking: Option<BayBooking>,
    /// Who is up next
    pub next_booking: Option<BayBooking>,
    /// Out of service
    pub under_maintenance: bool,
    /// When the bay was last cleaned
    pub last_cleaning_time: Option<DateTime<Utc>>,
}

impl BayStatus {
    /// An empty, available bay
    #[must_use]
    pub fn new(id: BayId, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            location: location.into(),
            is_available: true,
            current_booking: None,
            next_booking: None,
            under_maintenance: false,
            last_cleaning_time: None,
        }
    }

    /// An available bay never has a current booking, and a bay under
    /// maintenance is never available
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        (!self.is_available || self.current_booking.is_none())
            && !(self.is_available && self.under_maintenance)
    }

    /// Put a customer in the bay
    ///
    /// A real session may displace simulated occupancy but never another
    /// real session.
    ///
    /// # Errors
    ///
    /// - [`BayError::UnderMaintenance`] if the bay is out of service
    /// - [`BayError::Occupied`] if a real session already holds the bay
    pub fn occupy(&mut self, booking: BayBooking) -> Result<(), BayError> {
        if self.under_maintenance {
            return Err(BayError::UnderMaintenance(self.id));
        }
        let displaceable = self
            .current_booking
            .as_ref()
            .is_none_or(|current| !current.is_session() && booking.is_session());
        if !self.is_available && !displaceable {
            return Err(BayError::Occupied(self.id));
        }
        self.is_available = false;
        self.current_booking = Some(booking);
        Ok(())
    }

    /// Move the planned end of `session_id`'s booking to `until`
    ///
    /// Returns `false` if the bay is not held by that session.
    pub fn extend_booking(&mut self, session_id: SessionId, until: DateTime<Utc>) -> bool {
        match self.current_booking.as_mut() {
            Some(booking) if booking.session_id == Some(session_id) => {
                booking.until = Some(until);
                true
            },
            _ => false,
        }
    }

    /// Free the bay; it is cleaned on the way out
    ///
    /// Returns `false` if the bay was already free.
    pub fn release(&mut self, now: DateTime<Utc>) -> bool {
        if self.current_booking.is_none() {
            return false;
        }
        self.current_booking = None;
        self.is_available = !self.under_maintenance;
        self.last_cleaning_time = Some(now);
        true
    }

    /// Take the bay out of service or bring it back
    ///
    /// Maintenance does not evict the current booking; the bay becomes
    /// available again only once it is empty and back in service.
    pub fn set_maintenance(&mut self, on: bool) {
        self.under_maintenance = on;
        self.is_available = !on && self.current_booking.is_none();
    }

    /// One turn of the mock occupancy simulation
    ///
    /// An available bay becomes occupied by a random mock customer with
    /// even odds; a mock-occupied bay empties with even odds. Bays under
    /// maintenance and bays held by real sessions never change. Returns
    /// whether the bay flipped.
    pub fn simulate_status_change(&mut self, rng: &dyn RandomSource, now: DateTime<Utc>) -> bool {
        if self.under_maintenance {
            return false;
        }
        if self
            .current_booking
            .as_ref()
            .is_some_and(BayBooking::is_session)
        {
            return false;
        }
        if !rng.chance(FLIP_PROBABILITY) {
            return false;
        }
        if self.is_available {
            self.is_available = false;
            self.current_booking = Some(BayBooking::mock(rng, now));
        } else {
            self.release(now);
        }
        true
    }

    /// A fleet of bays with plausible mock occupancy
    ///
    /// Bays are numbered from 1. Roughly a third start occupied, some have a
    /// next booking queued, and about one in twenty is under maintenance.
    #[must_use]
    pub fn mock_fleet(count: usize, rng: &dyn RandomSource, now: DateTime<Utc>) -> Vec<Self> {
        (1..=count)
            .map(|number| {
                let id = BayId::new(u32::try_from(number).unwrap_or(u32::MAX));
                let location = LOCATIONS[(number - 1) % LOCATIONS.len()];
                let mut bay = Self::new(id, format!("Bay {number}"), location);
                bay.last_cleaning_time =
                    Some(now - TimeDelta::minutes(i64::try_from(rng.next_below(120)).unwrap_or(0)));

                if rng.chance(0.05) {
                    bay.set_maintenance(true);
                } else if rng.chance(0.35) {
                    bay.is_available = false;
                    bay.current_booking = Some(BayBooking::mock(rng, now));
                }
                if !bay.under_maintenance && rng.chance(0.25) {
                    bay.next_booking = Some(BayBooking::mock(rng, now + TimeDelta::hours(1)));
                }
                bay
            })
            .collect()
    }
}

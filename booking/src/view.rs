//! Read-only views for front ends.
//!
//! A screen showing the current session, a booking summary, or the bay
//! board only needs to read. These traits give it exactly that, with the
//! derived values computed here rather than in every screen. Mutation goes
//! through actions sent to the store.

use crate::bay::BayStatus;
use crate::features::{BayBoardState, BookingState, BookingStep, FacilityState, SessionManagerState};
use crate::pricing::PricingTier;
use crate::session::{CustomerSession, SessionStatus};
use crate::types::{BayId, Money};
use chrono::{DateTime, Utc};

/// Read access to the current customer session
pub trait SessionView {
    /// The session being tracked, if any
    fn current_session(&self) -> Option<&CustomerSession>;

    /// Its status
    fn session_status(&self) -> Option<SessionStatus> {
        self.current_session().map(CustomerSession::status)
    }

    /// Countdown text, e.g. "1h 05m" or "Overtime"
    fn time_remaining_text(&self, now: DateTime<Utc>) -> Option<String> {
        self.current_session().map(|s| s.time_remaining_text(now))
    }

    /// Fraction of the planned time used, within 0..=1
    fn progress(&self, now: DateTime<Utc>) -> Option<f64> {
        self.current_session().map(|s| s.progress(now))
    }

    /// Whether the session has run past its planned end
    fn is_overtime(&self, now: DateTime<Utc>) -> bool {
        self.current_session().is_some_and(|s| s.is_overtime(now))
    }
}

/// Read access to the booking being put together
pub trait BookingSummaryView {
    /// The wizard's state
    fn booking(&self) -> &BookingState;

    /// Current step
    fn step(&self) -> BookingStep {
        self.booking().step
    }

    /// Number of players
    fn player_count(&self) -> u8 {
        self.booking().player_count
    }

    /// Chosen slot's start, e.g. "2:00 PM"
    fn time_slot_label(&self) -> Option<&str> {
        self.booking().time_slot_label.as_deref()
    }

    /// Chosen pricing tier
    fn pricing_tier(&self) -> Option<PricingTier> {
        self.booking().pricing_tier
    }

    /// Total to pay
    fn total_price(&self) -> Option<Money> {
        self.booking().total_price()
    }

    /// Amount the membership takes off
    fn member_discount(&self) -> Option<Money> {
        self.booking().member_discount()
    }

    /// Amount due up front
    fn deposit_amount(&self) -> Option<Money> {
        self.booking().deposit_amount()
    }

    /// Whether "Continue" should be enabled
    fn can_continue(&self) -> bool {
        self.booking().can_continue()
    }

    /// Whether "Send code" should be enabled
    fn can_send_code(&self) -> bool {
        self.booking().can_send_code()
    }
}

/// Read access to bay occupancy
pub trait BayBoardView {
    /// Every bay
    fn bays(&self) -> &[BayStatus];

    /// One bay
    fn bay(&self, bay_id: BayId) -> Option<&BayStatus> {
        self.bays().iter().find(|bay| bay.id == bay_id)
    }

    /// Bays free to take a customer
    fn available_count(&self) -> usize {
        self.bays().iter().filter(|bay| bay.is_available).count()
    }

    /// Bays out of service
    fn maintenance_count(&self) -> usize {
        self.bays().iter().filter(|bay| bay.under_maintenance).count()
    }
}

impl SessionView for SessionManagerState {
    fn current_session(&self) -> Option<&CustomerSession> {
        self.current.as_ref()
    }
}

impl BookingSummaryView for BookingState {
    fn booking(&self) -> &BookingState {
        self
    }
}

impl BayBoardView for BayBoardState {
    fn bays(&self) -> &[BayStatus] {
        &self.bays
    }
}

impl SessionView for FacilityState {
    fn current_session(&self) -> Option<&CustomerSession> {
        self.sessions.current_session()
    }
}

impl BookingSummaryView for FacilityState {
    fn booking(&self) -> &BookingState {
        &self.booking
    }
}

impl BayBoardView for FacilityState {
    fn bays(&self) -> &[BayStatus] {
        &self.bays.bays
    }
}

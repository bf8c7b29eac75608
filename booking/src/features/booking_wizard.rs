//! Booking wizard: collects a customer's selections step by step.
//!
//! The wizard only accumulates what the customer picks. Moving between
//! steps is always explicit (`Continue` / `Back`) and is never blocked;
//! [`BookingState::can_continue`] and [`BookingState::can_send_code`] exist
//! so a front end can disable its buttons. Confirming builds a
//! [`CustomerSession`] and announces it with [`BookingAction::Confirmed`].

use crate::environment::FacilityEnvironment;
use crate::membership::Membership;
use crate::pricing::{PricingTier, Quote};
use crate::session::{CustomerSession, PaymentStatus};
use crate::time_slot::{MAX_PLAYERS, TimeSlot};
use crate::types::{BayId, Money, SessionId};
use bayline_core::{Effect, Reducer, SmallVec, async_effect, smallvec};
use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

/// Longest booking the wizard offers, in hours
pub const MAX_BOOKING_HOURS: u32 = 4;

/// Wizard steps, in order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStep {
    /// Member or guest?
    #[default]
    MembershipCheck,
    /// How many players
    PlayerSelection,
    /// Day, slot and bay
    DateTimeSelection,
    /// Pricing tier and length
    PricingSelection,
    /// Phone number and code
    PhoneVerification,
    /// Review and confirm
    Confirmation,
}

impl BookingStep {
    /// All steps, first to last
    pub const ALL: [Self; 6] = [
        Self::MembershipCheck,
        Self::PlayerSelection,
        Self::DateTimeSelection,
        Self::PricingSelection,
        Self::PhoneVerification,
        Self::Confirmation,
    ];

    /// Zero-based position in the wizard
    #[must_use]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// The following step, if any
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The preceding step, if any
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Everything the customer has picked so far
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingState {
    /// Current step
    pub step: BookingStep,
    /// Customer name
    pub customer_name: String,
    /// Membership the customer holds
    pub membership: Membership,
    /// Players, always within 1..=6
    pub player_count: u8,
    /// Chosen day
    pub date: Option<NaiveDate>,
    /// Slots offered for the chosen day
    pub available_slots: Vec<TimeSlot>,
    /// Chosen slot
    pub selected_slot: Option<TimeSlot>,
    /// Chosen slot's start on the local clock, e.g. "2:00 PM"
    pub time_slot_label: Option<String>,
    /// Chosen pricing tier
    pub pricing_tier: Option<PricingTier>,
    /// Booked hours, within 1..=4
    pub hours: u32,
    /// Chosen bay
    pub bay_id: Option<BayId>,
    /// Phone number as typed
    pub phone_number: String,
    /// A verification code was sent
    pub code_sent: bool,
    /// The phone number is verified
    pub is_verified: bool,
    /// Session created by the last confirmation
    pub confirmed: Option<SessionId>,
}

impl Default for BookingState {
    fn default() -> Self {
        Self {
            step: BookingStep::default(),
            customer_name: String::new(),
            membership: Membership::guest(),
            player_count: 1,
            date: None,
            available_slots: Vec::new(),
            selected_slot: None,
            time_slot_label: None,
            pricing_tier: None,
            hours: 1,
            bay_id: None,
            phone_number: String::new(),
            code_sent: false,
            is_verified: false,
            confirmed: None,
        }
    }
}

impl BookingState {
    /// Price of the current selection
    #[must_use]
    pub fn quote(&self) -> Option<Quote> {
        self.pricing_tier
            .map(|tier| Quote::for_hours(tier, self.membership.tier, self.hours))
    }

    /// Total to pay
    #[must_use]
    pub fn total_price(&self) -> Option<Money> {
        self.quote().map(|q| q.effective)
    }

    /// Amount the membership takes off
    #[must_use]
    pub fn member_discount(&self) -> Option<Money> {
        self.quote().map(|q| q.discount)
    }

    /// Amount due up front
    #[must_use]
    pub fn deposit_amount(&self) -> Option<Money> {
        self.quote().map(|q| q.deposit)
    }

    /// Whether there is a phone number to text a code to
    #[must_use]
    pub fn can_send_code(&self) -> bool {
        !self.phone_number.trim().is_empty()
    }

    /// Whether the current step has what it needs
    #[must_use]
    pub const fn can_continue(&self) -> bool {
        match self.step {
            BookingStep::MembershipCheck | BookingStep::PlayerSelection => true,
            BookingStep::DateTimeSelection => {
                self.date.is_some() && self.selected_slot.is_some() && self.bay_id.is_some()
            },
            BookingStep::PricingSelection => self.pricing_tier.is_some(),
            BookingStep::PhoneVerification => self.is_verified,
            BookingStep::Confirmation => false,
        }
    }

    /// Whether confirming would create a session
    #[must_use]
    pub const fn can_confirm(&self) -> bool {
        matches!(self.step, BookingStep::Confirmation)
            && self.is_verified
            && self.selected_slot.is_some()
            && self.bay_id.is_some()
            && self.confirmed.is_none()
    }
}

/// Actions for the booking wizard
#[derive(Clone, Debug, PartialEq)]
pub enum BookingAction {
    // Commands
    /// Record the customer's membership
    SelectMembership(Membership),
    /// Record the customer's name
    SetCustomerName(String),
    /// Set the number of players (clamped to 1..=6)
    SetPlayerCount(i32),
    /// One more player
    AddPlayer,
    /// One fewer player
    RemovePlayer,
    /// Pick a day; offers that day's slots
    SelectDate(NaiveDate),
    /// Pick one of the offered slots
    SelectTimeSlot {
        /// Position in `available_slots`
        index: usize,
    },
    /// Pick a pricing tier
    SelectPricingTier(PricingTier),
    /// Set the booking length (clamped to 1..=4 hours)
    SetHours(u32),
    /// Pick a bay
    SelectBay(BayId),
    /// Record the phone number
    SetPhoneNumber(String),
    /// Text a verification code
    SendCode,
    /// Enter the verification code
    EnterCode(String),
    /// Go to the next step
    Continue,
    /// Go to the previous step
    Back,
    /// Create the session
    Confirm,
    /// Start over
    Reset,

    // Events
    /// A booking was confirmed
    Confirmed {
        /// The new session
        session: Box<CustomerSession>,
    },
}

/// Reducer for the booking wizard
#[derive(Clone, Debug)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn clamp_players(count: i32) -> u8 {
        u8::try_from(count.clamp(1, i32::from(MAX_PLAYERS))).unwrap_or(1)
    }

    /// Build the session for a confirmable booking
    fn build_session(state: &BookingState, env: &FacilityEnvironment) -> Option<CustomerSession> {
        let slot = state.selected_slot.as_ref()?;
        let bay_id = state.bay_id?;
        let tier = state.pricing_tier.unwrap_or_else(|| slot.tier());
        let name = match state.customer_name.trim() {
            "" => "Guest",
            name => name,
        };
        let start = slot.start();
        let end = start + TimeDelta::hours(i64::from(state.hours));

        match CustomerSession::scheduled(
            name,
            state.membership.session_tier(),
            bay_id,
            start,
            end,
            tier,
            env.now(),
        ) {
            Ok(session) => Some(session.with_payment_status(PaymentStatus::Pending)),
            Err(error) => {
                tracing::debug!(%error, "Ignored confirm");
                None
            },
        }
    }
}

impl Default for BookingReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = FacilityEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            BookingAction::SelectMembership(membership) => state.membership = membership,
            BookingAction::SetCustomerName(name) => state.customer_name = name,
            BookingAction::SetPlayerCount(count) => state.player_count = Self::clamp_players(count),
            BookingAction::AddPlayer => {
                state.player_count = Self::clamp_players(i32::from(state.player_count) + 1);
            },
            BookingAction::RemovePlayer => {
                state.player_count = Self::clamp_players(i32::from(state.player_count) - 1);
            },
            BookingAction::SelectDate(date) => {
                let schedule = env.schedule();
                state.date = Some(date);
                state.available_slots =
                    TimeSlot::generate_day(date, schedule.utc_offset(), schedule.opening_hours());
                state.selected_slot = None;
                state.time_slot_label = None;
            },
            BookingAction::SelectTimeSlot { index } => match state.available_slots.get(index) {
                Some(slot) => {
                    state.time_slot_label = Some(slot.label(env.schedule().utc_offset()));
                    state.pricing_tier = Some(slot.tier());
                    state.selected_slot = Some(slot.clone());
                },
                None => tracing::debug!(index, "Ignored slot selection: no such slot"),
            },
            BookingAction::SelectPricingTier(tier) => state.pricing_tier = Some(tier),
            BookingAction::SetHours(hours) => state.hours = hours.clamp(1, MAX_BOOKING_HOURS),
            BookingAction::SelectBay(bay_id) => state.bay_id = Some(bay_id),
            BookingAction::SetPhoneNumber(number) => {
                state.phone_number = number;
                state.code_sent = false;
                state.is_verified = false;
            },
            BookingAction::SendCode => {
                tracing::info!("Verification code sent");
                state.code_sent = true;
            },
            BookingAction::EnterCode(code) => {
                // Verification is mocked: any non-empty code passes once sent
                state.is_verified = state.code_sent && !code.trim().is_empty();
            },
            BookingAction::Continue => {
                if let Some(next) = state.step.next() {
                    state.step = next;
                }
            },
            BookingAction::Back => {
                if let Some(previous) = state.step.previous() {
                    state.step = previous;
                }
            },
            BookingAction::Confirm => {
                if !state.can_confirm() {
                    tracing::debug!(step = ?state.step, "Ignored confirm: booking incomplete");
                    return SmallVec::new();
                }
                let Some(session) = Self::build_session(state, env) else {
                    return SmallVec::new();
                };
                tracing::info!(session = %session.id(), bay = %session.bay_id(), "Booking confirmed");
                state.confirmed = Some(session.id());
                let session = Box::new(session);
                return smallvec![async_effect! { Some(BookingAction::Confirmed { session }) }];
            },
            BookingAction::Reset => *state = BookingState::default(),
            BookingAction::Confirmed { .. } => {},
        }
        SmallVec::new()
    }
}

//! Customer sessions and their lifecycle.
//!
//! ```text
//! Scheduled ──start──▶ Active ──complete──▶ Completed
//!     │
//!     ├──cancel──▶ Cancelled
//!     └──no-show─▶ NoShow
//! ```
//!
//! Completed, Cancelled and NoShow are terminal. Transitions happen either
//! on command or when a periodic [`CustomerSession::tick`] compares the
//! session's timestamps against the clock.

use crate::membership::MembershipTier;
use crate::pricing::{PricingTier, Quote};
use crate::types::{BayId, SessionId};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where a session is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Booked, not yet started
    Scheduled,
    /// Customer is in the bay
    Active,
    /// Finished normally
    Completed,
    /// Called off before it started
    Cancelled,
    /// Customer never showed up
    NoShow,
}

impl SessionStatus {
    /// Whether the session can no longer change
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Human-readable status
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::NoShow => "No Show",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How the session came about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    /// Booked ahead through the wizard
    Booked,
    /// Customer walked in and started right away
    WalkIn,
}

/// Payment state, tracked as a label only
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Nothing paid yet
    Pending,
    /// Deposit taken
    DepositPaid,
    /// Paid in full
    Paid,
    /// Money returned
    Refunded,
}

/// A status change applied by [`CustomerSession::tick`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Scheduled became Active
    Started,
    /// Active became Completed
    Completed,
}

/// Why a lifecycle operation was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Planned end is not after the start
    #[error("session window is empty: ends {planned_end}, starts {start}")]
    EmptyWindow {
        /// Requested start
        start: DateTime<Utc>,
        /// Requested planned end
        planned_end: DateTime<Utc>,
    },
    /// The operation is not allowed in the current status
    #[error("cannot {operation} a session that is {status}")]
    InvalidTransition {
        /// Status at the time of the call
        status: SessionStatus,
        /// Operation attempted
        operation: &'static str,
    },
    /// Extensions must move the end forward
    #[error("extension must be positive, got {0} seconds")]
    NonPositiveExtension(i64),
    /// The resulting time is past the representable calendar
    #[error("session would end out of range: {by} seconds past {from}")]
    OutOfRange {
        /// Instant the duration was added to
        from: DateTime<Utc>,
        /// Duration in seconds
        by: i64,
    },
}

/// `from + by`, or [`SessionError::OutOfRange`] on overflow
fn checked_end(from: DateTime<Utc>, by: TimeDelta) -> Result<DateTime<Utc>, SessionError> {
    from.checked_add_signed(by).ok_or(SessionError::OutOfRange {
        from,
        by: by.num_seconds(),
    })
}

/// One customer's use of a bay for a bounded window
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSession {
    id: SessionId,
    customer_name: String,
    membership: Option<MembershipTier>,
    bay_id: BayId,
    start_time: DateTime<Utc>,
    planned_end_time: DateTime<Utc>,
    actual_end_time: Option<DateTime<Utc>>,
    status: SessionStatus,
    session_type: SessionType,
    payment_status: Option<PaymentStatus>,
    last_updated: DateTime<Utc>,
    tier: PricingTier,
    quote: Quote,
}

impl CustomerSession {
    /// A booked session for `[start, planned_end)`
    ///
    /// The session is Scheduled if `start` is still ahead of `now`, otherwise
    /// it begins Active.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyWindow`] if `planned_end` is not after `start`.
    pub fn scheduled(
        customer_name: impl Into<String>,
        membership: Option<MembershipTier>,
        bay_id: BayId,
        start: DateTime<Utc>,
        planned_end: DateTime<Utc>,
        tier: PricingTier,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if planned_end <= start {
            return Err(SessionError::EmptyWindow { start, planned_end });
        }
        let status = if start > now {
            SessionStatus::Scheduled
        } else {
            SessionStatus::Active
        };
        let mut session = Self {
            id: SessionId::new(),
            customer_name: customer_name.into(),
            membership,
            bay_id,
            start_time: start,
            planned_end_time: planned_end,
            actual_end_time: None,
            status,
            session_type: SessionType::Booked,
            payment_status: None,
            last_updated: now,
            tier,
            quote: Quote::hourly(tier, MembershipTier::Guest),
        };
        session.requote();
        Ok(session)
    }

    /// A walk-in session starting at `now`
    ///
    /// # Errors
    ///
    /// - [`SessionError::EmptyWindow`] if `duration` is not positive
    /// - [`SessionError::OutOfRange`] if `now + duration` overflows
    pub fn walk_in(
        customer_name: impl Into<String>,
        membership: Option<MembershipTier>,
        bay_id: BayId,
        duration: TimeDelta,
        tier: PricingTier,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let planned_end = checked_end(now, duration)?;
        let mut session =
            Self::scheduled(customer_name, membership, bay_id, now, planned_end, tier, now)?;
        session.session_type = SessionType::WalkIn;
        Ok(session)
    }

    /// Same session with a payment status
    #[must_use]
    pub const fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Scheduled → Active, with the start reset to `now`
    ///
    /// Starting at or past the planned end keeps the booked length by
    /// pushing the planned end out.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidTransition`] unless the session is Scheduled
    /// - [`SessionError::OutOfRange`] if the pushed planned end overflows
    pub fn mark_as_started(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.require(SessionStatus::Scheduled, "start")?;
        if now >= self.planned_end_time {
            let booked = self.planned_end_time - self.start_time;
            self.planned_end_time = checked_end(now, booked)?;
        }
        self.start_time = now;
        self.status = SessionStatus::Active;
        self.last_updated = now;
        Ok(())
    }

    /// Active → Completed, ending at `end`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the session is Active.
    pub fn mark_as_completed(&mut self, end: DateTime<Utc>) -> Result<(), SessionError> {
        self.require(SessionStatus::Active, "complete")?;
        self.status = SessionStatus::Completed;
        self.actual_end_time = Some(end);
        self.last_updated = end;
        Ok(())
    }

    /// Scheduled → Cancelled
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the session is Scheduled.
    pub fn mark_as_cancelled(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.require(SessionStatus::Scheduled, "cancel")?;
        self.status = SessionStatus::Cancelled;
        self.last_updated = now;
        Ok(())
    }

    /// Scheduled → `NoShow`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the session is Scheduled.
    pub fn mark_as_no_show(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.require(SessionStatus::Scheduled, "mark as no-show")?;
        self.status = SessionStatus::NoShow;
        self.last_updated = now;
        Ok(())
    }

    /// Push the planned end out by `by` and re-quote
    ///
    /// # Errors
    ///
    /// - [`SessionError::NonPositiveExtension`] if `by` is zero or negative
    /// - [`SessionError::InvalidTransition`] if the session is terminal
    /// - [`SessionError::OutOfRange`] if the new planned end overflows
    pub fn extend(&mut self, by: TimeDelta, now: DateTime<Utc>) -> Result<(), SessionError> {
        if by <= TimeDelta::zero() {
            return Err(SessionError::NonPositiveExtension(by.num_seconds()));
        }
        if self.status.is_terminal() {
            return Err(SessionError::InvalidTransition {
                status: self.status,
                operation: "extend",
            });
        }
        self.planned_end_time = checked_end(self.planned_end_time, by)?;
        self.last_updated = now;
        self.requote();
        Ok(())
    }

    /// Advance the status against the clock
    ///
    /// A Scheduled session whose start has arrived becomes Active; an Active
    /// session past its planned end becomes Completed at `now`. At most one
    /// transition happens per tick and terminal sessions never change.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        match self.status {
            SessionStatus::Scheduled if now >= self.start_time => self
                .mark_as_started(now)
                .ok()
                .map(|()| Transition::Started),
            SessionStatus::Active if now >= self.planned_end_time => self
                .mark_as_completed(now)
                .ok()
                .map(|()| Transition::Completed),
            _ => None,
        }
    }

    fn require(&self, status: SessionStatus, operation: &'static str) -> Result<(), SessionError> {
        if self.status == status {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                status: self.status,
                operation,
            })
        }
    }

    fn requote(&mut self) {
        self.quote = Quote::for_hours(
            self.tier,
            self.membership.unwrap_or_default(),
            self.billed_hours(),
        );
    }

    // ------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------

    /// Planned length of the session
    #[must_use]
    pub fn planned_duration(&self) -> TimeDelta {
        self.planned_end_time - self.start_time
    }

    /// Whole bay-hours billed for the planned length (started hours count)
    #[must_use]
    pub fn billed_hours(&self) -> u32 {
        let minutes = self.planned_duration().num_minutes().max(1);
        u32::try_from((minutes + 59) / 60).unwrap_or(u32::MAX)
    }

    /// Time left until the planned end; negative once past it
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        self.planned_end_time - now
    }

    /// Time spent in the bay so far
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        match self.status {
            SessionStatus::Scheduled | SessionStatus::Cancelled | SessionStatus::NoShow => {
                TimeDelta::zero()
            },
            SessionStatus::Active => (now - self.start_time).max(TimeDelta::zero()),
            SessionStatus::Completed => {
                let end = self.actual_end_time.unwrap_or(self.planned_end_time);
                (end - self.start_time).max(TimeDelta::zero())
            },
        }
    }

    /// Elapsed share of the planned length, in `[0, 1]`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        let planned = self.planned_duration().num_milliseconds();
        if planned <= 0 {
            return 1.0;
        }
        (self.elapsed(now).num_milliseconds() as f64 / planned as f64).clamp(0.0, 1.0)
    }

    /// Active with no time left
    #[must_use]
    pub fn is_overtime(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && self.remaining(now) <= TimeDelta::zero()
    }

    /// Remaining time for display: "1h 05m", "25m", or "Overtime"
    #[must_use]
    pub fn time_remaining_text(&self, now: DateTime<Utc>) -> String {
        let remaining = self.remaining(now);
        if remaining <= TimeDelta::zero() {
            return "Overtime".to_string();
        }
        let minutes = (remaining.num_seconds() + 59) / 60;
        match (minutes / 60, minutes % 60) {
            (0, m) => format!("{m}m"),
            (h, m) => format!("{h}h {m:02}m"),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Session identity
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Customer name
    #[must_use]
    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    /// Membership tier, `None` for guests
    #[must_use]
    pub const fn membership(&self) -> Option<MembershipTier> {
        self.membership
    }

    /// Bay the session uses
    #[must_use]
    pub const fn bay_id(&self) -> BayId {
        self.bay_id
    }

    /// Start (actual once Active)
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Planned end
    #[must_use]
    pub const fn planned_end_time(&self) -> DateTime<Utc> {
        self.planned_end_time
    }

    /// Actual end, set only once Completed
    #[must_use]
    pub const fn actual_end_time(&self) -> Option<DateTime<Utc>> {
        self.actual_end_time
    }

    /// Lifecycle status
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Booked or walk-in
    #[must_use]
    pub const fn session_type(&self) -> SessionType {
        self.session_type
    }

    /// Payment label, if tracked
    #[must_use]
    pub const fn payment_status(&self) -> Option<PaymentStatus> {
        self.payment_status
    }

    /// Last time the session changed
    #[must_use]
    pub const fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Pricing tier of the booked window
    #[must_use]
    pub const fn tier(&self) -> PricingTier {
        self.tier
    }

    /// Price of the planned window
    #[must_use]
    pub const fn quote(&self) -> Quote {
        self.quote
    }
}

//! Session manager: owns the facility's current customer session.
//!
//! Holds at most one session. Commands move it through its lifecycle;
//! a self-rescheduling poll tick advances it against the clock. Every
//! start, extension and end is announced with an event so the rest of the
//! facility can react (occupy the bay, move its end, release it).
//!
//! # Polling
//!
//! `StartPolling` schedules `Tick { generation }` after the idle interval.
//! Each tick reschedules itself: the active interval while a session is
//! active, the idle interval otherwise. `StopPolling` (or a new
//! `StartPolling`) bumps the generation so pending ticks are ignored.

use crate::environment::FacilityEnvironment;
use crate::membership::MembershipTier;
use crate::pricing::PricingTier;
use crate::session::{CustomerSession, SessionError, SessionStatus};
use crate::types::{BayId, SessionId};
use bayline_core::{Effect, Reducer, SmallVec, async_effect, delay, smallvec};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// State of the session manager
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionManagerState {
    /// The session being tracked, if any
    pub current: Option<CustomerSession>,
    /// Incremented on every start/stop of polling; ticks carry the value
    /// they were scheduled under
    pub poll_generation: u64,
    /// Whether a poll tick is pending
    pub polling: bool,
    /// Last time the manager changed anything
    pub last_updated: Option<DateTime<Utc>>,
}

impl SessionManagerState {
    /// Manager tracking `session`
    #[must_use]
    pub fn with_session(session: CustomerSession) -> Self {
        Self {
            current: Some(session),
            ..Self::default()
        }
    }

    /// Status of the current session
    #[must_use]
    pub fn current_status(&self) -> Option<SessionStatus> {
        self.current.as_ref().map(CustomerSession::status)
    }

    /// Whether a new session may be taken on
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.current
            .as_ref()
            .is_none_or(|session| session.status().is_terminal())
    }
}

/// Actions for the session manager
#[derive(Clone, Debug, PartialEq)]
pub enum SessionAction {
    // Commands
    /// Take on a session built elsewhere (e.g. a confirmed booking)
    Begin {
        /// The session to track
        session: Box<CustomerSession>,
    },
    /// Start a session for a customer who walked in
    WalkIn {
        /// Customer name
        customer_name: String,
        /// Membership, `None` for guests
        membership: Option<MembershipTier>,
        /// Bay to use
        bay_id: BayId,
        /// Planned length
        duration: TimeDelta,
    },
    /// The customer arrived: Scheduled → Active
    MarkStarted,
    /// The customer is done: Active → Completed
    Complete,
    /// Called off before starting
    Cancel,
    /// The customer never came
    NoShow,
    /// Add time to the session
    Extend {
        /// Time to add
        by: TimeDelta,
    },
    /// Finish whatever is current: complete if active, cancel if scheduled
    EndSession,
    /// Forget a finished session
    ClearSession,
    /// Begin periodic status checks
    StartPolling,
    /// Stop periodic status checks
    StopPolling,
    /// Periodic status check
    Tick {
        /// Generation the tick was scheduled under
        generation: u64,
    },

    // Events
    /// A session became active
    SessionStarted {
        /// Session
        session_id: SessionId,
        /// Bay it uses
        bay_id: BayId,
        /// Customer name
        customer_name: String,
        /// Customer tier
        membership: MembershipTier,
        /// Planned end
        until: DateTime<Utc>,
    },
    /// An active session's planned end moved
    SessionExtended {
        /// Session
        session_id: SessionId,
        /// Bay it uses
        bay_id: BayId,
        /// New planned end
        until: DateTime<Utc>,
    },
    /// A session reached a terminal status
    SessionEnded {
        /// Session
        session_id: SessionId,
        /// Bay it used
        bay_id: BayId,
        /// Terminal status reached
        status: SessionStatus,
    },
}

/// Reducer for the session manager
#[derive(Clone, Debug)]
pub struct SessionManagerReducer;

impl SessionManagerReducer {
    /// Creates a new `SessionManagerReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Events announcing a status change from `before` to the session's current status
    fn announce(before: SessionStatus, session: &CustomerSession) -> SmallVec<[Effect<SessionAction>; 4]> {
        let after = session.status();
        if before == after {
            return SmallVec::new();
        }

        if after == SessionStatus::Active {
            tracing::info!(session = %session.id(), bay = %session.bay_id(), "Session started");
            metrics::counter!("bayline.sessions.started").increment(1);
            let event = SessionAction::SessionStarted {
                session_id: session.id(),
                bay_id: session.bay_id(),
                customer_name: session.customer_name().to_string(),
                membership: session.membership().unwrap_or_default(),
                until: session.planned_end_time(),
            };
            return smallvec![async_effect! { Some(event) }];
        }

        if after.is_terminal() {
            tracing::info!(session = %session.id(), %after, "Session ended");
            metrics::counter!("bayline.sessions.ended", "status" => after.display_name())
                .increment(1);
            let event = SessionAction::SessionEnded {
                session_id: session.id(),
                bay_id: session.bay_id(),
                status: after,
            };
            return smallvec![async_effect! { Some(event) }];
        }

        SmallVec::new()
    }

    /// Run a lifecycle operation on the current session
    ///
    /// A missing session or a refused operation leaves state untouched.
    fn operate<F>(
        state: &mut SessionManagerState,
        now: DateTime<Utc>,
        operation: &'static str,
        f: F,
    ) -> SmallVec<[Effect<SessionAction>; 4]>
    where
        F: FnOnce(&mut CustomerSession) -> Result<(), SessionError>,
    {
        let Some(session) = state.current.as_mut() else {
            tracing::debug!(operation, "Ignored: no current session");
            return SmallVec::new();
        };

        let before = session.status();
        if let Err(error) = f(&mut *session) {
            tracing::debug!(operation, %error, "Ignored session command");
            return SmallVec::new();
        }

        state.last_updated = Some(now);
        Self::announce(before, session)
    }

    /// Track a new session if the manager is free
    fn adopt(
        state: &mut SessionManagerState,
        session: CustomerSession,
        now: DateTime<Utc>,
    ) -> SmallVec<[Effect<SessionAction>; 4]> {
        if !state.is_free() {
            tracing::debug!(session = %session.id(), "Ignored: a session is already in progress");
            return SmallVec::new();
        }
        if session.status().is_terminal() {
            tracing::debug!(session = %session.id(), "Ignored: session already finished");
            return SmallVec::new();
        }

        let effects = Self::announce(SessionStatus::Scheduled, &session);
        state.current = Some(session);
        state.last_updated = Some(now);
        effects
    }

    /// The next poll tick for the state as it now stands
    fn schedule_tick(state: &SessionManagerState, env: &FacilityEnvironment) -> Effect<SessionAction> {
        let interval = if state.current_status() == Some(SessionStatus::Active) {
            env.schedule().active_poll()
        } else {
            env.schedule().idle_poll()
        };
        delay! {
            duration: interval,
            action: SessionAction::Tick { generation: state.poll_generation }
        }
    }
}

impl Default for SessionManagerReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for SessionManagerReducer {
    type State = SessionManagerState;
    type Action = SessionAction;
    type Environment = FacilityEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let now = env.now();

        match action {
            // ========== Taking on a session ==========
            SessionAction::Begin { session } => Self::adopt(state, *session, now),

            SessionAction::WalkIn {
                customer_name,
                membership,
                bay_id,
                duration,
            } => {
                let tier = PricingTier::at(now, env.schedule().utc_offset());
                match CustomerSession::walk_in(customer_name, membership, bay_id, duration, tier, now)
                {
                    Ok(session) => Self::adopt(state, session, now),
                    Err(error) => {
                        tracing::debug!(%error, "Ignored walk-in");
                        SmallVec::new()
                    },
                }
            },

            // ========== Lifecycle ==========
            SessionAction::MarkStarted => {
                Self::operate(state, now, "start", |s| s.mark_as_started(now))
            },
            SessionAction::Complete => {
                Self::operate(state, now, "complete", |s| s.mark_as_completed(now))
            },
            SessionAction::Cancel => {
                Self::operate(state, now, "cancel", |s| s.mark_as_cancelled(now))
            },
            SessionAction::NoShow => {
                Self::operate(state, now, "no-show", |s| s.mark_as_no_show(now))
            },
            SessionAction::Extend { by } => {
                let before = state.current.as_ref().map(CustomerSession::planned_end_time);
                let mut effects = Self::operate(state, now, "extend", |s| s.extend(by, now));
                if let Some(session) = state.current.as_ref().filter(|s| {
                    s.status() == SessionStatus::Active && Some(s.planned_end_time()) != before
                }) {
                    let event = SessionAction::SessionExtended {
                        session_id: session.id(),
                        bay_id: session.bay_id(),
                        until: session.planned_end_time(),
                    };
                    effects.push(async_effect! { Some(event) });
                }
                effects
            },
            SessionAction::EndSession => Self::operate(state, now, "end", |s| {
                if s.status() == SessionStatus::Scheduled {
                    s.mark_as_cancelled(now)
                } else {
                    s.mark_as_completed(now)
                }
            }),
            SessionAction::ClearSession => {
                if state.current_status().is_some_and(SessionStatus::is_terminal) {
                    state.current = None;
                    state.last_updated = Some(now);
                } else {
                    tracing::debug!("Ignored clear: session still open");
                }
                SmallVec::new()
            },

            // ========== Polling ==========
            SessionAction::StartPolling => {
                state.poll_generation += 1;
                state.polling = true;
                smallvec![Self::schedule_tick(state, env)]
            },
            SessionAction::StopPolling => {
                state.poll_generation += 1;
                state.polling = false;
                SmallVec::new()
            },
            SessionAction::Tick { generation } => {
                if !state.polling || generation != state.poll_generation {
                    tracing::trace!(generation, current = state.poll_generation, "Stale tick");
                    return SmallVec::new();
                }

                let mut effects = match state.current.as_mut() {
                    Some(session) => {
                        let before = session.status();
                        match session.tick(now) {
                            Some(transition) => {
                                tracing::debug!(?transition, "Tick advanced session");
                                Self::announce(before, session)
                            },
                            None => SmallVec::new(),
                        }
                    },
                    None => SmallVec::new(),
                };
                state.last_updated = Some(now);
                effects.push(Self::schedule_tick(state, env));
                effects
            },

            // ========== Events ==========
            SessionAction::SessionStarted { .. }
            | SessionAction::SessionExtended { .. }
            | SessionAction::SessionEnded { .. } => {
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bayline_core::Clock;
    use bayline_testing::{ManualClock, ReducerTest, ScriptedRandom, assertions, test_time};
    use std::sync::Arc;
    use std::time::Duration;

    fn env() -> FacilityEnvironment {
        FacilityEnvironment::new(Arc::new(ManualClock::new(test_time())), Arc::new(ScriptedRandom::always(0.5)))
    }

    fn scheduled_in(minutes: i64) -> CustomerSession {
        CustomerSession::scheduled(
            "Dana Park",
            Some(MembershipTier::Premium),
            BayId::new(3),
            test_time() + TimeDelta::minutes(minutes),
            test_time() + TimeDelta::minutes(minutes + 60),
            PricingTier::Afternoon,
            test_time(),
        )
        .unwrap_or_else(|e| unreachable!("valid window: {e}"))
    }

    fn active() -> CustomerSession {
        CustomerSession::walk_in(
            "Lee",
            None,
            BayId::new(5),
            TimeDelta::minutes(60),
            PricingTier::Morning,
            test_time(),
        )
        .unwrap_or_else(|e| unreachable!("valid window: {e}"))
    }

    #[test]
    fn begin_scheduled_session_is_quiet() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::default())
            .when_action(SessionAction::Begin {
                session: Box::new(scheduled_in(25)),
            })
            .then_state(|state| {
                assert_eq!(state.current_status(), Some(SessionStatus::Scheduled));
                assert_eq!(state.last_updated, Some(test_time()));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn walk_in_announces_start() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::default())
            .when_action(SessionAction::WalkIn {
                customer_name: "Lee".to_string(),
                membership: Some(MembershipTier::Basic),
                bay_id: BayId::new(2),
                duration: TimeDelta::minutes(90),
            })
            .then_state(|state| {
                assert_eq!(state.current_status(), Some(SessionStatus::Active));
                let session = state.current.as_ref();
                // Midnight UTC is night pricing
                assert_eq!(session.map(CustomerSession::tier), Some(PricingTier::Night));
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn second_session_is_refused_while_one_is_open() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(scheduled_in(25)))
            .when_action(SessionAction::Begin {
                session: Box::new(active()),
            })
            .then_state(|state| {
                assert_eq!(state.current_status(), Some(SessionStatus::Scheduled));
                assert_eq!(state.current.as_ref().map(CustomerSession::bay_id), Some(BayId::new(3)));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn finished_session_can_be_replaced() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(scheduled_in(25)))
            .when_actions([
                SessionAction::Cancel,
                SessionAction::Begin {
                    session: Box::new(active()),
                },
            ])
            .then_state(|state| {
                assert_eq!(state.current_status(), Some(SessionStatus::Active));
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn commands_without_session_are_silent() {
        for action in [
            SessionAction::MarkStarted,
            SessionAction::Complete,
            SessionAction::Cancel,
            SessionAction::NoShow,
            SessionAction::Extend {
                by: TimeDelta::minutes(30),
            },
            SessionAction::EndSession,
            SessionAction::ClearSession,
        ] {
            ReducerTest::new(SessionManagerReducer::new())
                .with_env(env())
                .given_state(SessionManagerState::default())
                .when_action(action)
                .then_state(|state| assert_eq!(*state, SessionManagerState::default()))
                .then_effects(assertions::assert_no_effects)
                .run();
        }
    }

    #[test]
    fn invalid_transition_is_silent() {
        let session = scheduled_in(25);
        let expected = SessionManagerState::with_session(session.clone());

        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(session))
            .when_action(SessionAction::Complete)
            .then_state(move |state| assert_eq!(*state, expected))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn end_session_cancels_scheduled() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(scheduled_in(25)))
            .when_action(SessionAction::EndSession)
            .then_state(|state| {
                assert_eq!(state.current_status(), Some(SessionStatus::Cancelled));
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn end_session_completes_active() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(active()))
            .when_action(SessionAction::EndSession)
            .then_state(|state| {
                let session = state.current.as_ref();
                assert_eq!(session.map(CustomerSession::status), Some(SessionStatus::Completed));
                assert_eq!(session.and_then(CustomerSession::actual_end_time), Some(test_time()));
            })
            .run();
    }

    #[test]
    fn clear_only_drops_finished_sessions() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(active()))
            .when_action(SessionAction::ClearSession)
            .then_state(|state| assert!(state.current.is_some()))
            .run();

        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(active()))
            .when_actions([SessionAction::Complete, SessionAction::ClearSession])
            .then_state(|state| {
                assert!(state.current.is_none());
                assert!(state.is_free());
            })
            .run();
    }

    #[test]
    fn extend_keeps_status() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(active()))
            .when_action(SessionAction::Extend {
                by: TimeDelta::minutes(30),
            })
            .then_state(|state| {
                let session = state.current.as_ref();
                assert_eq!(session.map(CustomerSession::status), Some(SessionStatus::Active));
                assert_eq!(
                    session.map(CustomerSession::planned_end_time),
                    Some(test_time() + TimeDelta::minutes(90))
                );
            })
            .then_effects(|effects| {
                // The new end is announced for the bay board
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn extending_a_booking_is_quiet() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(scheduled_in(25)))
            .when_action(SessionAction::Extend {
                by: TimeDelta::minutes(30),
            })
            .then_state(|state| {
                assert_eq!(
                    state.current.as_ref().map(CustomerSession::planned_duration),
                    Some(TimeDelta::minutes(90))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn out_of_range_extension_is_ignored() {
        let session = active();
        let planned_end = session.planned_end_time();

        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(session))
            .when_action(SessionAction::Extend {
                by: TimeDelta::days(365 * 300_000),
            })
            .then_state(move |state| {
                let session = state.current.as_ref();
                assert_eq!(session.map(CustomerSession::planned_end_time), Some(planned_end));
                assert_eq!(session.map(CustomerSession::status), Some(SessionStatus::Active));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn out_of_range_walk_in_is_ignored() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::default())
            .when_action(SessionAction::WalkIn {
                customer_name: "Lee".to_string(),
                membership: None,
                bay_id: BayId::new(2),
                duration: TimeDelta::days(365 * 300_000),
            })
            .then_state(|state| assert!(state.current.is_none()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn start_polling_schedules_idle_tick() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::default())
            .when_action(SessionAction::StartPolling)
            .then_state(|state| {
                assert!(state.polling);
                assert_eq!(state.poll_generation, 1);
            })
            .then_effects(|effects| {
                assertions::assert_single_delay(
                    effects,
                    Duration::from_secs(30),
                    &SessionAction::Tick { generation: 1 },
                );
            })
            .run();
    }

    #[test]
    fn active_session_polls_every_minute() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::with_session(active()))
            .when_actions([SessionAction::StartPolling, SessionAction::Tick { generation: 1 }])
            .then_effects(|effects| {
                assertions::assert_single_delay(
                    effects,
                    Duration::from_secs(60),
                    &SessionAction::Tick { generation: 1 },
                );
            })
            .run();
    }

    #[test]
    fn stale_ticks_are_ignored() {
        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::default())
            .when_actions([
                SessionAction::StartPolling,
                SessionAction::StartPolling,
                SessionAction::Tick { generation: 1 },
            ])
            .then_state(|state| assert_eq!(state.poll_generation, 2))
            .then_effects(assertions::assert_no_effects)
            .run();

        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env())
            .given_state(SessionManagerState::default())
            .when_actions([
                SessionAction::StartPolling,
                SessionAction::StopPolling,
                SessionAction::Tick { generation: 2 },
            ])
            .then_state(|state| assert!(!state.polling))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn tick_starts_due_session() {
        let clock = Arc::new(ManualClock::new(test_time()));
        let env = FacilityEnvironment::new(clock.clone(), Arc::new(ScriptedRandom::always(0.5)));
        clock.advance(TimeDelta::minutes(26));
        let tick_time = clock.now();

        ReducerTest::new(SessionManagerReducer::new())
            .with_env(env)
            .given_state(SessionManagerState::with_session(scheduled_in(25)))
            .when_actions([SessionAction::StartPolling, SessionAction::Tick { generation: 1 }])
            .then_state(move |state| {
                let session = state.current.as_ref();
                assert_eq!(session.map(CustomerSession::status), Some(SessionStatus::Active));
                assert_eq!(session.map(CustomerSession::start_time), Some(tick_time));
            })
            .then_effects(|effects| {
                // Announcement plus the next tick, now at the active interval
                assertions::assert_effects_count(effects, 2);
                assertions::assert_has_future_effect(effects);
                assert_eq!(assertions::delays(effects)[0].0, Duration::from_secs(60));
            })
            .run();
    }
}

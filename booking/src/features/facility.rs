//! The whole facility as one reducer.
//!
//! The three features run side by side on their own slice of
//! [`FacilityState`]. A coordination reducer runs after them and turns
//! events from one feature into commands for another:
//!
//! - `Booking(Confirmed)` becomes `Session(Begin)`
//! - `Session(Begin)` that the manager turned away withdraws the wizard's
//!   confirmation so the customer can try again
//! - `Session(SessionStarted)` occupies the session's bay
//! - `Session(SessionExtended)` moves the end shown on the bay
//! - `Session(SessionEnded)` releases the bay, if the session still holds it

use crate::bay::BayBooking;
use crate::environment::FacilityEnvironment;
use crate::features::bay_board::{BayBoardAction, BayBoardReducer, BayBoardState};
use crate::features::booking_wizard::{BookingAction, BookingReducer, BookingState};
use crate::features::session_manager::{SessionAction, SessionManagerReducer, SessionManagerState};
use bayline_core::composition::{CombinedReducer, combine_reducers, scope_reducer};
use bayline_core::{Effect, Reducer, SmallVec, async_effect, smallvec};
use serde::{Deserialize, Serialize};

/// State of the whole facility
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityState {
    /// Booking wizard
    pub booking: BookingState,
    /// Current customer session
    pub sessions: SessionManagerState,
    /// Bay occupancy
    pub bays: BayBoardState,
}

/// Any action in the facility
#[derive(Clone, Debug, PartialEq)]
pub enum FacilityAction {
    /// Booking wizard action
    Booking(BookingAction),
    /// Session manager action
    Session(SessionAction),
    /// Bay board action
    Bays(BayBoardAction),
}

fn booking_state(state: &mut FacilityState) -> &mut BookingState {
    &mut state.booking
}

fn session_state(state: &mut FacilityState) -> &mut SessionManagerState {
    &mut state.sessions
}

fn bay_state(state: &mut FacilityState) -> &mut BayBoardState {
    &mut state.bays
}

fn booking_action(action: FacilityAction) -> Option<BookingAction> {
    match action {
        FacilityAction::Booking(action) => Some(action),
        _ => None,
    }
}

fn session_action(action: FacilityAction) -> Option<SessionAction> {
    match action {
        FacilityAction::Session(action) => Some(action),
        _ => None,
    }
}

fn bay_action(action: FacilityAction) -> Option<BayBoardAction> {
    match action {
        FacilityAction::Bays(action) => Some(action),
        _ => None,
    }
}

/// Cross-feature reactions
#[derive(Clone, Debug, Default)]
pub struct CoordinationReducer;

impl Reducer for CoordinationReducer {
    type State = FacilityState;
    type Action = FacilityAction;
    type Environment = FacilityEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            FacilityAction::Booking(BookingAction::Confirmed { session }) => {
                let next = FacilityAction::Session(SessionAction::Begin { session });
                smallvec![async_effect! { Some(next) }]
            },

            FacilityAction::Session(SessionAction::Begin { session }) => {
                let adopted = state
                    .sessions
                    .current
                    .as_ref()
                    .is_some_and(|current| current.id() == session.id());
                if !adopted && state.booking.confirmed == Some(session.id()) {
                    tracing::info!(session = %session.id(), "Booking not taken on, confirmation withdrawn");
                    state.booking.confirmed = None;
                }
                SmallVec::new()
            },

            FacilityAction::Session(SessionAction::SessionExtended {
                session_id,
                bay_id,
                until,
            }) => {
                let next = FacilityAction::Bays(BayBoardAction::ExtendBooking {
                    bay_id,
                    session_id,
                    until,
                });
                smallvec![async_effect! { Some(next) }]
            },

            FacilityAction::Session(SessionAction::SessionStarted {
                session_id,
                bay_id,
                customer_name,
                membership,
                until,
            }) => {
                let booking = BayBooking::for_session(session_id, customer_name, membership, until);
                let next = FacilityAction::Bays(BayBoardAction::Occupy { bay_id, booking });
                smallvec![async_effect! { Some(next) }]
            },

            FacilityAction::Session(SessionAction::SessionEnded {
                session_id, bay_id, ..
            }) => {
                let holds_bay = state
                    .bays
                    .get(bay_id)
                    .and_then(|bay| bay.current_booking.as_ref())
                    .is_some_and(|booking| booking.session_id == Some(session_id));
                if !holds_bay {
                    tracing::debug!(%session_id, %bay_id, "Session did not hold its bay");
                    return SmallVec::new();
                }
                let next = FacilityAction::Bays(BayBoardAction::Release { bay_id });
                smallvec![async_effect! { Some(next) }]
            },

            _ => SmallVec::new(),
        }
    }
}

/// Reducer for the whole facility
pub struct FacilityReducer {
    inner: CombinedReducer<FacilityState, FacilityAction, FacilityEnvironment>,
}

impl FacilityReducer {
    /// The three features plus coordination
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: combine_reducers(vec![
                Box::new(scope_reducer(
                    BookingReducer::new(),
                    booking_state,
                    booking_action,
                    FacilityAction::Booking,
                )),
                Box::new(scope_reducer(
                    SessionManagerReducer::new(),
                    session_state,
                    session_action,
                    FacilityAction::Session,
                )),
                Box::new(scope_reducer(
                    BayBoardReducer::new(),
                    bay_state,
                    bay_action,
                    FacilityAction::Bays,
                )),
                Box::new(CoordinationReducer),
            ]),
        }
    }
}

impl Default for FacilityReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FacilityReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityReducer").finish_non_exhaustive()
    }
}

impl Reducer for FacilityReducer {
    type State = FacilityState;
    type Action = FacilityAction;
    type Environment = FacilityEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        self.inner.reduce(state, action, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bay::BayStatus;
    use crate::membership::MembershipTier;
    use crate::pricing::PricingTier;
    use crate::session::{CustomerSession, SessionStatus};
    use crate::types::{BayId, SessionId};
    use bayline_testing::{ReducerTest, ScriptedRandom, assertions, test_clock, test_time};
    use chrono::TimeDelta;
    use std::sync::Arc;

    fn env() -> FacilityEnvironment {
        FacilityEnvironment::new(Arc::new(test_clock()), Arc::new(ScriptedRandom::always(0.5)))
    }

    fn facility(bays: u32) -> FacilityState {
        FacilityState {
            bays: BayBoardState::with_bays(
                (1..=bays)
                    .map(|n| BayStatus::new(BayId::new(n), format!("Bay {n}"), "Main Floor"))
                    .collect(),
            ),
            ..FacilityState::default()
        }
    }

    /// Resolve every future effect into the action it feeds back
    async fn feedback(effects: Vec<Effect<FacilityAction>>) -> Vec<FacilityAction> {
        let mut actions = Vec::new();
        for effect in effects {
            if let Effect::Future(fut) = effect {
                actions.extend(fut.await);
            }
        }
        actions
    }

    fn run(
        reducer: &FacilityReducer,
        state: &mut FacilityState,
        action: FacilityAction,
    ) -> Vec<Effect<FacilityAction>> {
        reducer.reduce(state, action, &env()).into_vec()
    }

    #[tokio::test]
    async fn walk_in_occupies_and_completion_releases() {
        let reducer = FacilityReducer::new();
        let mut state = facility(3);

        let effects = run(
            &reducer,
            &mut state,
            FacilityAction::Session(SessionAction::WalkIn {
                customer_name: "Sam Ortiz".to_string(),
                membership: Some(MembershipTier::Platinum),
                bay_id: BayId::new(2),
                duration: TimeDelta::hours(1),
            }),
        );
        let started = feedback(effects).await;
        assert!(matches!(
            started.as_slice(),
            [FacilityAction::Session(SessionAction::SessionStarted { .. })]
        ));

        // The started event itself asks the board to occupy the bay
        let mut occupy = Vec::new();
        for action in started {
            occupy.extend(feedback(run(&reducer, &mut state, action)).await);
        }
        for action in occupy {
            let _ = run(&reducer, &mut state, action);
        }
        let bay = state.bays.get(BayId::new(2));
        assert!(bay.is_some_and(|b| !b.is_available));
        assert_eq!(
            bay.and_then(|b| b.current_booking.as_ref())
                .map(|b| b.customer_name.as_str()),
            Some("Sam Ortiz")
        );

        let ended = feedback(run(
            &reducer,
            &mut state,
            FacilityAction::Session(SessionAction::Complete),
        ))
        .await;
        let mut release = Vec::new();
        for action in ended {
            release.extend(feedback(run(&reducer, &mut state, action)).await);
        }
        assert_eq!(
            release,
            vec![FacilityAction::Bays(BayBoardAction::Release {
                bay_id: BayId::new(2)
            })]
        );
        for action in release {
            let _ = run(&reducer, &mut state, action);
        }
        assert_eq!(state.bays.available_count(), 3);
        assert_eq!(state.sessions.current_status(), Some(SessionStatus::Completed));
    }

    #[tokio::test]
    async fn confirmed_booking_begins_session() {
        let session = CustomerSession::scheduled(
            "Lee Wong",
            None,
            BayId::new(1),
            test_time() + TimeDelta::hours(2),
            test_time() + TimeDelta::hours(3),
            PricingTier::Night,
            test_time(),
        );
        let Ok(session) = session else {
            return;
        };
        let id = session.id();

        let reducer = FacilityReducer::new();
        let mut state = facility(1);
        let forwarded = feedback(run(
            &reducer,
            &mut state,
            FacilityAction::Booking(BookingAction::Confirmed {
                session: Box::new(session),
            }),
        ))
        .await;
        assert_eq!(forwarded.len(), 1);

        for action in forwarded {
            let _ = run(&reducer, &mut state, action);
        }
        assert_eq!(state.sessions.current.as_ref().map(CustomerSession::id), Some(id));
        assert_eq!(state.sessions.current_status(), Some(SessionStatus::Scheduled));
        // Not started yet, so the bay stays free
        assert_eq!(state.bays.available_count(), 1);
    }

    #[tokio::test]
    async fn extension_moves_the_bays_end() {
        let reducer = FacilityReducer::new();
        let mut state = facility(2);

        // Walk-in, started event, occupy
        let mut pending = vec![FacilityAction::Session(SessionAction::WalkIn {
            customer_name: "Sam Ortiz".to_string(),
            membership: None,
            bay_id: BayId::new(1),
            duration: TimeDelta::hours(1),
        })];
        while let Some(action) = pending.pop() {
            pending.extend(feedback(run(&reducer, &mut state, action)).await);
        }

        pending.push(FacilityAction::Session(SessionAction::Extend {
            by: TimeDelta::minutes(30),
        }));
        while let Some(action) = pending.pop() {
            pending.extend(feedback(run(&reducer, &mut state, action)).await);
        }

        let until = state
            .bays
            .get(BayId::new(1))
            .and_then(|bay| bay.current_booking.as_ref())
            .and_then(|booking| booking.until);
        assert_eq!(until, Some(test_time() + TimeDelta::minutes(90)));
        assert_eq!(
            state.sessions.current.as_ref().map(CustomerSession::planned_end_time),
            until
        );
    }

    #[test]
    fn turned_away_booking_is_unconfirmed() {
        let session = CustomerSession::scheduled(
            "Lee Wong",
            None,
            BayId::new(1),
            test_time() + TimeDelta::hours(2),
            test_time() + TimeDelta::hours(3),
            PricingTier::Night,
            test_time(),
        );
        let Ok(session) = session else {
            return;
        };
        let walk_in = CustomerSession::walk_in(
            "Sam Ortiz",
            None,
            BayId::new(2),
            TimeDelta::hours(1),
            PricingTier::Night,
            test_time(),
        );
        let Ok(walk_in) = walk_in else {
            return;
        };
        let walk_in_id = walk_in.id();
        let mut state = facility(2);
        state.sessions = SessionManagerState::with_session(walk_in);
        state.booking.confirmed = Some(session.id());

        ReducerTest::new(FacilityReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(FacilityAction::Session(SessionAction::Begin {
                session: Box::new(session),
            }))
            .then_state(move |state| {
                assert_eq!(state.booking.confirmed, None);
                assert_eq!(state.sessions.current.as_ref().map(CustomerSession::id), Some(walk_in_id));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn ended_session_leaves_someone_elses_bay() {
        let mut state = facility(1);
        let other = BayBooking::for_session(SessionId::new(), "Other", MembershipTier::Basic, test_time());
        if let Some(bay) = state.bays.bays.first_mut() {
            assert!(bay.occupy(other).is_ok());
        }

        ReducerTest::new(CoordinationReducer)
            .with_env(env())
            .given_state(state)
            .when_action(FacilityAction::Session(SessionAction::SessionEnded {
                session_id: SessionId::new(),
                bay_id: BayId::new(1),
                status: SessionStatus::Completed,
            }))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn children_only_see_their_own_actions() {
        ReducerTest::new(FacilityReducer::new())
            .with_env(env())
            .given_state(facility(2))
            .when_actions([
                FacilityAction::Booking(BookingAction::SetPlayerCount(3)),
                FacilityAction::Bays(BayBoardAction::SetMaintenance {
                    bay_id: BayId::new(1),
                    on: true,
                }),
            ])
            .then_state(|state| {
                assert_eq!(state.booking.player_count, 3);
                assert_eq!(state.bays.available_count(), 1);
                assert!(state.sessions.current.is_none());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn polling_ticks_stay_in_their_feature() {
        ReducerTest::new(FacilityReducer::new())
            .with_env(env())
            .given_state(facility(2))
            .when_action(FacilityAction::Session(SessionAction::StartPolling))
            .then_effects(|effects| {
                let ticks = assertions::delays(effects);
                assert_eq!(ticks.len(), 1);
                assert!(matches!(
                    ticks.first().map(|(_, action)| *action),
                    Some(FacilityAction::Session(SessionAction::Tick { generation: 1 }))
                ));
            })
            .run();
    }
}

//! Bay board: live occupancy of every bay in the facility.
//!
//! Real sessions occupy and release bays through commands. When polling,
//! each tick gives every bay a gated turn of the mock occupancy simulation
//! so the board looks alive without a backend.

use crate::bay::{BayBooking, BayStatus};
use crate::environment::FacilityEnvironment;
use crate::types::{BayId, SessionId};
use bayline_core::{Effect, Reducer, SmallVec, delay, smallvec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of the bay board
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BayBoardState {
    /// Every bay, in bay-number order
    pub bays: Vec<BayStatus>,
    /// Incremented on every start/stop of polling
    pub poll_generation: u64,
    /// Whether a poll tick is pending
    pub polling: bool,
    /// Last simulation pass
    pub last_simulated: Option<DateTime<Utc>>,
}

impl BayBoardState {
    /// Board over the given bays
    #[must_use]
    pub fn with_bays(bays: Vec<BayStatus>) -> Self {
        Self {
            bays,
            ..Self::default()
        }
    }

    /// Bays free to take a customer
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.bays.iter().filter(|bay| bay.is_available).count()
    }

    /// Look up a bay
    #[must_use]
    pub fn get(&self, bay_id: BayId) -> Option<&BayStatus> {
        self.bays.iter().find(|bay| bay.id == bay_id)
    }

    fn get_mut(&mut self, bay_id: BayId) -> Option<&mut BayStatus> {
        self.bays.iter_mut().find(|bay| bay.id == bay_id)
    }

    /// Whether every bay satisfies the availability invariant
    #[must_use]
    pub fn all_consistent(&self) -> bool {
        self.bays.iter().all(BayStatus::is_consistent)
    }
}

/// Actions for the bay board
#[derive(Clone, Debug, PartialEq)]
pub enum BayBoardAction {
    /// Replace the board with a fresh mock fleet
    Seed {
        /// Number of bays
        count: usize,
    },
    /// Run one simulation pass over every bay
    Simulate,
    /// Put a customer in a bay
    Occupy {
        /// Bay to occupy
        bay_id: BayId,
        /// Who takes it
        booking: BayBooking,
    },
    /// Move the planned end of a session's booking
    ExtendBooking {
        /// Bay the session holds
        bay_id: BayId,
        /// Session whose booking moves
        session_id: SessionId,
        /// New planned end
        until: DateTime<Utc>,
    },
    /// Free a bay
    Release {
        /// Bay to free
        bay_id: BayId,
    },
    /// Take a bay out of service or bring it back
    SetMaintenance {
        /// Bay to change
        bay_id: BayId,
        /// Out of service when true
        on: bool,
    },
    /// Begin periodic simulation passes
    StartPolling,
    /// Stop periodic simulation passes
    StopPolling,
    /// Periodic simulation pass
    Tick {
        /// Generation the tick was scheduled under
        generation: u64,
    },
}

/// Reducer for the bay board
#[derive(Clone, Debug)]
pub struct BayBoardReducer;

impl BayBoardReducer {
    /// Creates a new `BayBoardReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Give each bay a gated simulation turn; returns how many flipped
    fn simulate(state: &mut BayBoardState, env: &FacilityEnvironment) -> usize {
        let now = env.now();
        let gate = env.schedule().occupancy_gate();
        let rng = env.random();

        let flipped = state
            .bays
            .iter_mut()
            .filter(|_| rng.chance(gate))
            .map(|bay| bay.simulate_status_change(rng, now))
            .filter(|changed| *changed)
            .count();

        state.last_simulated = Some(now);
        if flipped > 0 {
            tracing::debug!(flipped, available = state.available_count(), "Simulated occupancy");
        }
        flipped
    }

    fn schedule_tick(state: &BayBoardState, env: &FacilityEnvironment) -> Effect<BayBoardAction> {
        delay! {
            duration: env.schedule().bay_poll(),
            action: BayBoardAction::Tick { generation: state.poll_generation }
        }
    }
}

impl Default for BayBoardReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for BayBoardReducer {
    type State = BayBoardState;
    type Action = BayBoardAction;
    type Environment = FacilityEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            BayBoardAction::Seed { count } => {
                state.bays = BayStatus::mock_fleet(count, env.random(), env.now());
                tracing::info!(count, available = state.available_count(), "Seeded bay board");
                SmallVec::new()
            },

            BayBoardAction::Simulate => {
                Self::simulate(state, env);
                SmallVec::new()
            },

            BayBoardAction::Occupy { bay_id, booking } => {
                match state.get_mut(bay_id) {
                    Some(bay) => {
                        if let Err(error) = bay.occupy(booking) {
                            tracing::debug!(%error, "Ignored occupy");
                        }
                    },
                    None => tracing::debug!(%bay_id, "Ignored occupy: unknown bay"),
                }
                SmallVec::new()
            },

            BayBoardAction::ExtendBooking {
                bay_id,
                session_id,
                until,
            } => {
                let extended = state
                    .get_mut(bay_id)
                    .is_some_and(|bay| bay.extend_booking(session_id, until));
                if !extended {
                    tracing::debug!(%bay_id, %session_id, "Ignored extension: bay not held by session");
                }
                SmallVec::new()
            },

            BayBoardAction::Release { bay_id } => {
                let now = env.now();
                match state.get_mut(bay_id) {
                    Some(bay) => {
                        if !bay.release(now) {
                            tracing::debug!(%bay_id, "Ignored release: bay already free");
                        }
                    },
                    None => tracing::debug!(%bay_id, "Ignored release: unknown bay"),
                }
                SmallVec::new()
            },

            BayBoardAction::SetMaintenance { bay_id, on } => {
                match state.get_mut(bay_id) {
                    Some(bay) => bay.set_maintenance(on),
                    None => tracing::debug!(%bay_id, "Ignored maintenance: unknown bay"),
                }
                SmallVec::new()
            },

            BayBoardAction::StartPolling => {
                state.poll_generation += 1;
                state.polling = true;
                smallvec![Self::schedule_tick(state, env)]
            },

            BayBoardAction::StopPolling => {
                state.poll_generation += 1;
                state.polling = false;
                SmallVec::new()
            },

            BayBoardAction::Tick { generation } => {
                if !state.polling || generation != state.poll_generation {
                    tracing::trace!(generation, current = state.poll_generation, "Stale tick");
                    return SmallVec::new();
                }
                Self::simulate(state, env);
                smallvec![Self::schedule_tick(state, env)]
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::MembershipTier;
    use bayline_testing::{FixedClock, ReducerTest, ScriptedRandom, assertions, test_clock, test_time};
    use std::sync::Arc;
    use std::time::Duration;

    fn env_with(rng: ScriptedRandom) -> FacilityEnvironment {
        FacilityEnvironment::new(Arc::new(test_clock()), Arc::new(rng))
    }

    fn empty_board(count: u32) -> BayBoardState {
        BayBoardState::with_bays(
            (1..=count)
                .map(|n| BayStatus::new(BayId::new(n), format!("Bay {n}"), "Lower Deck"))
                .collect(),
        )
    }

    fn booking() -> BayBooking {
        BayBooking::for_session(SessionId::new(), "Dana", MembershipTier::Basic, test_time())
    }

    #[test]
    fn seed_builds_consistent_fleet() {
        ReducerTest::new(BayBoardReducer::new())
            .with_env(FacilityEnvironment::new(
                Arc::new(test_clock()),
                Arc::new(bayline_core::environment::StdRandom::seeded(11)),
            ))
            .given_state(BayBoardState::default())
            .when_action(BayBoardAction::Seed { count: 8 })
            .then_state(|state| {
                assert_eq!(state.bays.len(), 8);
                assert!(state.all_consistent());
                assert!(state.get(BayId::new(8)).is_some());
                assert!(state.get(BayId::new(9)).is_none());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn closed_gate_leaves_bays_alone() {
        ReducerTest::new(BayBoardReducer::new())
            .with_env(env_with(ScriptedRandom::always(0.5)))
            .given_state(empty_board(4))
            .when_action(BayBoardAction::Simulate)
            .then_state(|state| {
                assert_eq!(state.available_count(), 4);
                assert_eq!(state.last_simulated, Some(test_time()));
            })
            .run();
    }

    #[test]
    fn open_gate_flips_bays() {
        ReducerTest::new(BayBoardReducer::new())
            .with_env(env_with(ScriptedRandom::always(0.0)))
            .given_state(empty_board(4))
            .when_action(BayBoardAction::Simulate)
            .then_state(|state| {
                assert_eq!(state.available_count(), 0);
                assert!(state.all_consistent());
            })
            .run();
    }

    #[test]
    fn occupy_and_release() {
        ReducerTest::new(BayBoardReducer::new())
            .with_env(env_with(ScriptedRandom::always(0.5)))
            .given_state(empty_board(2))
            .when_action(BayBoardAction::Occupy {
                bay_id: BayId::new(2),
                booking: booking(),
            })
            .then_state(|state| {
                assert_eq!(state.available_count(), 1);
                assert!(!state.get(BayId::new(2)).is_some_and(|b| b.is_available));
            })
            .run();

        ReducerTest::new(BayBoardReducer::new())
            .with_env(env_with(ScriptedRandom::always(0.5)))
            .given_state(empty_board(2))
            .when_actions([
                BayBoardAction::Occupy {
                    bay_id: BayId::new(2),
                    booking: booking(),
                },
                BayBoardAction::Release {
                    bay_id: BayId::new(2),
                },
            ])
            .then_state(|state| {
                let bay = state.get(BayId::new(2));
                assert_eq!(state.available_count(), 2);
                assert_eq!(bay.and_then(|b| b.last_cleaning_time), Some(test_time()));
            })
            .run();
    }

    #[test]
    fn extension_moves_only_the_holders_end() {
        let session_id = SessionId::new();
        let holder = BayBooking::for_session(session_id, "Dana", MembershipTier::Basic, test_time());
        let later = test_time() + chrono::TimeDelta::hours(2);

        ReducerTest::new(BayBoardReducer::new())
            .with_env(env_with(ScriptedRandom::always(0.5)))
            .given_state(empty_board(2))
            .when_actions([
                BayBoardAction::Occupy {
                    bay_id: BayId::new(1),
                    booking: holder,
                },
                BayBoardAction::ExtendBooking {
                    bay_id: BayId::new(1),
                    session_id,
                    until: later,
                },
                // Someone else's session leaves the board alone
                BayBoardAction::ExtendBooking {
                    bay_id: BayId::new(1),
                    session_id: SessionId::new(),
                    until: later + chrono::TimeDelta::hours(5),
                },
            ])
            .then_state(move |state| {
                let until = state
                    .get(BayId::new(1))
                    .and_then(|b| b.current_booking.as_ref())
                    .and_then(|b| b.until);
                assert_eq!(until, Some(later));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn unknown_bays_are_ignored() {
        let board = empty_board(2);
        let expected = board.clone();

        ReducerTest::new(BayBoardReducer::new())
            .with_env(env_with(ScriptedRandom::always(0.5)))
            .given_state(board)
            .when_actions([
                BayBoardAction::Occupy {
                    bay_id: BayId::new(7),
                    booking: booking(),
                },
                BayBoardAction::Release {
                    bay_id: BayId::new(7),
                },
                BayBoardAction::SetMaintenance {
                    bay_id: BayId::new(7),
                    on: true,
                },
            ])
            .then_state(move |state| assert_eq!(*state, expected))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn maintenance_blocks_occupy() {
        ReducerTest::new(BayBoardReducer::new())
            .with_env(env_with(ScriptedRandom::always(0.5)))
            .given_state(empty_board(1))
            .when_actions([
                BayBoardAction::SetMaintenance {
                    bay_id: BayId::new(1),
                    on: true,
                },
                BayBoardAction::Occupy {
                    bay_id: BayId::new(1),
                    booking: booking(),
                },
            ])
            .then_state(|state| {
                let bay = state.get(BayId::new(1));
                assert!(bay.is_some_and(|b| b.current_booking.is_none()));
                assert_eq!(state.available_count(), 0);
                assert!(state.all_consistent());
            })
            .run();
    }

    #[test]
    fn polling_reschedules_until_stopped() {
        ReducerTest::new(BayBoardReducer::new())
            .with_env(env_with(ScriptedRandom::always(0.5)))
            .given_state(empty_board(3))
            .when_actions([BayBoardAction::StartPolling, BayBoardAction::Tick { generation: 1 }])
            .then_state(|state| assert_eq!(state.last_simulated, Some(test_time())))
            .then_effects(|effects| {
                assertions::assert_single_delay(
                    effects,
                    Duration::from_secs(30),
                    &BayBoardAction::Tick { generation: 1 },
                );
            })
            .run();

        ReducerTest::new(BayBoardReducer::new())
            .with_env(env_with(ScriptedRandom::always(0.0)))
            .given_state(empty_board(3))
            .when_actions([
                BayBoardAction::StartPolling,
                BayBoardAction::StopPolling,
                BayBoardAction::Tick { generation: 1 },
            ])
            .then_state(|state| {
                assert_eq!(state.available_count(), 3);
                assert_eq!(state.last_simulated, None);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn fixed_clock_stamps_cleaning() {
        let later = test_time() + chrono::TimeDelta::hours(2);
        let env = FacilityEnvironment::new(Arc::new(FixedClock::new(later)), Arc::new(ScriptedRandom::always(0.0)));

        ReducerTest::new(BayBoardReducer::new())
            .with_env(env)
            .given_state(empty_board(1))
            .when_actions([BayBoardAction::Simulate, BayBoardAction::Simulate])
            .then_state(move |state| {
                let bay = state.get(BayId::new(1));
                assert!(bay.is_some_and(|b| b.is_available));
                assert_eq!(bay.and_then(|b| b.last_cleaning_time), Some(later));
            })
            .run();
    }
}

//! Reducer composition utilities
//!
//! The facility is built from small features that each own a slice of
//! state and their own action enum. This module glues them together:
//!
//! - **`scope_reducer`**: Run a child reducer on a field of the parent state,
//!   translating parent actions into child actions and child effects back
//!   into parent actions
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//!
//! # Example
//!
//! ```
//! use bayline_core::{Reducer, Effect, SmallVec};
//! use bayline_core::composition::{combine_reducers, scope_reducer};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Lights {
//!     on: bool,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum LightsAction {
//!     Toggle,
//! }
//!
//! struct LightsReducer;
//!
//! impl Reducer for LightsReducer {
//!     type State = Lights;
//!     type Action = LightsAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Lights, _action: LightsAction, _env: &()) -> SmallVec<[Effect<LightsAction>; 4]> {
//!         state.on = !state.on;
//!         SmallVec::new()
//!     }
//! }
//!
//! #[derive(Clone, Debug, Default)]
//! struct Bay {
//!     lights: Lights,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum BayAction {
//!     Lights(LightsAction),
//! }
//!
//! fn lights(bay: &mut Bay) -> &mut Lights {
//!     &mut bay.lights
//! }
//!
//! let scoped = scope_reducer(
//!     LightsReducer,
//!     lights,
//!     |action: BayAction| match action {
//!         BayAction::Lights(a) => Some(a),
//!     },
//!     BayAction::Lights,
//! );
//!
//! let combined = combine_reducers(vec![Box::new(scoped)]);
//!
//! let mut bay = Bay::default();
//! let _ = combined.reduce(&mut bay, BayAction::Lights(LightsAction::Toggle), &());
//! assert!(bay.lights.on);
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in order, and all effects are collected and concatenated.
/// Order matters: a later reducer observes the state changes of earlier ones.
///
/// # Type Parameters
///
/// - `S`: The state type
/// - `A`: The action type
/// - `E`: The environment type
#[must_use]
pub fn combine_reducers<S, A, E>(
    reducers: Vec<Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>>,
) -> CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    reducers: Vec<Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>>,
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects);
        }

        all_effects
    }
}

/// Scopes a child reducer to a field of a larger state.
///
/// # Arguments
///
/// - `reducer`: The child reducer
/// - `lens`: Borrows the child state out of the parent state
/// - `extract`: Returns the child action carried by a parent action, if any.
///   Parent actions that carry no child action are ignored.
/// - `embed`: Wraps child actions produced by child effects back into the
///   parent action type
#[must_use]
pub fn scope_reducer<S, SubS, A, SubA, E, R>(
    reducer: R,
    lens: fn(&mut S) -> &mut SubS,
    extract: fn(A) -> Option<SubA>,
    embed: fn(SubA) -> A,
) -> ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    ScopedReducer {
        reducer,
        lens,
        extract,
        embed,
        _phantom: std::marker::PhantomData,
    }
}

/// A reducer that runs a child reducer on a slice of parent state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    reducer: R,
    lens: fn(&mut S) -> &mut SubS,
    extract: fn(A) -> Option<SubA>,
    embed: fn(SubA) -> A,
    _phantom: std::marker::PhantomData<fn() -> E>,
}

impl<S, SubS, A, SubA, E, R> Reducer for ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
    A: Send + 'static,
    SubA: Send + 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some(child_action) = (self.extract)(action) else {
            return SmallVec::new();
        };

        let child_state = (self.lens)(state);
        let embed = self.embed;

        self.reducer
            .reduce(child_state, child_action, env)
            .into_iter()
            .map(|effect| effect.map(embed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;
    use std::time::Duration;

    #[derive(Clone, Debug, Default)]
    struct DoorState {
        open: bool,
        opened_count: u32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum DoorAction {
        Open,
        Close,
        AutoClose,
    }

    struct DoorReducer;

    impl Reducer for DoorReducer {
        type State = DoorState;
        type Action = DoorAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                DoorAction::Open => {
                    state.open = true;
                    state.opened_count += 1;
                    smallvec![Effect::Delay {
                        duration: Duration::from_secs(5),
                        action: Box::new(DoorAction::AutoClose),
                    }]
                },
                DoorAction::Close | DoorAction::AutoClose => {
                    state.open = false;
                    SmallVec::new()
                },
            }
        }
    }

    #[derive(Clone, Debug, Default)]
    struct BayState {
        door: DoorState,
        label: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum BayAction {
        Door(DoorAction),
        Rename(String),
    }

    struct RenameReducer;

    impl Reducer for RenameReducer {
        type State = BayState;
        type Action = BayAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            if let BayAction::Rename(label) = action {
                state.label = label;
            }
            SmallVec::new()
        }
    }

    fn door(bay: &mut BayState) -> &mut DoorState {
        &mut bay.door
    }

    fn door_scope() -> ScopedReducer<BayState, DoorState, BayAction, DoorAction, (), DoorReducer> {
        scope_reducer(
            DoorReducer,
            door,
            |action: BayAction| match action {
                BayAction::Door(a) => Some(a),
                BayAction::Rename(_) => None,
            },
            BayAction::Door,
        )
    }

    #[test]
    fn scoped_reducer_updates_child_state_only() {
        let scoped = door_scope();
        let mut state = BayState {
            label: "Bay 1".to_string(),
            ..BayState::default()
        };

        let _ = scoped.reduce(&mut state, BayAction::Door(DoorAction::Open), &());

        assert!(state.door.open);
        assert_eq!(state.door.opened_count, 1);
        assert_eq!(state.label, "Bay 1");
    }

    #[test]
    fn scoped_reducer_embeds_child_effects() {
        let scoped = door_scope();
        let mut state = BayState::default();

        let effects = scoped.reduce(&mut state, BayAction::Door(DoorAction::Open), &());

        assert_eq!(effects.len(), 1);
        assert_eq!(
            effects[0].delayed_action(),
            Some(&BayAction::Door(DoorAction::AutoClose))
        );
    }

    #[test]
    fn scoped_reducer_ignores_foreign_actions() {
        let scoped = door_scope();
        let mut state = BayState::default();

        let effects = scoped.reduce(&mut state, BayAction::Rename("VIP".to_string()), &());

        assert!(effects.is_empty());
        assert!(!state.door.open);
    }

    #[test]
    fn combined_reducers_all_see_action() {
        let combined = combine_reducers(vec![Box::new(door_scope()), Box::new(RenameReducer)]);
        let mut state = BayState::default();

        let _ = combined.reduce(&mut state, BayAction::Rename("VIP".to_string()), &());
        let effects = combined.reduce(&mut state, BayAction::Door(DoorAction::Open), &());

        assert_eq!(state.label, "VIP");
        assert!(state.door.open);
        assert_eq!(effects.len(), 1);

        let _ = combined.reduce(&mut state, BayAction::Door(DoorAction::Close), &());
        assert!(!state.door.open);
        assert_eq!(state.label, "VIP");
    }
}

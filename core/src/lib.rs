//! # Bayline Core
//!
//! Core traits and types for the Bayline facility model.
//!
//! Every feature of the facility (booking wizard, session manager, bay board)
//! is written as a reducer over plain state. This crate provides the pieces
//! those reducers share.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature
//! - **Action**: All possible inputs to a reducer (commands from a UI, timer ticks, feedback events)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits (`Clock`, `RandomSource`)
//!
//! ## Example
//!
//! ```ignore
//! use bayline_core::*;
//!
//! #[derive(Clone, Debug, Default)]
//! struct LaneState {
//!     occupied: bool,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum LaneAction {
//!     Occupy,
//!     Release,
//! }
//!
//! impl Reducer for LaneReducer {
//!     type State = LaneState;
//!     type Action = LaneAction;
//!     type Environment = LaneEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut LaneState,
//!         action: LaneAction,
//!         env: &LaneEnvironment,
//!     ) -> SmallVec<[Effect<LaneAction>; 4]> {
//!         state.occupied = matches!(action, LaneAction::Occupy);
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub use effect::Effect;
pub use environment::{Clock, RandomSource};
pub use reducer::Reducer;

/// Reducer composition utilities
pub mod composition;

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for SessionManagerReducer {
    ///     type State = SessionManagerState;
    ///     type Action = SessionAction;
    ///     type Environment = FacilityEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut SessionManagerState,
    ///         action: SessionAction,
    ///         env: &FacilityEnvironment,
    ///     ) -> SmallVec<[Effect<SessionAction>; 4]> {
    ///         match action {
    ///             SessionAction::Cancel => {
    ///                 // Business logic here
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and can be mapped into a parent
/// action type when a reducer is scoped into a larger feature.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (poll ticks, timeouts)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Returns the action carried by a `Delay` effect, if this is one
        #[must_use]
        pub fn delayed_action(&self) -> Option<&Action> {
            match self {
                Effect::Delay { action, .. } => Some(action),
                _ => None,
            }
        }

        /// Transform every action this effect can produce
        ///
        /// Used when a child reducer runs inside a parent feature: the
        /// child's effects must feed back parent actions.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            F: Fn(Action) -> B + Clone + Send + Sync + 'static,
            Action: Send + 'static,
            B: Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => Effect::Parallel(
                    effects.into_iter().map(|e| e.map(f.clone())).collect(),
                ),
                Effect::Sequential(effects) => Effect::Sequential(
                    effects.into_iter().map(|e| e.map(f.clone())).collect(),
                ),
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All sources of nondeterminism (wall-clock time, randomness) are
/// abstracted behind traits and injected via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::{Mutex, PoisonError};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock = SystemClock;
    ///
    /// // Test - fixed time for deterministic tests
    /// let clock = FixedClock::new(start_of_day);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of randomness for simulations
    ///
    /// Methods take `&self` because environments are shared immutably
    /// with reducers; implementations use interior mutability.
    pub trait RandomSource: Send + Sync {
        /// Uniform float in `[0, 1)`
        fn next_f64(&self) -> f64;

        /// Uniform index in `[0, upper)`. Returns 0 when `upper` is 0.
        fn next_below(&self, upper: usize) -> usize;

        /// Bernoulli trial succeeding with the given probability
        fn chance(&self, probability: f64) -> bool {
            self.next_f64() < probability
        }
    }

    /// `RandomSource` backed by [`StdRng`]
    #[derive(Debug)]
    pub struct StdRandom {
        rng: Mutex<StdRng>,
    }

    impl StdRandom {
        /// Seeded from OS entropy
        #[must_use]
        pub fn from_entropy() -> Self {
            Self {
                rng: Mutex::new(StdRng::from_entropy()),
            }
        }

        /// Reproducible sequence for a given seed
        #[must_use]
        pub fn seeded(seed: u64) -> Self {
            Self {
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            }
        }
    }

    impl RandomSource for StdRandom {
        fn next_f64(&self) -> f64 {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.r#gen::<f64>()
        }

        fn next_below(&self, upper: usize) -> usize {
            if upper == 0 {
                return 0;
            }
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.gen_range(0..upper)
        }
    }
}

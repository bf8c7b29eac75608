//! # Bayline Testing
//!
//! Testing utilities for Bayline reducers and stores.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits (`Clock`, `RandomSource`)
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use bayline_testing::{ReducerTest, test_clock, ScriptedRandom};
//!
//! ReducerTest::new(BayBoardReducer::new())
//!     .with_env(FacilityEnvironment::new(test_clock(), ScriptedRandom::always(0.0)))
//!     .given_state(BayBoardState::default())
//!     .when_action(BayBoardAction::Seed { count: 4 })
//!     .then_state(|s| assert_eq!(s.bays.len(), 4))
//!     .run();
//! ```

use bayline_core::environment::{Clock, RandomSource};
use chrono::{DateTime, Utc};


pub use reducer_test::{ReducerTest, assertions};

/// Deterministic implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, RandomSource, Utc};
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use bayline_testing::mocks::FixedClock;
    /// use bayline_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Lets a test walk a session through its lifetime: advance past the
    /// planned start, then past the planned end, sending a tick each time.
    ///
    /// ```
    /// use bayline_testing::mocks::ManualClock;
    /// use bayline_core::Clock;
    /// use chrono::{TimeDelta, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = ManualClock::new(start);
    /// clock.advance(TimeDelta::minutes(5));
    /// assert_eq!(clock.now(), start + TimeDelta::minutes(5));
    /// ```
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start the clock at the given instant
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::TimeDelta) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute instant
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Random source that replays a script of draws
    ///
    /// Each call to `next_f64` pops the next scripted value; once the script
    /// runs out every draw returns the fallback. `next_below(n)` scales the
    /// draw into `[0, n)`.
    ///
    /// ```
    /// use bayline_testing::mocks::ScriptedRandom;
    /// use bayline_core::RandomSource;
    ///
    /// let rng = ScriptedRandom::new([0.05, 0.9], 0.5);
    /// assert!(rng.chance(0.1));
    /// assert!(!rng.chance(0.5));
    /// assert_eq!(rng.next_f64(), 0.5);
    /// ```
    #[derive(Debug)]
    pub struct ScriptedRandom {
        script: Mutex<VecDeque<f64>>,
        fallback: f64,
    }

    impl ScriptedRandom {
        /// Replay `script`, then return `fallback` forever
        #[must_use]
        pub fn new(script: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                fallback,
            }
        }

        /// Every draw returns `value`
        #[must_use]
        pub fn always(value: f64) -> Self {
            Self::new([], value)
        }

        /// Draws still queued
        #[must_use]
        pub fn remaining(&self) -> usize {
            self.script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    impl RandomSource for ScriptedRandom {
        fn next_f64(&self) -> f64 {
            self.script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or(self.fallback)
        }

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        fn next_below(&self, upper: usize) -> usize {
            if upper == 0 {
                return 0;
            }
            let scaled = (self.next_f64().clamp(0.0, 1.0) * upper as f64) as usize;
            scaled.min(upper - 1)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// The instant [`test_clock`] is frozen at
    ///
    /// # Panics
    ///
    /// Never in practice; the timestamp is hardcoded.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }
}

/// Install a test log subscriber honoring `RUST_LOG`
///
/// Safe to call from many tests; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, ScriptedRandom, test_clock, test_time};

//! Injected dependencies for the facility reducers.

use crate::config::{FacilityConfig, ScheduleConfig};
use bayline_core::environment::{StdRandom, SystemClock};
use bayline_core::{Clock, RandomSource};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Clock, randomness and schedule shared by every facility reducer
///
/// Cloning is cheap; clones share the same clock and random source.
#[derive(Clone)]
pub struct FacilityEnvironment {
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    schedule: ScheduleConfig,
}

impl FacilityEnvironment {
    /// Environment with the default schedule
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            clock,
            random,
            schedule: ScheduleConfig::default(),
        }
    }

    /// Production environment: system clock, random source seeded from the
    /// config or from entropy
    #[must_use]
    pub fn from_config(config: &FacilityConfig) -> Self {
        let random: Arc<dyn RandomSource> = match config.seed {
            Some(seed) => Arc::new(StdRandom::seeded(seed)),
            None => Arc::new(StdRandom::from_entropy()),
        };
        Self::new(Arc::new(SystemClock), random).with_schedule(config.schedule.clone())
    }

    /// Same environment reading time from `clock`
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Same environment with a different schedule
    #[must_use]
    pub fn with_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.schedule = schedule;
        self
    }

    /// Current time
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Random source
    #[must_use]
    pub fn random(&self) -> &dyn RandomSource {
        self.random.as_ref()
    }

    /// Polling and opening hours
    #[must_use]
    pub const fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }
}

impl std::fmt::Debug for FacilityEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityEnvironment")
            .field("now", &self.now())
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

//! Configuration management for the facility.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Call `dotenvy::dotenv()` first to pick up a local `.env` file.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::ops::Range;
use std::time::Duration;

/// Facility configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityConfig {
    /// Number of bays seeded at startup
    pub bay_count: usize,
    /// Polling and opening hours
    pub schedule: ScheduleConfig,
    /// Seed for the random source; entropy when absent
    pub seed: Option<u64>,
    /// Simulator settings
    pub simulator: SimulatorConfig,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Grace period for in-flight effects at shutdown, in seconds
    pub shutdown_timeout_secs: u64,
}

/// Timing and opening-hour settings shared by the reducers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes east of UTC for the facility's local clock
    pub utc_offset_minutes: i32,
    /// Session poll interval while no session is active, in milliseconds
    pub idle_poll_ms: u64,
    /// Session poll interval while a session is active, in milliseconds
    pub active_poll_ms: u64,
    /// Bay board poll interval, in milliseconds
    pub bay_poll_ms: u64,
    /// Chance per poll that a bay gets a simulation turn, in percent
    pub occupancy_gate_percent: u8,
    /// First bookable hour (local)
    pub opening_hour: u32,
    /// Hour the last slot ends (local, up to 24)
    pub closing_hour: u32,
}

/// Settings for the `bayline-sim` binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Wall-clock length of a run, in seconds
    pub run_seconds: u64,
    /// Simulated seconds per wall-clock second
    pub speedup: u32,
}

impl ScheduleConfig {
    /// The facility's local offset; UTC if the configured minutes are out of range
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Session poll interval while idle or waiting for a scheduled start
    #[must_use]
    pub const fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// Session poll interval while a session is active
    #[must_use]
    pub const fn active_poll(&self) -> Duration {
        Duration::from_millis(self.active_poll_ms)
    }

    /// Bay board poll interval
    #[must_use]
    pub const fn bay_poll(&self) -> Duration {
        Duration::from_millis(self.bay_poll_ms)
    }

    /// Probability that a bay gets a simulation turn on a poll
    #[must_use]
    pub fn occupancy_gate(&self) -> f64 {
        f64::from(self.occupancy_gate_percent.min(100)) / 100.0
    }

    /// Bookable start hours (local)
    #[must_use]
    pub fn opening_hours(&self) -> Range<u32> {
        let closing = self.closing_hour.min(24);
        self.opening_hour.min(closing)..closing
    }

    /// Same schedule with every interval divided by `speedup`
    ///
    /// Used to run a compressed day: a 30 second poll at a speedup of 60
    /// fires every half second.
    #[must_use]
    pub fn compressed(&self, speedup: u32) -> Self {
        let speedup = u64::from(speedup.max(1));
        Self {
            idle_poll_ms: (self.idle_poll_ms / speedup).max(1),
            active_poll_ms: (self.active_poll_ms / speedup).max(1),
            bay_poll_ms: (self.bay_poll_ms / speedup).max(1),
            ..self.clone()
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            idle_poll_ms: 30_000,
            active_poll_ms: 60_000,
            bay_poll_ms: 30_000,
            occupancy_gate_percent: 10,
            opening_hour: 6,
            closing_hour: 24,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            run_seconds: 20,
            speedup: 360,
        }
    }
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            bay_count: 8,
            schedule: ScheduleConfig::default(),
            seed: None,
            simulator: SimulatorConfig::default(),
            log_level: "info".to_string(),
            shutdown_timeout_secs: 5,
        }
    }
}

impl FacilityConfig {
    /// Load configuration from environment variables.
    ///
    /// Falls back to defaults for missing or unparsable variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let schedule = defaults.schedule.clone();
        Self {
            bay_count: env::var("BAYLINE_BAY_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.bay_count),
            schedule: ScheduleConfig {
                utc_offset_minutes: env::var("BAYLINE_UTC_OFFSET_MINUTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(schedule.utc_offset_minutes),
                idle_poll_ms: env::var("BAYLINE_IDLE_POLL_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .map_or(schedule.idle_poll_ms, |secs| secs.saturating_mul(1000)),
                active_poll_ms: env::var("BAYLINE_ACTIVE_POLL_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .map_or(schedule.active_poll_ms, |secs| secs.saturating_mul(1000)),
                bay_poll_ms: env::var("BAYLINE_BAY_POLL_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .map_or(schedule.bay_poll_ms, |secs| secs.saturating_mul(1000)),
                occupancy_gate_percent: env::var("BAYLINE_OCCUPANCY_GATE_PERCENT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(schedule.occupancy_gate_percent),
                opening_hour: env::var("BAYLINE_OPENING_HOUR")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(schedule.opening_hour),
                closing_hour: env::var("BAYLINE_CLOSING_HOUR")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(schedule.closing_hour),
            },
            seed: env::var("BAYLINE_SEED").ok().and_then(|s| s.parse().ok()),
            simulator: SimulatorConfig {
                run_seconds: env::var("BAYLINE_SIM_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.simulator.run_seconds),
                speedup: env::var("BAYLINE_SIM_SPEEDUP")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.simulator.speedup),
            },
            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
            shutdown_timeout_secs: env::var("BAYLINE_SHUTDOWN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.shutdown_timeout_secs),
        }
    }

    /// Grace period for in-flight effects at shutdown
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

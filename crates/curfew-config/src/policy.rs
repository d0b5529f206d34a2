//! Validated policy structures

use crate::schema::{RawConfig, RawDeviceConfig, RawSchedule, RawServiceConfig, RawVolumeCap};
use crate::validation::parse_time;
use curfew_util::{SECONDS_PER_DAY, WallClock, default_state_path};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TICK_SECONDS: u64 = 5;
pub const DEFAULT_DAILY_BUDGET_SECONDS: u64 = 3600;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_BLOCKED_BEFORE: &str = "08:00";
pub const DEFAULT_FREE_WINDOW_START: &str = "19:30";
pub const DEFAULT_ENABLE_RESET_AT: &str = "04:00";

/// Validated policy ready for use by the enforcement cycle
#[derive(Debug, Clone)]
pub struct Policy {
    pub device: DeviceConfig,
    pub schedule: SchedulePolicy,
    /// None means volume is never capped
    pub volume: Option<VolumeCapPolicy>,
    pub service: ServiceConfig,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            device: DeviceConfig::from_raw(raw.device),
            schedule: SchedulePolicy::from_raw(raw.schedule),
            volume: raw.volume.map(VolumeCapPolicy::from_raw),
            service: ServiceConfig::from_raw(raw.service),
        }
    }
}

/// How to reach the television
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub address: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl DeviceConfig {
    fn from_raw(raw: RawDeviceConfig) -> Self {
        Self {
            address: raw.address.trim().to_string(),
            connect_timeout: Duration::from_millis(
                raw.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
            ),
            command_timeout: Duration::from_millis(
                raw.command_timeout_ms.unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS),
            ),
        }
    }
}

/// Budget and time-of-day rules
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    /// Interval between ticks, also the amount accrued per tick while on
    pub tick: Duration,
    pub daily_budget: Duration,
    /// The device is always powered off before this time of day
    pub blocked_before: WallClock,
    pub free_window: FreeWindow,
    /// A manual disable is lifted during this minute each day
    pub enable_reset_at: WallClock,
}

impl SchedulePolicy {
    fn from_raw(raw: RawSchedule) -> Self {
        Self {
            tick: Duration::from_secs(raw.tick_seconds.unwrap_or(DEFAULT_TICK_SECONDS)),
            daily_budget: Duration::from_secs(
                raw.daily_budget_seconds
                    .unwrap_or(DEFAULT_DAILY_BUDGET_SECONDS),
            ),
            blocked_before: clock_or(raw.blocked_before.as_deref(), DEFAULT_BLOCKED_BEFORE),
            free_window: FreeWindow {
                start: clock_or(raw.free_window_start.as_deref(), DEFAULT_FREE_WINDOW_START),
                end: raw.free_window_end.as_deref().map(|s| clock_or(Some(s), "23:59")),
            },
            enable_reset_at: clock_or(raw.enable_reset_at.as_deref(), DEFAULT_ENABLE_RESET_AT),
        }
    }

    pub fn tick_seconds(&self) -> u64 {
        self.tick.as_secs()
    }

    pub fn daily_budget_seconds(&self) -> u64 {
        self.daily_budget.as_secs()
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self::from_raw(RawSchedule::default())
    }
}

/// Evening interval during which the daily budget is not enforced.
///
/// The window is open strictly after `start` and, when `end` is set,
/// strictly before `end`. Without an end it runs until midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeWindow {
    pub start: WallClock,
    pub end: Option<WallClock>,
}

impl FreeWindow {
    pub fn contains_seconds(&self, seconds_since_midnight: u32) -> bool {
        let end = self
            .end
            .map(|e| e.as_seconds_from_midnight())
            .unwrap_or(SECONDS_PER_DAY);
        seconds_since_midnight > self.start.as_seconds_from_midnight()
            && seconds_since_midnight < end
    }
}

/// Morning volume cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeCapPolicy {
    pub cap: u8,
    /// The cap applies from midnight until this time of day
    pub until: WallClock,
}

impl VolumeCapPolicy {
    fn from_raw(raw: RawVolumeCap) -> Self {
        Self {
            cap: raw.cap.min(100),
            until: clock_or(Some(raw.until.as_str()), "00:00"),
        }
    }

    pub fn applies_at(&self, seconds_since_midnight: u32) -> bool {
        seconds_since_midnight < self.until.as_seconds_from_midnight()
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub state_file: PathBuf,
    pub http_bind: SocketAddr,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            state_file: raw.state_file.unwrap_or_else(default_state_path),
            http_bind: raw
                .http_bind
                .and_then(|b| b.parse().ok())
                .unwrap_or_else(default_http_bind),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

fn default_http_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Parse an already-validated `HH:MM` value, falling back to `default`.
fn clock_or(value: Option<&str>, default: &str) -> WallClock {
    value
        .and_then(|s| parse_time(s).ok())
        .or_else(|| parse_time(default).ok())
        .and_then(|(h, m)| WallClock::new(h, m))
        .unwrap_or(WallClock { hour: 0, minute: 0 })
}

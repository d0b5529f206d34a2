//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// The controlled television
    pub device: RawDeviceConfig,

    /// Budget and time-of-day rules
    #[serde(default)]
    pub schedule: RawSchedule,

    /// Morning volume cap (absent means no cap)
    #[serde(default)]
    pub volume: Option<RawVolumeCap>,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,
}

/// Device connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawDeviceConfig {
    /// `host:port` of the device control endpoint
    pub address: String,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Per-command timeout in milliseconds
    pub command_timeout_ms: Option<u64>,
}

/// Schedule settings. Times are `HH:MM` local time.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSchedule {
    /// Seconds between enforcement ticks
    pub tick_seconds: Option<u64>,

    /// Daily on-time budget in seconds
    pub daily_budget_seconds: Option<u64>,

    /// The device must be off before this time of day
    pub blocked_before: Option<String>,

    /// After this time of day the budget is waived
    pub free_window_start: Option<String>,

    /// Optional end of the free window (default: midnight)
    pub free_window_end: Option<String>,

    /// Time of day at which a manual disable is lifted
    pub enable_reset_at: Option<String>,
}

/// Volume cap
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawVolumeCap {
    /// Maximum volume while the cap applies
    pub cap: u8,

    /// The cap applies from midnight until this time of day
    pub until: String,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Usage state file (default: `$XDG_DATA_HOME/curfew/usage.json`)
    pub state_file: Option<PathBuf>,

    /// Listen address for the status page
    pub http_bind: Option<String>,
}

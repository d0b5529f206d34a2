//! The persisted daily usage record

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Today's usage. Exactly one of these exists; it is overwritten in place.
///
/// On disk:
/// `{"date": "<rfc3339>", "secondsOn": 120, "enabled": true, "volume": 8}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// Timestamp the record's day is derived from
    pub date: DateTime<Local>,

    /// Accumulated on-time for the record's day
    pub seconds_on: u64,

    /// When false, quota and window rules are suspended
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Last volume reported by the device
    #[serde(default, rename = "volume", skip_serializing_if = "Option::is_none")]
    pub last_known_volume: Option<u8>,

    /// Instant of the most recent accrual
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Local>>,
}

fn default_enabled() -> bool {
    true
}

impl UsageRecord {
    /// A fresh record for the day of `now`
    pub fn fresh(now: DateTime<Local>) -> Self {
        Self {
            date: now,
            seconds_on: 0,
            enabled: true,
            last_known_volume: None,
            last_checked_at: None,
        }
    }

    /// Calendar day this record accounts for
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    /// Reset the accumulated time if `now` is on a different day.
    ///
    /// Returns true when a rollover happened.
    pub fn roll_over(&mut self, now: DateTime<Local>) -> bool {
        if self.day() == now.date_naive() {
            return false;
        }

        self.date = now;
        self.seconds_on = 0;
        true
    }

    /// Roll the day over, then count one tick of on-time.
    ///
    /// An instant that was already counted is not counted again. Returns
    /// true when time was added.
    pub fn accrue(&mut self, now: DateTime<Local>, tick_seconds: u64) -> bool {
        self.roll_over(now);

        if self.last_checked_at == Some(now) {
            return false;
        }

        self.seconds_on = self.seconds_on.saturating_add(tick_seconds);
        self.date = now;
        self.last_checked_at = Some(now);
        true
    }

    /// Seconds left before the daily budget is used up
    pub fn remaining_seconds(&self, daily_budget_seconds: u64) -> u64 {
        daily_budget_seconds.saturating_sub(self.seconds_on)
    }
}

//! Live status shared with the status page
//!
//! The enforcement cycle owns the only [`StatusPublisher`]. Readers hold a
//! [`StatusReceiver`] and may see a snapshot that is one tick old.

use chrono::{DateTime, Local};
use curfew_store::UsageRecord;
use serde::Serialize;
use tokio::sync::watch;

use crate::Decision;

/// Snapshot of what the daemon last observed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveStatus {
    /// Whether the device answered on the last tick
    pub is_on: bool,
    pub seconds_on: u64,
    pub remaining_seconds: u64,
    pub enabled: bool,
    pub volume: Option<u8>,
    pub last_checked_at: Option<DateTime<Local>>,
    /// Instant of the last completed tick, whatever its outcome
    pub last_tick_at: Option<DateTime<Local>>,
    pub decision: Option<Decision>,
    /// Set when the last tick could not persist usage
    pub last_error: Option<String>,
}

impl LiveStatus {
    /// Status as known from the persisted record alone, before any tick
    pub fn from_record(record: &UsageRecord, daily_budget_seconds: u64) -> Self {
        Self {
            is_on: false,
            seconds_on: record.seconds_on,
            remaining_seconds: record.remaining_seconds(daily_budget_seconds),
            enabled: record.enabled,
            volume: record.last_known_volume,
            last_checked_at: record.last_checked_at,
            last_tick_at: None,
            decision: None,
            last_error: None,
        }
    }

    pub fn minutes_used(&self) -> u64 {
        self.seconds_on / 60
    }

    pub fn minutes_remaining(&self) -> u64 {
        self.remaining_seconds / 60
    }
}

pub type StatusReceiver = watch::Receiver<LiveStatus>;

/// Single writer side of the status channel
#[derive(Debug)]
pub struct StatusPublisher {
    tx: watch::Sender<LiveStatus>,
}

/// Create the status channel seeded with `initial`
pub fn status_channel(initial: LiveStatus) -> (StatusPublisher, StatusReceiver) {
    let (tx, rx) = watch::channel(initial);
    (StatusPublisher { tx }, rx)
}

impl StatusPublisher {
    pub fn subscribe(&self) -> StatusReceiver {
        self.tx.subscribe()
    }

    /// The device did not answer. `record` is the stored usage as of
    /// `now`, already rolled over but not saved.
    pub fn device_off(
        &self,
        now: DateTime<Local>,
        record: &UsageRecord,
        daily_budget_seconds: u64,
    ) {
        self.tx.send_modify(|status| {
            status.is_on = false;
            status.seconds_on = record.seconds_on;
            status.remaining_seconds = record.remaining_seconds(daily_budget_seconds);
            status.enabled = record.enabled;
            status.volume = record.last_known_volume;
            status.last_checked_at = record.last_checked_at;
            status.last_tick_at = Some(now);
            status.last_error = None;
        });
    }

    /// A tick persisted `record` and reached `decision`
    pub fn enforced(&self, now: DateTime<Local>, record: &UsageRecord, decision: &Decision) {
        self.tx.send_modify(|status| {
            status.is_on = true;
            status.seconds_on = record.seconds_on;
            status.remaining_seconds = decision.remaining_seconds;
            status.enabled = record.enabled;
            status.volume = record.last_known_volume;
            status.last_checked_at = record.last_checked_at;
            status.last_tick_at = Some(now);
            status.decision = Some(*decision);
            status.last_error = None;
        });
    }

    /// Usage could not be saved. Everything else stays as it was.
    pub fn persist_failed(&self, error: String) {
        self.tx.send_modify(|status| {
            status.last_error = Some(error);
        });
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.tx.send_modify(|status| status.enabled = enabled);
    }
}

use curfew_config::Policy;
use curfew_core::{Decision, LiveStatus};
use curfew_util::format_datetime_full;
use serde::Serialize;

/// What the status page and `/api/status` show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub is_on: bool,
    pub enabled: bool,
    pub minutes_used: u64,
    pub minutes_remaining: u64,
    pub daily_budget_minutes: u64,
    pub last_checked_at: Option<String>,
    pub volume: Option<u8>,
    pub volume_cap: Option<u8>,
    pub volume_cap_until: Option<String>,
    pub blocked_before: String,
    pub free_window_start: String,
    pub free_window_end: Option<String>,
    pub decision: Option<Decision>,
    pub last_error: Option<String>,
}

impl StatusView {
    pub fn new(status: &LiveStatus, policy: &Policy) -> Self {
        let schedule = &policy.schedule;
        Self {
            is_on: status.is_on,
            enabled: status.enabled,
            minutes_used: status.minutes_used(),
            minutes_remaining: status.minutes_remaining(),
            daily_budget_minutes: schedule.daily_budget_seconds() / 60,
            last_checked_at: status.last_checked_at.as_ref().map(format_datetime_full),
            volume: status.volume,
            volume_cap: policy.volume.map(|v| v.cap),
            volume_cap_until: policy.volume.map(|v| v.until.to_string()),
            blocked_before: schedule.blocked_before.to_string(),
            free_window_start: schedule.free_window.start.to_string(),
            free_window_end: schedule.free_window.end.map(|end| end.to_string()),
            decision: status.decision,
            last_error: status.last_error.clone(),
        }
    }
}

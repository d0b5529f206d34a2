//! Policy evaluator

use chrono::{DateTime, TimeZone};
use curfew_config::Policy;
use curfew_store::UsageRecord;
use curfew_util::seconds_since_midnight;
use serde::Serialize;

/// What should happen to the device's power this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerDecision {
    Allow,
    PowerOff,
}

/// Which rule produced the decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Enforcement is manually disabled
    Override,
    /// Before the morning block ends
    TooEarly,
    /// Daily budget used up outside the free window
    BudgetExhausted,
    /// Over budget, but inside the free window
    FreeWindow,
    WithinBudget,
}

impl DecisionReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Override => "enforcement disabled",
            Self::TooEarly => "too early",
            Self::BudgetExhausted => "daily budget used up",
            Self::FreeWindow => "free window",
            Self::WithinBudget => "within budget",
        }
    }
}

/// Result of evaluating the policy against the current record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub power: PowerDecision,
    pub reason: DecisionReason,
    /// Set the volume to this value
    pub cap_volume: Option<u8>,
    /// Budget left today, independent of the window rules
    pub remaining_seconds: u64,
}

impl Decision {
    pub fn is_power_off(&self) -> bool {
        self.power == PowerDecision::PowerOff
    }

    /// True when the decision asks the device to do nothing
    pub fn is_noop(&self) -> bool {
        !self.is_power_off() && self.cap_volume.is_none()
    }
}

/// Decide what to do with the device.
///
/// Rules, first match wins:
/// 1. Enforcement disabled: allow, nothing else.
/// 2. Before `blocked_before`: power off.
/// 3. Over budget outside the free window: power off.
/// 4. Otherwise allow, capping the volume while the cap window is open.
///
/// Stateless: the same inputs always give the same decision.
pub fn evaluate<Tz: TimeZone>(now: &DateTime<Tz>, record: &UsageRecord, policy: &Policy) -> Decision {
    let schedule = &policy.schedule;
    let remaining_seconds = record.remaining_seconds(schedule.daily_budget_seconds());

    let decide = |power, reason, cap_volume| Decision {
        power,
        reason,
        cap_volume,
        remaining_seconds,
    };

    if !record.enabled {
        return decide(PowerDecision::Allow, DecisionReason::Override, None);
    }

    let seconds = seconds_since_midnight(now);

    if seconds < schedule.blocked_before.as_seconds_from_midnight() {
        return decide(PowerDecision::PowerOff, DecisionReason::TooEarly, None);
    }

    let over_budget = record.seconds_on > schedule.daily_budget_seconds();
    let in_free_window = schedule.free_window.contains_seconds(seconds);
    if over_budget && !in_free_window {
        return decide(PowerDecision::PowerOff, DecisionReason::BudgetExhausted, None);
    }

    let reason = if over_budget {
        DecisionReason::FreeWindow
    } else {
        DecisionReason::WithinBudget
    };

    let cap_volume = policy.volume.and_then(|volume| {
        let loud = record.last_known_volume.is_some_and(|v| v > volume.cap);
        (volume.applies_at(seconds) && loud).then_some(volume.cap)
    });

    decide(PowerDecision::Allow, reason, cap_volume)
}

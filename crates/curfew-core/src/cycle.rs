//! The per-tick enforcement cycle

use chrono::{DateTime, Local};
use curfew_config::Policy;
use curfew_device::{DeviceClient, DeviceSession};
use curfew_store::UsageStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{Decision, StatusPublisher, StatusReceiver, evaluate};

/// How a tick ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The device did not answer; nothing was accrued
    DeviceOff,
    /// Usage was persisted and the decision was carried out
    Enforced(Decision),
    /// Usage could not be persisted; no action was taken
    PersistFailed(String),
}

/// Runs one enforcement pass per tick.
///
/// Order within a tick: maintenance reset, connect, load, roll over,
/// accrue, observe volume, persist, evaluate, act, close.
pub struct EnforcementCycle {
    policy: Policy,
    store: Arc<dyn UsageStore>,
    device: Arc<dyn DeviceClient>,
    status: StatusPublisher,
}

impl EnforcementCycle {
    pub fn new(
        policy: Policy,
        store: Arc<dyn UsageStore>,
        device: Arc<dyn DeviceClient>,
        status: StatusPublisher,
    ) -> Self {
        info!(
            tick_seconds = policy.schedule.tick_seconds(),
            daily_budget_seconds = policy.schedule.daily_budget_seconds(),
            "Enforcement cycle initialized"
        );

        Self {
            policy,
            store,
            device,
            status,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn status(&self) -> StatusReceiver {
        self.status.subscribe()
    }

    /// Run one tick at `now`
    pub async fn tick(&self, now: DateTime<Local>) -> TickOutcome {
        self.daily_reset(now);

        let mut session = match self.device.connect(self.policy.device.connect_timeout).await {
            Ok(session) => session,
            Err(e) => {
                if e.is_unreachable() {
                    debug!(error = %e, "Device off");
                } else {
                    warn!(error = %e, "Device connect failed, treating as off");
                }
                self.publish_device_off(now);
                return TickOutcome::DeviceOff;
            }
        };

        let outcome = self.enforce(session.as_mut(), now).await;
        session.close().await;
        outcome
    }

    /// Refresh the status from what is stored, as it would read after a
    /// rollover. Nothing is saved.
    fn publish_device_off(&self, now: DateTime<Local>) {
        let mut record = self.store.load(now);
        record.roll_over(now);
        self.status
            .device_off(now, &record, self.policy.schedule.daily_budget_seconds());
    }

    /// Lift a manual disable during the configured reset minute
    fn daily_reset(&self, now: DateTime<Local>) {
        if !self.policy.schedule.enable_reset_at.matches_minute(&now) {
            return;
        }
        if self.store.load(now).enabled {
            return;
        }

        match self.store.set_enabled(true, now) {
            Ok(_) => {
                info!(at = %self.policy.schedule.enable_reset_at, "Daily reset: enforcement re-enabled");
                self.status.set_enabled(true);
            }
            Err(e) => error!(error = %e, "Daily reset failed to persist"),
        }
    }

    async fn enforce(&self, session: &mut dyn DeviceSession, now: DateTime<Local>) -> TickOutcome {
        let mut record = self.store.load(now);

        let previous_day = record.day();
        if record.roll_over(now) {
            info!(previous = %previous_day, today = %record.day(), "New day, usage reset");
        }
        if !record.accrue(now, self.policy.schedule.tick_seconds()) {
            debug!("Instant already counted, not accruing again");
        }

        match session.audio_status().await {
            Ok(audio) => record.last_known_volume = Some(audio.volume),
            Err(e) => debug!(error = %e, "Volume query failed, keeping last known volume"),
        }

        if let Err(e) = self.store.save(&record) {
            error!(error = %e, seconds_on = record.seconds_on, "Failed to persist usage, skipping enforcement");
            self.status.persist_failed(e.to_string());
            return TickOutcome::PersistFailed(e.to_string());
        }

        let decision = evaluate(&now, &record, &self.policy);
        debug!(
            seconds_on = record.seconds_on,
            enabled = record.enabled,
            power = ?decision.power,
            reason = decision.reason.describe(),
            cap_volume = ?decision.cap_volume,
            "Policy evaluated"
        );

        self.act(session, &decision).await;
        self.status.enforced(now, &record, &decision);

        TickOutcome::Enforced(decision)
    }

    async fn act(&self, session: &mut dyn DeviceSession, decision: &Decision) {
        if decision.is_power_off() {
            info!(
                reason = decision.reason.describe(),
                remaining_seconds = decision.remaining_seconds,
                "Powering off device"
            );
            if let Err(e) = session.power_off().await {
                warn!(error = %e, "Power off failed, will retry next tick");
            }
        }

        if let Some(cap) = decision.cap_volume {
            info!(cap, "Capping volume");
            if let Err(e) = session.set_volume(cap).await {
                warn!(error = %e, cap, "Volume cap failed, will retry next tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecisionReason, LiveStatus, PowerDecision, status_channel};
    use chrono::TimeZone;
    use curfew_config::{
        DeviceConfig, SchedulePolicy, ServiceConfig, VolumeCapPolicy,
    };
    use curfew_device::{DeviceCommand, MockDevice};
    use curfew_store::{MemoryStore, UsageRecord};
    use curfew_util::WallClock;
    use std::time::Duration;

    fn test_policy() -> Policy {
        Policy {
            device: DeviceConfig {
                address: "mock".into(),
                connect_timeout: Duration::from_millis(50),
                command_timeout: Duration::from_millis(50),
            },
            schedule: SchedulePolicy::default(),
            volume: Some(VolumeCapPolicy {
                cap: 5,
                until: WallClock::new(17, 0).unwrap(),
            }),
            service: ServiceConfig::default(),
        }
    }

    fn at(day: u32, h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, day, h, m, 0).unwrap()
    }

    struct Harness {
        cycle: EnforcementCycle,
        store: MemoryStore,
        device: MockDevice,
        status: StatusReceiver,
    }

    fn harness(store: MemoryStore, device: MockDevice) -> Harness {
        let (publisher, status) = status_channel(LiveStatus::default());
        let cycle = EnforcementCycle::new(
            test_policy(),
            Arc::new(store.clone()),
            Arc::new(device.clone()),
            publisher,
        );
        Harness {
            cycle,
            store,
            device,
            status,
        }
    }

    fn stored_record(seconds_on: u64, enabled: bool, now: DateTime<Local>) -> UsageRecord {
        let mut record = UsageRecord::fresh(now);
        record.seconds_on = seconds_on;
        record.enabled = enabled;
        record
    }

    #[tokio::test]
    async fn test_fresh_start_accrues_and_allows() {
        let h = harness(MemoryStore::new(), MockDevice::new().with_volume(3));

        let outcome = h.cycle.tick(at(10, 10, 0)).await;
        let TickOutcome::Enforced(decision) = outcome else {
            panic!("expected enforcement, got {outcome:?}");
        };
        assert_eq!(decision.power, PowerDecision::Allow);

        let record = h.store.stored().unwrap();
        assert_eq!(record.seconds_on, 5);
        assert_eq!(record.last_known_volume, Some(3));
        assert_eq!(h.device.sent(), vec![DeviceCommand::GetAudioStatus]);

        let status = h.status.borrow().clone();
        assert!(status.is_on);
        assert_eq!(status.seconds_on, 5);
    }

    #[tokio::test]
    async fn test_device_off_does_not_accrue() {
        let now = at(10, 10, 0);
        let store = MemoryStore::with_record(stored_record(100, true, now));
        let device = MockDevice::new();
        device.set_reachable(false);
        let h = harness(store, device);

        assert_eq!(h.cycle.tick(now).await, TickOutcome::DeviceOff);
        assert_eq!(h.store.stored().unwrap().seconds_on, 100);
        assert!(!h.status.borrow().is_on);
        assert_eq!(h.device.snapshot().connects, 0);
    }

    #[tokio::test]
    async fn test_device_off_shows_stored_toggle() {
        let now = at(10, 15, 0);
        let store = MemoryStore::with_record(stored_record(1200, true, now));
        let device = MockDevice::new();
        device.set_reachable(false);
        let h = harness(store.clone(), device);

        h.cycle.tick(now).await;
        assert!(h.status.borrow().enabled);

        store.set_enabled(false, now).unwrap();
        assert_eq!(h.cycle.tick(at(10, 15, 5)).await, TickOutcome::DeviceOff);

        let status = h.status.borrow().clone();
        assert!(!status.is_on);
        assert!(!status.enabled);
        assert_eq!(status.seconds_on, 1200);
        assert_eq!(status.remaining_seconds, 2400);
    }

    #[tokio::test]
    async fn test_device_off_after_midnight_shows_new_day() {
        let yesterday = at(9, 22, 0);
        let store = MemoryStore::with_record(stored_record(5000, true, yesterday));
        let device = MockDevice::new();
        device.set_reachable(false);
        let h = harness(store, device);

        assert_eq!(h.cycle.tick(at(10, 9, 0)).await, TickOutcome::DeviceOff);

        let status = h.status.borrow().clone();
        assert_eq!(status.seconds_on, 0);
        assert_eq!(status.remaining_seconds, 3600);

        // Preview only; the stored day is rolled over on the next save
        let stored = h.store.stored().unwrap();
        assert_eq!(stored.seconds_on, 5000);
        assert_eq!(stored.day(), yesterday.date_naive());
    }

    #[tokio::test]
    async fn test_over_budget_powers_off() {
        let now = at(10, 15, 0);
        let store = MemoryStore::with_record(stored_record(3605, true, now));
        let h = harness(store, MockDevice::new());

        let outcome = h.cycle.tick(now).await;
        assert!(matches!(outcome, TickOutcome::Enforced(d) if d.is_power_off()));
        assert!(h.device.is_powered_off());
        assert_eq!(h.store.stored().unwrap().seconds_on, 3610);

        // Off now, so the next tick neither accrues nor acts
        assert_eq!(h.cycle.tick(at(10, 15, 5)).await, TickOutcome::DeviceOff);
        assert_eq!(h.store.stored().unwrap().seconds_on, 3610);
    }

    #[tokio::test]
    async fn test_free_window_allows_over_budget() {
        let now = at(10, 20, 0);
        let store = MemoryStore::with_record(stored_record(3605, true, now));
        let h = harness(store, MockDevice::new());

        let outcome = h.cycle.tick(now).await;
        assert!(
            matches!(outcome, TickOutcome::Enforced(d) if d.reason == DecisionReason::FreeWindow)
        );
        assert!(!h.device.is_powered_off());
    }

    #[tokio::test]
    async fn test_toggle_off_flips_next_tick() {
        let now = at(10, 15, 0);
        let store = MemoryStore::with_record(stored_record(4000, true, now));
        let h = harness(store.clone(), MockDevice::new());

        store.set_enabled(false, now).unwrap();
        let outcome = h.cycle.tick(now).await;
        assert!(matches!(outcome, TickOutcome::Enforced(d) if !d.is_power_off()));
        assert!(!h.device.is_powered_off());
    }

    #[tokio::test]
    async fn test_volume_capped_before_cutoff() {
        let h = harness(MemoryStore::new(), MockDevice::new().with_volume(8));

        let outcome = h.cycle.tick(at(10, 10, 0)).await;
        assert!(matches!(outcome, TickOutcome::Enforced(d) if d.cap_volume == Some(5)));
        assert_eq!(h.device.volume(), 5);
        assert_eq!(
            h.device.sent(),
            vec![
                DeviceCommand::GetAudioStatus,
                DeviceCommand::SetVolume { volume: 5 }
            ]
        );
    }

    #[tokio::test]
    async fn test_rollover_resets_before_accrual() {
        let yesterday = at(9, 22, 0);
        let store = MemoryStore::with_record(stored_record(5000, true, yesterday));
        let h = harness(store, MockDevice::new());

        let outcome = h.cycle.tick(at(10, 9, 0)).await;
        assert!(matches!(outcome, TickOutcome::Enforced(d) if !d.is_power_off()));

        let record = h.store.stored().unwrap();
        assert_eq!(record.seconds_on, 5);
        assert_eq!(record.day(), at(10, 9, 0).date_naive());
    }

    #[tokio::test]
    async fn test_same_instant_twice_counts_once() {
        let h = harness(MemoryStore::new(), MockDevice::new());
        let now = at(10, 10, 0);

        h.cycle.tick(now).await;
        h.cycle.tick(now).await;
        assert_eq!(h.store.stored().unwrap().seconds_on, 5);
    }

    #[tokio::test]
    async fn test_volume_query_failure_is_not_fatal() {
        let now = at(10, 10, 0);
        let mut record = stored_record(0, true, now);
        record.last_known_volume = Some(4);
        let device = MockDevice::new();
        *device.fail_audio_status.lock().unwrap() = true;
        let h = harness(MemoryStore::with_record(record), device);

        let outcome = h.cycle.tick(now).await;
        assert!(matches!(outcome, TickOutcome::Enforced(_)));
        let record = h.store.stored().unwrap();
        assert_eq!(record.seconds_on, 5);
        assert_eq!(record.last_known_volume, Some(4));
    }

    #[tokio::test]
    async fn test_command_failure_is_swallowed_and_session_closed() {
        let now = at(10, 15, 0);
        let store = MemoryStore::with_record(stored_record(3605, true, now));
        let device = MockDevice::new();
        *device.fail_commands.lock().unwrap() = true;
        let h = harness(store, device);

        let outcome = h.cycle.tick(now).await;
        assert!(matches!(outcome, TickOutcome::Enforced(d) if d.is_power_off()));
        assert!(!h.device.is_powered_off());

        let snapshot = h.device.snapshot();
        assert_eq!(snapshot.open_sessions, 0);
        assert_eq!(snapshot.closes, 1);
        assert_eq!(h.store.stored().unwrap().seconds_on, 3610);
    }

    #[tokio::test]
    async fn test_persist_failure_skips_acting() {
        let now = at(10, 15, 0);
        let store = MemoryStore::with_record(stored_record(3605, true, now));
        *store.fail_saves.lock().unwrap() = true;
        let h = harness(store, MockDevice::new());

        let outcome = h.cycle.tick(now).await;
        assert!(matches!(outcome, TickOutcome::PersistFailed(_)));
        assert!(!h.device.is_powered_off());
        assert_eq!(h.device.sent(), vec![DeviceCommand::GetAudioStatus]);
        assert_eq!(h.device.snapshot().open_sessions, 0);

        let status = h.status.borrow().clone();
        assert!(status.last_error.is_some());
        assert_eq!(status.last_tick_at, None);
        assert_eq!(h.store.stored().unwrap().seconds_on, 3605);
    }

    #[tokio::test]
    async fn test_daily_reset_reenables_even_when_off() {
        let reset_minute = at(10, 4, 0);
        let store = MemoryStore::with_record(stored_record(0, false, at(10, 1, 0)));
        let device = MockDevice::new();
        device.set_reachable(false);
        let h = harness(store, device);

        assert_eq!(h.cycle.tick(reset_minute).await, TickOutcome::DeviceOff);
        assert!(h.store.stored().unwrap().enabled);
        assert!(h.status.borrow().enabled);
    }

    #[tokio::test]
    async fn test_daily_reset_only_in_matching_minute() {
        let store = MemoryStore::with_record(stored_record(0, false, at(10, 1, 0)));
        let device = MockDevice::new();
        device.set_reachable(false);
        let h = harness(store, device);

        h.cycle.tick(at(10, 4, 1)).await;
        assert!(!h.store.stored().unwrap().enabled);
    }
}

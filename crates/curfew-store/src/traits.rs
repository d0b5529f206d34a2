//! Store trait definitions

use chrono::{DateTime, Local};
use tracing::info;

use crate::{StoreResult, UsageRecord};

/// Durable home of the single usage record
pub trait UsageStore: Send + Sync {
    /// Read the persisted record.
    ///
    /// A missing or unreadable record is not an error: implementations
    /// log the recovery and return [`UsageRecord::fresh`] for `now`.
    fn load(&self, now: DateTime<Local>) -> UsageRecord;

    /// Overwrite the persisted record with `record` in full
    fn save(&self, record: &UsageRecord) -> StoreResult<()>;

    /// Set the manual override flag (load, mutate, save)
    fn set_enabled(&self, enabled: bool, now: DateTime<Local>) -> StoreResult<UsageRecord> {
        let mut record = self.load(now);
        record.enabled = enabled;
        self.save(&record)?;

        info!(enabled, seconds_on = record.seconds_on, "Enforcement flag updated");
        Ok(record)
    }
}

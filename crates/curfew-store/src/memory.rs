//! In-memory store implementation

use chrono::{DateTime, Local};
use std::io;
use std::sync::{Arc, Mutex};

use crate::{StoreError, StoreResult, UsageRecord, UsageStore};

/// Keeps the record in memory. Used by tests across the workspace.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<UsageRecord>>>,

    /// Configure save to fail
    pub fail_saves: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: UsageRecord) -> Self {
        let store = Self::new();
        *store.record.lock().unwrap() = Some(record);
        store
    }

    /// The stored record, without the fresh-start fallback of `load`
    pub fn stored(&self) -> Option<UsageRecord> {
        self.record.lock().unwrap().clone()
    }
}

impl UsageStore for MemoryStore {
    fn load(&self, now: DateTime<Local>) -> UsageRecord {
        self.record
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| UsageRecord::fresh(now))
    }

    fn save(&self, record: &UsageRecord) -> StoreResult<()> {
        if *self.fail_saves.lock().unwrap() {
            return Err(StoreError::Io(io::Error::other("simulated write failure")));
        }
        *self.record.lock().unwrap() = Some(record.clone());
        Ok(())
    }
}

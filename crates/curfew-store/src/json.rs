//! JSON file store implementation

use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{StoreResult, UsageRecord, UsageStore};

/// Keeps the usage record in a single JSON document.
///
/// Every save writes a sibling temp file, syncs it and renames it over the
/// target, so readers only ever see a complete document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "usage.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl UsageStore for JsonFileStore {
    fn load(&self, now: DateTime<Local>) -> UsageRecord {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No usage record yet, starting fresh");
                return UsageRecord::fresh(now);
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Usage record unreadable, starting fresh"
                );
                return UsageRecord::fresh(now);
            }
        };

        match serde_json::from_str::<UsageRecord>(&content) {
            Ok(record) => {
                debug!(
                    day = %record.day(),
                    seconds_on = record.seconds_on,
                    enabled = record.enabled,
                    "Usage record loaded"
                );
                record
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Usage record corrupt, starting fresh"
                );
                UsageRecord::fresh(now)
            }
        }
    }

    fn save(&self, record: &UsageRecord) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(record)?;
        let temp_path = self.temp_path();

        {
            let mut file = File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!(
            seconds_on = record.seconds_on,
            enabled = record.enabled,
            "Usage record saved"
        );
        Ok(())
    }
}

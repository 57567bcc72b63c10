use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;

use crate::error::PipelineError;
use crate::model::GlobalCounterRecord;
use crate::persist::{read_json, write_json_atomic};

pub const COUNTER_FILE: &str = "global-counter.json";

/// Persisted source of result ids shared by every category.
///
/// Single writer: the owning [`ResultStore`](crate::ResultStore) is the only
/// caller of [`next`](GlobalCounter::next). Several processes sharing one data
/// directory would need file locking here.
#[derive(Debug)]
pub struct GlobalCounter {
    path: PathBuf,
    current: u64,
}

impl GlobalCounter {
    pub fn open(dir: &Path) -> Result<Self, PipelineError> {
        let path = dir.join(COUNTER_FILE);
        let current = read_json::<GlobalCounterRecord>(&path)?
            .map(|r| r.counter)
            .unwrap_or(0);
        info!("Global counter at {}", current);
        Ok(GlobalCounter { path, current })
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    /// Increments, persists, and returns the new value.
    ///
    /// The in-memory value only moves once the write succeeded, so a failed
    /// write never hands out an id that a restart could hand out again.
    pub fn next(&mut self) -> Result<u64, PipelineError> {
        let value = self.current + 1;
        write_json_atomic(
            &self.path,
            &GlobalCounterRecord {
                counter: value,
                last_update: Utc::now(),
            },
        )?;
        self.current = value;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero_and_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut counter = GlobalCounter::open(dir.path()).unwrap();
        assert_eq!(counter.current(), 0);
        assert_eq!(counter.next().unwrap(), 1);
        assert_eq!(counter.next().unwrap(), 2);
    }

    #[test]
    fn test_continues_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut counter = GlobalCounter::open(dir.path()).unwrap();
            for _ in 0..3 {
                counter.next().unwrap();
            }
        }
        let mut counter = GlobalCounter::open(dir.path()).unwrap();
        assert_eq!(counter.next().unwrap(), 4);

        let raw = std::fs::read_to_string(dir.path().join(COUNTER_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["counter"], 4);
        assert!(value["lastUpdate"].is_string());
    }
}

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{info, warn};

use crate::error::PipelineError;
use crate::model::ProgressRecord;
use crate::persist::{read_json, write_json_atomic};

/// Per-category resume cursor, one `progress-{category}.json` each.
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ProgressStore { dir: dir.into() }
    }

    pub fn path_for(&self, category: &str) -> PathBuf {
        self.dir.join(format!("progress-{}.json", category))
    }

    /// Index of the next unprocessed item, `0` on a cold start.
    pub fn load(&self, category: &str) -> Result<usize, PipelineError> {
        match read_json::<ProgressRecord>(&self.path_for(category))? {
            Some(record) => {
                info!("Resuming '{}' from index {}", category, record.last_index);
                Ok(record.last_index)
            }
            None => {
                info!("No progress file for '{}'. Starting fresh.", category);
                Ok(0)
            }
        }
    }

    /// Durably overwrites the cursor. Returns only once the file is in place.
    pub fn save(&self, category: &str, index: usize) -> Result<(), PipelineError> {
        let record = ProgressRecord {
            last_index: index,
            timestamp: Utc::now(),
        };
        write_json_atomic(&self.path_for(category), &record).map_err(|e| {
            warn!("Failed to save progress for '{}' at {}: {}", category, index, e);
            e
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_start_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path());
        assert_eq!(store.load("brasserie").unwrap(), 0);
    }

    #[test]
    fn test_save_then_load_per_category() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path());

        store.save("fast-food", 4).unwrap();
        store.save("pizzeria", 2).unwrap();
        store.save("fast-food", 6).unwrap();

        assert_eq!(store.load("fast-food").unwrap(), 6);
        assert_eq!(store.load("pizzeria").unwrap(), 2);
        assert!(dir.path().join("progress-fast-food.json").exists());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        ProgressStore::new(dir.path()).save("restaurant", 9).unwrap();
        let reopened = ProgressStore::new(dir.path());
        assert_eq!(reopened.load("restaurant").unwrap(), 9);
    }
}

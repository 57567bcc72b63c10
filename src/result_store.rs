use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};
use serde_json::Value;

use crate::counter::GlobalCounter;
use crate::error::PipelineError;
use crate::model::{CategoryResultFile, PendingBatch, ResultBatch, ResultRecord};
use crate::persist::{read_json, write_json_atomic};

/// Append-only per-category results, ids drawn from the shared counter.
pub struct ResultStore {
    dir: PathBuf,
    counter: GlobalCounter,
    dedupe_key: Option<String>,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>, counter: GlobalCounter) -> Self {
        ResultStore {
            dir: dir.into(),
            counter,
            dedupe_key: None,
        }
    }

    /// Drop records whose `key` value is already stored for the category.
    pub fn with_dedupe_key(mut self, key: Option<String>) -> Self {
        self.dedupe_key = key;
        self
    }

    pub fn path_for(&self, category: &str) -> PathBuf {
        results_path(&self.dir, category)
    }

    pub fn counter(&self) -> &GlobalCounter {
        &self.counter
    }

    pub fn load(&self, category: &str) -> Result<Option<CategoryResultFile>, PipelineError> {
        read_json(&self.path_for(category))
    }

    pub fn append(&mut self, category: &str, batch: PendingBatch) -> Result<usize, PipelineError> {
        self.append_chunk(category, vec![batch])
    }

    /// Assigns ids to every batch in order and persists the category file once.
    /// Returns the number of records written.
    pub fn append_chunk(
        &mut self,
        category: &str,
        batches: Vec<PendingBatch>,
    ) -> Result<usize, PipelineError> {
        let path = self.path_for(category);
        let mut file = read_json::<CategoryResultFile>(&path)?
            .unwrap_or_else(|| CategoryResultFile::empty(category));

        let mut seen: HashSet<String> = match &self.dedupe_key {
            Some(key) => file
                .results
                .iter()
                .flat_map(|b| b.data.iter())
                .filter_map(|r| dedupe_value(r.fields.get(key)))
                .collect(),
            None => HashSet::new(),
        };

        let mut written = 0;
        for batch in batches {
            let mut data = Vec::with_capacity(batch.records.len());
            for fields in batch.records {
                if let Some(key) = &self.dedupe_key {
                    if let Some(value) = dedupe_value(fields.get(key)) {
                        if !seen.insert(value) {
                            debug!("Skipping duplicate record in '{}'", category);
                            continue;
                        }
                    }
                }
                let id = self.counter.next()?;
                data.push(ResultRecord { id, fields });
            }
            written += data.len();
            file.results.push(ResultBatch {
                coordinates: batch.coordinates,
                data,
                timestamp: Utc::now(),
            });
        }

        file.last_update = Utc::now();
        write_json_atomic(&path, &file)?;
        info!(
            "Saved {} record(s) for '{}' ({} total)",
            written,
            category,
            file.record_count()
        );
        Ok(written)
    }
}

pub fn results_path(dir: &Path, category: &str) -> PathBuf {
    dir.join(format!("results-{}.json", category))
}

fn dedupe_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExtractedRecord;
    use serde_json::json;

    fn record(url: &str) -> ExtractedRecord {
        let mut fields = ExtractedRecord::new();
        fields.insert("url".into(), json!(url));
        fields
    }

    fn batch(urls: &[&str]) -> PendingBatch {
        PendingBatch {
            coordinates: json!({ "lat": "48.0", "lng": "0.2" }),
            records: urls.iter().map(|u| record(u)).collect(),
        }
    }

    fn store(dir: &Path) -> ResultStore {
        ResultStore::new(dir, GlobalCounter::open(dir).unwrap())
    }

    #[test]
    fn test_ids_increase_across_categories() {
        let dir = tempfile::tempdir().unwrap();
        let mut results = store(dir.path());

        results.append("restaurant", batch(&["a", "b"])).unwrap();
        results.append("fast-food", batch(&["c"])).unwrap();
        results.append("restaurant", batch(&["d"])).unwrap();

        let restaurant = results.load("restaurant").unwrap().unwrap();
        let fast_food = results.load("fast-food").unwrap().unwrap();
        let ids = |f: &CategoryResultFile| -> Vec<u64> {
            f.results.iter().flat_map(|b| b.data.iter().map(|r| r.id)).collect()
        };
        assert_eq!(ids(&restaurant), vec![1, 2, 4]);
        assert_eq!(ids(&fast_food), vec![3]);
        assert_eq!(restaurant.results.len(), 2);
    }

    #[test]
    fn test_append_keeps_previous_batches() {
        let dir = tempfile::tempdir().unwrap();
        let mut results = store(dir.path());

        results.append("brasserie", batch(&["x"])).unwrap();
        drop(results);

        let mut reopened = store(dir.path());
        reopened.append("brasserie", batch(&["y"])).unwrap();

        let file = reopened.load("brasserie").unwrap().unwrap();
        assert_eq!(file.category, "brasserie");
        assert_eq!(file.record_count(), 2);
        assert_eq!(file.results[1].data[0].id, 2);
    }

    #[test]
    fn test_chunk_append_is_one_write_in_item_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut results = store(dir.path());

        let written = results
            .append_chunk("pizzeria", vec![batch(&["p1", "p2"]), batch(&["p3"])])
            .unwrap();
        assert_eq!(written, 3);

        let file = results.load("pizzeria").unwrap().unwrap();
        let urls: Vec<(u64, &str)> = file
            .results
            .iter()
            .flat_map(|b| b.data.iter())
            .map(|r| (r.id, r.fields["url"].as_str().unwrap()))
            .collect();
        assert_eq!(urls, vec![(1, "p1"), (2, "p2"), (3, "p3")]);
    }

    #[test]
    fn test_dedupe_skips_known_values_without_consuming_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut results = store(dir.path()).with_dedupe_key(Some("url".into()));

        results.append("restaurant", batch(&["a", "b"])).unwrap();
        let written = results.append("restaurant", batch(&["b", "c", "c"])).unwrap();
        assert_eq!(written, 1);
        assert_eq!(results.counter().current(), 3);

        let file = results.load("restaurant").unwrap().unwrap();
        assert_eq!(file.record_count(), 3);
    }

    #[test]
    fn test_empty_batch_is_still_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut results = store(dir.path());

        assert_eq!(results.append("brasserie", batch(&[])).unwrap(), 0);
        let file = results.load("brasserie").unwrap().unwrap();
        assert_eq!(file.results.len(), 1);
        assert_eq!(file.record_count(), 0);
    }
}

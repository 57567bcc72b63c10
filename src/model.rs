use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields produced by an extractor for one result, before an id is attached.
pub type ExtractedRecord = Map<String, Value>;

/// One unit of extraction work: a category and a position in its list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub category: String,
    pub index: usize,
    pub payload: String,
}

/// `progress-{category}.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub last_index: usize,
    pub timestamp: DateTime<Utc>,
}

/// `global-counter.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalCounterRecord {
    pub counter: u64,
    pub last_update: DateTime<Utc>,
}

/// An extracted record with its globally unique id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    pub id: u64,
    #[serde(flatten)]
    pub fields: ExtractedRecord,
}

/// Records extracted from one work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultBatch {
    pub coordinates: Value,
    pub data: Vec<ResultRecord>,
    pub timestamp: DateTime<Utc>,
}

/// Extractor output for one item, waiting for ids.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBatch {
    pub coordinates: Value,
    pub records: Vec<ExtractedRecord>,
}

/// `results-{category}.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResultFile {
    pub category: String,
    pub results: Vec<ResultBatch>,
    pub last_update: DateTime<Utc>,
}

impl CategoryResultFile {
    pub fn empty(category: &str) -> Self {
        CategoryResultFile {
            category: category.to_string(),
            results: Vec::new(),
            last_update: Utc::now(),
        }
    }

    pub fn record_count(&self) -> usize {
        self.results.iter().map(|b| b.data.len()).sum()
    }
}

/// `{summary-name}.json`. Rebuildable from the category files at any time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub last_update: DateTime<Utc>,
    pub total: usize,
    pub categories: Vec<CategoryResultFile>,
}

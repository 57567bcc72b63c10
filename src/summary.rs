use std::path::PathBuf;

use chrono::Utc;
use log::{info, warn};

use crate::error::PipelineError;
use crate::model::{CategoryResultFile, Summary};
use crate::persist::{read_json, write_json_atomic};
use crate::result_store::results_path;

/// Merges per-category result files into `{name}.json`.
pub struct SummaryBuilder {
    dir: PathBuf,
    categories: Vec<String>,
    name: String,
}

impl SummaryBuilder {
    pub fn new(dir: impl Into<PathBuf>, categories: Vec<String>, name: impl Into<String>) -> Self {
        SummaryBuilder {
            dir: dir.into(),
            categories,
            name: name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }

    /// Reads whatever result files exist, in configured order, and persists
    /// the merged summary. Missing or unreadable files are skipped.
    pub fn build(&self) -> Result<Summary, PipelineError> {
        let mut categories = Vec::new();
        for category in &self.categories {
            match read_json::<CategoryResultFile>(&results_path(&self.dir, category)) {
                Ok(Some(file)) => categories.push(file),
                Ok(None) => info!("No results for '{}' yet, leaving it out of the summary", category),
                Err(e) => warn!("Skipping '{}' in summary: {}", category, e),
            }
        }

        let summary = Summary {
            last_update: Utc::now(),
            total: categories.iter().map(|c| c.record_count()).sum(),
            categories,
        };
        write_json_atomic(&self.path(), &summary)?;
        info!(
            "Summary saved to {:?}: {} categor(ies), {} record(s)",
            self.path(),
            summary.categories.len(),
            summary.total
        );
        Ok(summary)
    }
}

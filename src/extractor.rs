use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::model::{ExtractedRecord, WorkItem};

/// Turns one work item into zero or more records.
///
/// Implementations own whatever session they need for a single invocation
/// (browser, HTTP client, API handle). The pipeline never retries inside an
/// invocation and never lets an implementation touch progress or ids; a
/// stalled page, a block, or a navigation error is reported as an
/// [`ExtractionError`] and the whole chunk is redone on the next run.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn run(&self, item: &WorkItem) -> Result<Vec<ExtractedRecord>, ExtractionError>;
}

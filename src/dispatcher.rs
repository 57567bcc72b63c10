use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::JoinSet;

use crate::coordinates::CoordinateParser;
use crate::delay_manager::Pacing;
use crate::error::{ExtractionError, PipelineError};
use crate::extractor::Extractor;
use crate::model::{ExtractedRecord, PendingBatch, WorkItem};
use crate::result_store::ResultStore;
use crate::resume_manager::ProgressStore;

type Settled = Result<Vec<ExtractedRecord>, ExtractionError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Results persisted and progress moved from `start` to `end`.
    Advanced {
        start: usize,
        end: usize,
        records: usize,
    },
    /// The saved cursor is already at (or past) the end of the list.
    Exhausted { index: usize },
}

/// Runs one chunk of `workers` items at a time and checkpoints it as a unit.
pub struct Dispatcher {
    extractor: Arc<dyn Extractor>,
    workers: usize,
    item_timeout: Option<Duration>,
    pacing: Pacing,
    coordinates: CoordinateParser,
}

impl Dispatcher {
    pub fn new(extractor: Arc<dyn Extractor>, workers: usize) -> Self {
        Dispatcher {
            extractor,
            workers: workers.max(1),
            item_timeout: None,
            pacing: Pacing::none(),
            coordinates: CoordinateParser::new(),
        }
    }

    pub fn with_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Processes the chunk at the category's saved cursor.
    ///
    /// Either every item of the chunk succeeds, its results are appended and
    /// the cursor moves past it, or the cursor is re-saved unchanged, nothing
    /// is appended, and `ChunkFailed` is returned.
    pub async fn run_chunk(
        &self,
        category: &str,
        items: &[WorkItem],
        progress: &ProgressStore,
        results: &mut ResultStore,
    ) -> Result<ChunkOutcome, PipelineError> {
        let start = progress.load(category)?;
        if start >= items.len() {
            return Ok(ChunkOutcome::Exhausted { index: start });
        }
        let end = (start + self.workers).min(items.len());
        let chunk = &items[start..end];

        info!(
            "category={} chunk={}..{} of {} dispatching {} worker(s)",
            category,
            start,
            end,
            items.len(),
            chunk.len()
        );

        let settled = self.execute(chunk).await;

        let mut outputs = Vec::with_capacity(settled.len());
        let mut failures = Vec::new();
        for (item, outcome) in chunk.iter().zip(settled) {
            match outcome {
                Ok(records) => outputs.push(records),
                Err(e) => {
                    warn!("category={} item={} failed: {}", category, item.index, e);
                    failures.push(e);
                }
            }
        }

        if let Some(first) = failures.first().cloned() {
            if let Err(e) = progress.save(category, start) {
                error!("category={} could not re-save cursor {}: {}", category, start, e);
            }
            warn!(
                "category={} chunk={}..{} outcome=failed discarded={} failed={}",
                category,
                start,
                end,
                outputs.len(),
                failures.len()
            );
            return Err(PipelineError::ChunkFailed {
                category: category.to_string(),
                start_index: start,
                failed: failures.len(),
                reason: first,
            });
        }

        let batches: Vec<PendingBatch> = chunk
            .iter()
            .zip(outputs)
            .map(|(item, records)| PendingBatch {
                coordinates: self.coordinates.key_for(&item.payload),
                records,
            })
            .collect();
        let records = results.append_chunk(category, batches)?;
        progress.save(category, end)?;

        info!(
            "category={} chunk={}..{} outcome=advanced records={}",
            category, start, end, records
        );

        if end < items.len() {
            self.pacing.after_chunk().await;
        }
        Ok(ChunkOutcome::Advanced {
            start,
            end,
            records,
        })
    }

    /// Spawns one task per item and waits for all of them, in item order.
    async fn execute(&self, chunk: &[WorkItem]) -> Vec<Settled> {
        let mut tasks = JoinSet::new();
        for (slot, item) in chunk.iter().cloned().enumerate() {
            let extractor = Arc::clone(&self.extractor);
            let timeout = self.item_timeout;
            tasks.spawn(async move {
                let outcome = match timeout {
                    Some(limit) => tokio::time::timeout(limit, extractor.run(&item))
                        .await
                        .unwrap_or(Err(ExtractionError::Timeout(limit))),
                    None => extractor.run(&item).await,
                };
                (slot, outcome)
            });
        }

        let mut settled: Vec<Option<Settled>> = (0..chunk.len()).map(|_| None).collect();
        let mut aborted = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => settled[slot] = Some(outcome),
                Err(e) => {
                    error!("Worker task did not settle: {}", e);
                    aborted.push(e.to_string());
                }
            }
        }

        settled
            .into_iter()
            .map(|s| {
                s.unwrap_or_else(|| {
                    let reason = aborted.first().cloned().unwrap_or_else(|| "no result".into());
                    Err(ExtractionError::Aborted(reason))
                })
            })
            .collect()
    }
}

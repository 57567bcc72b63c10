use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::counter::GlobalCounter;
use crate::dispatcher::{ChunkOutcome, Dispatcher};
use crate::error::PipelineError;
use crate::extractor::Extractor;
use crate::input_loader::WorkSource;
use crate::model::Summary;
use crate::result_store::ResultStore;
use crate::resume_manager::ProgressStore;
use crate::summary::SummaryBuilder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// Every item is accounted for. `records` counts those written in this run.
    Completed { items: usize, records: usize },
    /// A chunk failed; the next run restarts at `resume_index`, or at an
    /// unknown point if the progress file itself could not be read.
    Aborted {
        resume_index: Option<usize>,
        reason: String,
    },
    /// The work list could not be read; progress untouched.
    Skipped { reason: String },
}

impl CategoryOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CategoryOutcome::Completed { .. } => "completed",
            CategoryOutcome::Aborted { .. } => "aborted",
            CategoryOutcome::Skipped { .. } => "skipped",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: String,
    pub outcome: CategoryOutcome,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<CategoryReport>,
    pub summary: Summary,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, CategoryOutcome::Completed { .. }))
            .count()
    }
}

/// Walks the categories in order, one dispatcher loop each, then summarises.
pub struct Orchestrator<S: WorkSource> {
    source: S,
    dispatcher: Dispatcher,
    progress: ProgressStore,
    results: ResultStore,
    summary: SummaryBuilder,
    categories: Vec<String>,
}

impl<S: WorkSource> Orchestrator<S> {
    pub fn new(
        source: S,
        dispatcher: Dispatcher,
        progress: ProgressStore,
        results: ResultStore,
        summary: SummaryBuilder,
        categories: Vec<String>,
    ) -> Self {
        Orchestrator {
            source,
            dispatcher,
            progress,
            results,
            summary,
            categories,
        }
    }

    /// Opens the stores under `config.data_dir`. Fails if the counter file is
    /// unreadable, since ids could otherwise repeat.
    pub fn from_config(
        config: &PipelineConfig,
        source: S,
        extractor: Arc<dyn Extractor>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let counter = GlobalCounter::open(&config.data_dir)?;
        let dispatcher = Dispatcher::new(extractor, config.workers)
            .with_item_timeout(config.item_timeout)
            .with_pacing(config.pacing());
        Ok(Orchestrator::new(
            source,
            dispatcher,
            ProgressStore::new(&config.data_dir),
            ResultStore::new(&config.data_dir, counter).with_dedupe_key(config.dedupe_key.clone()),
            SummaryBuilder::new(
                &config.data_dir,
                config.categories.clone(),
                config.summary_name.clone(),
            ),
            config.categories.clone(),
        ))
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Attempts every category once, whatever happens to the others, then
    /// builds the summary. Only a failure to write the summary is an error.
    pub async fn run(&mut self) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            "run={} starting: {} categor(ies), {} worker(s)",
            run_id,
            self.categories.len(),
            self.dispatcher.workers()
        );

        let categories = self.categories.clone();
        let mut outcomes = Vec::with_capacity(categories.len());
        for (i, category) in categories.iter().enumerate() {
            info!("run={} category={} state=running", run_id, category);
            let outcome = self.run_category(category).await;
            info!(
                "run={} category={} state={}",
                run_id,
                category,
                outcome.label()
            );
            outcomes.push(CategoryReport {
                category: category.clone(),
                outcome,
            });

            if i + 1 < categories.len() {
                self.dispatcher.pacing().after_category().await;
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            outcomes,
            summary: self.summary.build()?,
        };
        info!(
            "run={} done: {}/{} categor(ies) completed",
            run_id,
            report.completed(),
            report.outcomes.len()
        );
        Ok(report)
    }

    async fn run_category(&mut self, category: &str) -> CategoryOutcome {
        let items = match self.source.items(category) {
            Ok(items) => items,
            Err(e) => {
                warn!("category={} skipped: {}", category, e);
                return CategoryOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let mut records = 0;
        loop {
            let step = self
                .dispatcher
                .run_chunk(category, &items, &self.progress, &mut self.results)
                .await;
            match step {
                Ok(ChunkOutcome::Advanced { records: n, .. }) => records += n,
                Ok(ChunkOutcome::Exhausted { index }) => {
                    if index > items.len() {
                        warn!(
                            "category={} cursor {} is past the end of its {} item(s)",
                            category,
                            index,
                            items.len()
                        );
                    }
                    return CategoryOutcome::Completed {
                        items: items.len(),
                        records,
                    };
                }
                Err(e) => {
                    let resume_index = match &e {
                        PipelineError::ChunkFailed { start_index, .. } => Some(*start_index),
                        _ => match self.progress.load(category) {
                            Ok(index) => Some(index),
                            Err(load_err) => {
                                error!("category={} resume point unknown: {}", category, load_err);
                                None
                            }
                        },
                    };
                    if e.is_store_error() {
                        error!("category={} store failure, aborting category: {}", category, e);
                    } else {
                        warn!("category={} aborted: {}", category, e);
                    }
                    return CategoryOutcome::Aborted {
                        resume_index,
                        reason: e.to_string(),
                    };
                }
            }
        }
    }
}

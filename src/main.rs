use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use place_scraper_lib::config::{validate_categories, validate_summary_name, Cli, Command};
use place_scraper_lib::{
    generator, logger, CategoryOutcome, FileWorkSource, HttpExtractor, Orchestrator,
    PipelineConfig, SummaryBuilder,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logger::init(cli.log_level);

    match cli.command {
        Command::Run(args) => {
            let config = PipelineConfig::from(args);
            config.validate()?;
            info!("Starting Place Scraper...");

            let extractor = Arc::new(HttpExtractor::new(&config.link_selector)?);
            let source = FileWorkSource::new(&config.input_dir);
            let mut orchestrator = Orchestrator::from_config(&config, source, extractor)?;

            let report = orchestrator.run().await?;
            for entry in &report.outcomes {
                match &entry.outcome {
                    CategoryOutcome::Completed { items, records } => info!(
                        "{:<28} completed  items={} new_records={}",
                        entry.category, items, records
                    ),
                    CategoryOutcome::Aborted {
                        resume_index: Some(index),
                        reason,
                    } => warn!(
                        "{:<28} aborted    resume_at={} reason={}",
                        entry.category, index, reason
                    ),
                    CategoryOutcome::Aborted {
                        resume_index: None,
                        reason,
                    } => warn!(
                        "{:<28} aborted    resume_at=unknown reason={}",
                        entry.category, reason
                    ),
                    CategoryOutcome::Skipped { reason } => {
                        warn!("{:<28} skipped    reason={}", entry.category, reason)
                    }
                }
            }
            info!(
                "Run {} finished: {}/{} categories completed, {} record(s) in summary.",
                report.run_id,
                report.completed(),
                report.outcomes.len(),
                report.summary.total
            );
        }
        Command::Summary(args) => {
            validate_categories(&args.store.categories)?;
            validate_summary_name(&args.store.summary_name, &args.store.categories)?;
            let summary = SummaryBuilder::new(
                &args.store.data_dir,
                args.store.categories,
                args.store.summary_name,
            )
            .build()?;
            info!(
                "Summary rebuilt: {} categor(ies), {} record(s).",
                summary.categories.len(),
                summary.total
            );
        }
        Command::Generate(args) => {
            validate_categories(&args.categories)?;
            match generator::generate_category_files(&args.source, &args.out_dir, &args.categories) {
                Ok(count) => info!(
                    "Generated {} list(s) with {} URL(s) each in {:?}",
                    args.categories.len(),
                    count,
                    args.out_dir
                ),
                Err(e) => {
                    error!("Failed to generate category lists: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::counter::COUNTER_FILE;
use crate::delay_manager::Pacing;
use crate::error::PipelineError;

pub const DEFAULT_CATEGORIES: [&str; 3] = ["restaurant", "fast-food", "brasserie"];
pub const DEFAULT_LINK_SELECTOR: &str = "a.hfpxzc";

/// Everything a run needs, independent of how it was supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Directory holding one `{category}.csv` (or `.xlsx`) list per category.
    pub input_dir: PathBuf,
    /// Progress, counter, results and summary files.
    pub data_dir: PathBuf,
    /// Processing order.
    pub categories: Vec<String>,
    pub workers: usize,
    pub chunk_delay: Duration,
    pub category_delay: Duration,
    pub delay_jitter: Duration,
    pub item_timeout: Option<Duration>,
    pub summary_name: String,
    pub link_selector: String,
    pub dedupe_key: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_dir: PathBuf::from("csvCateg"),
            data_dir: PathBuf::from("data"),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            workers: 3,
            chunk_delay: Duration::from_secs(10),
            category_delay: Duration::from_secs(30),
            delay_jitter: Duration::from_secs(5),
            item_timeout: Some(Duration::from_secs(120)),
            summary_name: "results-summary".to_string(),
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            dedupe_key: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::Configuration("workers must be at least 1".into()));
        }
        validate_categories(&self.categories)?;
        validate_summary_name(&self.summary_name, &self.categories)?;
        if self.link_selector.trim().is_empty() {
            return Err(PipelineError::Configuration("link selector is empty".into()));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            chunk_delay: self.chunk_delay,
            category_delay: self.category_delay,
            jitter: self.delay_jitter,
        }
    }
}

pub fn validate_categories(categories: &[String]) -> Result<(), PipelineError> {
    if categories.is_empty() {
        return Err(PipelineError::Configuration("no categories configured".into()));
    }
    let mut seen = HashSet::new();
    for category in categories {
        validate_file_stem("category", category)?;
        if !seen.insert(category.as_str()) {
            return Err(PipelineError::Configuration(format!(
                "category '{}' listed twice",
                category
            )));
        }
    }
    Ok(())
}

/// The summary shares `data_dir` with the counter and the per-category
/// progress and results files; it must not take any of their names.
pub fn validate_summary_name(name: &str, categories: &[String]) -> Result<(), PipelineError> {
    validate_file_stem("summary name", name)?;
    let file = format!("{}.json", name);
    let taken = file == COUNTER_FILE
        || categories
            .iter()
            .any(|c| name == format!("results-{}", c) || name == format!("progress-{}", c));
    if taken {
        return Err(PipelineError::Configuration(format!(
            "summary name '{}' would overwrite a store file in the data directory",
            name
        )));
    }
    Ok(())
}

// Categories and the summary name end up inside file names.
fn validate_file_stem(what: &str, value: &str) -> Result<(), PipelineError> {
    if value.trim().is_empty() {
        return Err(PipelineError::Configuration(format!("{} is empty", what)));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(PipelineError::Configuration(format!(
            "{} '{}' cannot be used in a file name",
            what, value
        )));
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(name = "place-scraper", version, about = "Resumable chunked place-listing scraper")]
pub struct Cli {
    /// Default log filter (RUST_LOG overrides it).
    #[arg(long, global = true, env = "PLACE_SCRAPER_LOG", default_value = "info")]
    pub log_level: log::LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every category, resuming from saved progress, then rebuild the summary.
    Run(RunArgs),
    /// Rebuild the summary from existing result files only.
    Summary(SummaryArgs),
    /// Write one URL list per category from a CSV of map links.
    Generate(GenerateArgs),
}

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    #[arg(long, env = "PLACE_SCRAPER_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(
        long,
        env = "PLACE_SCRAPER_CATEGORIES",
        value_delimiter = ',',
        default_values_t = DEFAULT_CATEGORIES.map(String::from)
    )]
    pub categories: Vec<String>,

    #[arg(long, env = "PLACE_SCRAPER_SUMMARY_NAME", default_value = "results-summary")]
    pub summary_name: String,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, env = "PLACE_SCRAPER_INPUT_DIR", default_value = "csvCateg")]
    pub input_dir: PathBuf,

    /// Items extracted concurrently per chunk.
    #[arg(short, long, env = "PLACE_SCRAPER_WORKERS", default_value_t = 3)]
    pub workers: usize,

    #[arg(long, env = "PLACE_SCRAPER_CHUNK_DELAY_SECS", default_value_t = 10)]
    pub chunk_delay_secs: u64,

    #[arg(long, env = "PLACE_SCRAPER_CATEGORY_DELAY_SECS", default_value_t = 30)]
    pub category_delay_secs: u64,

    #[arg(long, env = "PLACE_SCRAPER_JITTER_SECS", default_value_t = 5)]
    pub jitter_secs: u64,

    /// Per-item limit; 0 disables it.
    #[arg(long, env = "PLACE_SCRAPER_ITEM_TIMEOUT_SECS", default_value_t = 120)]
    pub item_timeout_secs: u64,

    #[arg(long, env = "PLACE_SCRAPER_LINK_SELECTOR", default_value = DEFAULT_LINK_SELECTOR)]
    pub link_selector: String,

    /// Skip records whose value for this field is already stored.
    #[arg(long, env = "PLACE_SCRAPER_DEDUPE_KEY")]
    pub dedupe_key: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// CSV whose rows contain map links with `@lat,lng,` segments.
    #[arg(long)]
    pub source: PathBuf,

    #[arg(long, default_value = "csvCateg")]
    pub out_dir: PathBuf,

    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_CATEGORIES.map(String::from)
    )]
    pub categories: Vec<String>,
}

impl From<RunArgs> for PipelineConfig {
    fn from(args: RunArgs) -> Self {
        PipelineConfig {
            input_dir: args.input_dir,
            data_dir: args.store.data_dir,
            categories: args.store.categories,
            workers: args.workers,
            chunk_delay: Duration::from_secs(args.chunk_delay_secs),
            category_delay: Duration::from_secs(args.category_delay_secs),
            delay_jitter: Duration::from_secs(args.jitter_secs),
            item_timeout: (args.item_timeout_secs > 0)
                .then(|| Duration::from_secs(args.item_timeout_secs)),
            summary_name: args.store.summary_name,
            link_selector: args.link_selector,
            dedupe_key: args.dedupe_key,
        }
    }
}

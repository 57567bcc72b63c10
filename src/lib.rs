pub mod config;
pub mod coordinates;
pub mod counter;
pub mod delay_manager;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod input_loader;
pub mod logger;
pub mod model;
pub mod orchestrator;
pub mod persist;
pub mod result_store;
pub mod resume_manager;
pub mod scraper;
pub mod summary;

// Exporting types for convenience
pub use config::PipelineConfig;
pub use counter::GlobalCounter;
pub use delay_manager::Pacing;
pub use dispatcher::{ChunkOutcome, Dispatcher};
pub use error::{ExtractionError, PipelineError};
pub use extractor::Extractor;
pub use input_loader::{FileWorkSource, MemoryWorkSource, WorkSource};
pub use model::{
    CategoryResultFile, ExtractedRecord, PendingBatch, ResultBatch, ResultRecord, Summary,
    WorkItem,
};
pub use orchestrator::{CategoryOutcome, CategoryReport, Orchestrator, RunReport};
pub use result_store::ResultStore;
pub use resume_manager::ProgressStore;
pub use crate::scraper::HttpExtractor;
pub use summary::SummaryBuilder;

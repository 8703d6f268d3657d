pub mod calendar;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod outputs;
pub mod pipeline;
pub mod schema;
pub mod summaries;
pub mod validation;
pub mod window;

pub use error::{PipelineError, Result};
pub use pipeline::{build_fact_table, run_pipeline, FactTable, PipelineRun, FACT_TABLE};

use chrono_tz::Tz;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, info_span};

use crate::cleaning::{clean_trips, CleaningSummary};
use crate::error::Result;
use crate::schema::ensure_raw_schema;
use crate::summaries::{build_summaries, NamedTable};
use crate::validation::{validate_trips, ValidationReport};
use crate::window::{apply_window, TripWindow, WindowSummary};

/// Output name of the cleaned fact table.
pub const FACT_TABLE: &str = "cleaned_trips";

/// Row counts at each stage boundary.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StageCounts {
    pub raw_rows: usize,
    pub window: WindowSummary,
    pub cleaning: CleaningSummary,
}

/// Fact table plus its diagnostics, without summaries.
#[derive(Debug, Clone)]
pub struct FactTable {
    pub trips: DataFrame,
    pub stages: StageCounts,
    pub validation: ValidationReport,
}

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub fact: FactTable,
    pub summaries: Vec<NamedTable>,
}

impl PipelineRun {
    /// Fact table first, then the summaries in registry order.
    pub fn tables(&self) -> Vec<NamedTable> {
        let mut tables = Vec::with_capacity(self.summaries.len() + 1);
        tables.push(NamedTable {
            name: FACT_TABLE,
            dataframe: self.fact.trips.clone(),
        });
        tables.extend(self.summaries.iter().cloned());
        tables
    }
}

/// Windowing, cleaning and validation. Validation findings never fail the call.
pub fn build_fact_table(raw: &DataFrame, window: &TripWindow, tz: Tz) -> Result<FactTable> {
    window.check()?;
    let raw = ensure_raw_schema(raw)?;

    let windowed = {
        let _span = info_span!("windowing").entered();
        apply_window(&raw, window)?
    };
    let cleaned = {
        let _span = info_span!("cleaning").entered();
        clean_trips(&windowed.dataframe, tz)?
    };
    let validation = {
        let _span = info_span!("validation").entered();
        validate_trips(&cleaned.dataframe)?
    };

    Ok(FactTable {
        trips: cleaned.dataframe,
        stages: StageCounts {
            raw_rows: raw.height(),
            window: windowed.summary,
            cleaning: cleaned.summary,
        },
        validation,
    })
}

/// Full run: fact table and every summary, rebuilt from scratch.
pub fn run_pipeline(raw: &DataFrame, window: &TripWindow, tz: Tz) -> Result<PipelineRun> {
    let fact = build_fact_table(raw, window, tz)?;
    let summaries = {
        let _span = info_span!("summaries").entered();
        build_summaries(&fact.trips)?
    };
    info!(
        fact_rows = fact.trips.height(),
        summaries = summaries.len(),
        "pipeline complete"
    );
    Ok(PipelineRun { fact, summaries })
}

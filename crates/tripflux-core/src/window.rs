use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::schema::{utc_micros, STARTED_AT};

/// Half-open `[start, end)` interval applied to `started_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TripWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let window = Self { start, end };
        window.check()?;
        Ok(window)
    }

    pub fn check(&self) -> Result<()> {
        if self.start < self.end {
            Ok(())
        } else {
            Err(PipelineError::Config(format!(
                "window start {} must be before window end {}",
                self.start.to_rfc3339(),
                self.end.to_rfc3339()
            )))
        }
    }

    pub fn contains_micros(&self, micros: i64) -> bool {
        micros >= self.start.timestamp_micros() && micros < self.end.timestamp_micros()
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WindowSummary {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped_rows: usize,
}

#[derive(Debug, Clone)]
pub struct WindowResult {
    pub dataframe: DataFrame,
    pub summary: WindowSummary,
}

/// Keeps the rows whose `started_at` falls inside the window. Columns pass through untouched;
/// rows outside the window are dropped without complaint.
pub fn apply_window(df: &DataFrame, window: &TripWindow) -> PolarsResult<WindowResult> {
    let started = utc_micros(df, STARTED_AT)?;
    let started = started.datetime()?;

    let mask: BooleanChunked = (0..df.height())
        .map(|idx| started.get(idx).map(|ts| window.contains_micros(ts)))
        .collect();
    let dataframe = df.filter(&mask)?;

    let summary = WindowSummary {
        input_rows: df.height(),
        kept_rows: dataframe.height(),
        dropped_rows: df.height() - dataframe.height(),
    };
    info!(
        input_rows = summary.input_rows,
        kept_rows = summary.kept_rows,
        window_start = %window.start,
        window_end = %window.end,
        "applied trip window"
    );

    Ok(WindowResult { dataframe, summary })
}

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use tripflux_parser::RideableType;

use crate::config::InputConfig;
use crate::error::{PipelineError, Result};
use crate::schema::{ensure_raw_schema, RIDEABLE_TYPE};

pub const PARQUET_FORMAT: &str = "PARQUET";

/// Provenance of one input file, recorded in the run manifest.
#[derive(Debug, Clone, Serialize)]
pub struct InputFileReport {
    pub path: String,
    pub format: &'static str,
    pub file_hash: String,
    pub rows: usize,
    /// Rows whose `rideable_type` is neither a classic nor an electric bike.
    pub other_rideable_rows: usize,
}

#[derive(Debug, Clone)]
pub struct IngestionResult {
    /// All input rows stacked in file order, normalised to the raw trip schema.
    pub dataframe: DataFrame,
    pub files: Vec<InputFileReport>,
}

/// Expands glob patterns into a sorted, de-duplicated list of files.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = BTreeSet::new();
    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            let path = entry.map_err(|err| PipelineError::Io(err.into()))?;
            if path.is_file() {
                paths.insert(path);
            }
        }
    }
    Ok(paths.into_iter().collect())
}

pub fn ingest(config: &InputConfig) -> Result<IngestionResult> {
    let paths = expand_inputs(&config.paths)?;
    if paths.is_empty() {
        return Err(PipelineError::Config(format!(
            "no input files matched {:?}",
            config.paths
        )));
    }
    ingest_paths(&paths)
}

/// Reads every file and stacks the frames vertically. Rows are not de-duplicated.
pub fn ingest_paths(paths: &[PathBuf]) -> Result<IngestionResult> {
    let mut combined: Option<DataFrame> = None;
    let mut files = Vec::with_capacity(paths.len());

    for path in paths {
        let (df, report) = read_trip_file(path)?;
        debug!(
            path = %report.path,
            format = report.format,
            rows = report.rows,
            other_rideable_rows = report.other_rideable_rows,
            file_hash = %report.file_hash,
            "ingested trip file"
        );
        files.push(report);

        match combined.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&df).map_err(|err| {
                    PipelineError::Processing(format!("failed to stack {}: {err}", path.display()))
                })?;
            }
            None => combined = Some(df),
        }
    }

    let dataframe = combined.ok_or_else(|| {
        PipelineError::Config("at least one input file is required".to_string())
    })?;
    info!(
        files = files.len(),
        rows = dataframe.height(),
        "ingested raw trips"
    );

    Ok(IngestionResult { dataframe, files })
}

/// Reads one CSV export (any registered format) or a Parquet file with raw trip columns.
pub fn read_trip_file(path: &Path) -> Result<(DataFrame, InputFileReport)> {
    let contents = std::fs::read(path)?;
    let file_hash = compute_hash(&contents);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let (format, raw) = match extension.as_deref() {
        Some("csv") => {
            let text = std::str::from_utf8(&contents).map_err(|_| {
                PipelineError::Schema(format!("{} is not valid UTF-8", path.display()))
            })?;
            let parsed = tripflux_parser::parse_trip_file(text)?;
            (parsed.format, parsed.df)
        }
        Some("parquet") => {
            let df = ParquetReader::new(Cursor::new(contents)).finish()?;
            (PARQUET_FORMAT, df)
        }
        _ => {
            return Err(PipelineError::Config(format!(
                "unsupported input file {}; expected .csv or .parquet",
                path.display()
            )))
        }
    };

    let dataframe = ensure_raw_schema(&raw).map_err(|err| match err {
        PipelineError::Schema(message) => {
            PipelineError::Schema(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;

    let report = InputFileReport {
        path: path.display().to_string(),
        format,
        file_hash,
        rows: dataframe.height(),
        other_rideable_rows: count_other_rideable(&dataframe)?,
    };
    Ok((dataframe, report))
}

fn count_other_rideable(df: &DataFrame) -> Result<usize> {
    let rideable = df.column(RIDEABLE_TYPE)?.str()?;
    Ok(rideable
        .into_iter()
        .flatten()
        .filter(|value| RideableType::classify(value) == RideableType::Other)
        .count())
}

pub fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::OutputFormat;
use crate::ingestion::InputFileReport;
use crate::pipeline::{PipelineRun, StageCounts};
use crate::summaries::NamedTable;
use crate::validation::ValidationReport;
use crate::window::TripWindow;

pub const MANIFEST_FILE: &str = "run_manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct TableRowCount {
    pub name: String,
    pub rows: usize,
}

/// Provenance and diagnostics for one pipeline run, written next to the tables.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub window: TripWindow,
    pub timezone: String,
    pub output_format: OutputFormat,
    pub inputs: Vec<InputFileReport>,
    pub stages: StageCounts,
    pub validation: ValidationReport,
    pub warnings: Vec<String>,
    pub tables: Vec<TableRowCount>,
}

impl RunManifest {
    pub fn new(
        run: &PipelineRun,
        window: TripWindow,
        timezone: &str,
        output_format: OutputFormat,
        inputs: Vec<InputFileReport>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            window,
            timezone: timezone.to_string(),
            output_format,
            inputs,
            stages: run.fact.stages,
            validation: run.fact.validation.clone(),
            warnings: run.fact.validation.warnings(),
            tables: run
                .tables()
                .iter()
                .map(|table| TableRowCount {
                    name: table.name.to_string(),
                    rows: table.dataframe.height(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

#[derive(Debug, Clone)]
pub struct PublishedOutputs {
    pub run_id: Uuid,
    pub table_paths: Vec<PathBuf>,
    pub manifest_path: PathBuf,
}

/// Writes every table and the manifest into a staging directory, then renames each file into
/// `directory`. Targets are checked before the first rename. If a write or a check fails the
/// staging directory is removed and existing outputs are left as they were. The manifest is
/// moved last, so a run interrupted mid-rename leaves no new manifest behind.
pub fn publish_outputs(
    directory: &Path,
    format: OutputFormat,
    tables: &[NamedTable],
    manifest: &RunManifest,
) -> Result<PublishedOutputs> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create output directory {}", directory.display()))?;

    let staging = directory.join(format!(".staging-{}", manifest.run_id));
    fs::create_dir_all(&staging)
        .with_context(|| format!("failed to create staging directory {}", staging.display()))?;

    let staged = match stage_files(&staging, format, tables, manifest)
        .and_then(|staged| check_targets(directory, &staged).map(|()| staged))
    {
        Ok(staged) => staged,
        Err(err) => {
            discard_staging(&staging);
            return Err(err);
        }
    };

    let moved = move_into_place(directory, &staged);
    discard_staging(&staging);
    let (table_paths, manifest_path) = moved?;

    info!(
        run_id = %manifest.run_id,
        directory = %directory.display(),
        tables = table_paths.len(),
        "published outputs"
    );

    Ok(PublishedOutputs {
        run_id: manifest.run_id,
        table_paths,
        manifest_path,
    })
}

fn check_targets(directory: &Path, staged: &[PathBuf]) -> Result<()> {
    for staged_path in staged {
        let Some(file_name) = staged_path.file_name() else {
            bail!("staged path {} has no file name", staged_path.display());
        };
        let target = directory.join(file_name);
        if target.is_dir() {
            bail!("output target {} is a directory", target.display());
        }
    }
    Ok(())
}

fn move_into_place(directory: &Path, staged: &[PathBuf]) -> Result<(Vec<PathBuf>, PathBuf)> {
    let mut table_paths = Vec::with_capacity(staged.len());
    let mut manifest_path = directory.join(MANIFEST_FILE);
    for staged_path in staged {
        let Some(file_name) = staged_path.file_name() else {
            continue;
        };
        let target = directory.join(file_name);
        fs::rename(staged_path, &target).with_context(|| {
            format!(
                "failed to move {} into {}",
                staged_path.display(),
                target.display()
            )
        })?;
        if file_name == MANIFEST_FILE {
            manifest_path = target;
        } else {
            table_paths.push(target);
        }
    }
    Ok((table_paths, manifest_path))
}

fn stage_files(
    staging: &Path,
    format: OutputFormat,
    tables: &[NamedTable],
    manifest: &RunManifest,
) -> Result<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(tables.len() + 1);
    for table in tables {
        let path = staging.join(format!("{}.{}", table.name, format.extension()));
        write_table(&path, format, &table.dataframe)
            .with_context(|| format!("failed to write table {}", table.name))?;
        staged.push(path);
    }

    let manifest_path = staging.join(MANIFEST_FILE);
    let manifest_bytes = manifest
        .to_json()
        .context("failed to serialize run manifest")?;
    fs::write(&manifest_path, manifest_bytes)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    staged.push(manifest_path);

    Ok(staged)
}

pub fn write_table(path: &Path, format: OutputFormat, df: &DataFrame) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut clone = df.clone();
    match format {
        OutputFormat::Parquet => {
            ParquetWriter::new(&mut file)
                .with_compression(ParquetCompression::Zstd(None))
                .with_statistics(StatisticsOptions::default())
                .finish(&mut clone)
                .context("failed to write parquet")?;
        }
        OutputFormat::Csv => {
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut clone)
                .context("failed to write csv")?;
        }
    }
    Ok(())
}

fn discard_staging(staging: &Path) {
    if let Err(err) = fs::remove_dir_all(staging) {
        warn!(path = %staging.display(), error = %err, "failed to remove staging directory");
    }
}

mod common;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Duration;
use chrono_tz::Tz;
use polars::prelude::*;
use tripflux_core::config::{parse_config, InputConfig};
use tripflux_core::ingestion::{expand_inputs, ingest, ingest_paths};
use tripflux_core::schema::{ensure_raw_schema, MEMBER_CASUAL, START_LAT, START_STATION_NAME};
use tripflux_core::window::TripWindow;
use tripflux_core::{build_fact_table, run_pipeline, PipelineError, FACT_TABLE};
use tripflux_parser::RiderType;

use common::{raw_frame, str_values, utc, Trip};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../tripflux-parser/tests/data")
}

fn year_window() -> TripWindow {
    TripWindow::new(utc(2024, 11, 1, 0, 0, 0), utc(2025, 11, 1, 0, 0, 0)).unwrap()
}

#[test]
fn pipeline_runs_every_stage() -> Result<()> {
    let inside = utc(2025, 3, 15, 7, 45, 0);
    let raw = raw_frame(&[
        Trip::new("early", RiderType::Member, utc(2024, 10, 1, 9, 0, 0), Duration::minutes(9)),
        Trip::new("ok-1", RiderType::Member, inside, Duration::minutes(9)),
        Trip::new("ok-2", RiderType::Casual, inside, Duration::minutes(31)).start_station(None),
        Trip::new("blip", RiderType::Casual, inside, Duration::seconds(30)),
        Trip::new("lost", RiderType::Member, inside, Duration::hours(25)),
        Trip::new("late", RiderType::Casual, utc(2025, 11, 2, 9, 0, 0), Duration::minutes(9)),
    ]);

    let run = run_pipeline(&raw, &year_window(), Tz::UTC)?;

    let stages = run.fact.stages;
    assert_eq!(stages.raw_rows, 6);
    assert_eq!(stages.window.kept_rows, 4);
    assert_eq!(stages.cleaning.retained_rows, 2);
    assert_eq!(stages.cleaning.dropped_too_short, 1);
    assert_eq!(stages.cleaning.dropped_too_long, 1);
    assert_eq!(run.fact.trips.height(), 2);

    // one month of data in a twelve-month window is reported, not fatal
    assert_eq!(run.fact.validation.month_coverage.distinct_months, 1);
    assert!(!run.fact.validation.is_clean());

    let tables = run.tables();
    assert_eq!(tables.len(), 9);
    assert_eq!(tables[0].name, FACT_TABLE);
    assert_eq!(
        str_values(&tables[0].dataframe, START_STATION_NAME),
        [Some("Clark St & Elm St".to_string()), None]
    );
    Ok(())
}

#[test]
fn missing_column_is_a_schema_error() {
    let raw = raw_frame(&[Trip::new(
        "a",
        RiderType::Member,
        utc(2025, 3, 15, 7, 45, 0),
        Duration::minutes(9),
    )])
    .drop(MEMBER_CASUAL)
    .unwrap();

    let err = build_fact_table(&raw, &year_window(), Tz::UTC).expect_err("schema must be checked");
    assert!(matches!(err, PipelineError::Schema(_)));
}

#[test]
fn unknown_rider_type_is_a_schema_error() -> PolarsResult<()> {
    let mut raw = raw_frame(&[Trip::new(
        "a",
        RiderType::Member,
        utc(2025, 3, 15, 7, 45, 0),
        Duration::minutes(9),
    )]);
    raw.with_column(Series::new(MEMBER_CASUAL.into(), ["visitor"]))?;

    let err = build_fact_table(&raw, &year_window(), Tz::UTC).expect_err("rider type is checked");
    assert!(matches!(err, PipelineError::Schema(_)));
    Ok(())
}

#[test]
fn string_timestamps_are_rejected() -> PolarsResult<()> {
    let mut raw = raw_frame(&[Trip::new(
        "a",
        RiderType::Member,
        utc(2025, 3, 15, 7, 45, 0),
        Duration::minutes(9),
    )]);
    raw.with_column(Series::new("started_at".into(), ["2025-03-15 07:45:00"]))?;

    let err = build_fact_table(&raw, &year_window(), Tz::UTC).expect_err("dtype is checked");
    assert!(matches!(err, PipelineError::Schema(_)));
    Ok(())
}

#[test]
fn non_numeric_coordinate_is_a_schema_error() -> PolarsResult<()> {
    let mut raw = raw_frame(&[Trip::new(
        "a",
        RiderType::Member,
        utc(2025, 3, 15, 7, 45, 0),
        Duration::minutes(9),
    )]);
    raw.with_column(Series::new(START_LAT.into(), ["north"]))?;

    let err = ensure_raw_schema(&raw).expect_err("coordinate text is not converted to null");
    match err {
        PipelineError::Schema(message) => assert!(message.contains(START_LAT)),
        other => panic!("expected a schema error, got {other}"),
    }
    Ok(())
}

#[test]
fn numeric_text_coordinates_are_accepted() -> PolarsResult<()> {
    let mut raw = raw_frame(&[Trip::new(
        "a",
        RiderType::Member,
        utc(2025, 3, 15, 7, 45, 0),
        Duration::minutes(9),
    )]);
    raw.with_column(Series::new(START_LAT.into(), ["41.88"]))?;

    let normalised = ensure_raw_schema(&raw).expect("numeric text casts to float");
    let lat = normalised.column(START_LAT)?.f64()?.get(0);
    assert_eq!(lat, Some(41.88));
    Ok(())
}

#[test]
fn ingestion_stacks_both_export_formats() -> Result<()> {
    let paths = vec![
        fixture_dir().join("current_export_sample.csv"),
        fixture_dir().join("legacy_export_sample.csv"),
    ];

    let ingested = ingest_paths(&paths)?;

    assert_eq!(ingested.dataframe.height(), 7);
    assert_eq!(ingested.files.len(), 2);
    assert_eq!(ingested.files[0].format, "CURRENT_EXPORT");
    assert_eq!(ingested.files[0].rows, 4);
    assert_eq!(ingested.files[1].format, "LEGACY_EXPORT");
    assert_eq!(ingested.files[1].rows, 3);
    assert_eq!(ingested.files[0].other_rideable_rows, 1);
    assert_eq!(ingested.files[1].other_rideable_rows, 3);
    assert!(ingested
        .files
        .iter()
        .all(|file| file.file_hash.len() == 64));
    assert_ne!(ingested.files[0].file_hash, ingested.files[1].file_hash);
    Ok(())
}

#[test]
fn glob_expansion_is_sorted_and_zero_matches_is_a_config_error() -> Result<()> {
    let pattern = fixture_dir().join("*_export_sample.csv");
    let paths = expand_inputs(&[pattern.display().to_string()])?;
    let names: Vec<String> = paths
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["current_export_sample.csv", "legacy_export_sample.csv"]);

    let nothing = InputConfig {
        paths: vec![fixture_dir().join("*.nothing").display().to_string()],
    };
    let err = ingest(&nothing).expect_err("no files matched");
    assert!(matches!(err, PipelineError::Config(_)));
    Ok(())
}

#[test]
fn configured_run_over_fixture_files() -> Result<()> {
    let toml = format!(
        r#"
[window]
start = "2025-01-01T00:00:00Z"
end = "2026-01-01T00:00:00Z"

[calendar]
timezone = "America/Chicago"

[input]
paths = ["{}"]
"#,
        fixture_dir().join("current_export_sample.csv").display()
    );
    let config = parse_config(&toml)?;
    let ingested = ingest(&config.input)?;

    let run = run_pipeline(&ingested.dataframe, &config.window, config.calendar.tz()?)?;

    assert_eq!(run.fact.stages.window.kept_rows, 4);
    assert_eq!(run.fact.trips.height(), 4);
    assert_eq!(run.summaries.len(), 8);
    Ok(())
}

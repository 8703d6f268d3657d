mod common;

use chrono::Duration;
use polars::prelude::*;
use tripflux_core::schema::RAW_TRIP_COLUMNS;
use tripflux_core::window::{apply_window, TripWindow};
use tripflux_core::PipelineError;
use tripflux_parser::RiderType;

use common::{raw_frame, str_values, utc, Trip};

fn twelve_months() -> TripWindow {
    TripWindow::new(utc(2024, 11, 1, 0, 0, 0), utc(2025, 11, 1, 0, 0, 0)).unwrap()
}

#[test]
fn window_is_half_open_on_started_at() -> PolarsResult<()> {
    let ride = Duration::minutes(10);
    let raw = raw_frame(&[
        Trip::new("before", RiderType::Member, utc(2024, 10, 31, 23, 59, 59), ride),
        Trip::new("at_start", RiderType::Member, utc(2024, 11, 1, 0, 0, 0), ride),
        Trip::new("inside", RiderType::Casual, utc(2025, 6, 15, 12, 0, 0), ride),
        Trip::new("last_second", RiderType::Casual, utc(2025, 10, 31, 23, 59, 59), ride),
        Trip::new("at_end", RiderType::Member, utc(2025, 11, 1, 0, 0, 0), ride),
    ]);

    let result = apply_window(&raw, &twelve_months())?;

    let ids: Vec<String> = str_values(&result.dataframe, "ride_id")
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(ids, ["at_start", "inside", "last_second"]);
    assert_eq!(result.summary.input_rows, 5);
    assert_eq!(result.summary.kept_rows, 3);
    assert_eq!(result.summary.dropped_rows, 2);
    Ok(())
}

#[test]
fn window_keeps_columns_and_ignores_ride_quality() -> PolarsResult<()> {
    // Backwards and overlong trips are cleaning's concern, not the window's.
    let raw = raw_frame(&[
        Trip::new("backwards", RiderType::Member, utc(2025, 1, 1, 10, 0, 0), Duration::minutes(-5)),
        Trip::new("overlong", RiderType::Casual, utc(2025, 1, 1, 10, 0, 0), Duration::hours(30)),
    ]);

    let result = apply_window(&raw, &twelve_months())?;

    assert_eq!(result.dataframe.height(), 2);
    let names: Vec<String> = result
        .dataframe
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, RAW_TRIP_COLUMNS);
    Ok(())
}

#[test]
fn window_is_idempotent() -> PolarsResult<()> {
    let window = twelve_months();
    let raw = raw_frame(&[
        Trip::new("a", RiderType::Member, utc(2024, 9, 1, 8, 0, 0), Duration::minutes(12)),
        Trip::new("b", RiderType::Member, utc(2025, 2, 1, 8, 0, 0), Duration::minutes(12)),
        Trip::new("c", RiderType::Casual, utc(2025, 12, 1, 8, 0, 0), Duration::minutes(12)),
    ]);

    let once = apply_window(&raw, &window)?;
    let twice = apply_window(&once.dataframe, &window)?;

    assert!(once.dataframe.equals_missing(&twice.dataframe));
    assert_eq!(twice.summary.dropped_rows, 0);
    Ok(())
}

#[test]
fn inverted_window_is_a_config_error() {
    let err = TripWindow::new(utc(2025, 11, 1, 0, 0, 0), utc(2024, 11, 1, 0, 0, 0))
        .expect_err("start must precede end");
    assert!(matches!(err, PipelineError::Config(_)));
}

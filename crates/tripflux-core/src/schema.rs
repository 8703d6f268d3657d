use polars::prelude::*;
use tripflux_parser::RiderType;

use crate::error::{PipelineError, Result};

pub use tripflux_parser::formats::schema::{
    END_LAT, END_LNG, END_STATION_NAME, ENDED_AT, MEMBER_CASUAL, RAW_TRIP_COLUMNS, RIDEABLE_TYPE,
    RIDE_ID, START_LAT, START_LNG, START_STATION_NAME, STARTED_AT,
};

pub const RIDE_LENGTH_MINUTES: &str = "ride_length_minutes";
pub const RIDE_DATE: &str = "ride_date";
pub const RIDE_YEAR: &str = "ride_year";
pub const RIDE_MONTH: &str = "ride_month";
pub const DAY_OF_WEEK: &str = "day_of_week";
pub const START_HOUR: &str = "start_hour";
pub const IS_WEEKEND: &str = "is_weekend";
pub const SEASON: &str = "season";

/// Columns derived during cleaning, appended after the raw columns.
pub const DERIVED_COLUMNS: [&str; 8] = [
    RIDE_LENGTH_MINUTES,
    RIDE_DATE,
    RIDE_YEAR,
    RIDE_MONTH,
    DAY_OF_WEEK,
    START_HOUR,
    IS_WEEKEND,
    SEASON,
];

const TEXT_COLUMNS: [&str; 5] = [
    RIDE_ID,
    RIDEABLE_TYPE,
    START_STATION_NAME,
    END_STATION_NAME,
    MEMBER_CASUAL,
];
const TIMESTAMP_COLUMNS: [&str; 2] = [STARTED_AT, ENDED_AT];
const COORDINATE_COLUMNS: [&str; 4] = [START_LAT, START_LNG, END_LAT, END_LNG];
const NON_NULL_COLUMNS: [&str; 5] = [RIDE_ID, RIDEABLE_TYPE, STARTED_AT, ENDED_AT, MEMBER_CASUAL];

pub fn utc_datetime() -> DataType {
    DataType::Datetime(TimeUnit::Microseconds, Some(polars::prelude::TimeZone::UTC))
}

/// Returns the named timestamp column as microsecond UTC datetimes.
pub(crate) fn utc_micros(df: &DataFrame, name: &str) -> PolarsResult<Series> {
    df.column(name)?
        .as_materialized_series()
        .cast(&utc_datetime())
}

/// Verifies the raw trip schema and normalises column types and order. Missing columns,
/// non-datetime timestamps, values that do not convert to the column type, nulls in required
/// columns and unknown rider types are fatal.
pub fn ensure_raw_schema(df: &DataFrame) -> Result<DataFrame> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let missing: Vec<&str> = RAW_TRIP_COLUMNS
        .iter()
        .copied()
        .filter(|name| !present.iter().any(|p| p == name))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema(format!(
            "missing columns: {}",
            missing.join(", ")
        )));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(RAW_TRIP_COLUMNS.len());
    for name in RAW_TRIP_COLUMNS {
        let series = df.column(name)?.as_materialized_series();
        let target = if TEXT_COLUMNS.contains(&name) {
            DataType::String
        } else if TIMESTAMP_COLUMNS.contains(&name) {
            if !matches!(series.dtype(), DataType::Datetime(_, _)) {
                return Err(PipelineError::Schema(format!(
                    "column '{name}' has type {} but a datetime is required",
                    series.dtype()
                )));
            }
            utc_datetime()
        } else if COORDINATE_COLUMNS.contains(&name) {
            DataType::Float64
        } else {
            return Err(PipelineError::Schema(format!("unclassified column '{name}'")));
        };

        let cast = series.strict_cast(&target).map_err(|err| {
            PipelineError::Schema(format!(
                "column '{name}' cannot be read as {target}: {err}"
            ))
        })?;
        if NON_NULL_COLUMNS.contains(&name) && cast.null_count() > 0 {
            return Err(PipelineError::Schema(format!(
                "column '{name}' contains {} null values",
                cast.null_count()
            )));
        }
        columns.push(cast.into());
    }

    let normalized = DataFrame::new(columns)?;
    check_rider_types(&normalized)?;
    Ok(normalized)
}

fn check_rider_types(df: &DataFrame) -> Result<()> {
    let riders = df.column(MEMBER_CASUAL)?.str()?;
    for (idx, value) in riders.into_iter().enumerate() {
        if let Some(value) = value {
            if value != RiderType::Member.as_str() && value != RiderType::Casual.as_str() {
                return Err(PipelineError::Schema(format!(
                    "row {idx}: member_casual must be 'member' or 'casual', found '{value}'"
                )));
            }
        }
    }
    Ok(())
}

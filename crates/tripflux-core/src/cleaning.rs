use chrono_tz::Tz;
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::calendar::{self, CalendarParts};
use crate::schema::*;

pub const MICROS_PER_MINUTE: i64 = 60 * 1_000_000;
pub const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

/// Trips of this many whole minutes or fewer are treated as accidental unlocks.
pub const MIN_RIDE_MINUTES_EXCLUSIVE: i64 = 1;
/// Trips of this many whole hours or more are treated as lost or unreturned bikes.
pub const MAX_RIDE_HOURS_EXCLUSIVE: i64 = 24;

/// Whole minutes between two timestamps; fractional minutes truncate toward zero.
pub fn ride_length_minutes(started_micros: i64, ended_micros: i64) -> i64 {
    (ended_micros - started_micros) / MICROS_PER_MINUTE
}

/// Whole hours between two timestamps, truncated independently of the minute count.
pub fn ride_length_hours(started_micros: i64, ended_micros: i64) -> i64 {
    (ended_micros - started_micros) / MICROS_PER_HOUR
}

/// Which validity predicates a trip fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TripChecks {
    pub non_positive_duration: bool,
    pub too_short: bool,
    pub too_long: bool,
}

impl TripChecks {
    pub fn evaluate(started_micros: i64, ended_micros: i64) -> Self {
        Self {
            non_positive_duration: ended_micros <= started_micros,
            too_short: ride_length_minutes(started_micros, ended_micros)
                <= MIN_RIDE_MINUTES_EXCLUSIVE,
            too_long: ride_length_hours(started_micros, ended_micros)
                >= MAX_RIDE_HOURS_EXCLUSIVE,
        }
    }

    pub fn is_valid(&self) -> bool {
        !(self.non_positive_duration || self.too_short || self.too_long)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CleaningSummary {
    pub input_rows: usize,
    pub retained_rows: usize,
    pub dropped_rows: usize,
    /// A row failing several predicates is counted under each of them.
    pub dropped_non_positive_duration: usize,
    pub dropped_too_short: usize,
    pub dropped_too_long: usize,
}

#[derive(Debug, Clone)]
pub struct CleaningResult {
    pub dataframe: DataFrame,
    pub summary: CleaningSummary,
}

/// Drops trips that fail the validity predicates and appends the derived calendar columns.
/// Calendar fields are taken from `started_at` in `tz`. Duplicate ride ids are kept.
pub fn clean_trips(df: &DataFrame, tz: Tz) -> PolarsResult<CleaningResult> {
    let len = df.height();

    let started = utc_micros(df, STARTED_AT)?;
    let started = started.datetime()?;
    let ended = utc_micros(df, ENDED_AT)?;
    let ended = ended.datetime()?;

    let mut summary = CleaningSummary {
        input_rows: len,
        ..CleaningSummary::default()
    };

    let mut keep = Vec::with_capacity(len);
    let mut minutes = Vec::new();
    let mut dates = Vec::new();
    let mut years = Vec::new();
    let mut months = Vec::new();
    let mut day_names = Vec::new();
    let mut hours = Vec::new();
    let mut weekend = Vec::new();
    let mut seasons = Vec::new();

    for idx in 0..len {
        let start = started
            .get(idx)
            .ok_or_else(|| missing_timestamp(STARTED_AT, idx))?;
        let end = ended
            .get(idx)
            .ok_or_else(|| missing_timestamp(ENDED_AT, idx))?;

        let checks = TripChecks::evaluate(start, end);
        if !checks.is_valid() {
            if checks.non_positive_duration {
                summary.dropped_non_positive_duration += 1;
            }
            if checks.too_short {
                summary.dropped_too_short += 1;
            }
            if checks.too_long {
                summary.dropped_too_long += 1;
            }
            keep.push(false);
            continue;
        }

        let parts = CalendarParts::from_micros(start, tz).ok_or_else(|| {
            PolarsError::ComputeError(format!("started_at {start} is out of range").into())
        })?;
        let season = parts.season().ok_or_else(|| {
            PolarsError::ComputeError(format!("invalid month {}", parts.month).into())
        })?;

        keep.push(true);
        minutes.push(ride_length_minutes(start, end));
        dates.push(calendar::epoch_days(parts.date));
        years.push(parts.year);
        months.push(parts.month as i32);
        day_names.push(calendar::weekday_name(parts.weekday));
        hours.push(parts.hour as i32);
        weekend.push(calendar::is_weekend(parts.weekday));
        seasons.push(season.as_str());
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let mut output = df.select(RAW_TRIP_COLUMNS)?.filter(&mask)?;
    output.hstack_mut(&mut [
        Series::new(RIDE_LENGTH_MINUTES.into(), minutes).into(),
        Series::new(RIDE_DATE.into(), dates)
            .cast(&DataType::Date)?
            .into(),
        Series::new(RIDE_YEAR.into(), years).into(),
        Series::new(RIDE_MONTH.into(), months).into(),
        Series::new(DAY_OF_WEEK.into(), day_names).into(),
        Series::new(START_HOUR.into(), hours).into(),
        Series::new(IS_WEEKEND.into(), weekend).into(),
        Series::new(SEASON.into(), seasons).into(),
    ])?;

    summary.retained_rows = output.height();
    summary.dropped_rows = len - output.height();

    info!(
        input_rows = summary.input_rows,
        retained_rows = summary.retained_rows,
        dropped_non_positive_duration = summary.dropped_non_positive_duration,
        dropped_too_short = summary.dropped_too_short,
        dropped_too_long = summary.dropped_too_long,
        "cleaned trips"
    );

    Ok(CleaningResult {
        dataframe: output,
        summary,
    })
}

fn missing_timestamp(column: &str, idx: usize) -> PolarsError {
    PolarsError::ComputeError(format!("column '{column}' is null at row {idx}").into())
}

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime};
use csv::StringRecord;
use polars::prelude::*;

use super::schema::*;
use crate::errors::ParserError;
use crate::model::RiderType;

/// Column accumulator shared by every export format.
#[derive(Debug, Clone, Default)]
pub struct TripColumns {
    pub ride_id: Vec<String>,
    pub rideable_type: Vec<String>,
    pub started_at: Vec<i64>,
    pub ended_at: Vec<i64>,
    pub start_station_name: Vec<Option<String>>,
    pub end_station_name: Vec<Option<String>>,
    pub start_lat: Vec<Option<f64>>,
    pub start_lng: Vec<Option<f64>>,
    pub end_lat: Vec<Option<f64>>,
    pub end_lng: Vec<Option<f64>>,
    pub member_casual: Vec<RiderType>,
}

impl TripColumns {
    pub fn len(&self) -> usize {
        self.ride_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ride_id.is_empty()
    }
}

/// Maps normalised header names to their column position.
pub(crate) struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: &StringRecord, normalize: impl Fn(&str) -> String) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (normalize(name), idx))
            .collect();
        Self { positions }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn require(&self, parser: &'static str, names: &[&str]) -> Result<(), ParserError> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !self.positions.contains_key(*name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ParserError::FormatMismatch {
                parser,
                reason: format!("missing required columns: {}", missing.join(", ")),
            })
        }
    }
}

pub(crate) fn normalize_header(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

pub(crate) fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> &'r str {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim()
}

pub(crate) fn build_trip_dataframe(
    parser: &'static str,
    columns: TripColumns,
) -> Result<DataFrame, ParserError> {
    let rows = columns.len();
    let lengths = [
        columns.rideable_type.len(),
        columns.started_at.len(),
        columns.ended_at.len(),
        columns.start_station_name.len(),
        columns.end_station_name.len(),
        columns.start_lat.len(),
        columns.start_lng.len(),
        columns.end_lat.len(),
        columns.end_lng.len(),
        columns.member_casual.len(),
    ];
    if let Some(found) = lengths.iter().find(|len| **len != rows) {
        return Err(ParserError::Frame {
            parser,
            message: format!("column length mismatch: expected {rows} rows, found {found}"),
        });
    }

    let utc = DataType::Datetime(TimeUnit::Microseconds, Some(polars::prelude::TimeZone::UTC));
    let cast_err = |err: PolarsError| ParserError::Frame {
        parser,
        message: format!("failed to cast timestamp column: {err}"),
    };
    let started = Series::new(STARTED_AT.into(), columns.started_at)
        .cast(&utc)
        .map_err(cast_err)?;
    let ended = Series::new(ENDED_AT.into(), columns.ended_at)
        .cast(&utc)
        .map_err(cast_err)?;

    let start_names: Vec<Option<&str>> = columns
        .start_station_name
        .iter()
        .map(|v| v.as_deref())
        .collect();
    let end_names: Vec<Option<&str>> = columns
        .end_station_name
        .iter()
        .map(|v| v.as_deref())
        .collect();
    let rider_types: Vec<&str> = columns.member_casual.iter().map(|r| r.as_str()).collect();

    let cols: Vec<Column> = vec![
        Series::new(RIDE_ID.into(), columns.ride_id).into(),
        Series::new(RIDEABLE_TYPE.into(), columns.rideable_type).into(),
        started.into(),
        ended.into(),
        Series::new(START_STATION_NAME.into(), start_names).into(),
        Series::new(END_STATION_NAME.into(), end_names).into(),
        Series::new(START_LAT.into(), columns.start_lat).into(),
        Series::new(START_LNG.into(), columns.start_lng).into(),
        Series::new(END_LAT.into(), columns.end_lat).into(),
        Series::new(END_LNG.into(), columns.end_lng).into(),
        Series::new(MEMBER_CASUAL.into(), rider_types).into(),
    ];

    DataFrame::new(cols).map_err(|err| ParserError::Frame {
        parser,
        message: format!("failed to build trip dataframe: {err}"),
    })
}

/// Parses a timestamp into UTC microseconds. Values without an offset are read as UTC.
pub(crate) fn parse_timestamp(
    parser: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<i64, ParserError> {
    static FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp_micros());
    }
    let naive = trimmed.strip_suffix(" UTC").unwrap_or(trimmed);
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt.and_utc().timestamp_micros());
        }
    }
    Err(ParserError::DataRow {
        parser,
        line_index,
        message: format!("invalid timestamp '{trimmed}' in column '{column}'"),
    })
}

pub(crate) fn parse_required_text(
    parser: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<String, ParserError> {
    optional_text(value).ok_or_else(|| ParserError::DataRow {
        parser,
        line_index,
        message: format!("column '{column}' is empty"),
    })
}

pub(crate) fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn parse_optional_f64(
    parser: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<f64>, ParserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|err| ParserError::DataRow {
            parser,
            line_index,
            message: format!("failed to parse column '{column}' as float: {err}"),
        })
}

pub(crate) fn parse_rider_type(
    parser: &'static str,
    value: &str,
    line_index: usize,
) -> Result<RiderType, ParserError> {
    RiderType::try_from(value).map_err(|err| ParserError::DataRow {
        parser,
        line_index,
        message: format!("{MEMBER_CASUAL}: {err}"),
    })
}

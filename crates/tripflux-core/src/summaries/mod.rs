//! Aggregate views over the cleaned fact table.
//!
//! Every table is a pure function of the fact table and is rebuilt from scratch on each run.
//! Means are rounded to two decimals and percentages to one, using `f64::round` (half away
//! from zero). Percentiles use the nearest-rank method over each group's sorted durations.

mod riders;
mod stations;
mod temporal;

use once_cell::sync::Lazy;
use polars::prelude::*;
use tracing::debug;

use crate::schema::*;

pub use riders::{member_stats, rideable_share, weekend_split};
pub use stations::{top_end_stations, top_start_stations, TOP_STATION_LIMIT};
pub use temporal::{trips_by_dow, trips_by_hour, trips_by_month};

pub type SummaryFn = fn(&DataFrame) -> PolarsResult<DataFrame>;

#[derive(Debug, Clone, Copy)]
pub struct SummaryDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub build: SummaryFn,
}

static SUMMARIES: Lazy<Vec<SummaryDescriptor>> = Lazy::new(|| {
    vec![
        SummaryDescriptor {
            name: "member_stats",
            description: "Ride counts, mean and p10/p50/p90 duration, share of all rides per rider type",
            build: member_stats,
        },
        SummaryDescriptor {
            name: "trips_by_dow",
            description: "Rides and mean duration per rider type and weekday",
            build: trips_by_dow,
        },
        SummaryDescriptor {
            name: "trips_by_month",
            description: "Rides and mean duration per calendar month and rider type, with season",
            build: trips_by_month,
        },
        SummaryDescriptor {
            name: "trips_by_hour",
            description: "Rides and mean duration per rider type and start hour",
            build: trips_by_hour,
        },
        SummaryDescriptor {
            name: "rideable_share",
            description: "Bike type mix within each rider type",
            build: rideable_share,
        },
        SummaryDescriptor {
            name: "top_start_stations",
            description: "Twenty busiest start stations per rider type (dockless trips excluded)",
            build: top_start_stations,
        },
        SummaryDescriptor {
            name: "top_end_stations",
            description: "Twenty busiest end stations per rider type (dockless trips excluded)",
            build: top_end_stations,
        },
        SummaryDescriptor {
            name: "weekend_split",
            description: "Weekend versus weekday rides per rider type",
            build: weekend_split,
        },
    ]
});

pub fn all_summaries() -> &'static [SummaryDescriptor] {
    SUMMARIES.as_slice()
}

#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: &'static str,
    pub dataframe: DataFrame,
}

/// Runs every registered summary against the fact table, in registry order.
pub fn build_summaries(trips: &DataFrame) -> PolarsResult<Vec<NamedTable>> {
    all_summaries()
        .iter()
        .map(|summary| {
            let dataframe = (summary.build)(trips)?;
            debug!(table = summary.name, rows = dataframe.height(), "built summary");
            Ok(NamedTable {
                name: summary.name,
                dataframe,
            })
        })
        .collect()
}

/// Borrowed column accessors over the fact table.
pub(crate) struct FactView<'a> {
    pub rider: &'a StringChunked,
    pub minutes: &'a Int64Chunked,
    pub rideable: &'a StringChunked,
    pub start_station: &'a StringChunked,
    pub end_station: &'a StringChunked,
    pub year: &'a Int32Chunked,
    pub month: &'a Int32Chunked,
    pub day_of_week: &'a StringChunked,
    pub hour: &'a Int32Chunked,
    pub weekend: &'a BooleanChunked,
    len: usize,
}

impl<'a> FactView<'a> {
    pub fn new(trips: &'a DataFrame) -> PolarsResult<Self> {
        Ok(Self {
            rider: trips.column(MEMBER_CASUAL)?.str()?,
            minutes: trips.column(RIDE_LENGTH_MINUTES)?.i64()?,
            rideable: trips.column(RIDEABLE_TYPE)?.str()?,
            start_station: trips.column(START_STATION_NAME)?.str()?,
            end_station: trips.column(END_STATION_NAME)?.str()?,
            year: trips.column(RIDE_YEAR)?.i32()?,
            month: trips.column(RIDE_MONTH)?.i32()?,
            day_of_week: trips.column(DAY_OF_WEEK)?.str()?,
            hour: trips.column(START_HOUR)?.i32()?,
            weekend: trips.column(IS_WEEKEND)?.bool()?,
            len: trips.height(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

/// Running count and duration total for one group.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RideTally {
    pub rides: i64,
    pub total_minutes: i64,
}

impl RideTally {
    pub fn add(&mut self, minutes: Option<i64>) {
        self.rides += 1;
        self.total_minutes += minutes.unwrap_or(0);
    }

    pub fn mean_minutes(&self) -> Option<f64> {
        if self.rides == 0 {
            None
        } else {
            Some(round_to(self.total_minutes as f64 / self.rides as f64, 2))
        }
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `100 * part / whole` rounded to one decimal; `None` when `whole` is zero.
pub(crate) fn percentage(part: i64, whole: i64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(round_to(100.0 * part as f64 / whole as f64, 1))
    }
}

/// Nearest-rank percentile over an ascending slice.
pub(crate) fn nearest_rank(sorted: &[i64], quantile: f64) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (quantile * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    sorted.get(idx).copied()
}

pub(crate) fn unexpected_null(column: &str, idx: usize) -> PolarsError {
    PolarsError::ComputeError(format!("fact table column '{column}' is null at row {idx}").into())
}

use std::collections::BTreeMap;

use chrono::Weekday;
use polars::prelude::*;

use super::{unexpected_null, FactView, RideTally};
use crate::calendar::{self, Season};
use crate::schema::{DAY_OF_WEEK, MEMBER_CASUAL, RIDE_MONTH, RIDE_YEAR, START_HOUR};

/// Rides per rider type and weekday, with both Sunday-first and Monday-first numbering.
/// Sorted by Monday-first number, then rider type.
pub fn trips_by_dow(trips: &DataFrame) -> PolarsResult<DataFrame> {
    let view = FactView::new(trips)?;

    let mut groups: BTreeMap<(i32, &str), (Weekday, RideTally)> = BTreeMap::new();
    for idx in 0..view.len() {
        let rider = view
            .rider
            .get(idx)
            .ok_or_else(|| unexpected_null(MEMBER_CASUAL, idx))?;
        let day_name = view
            .day_of_week
            .get(idx)
            .ok_or_else(|| unexpected_null(DAY_OF_WEEK, idx))?;
        let day = calendar::weekday_from_name(day_name).ok_or_else(|| {
            PolarsError::ComputeError(format!("unknown day_of_week '{day_name}'").into())
        })?;

        groups
            .entry((calendar::dow_monday_first(day), rider))
            .or_insert((day, RideTally::default()))
            .1
            .add(view.minutes.get(idx));
    }

    let mut riders = Vec::with_capacity(groups.len());
    let mut day_names = Vec::with_capacity(groups.len());
    let mut sunday_first = Vec::with_capacity(groups.len());
    let mut monday_first = Vec::with_capacity(groups.len());
    let mut rides = Vec::with_capacity(groups.len());
    let mut means = Vec::with_capacity(groups.len());
    for ((mon_first, rider), (day, tally)) in groups {
        riders.push(rider);
        day_names.push(calendar::weekday_name(day));
        sunday_first.push(calendar::dow_sunday_first(day));
        monday_first.push(mon_first);
        rides.push(tally.rides);
        means.push(tally.mean_minutes());
    }

    df![
        "member_casual" => riders,
        "day_of_week" => day_names,
        "dow_sun_first" => sunday_first,
        "dow_mon_first" => monday_first,
        "total_rides" => rides,
        "avg_ride_minutes" => means,
    ]
}

/// Rides per calendar month and rider type, labelled with season and a `YYYY-MM` key.
pub fn trips_by_month(trips: &DataFrame) -> PolarsResult<DataFrame> {
    let view = FactView::new(trips)?;

    let mut groups: BTreeMap<(i32, i32, &str), RideTally> = BTreeMap::new();
    for idx in 0..view.len() {
        let rider = view
            .rider
            .get(idx)
            .ok_or_else(|| unexpected_null(MEMBER_CASUAL, idx))?;
        let year = view
            .year
            .get(idx)
            .ok_or_else(|| unexpected_null(RIDE_YEAR, idx))?;
        let month = view
            .month
            .get(idx)
            .ok_or_else(|| unexpected_null(RIDE_MONTH, idx))?;
        groups
            .entry((year, month, rider))
            .or_default()
            .add(view.minutes.get(idx));
    }

    let mut years = Vec::with_capacity(groups.len());
    let mut months = Vec::with_capacity(groups.len());
    let mut year_months = Vec::with_capacity(groups.len());
    let mut seasons = Vec::with_capacity(groups.len());
    let mut riders = Vec::with_capacity(groups.len());
    let mut rides = Vec::with_capacity(groups.len());
    let mut means = Vec::with_capacity(groups.len());
    for ((year, month, rider), tally) in groups {
        let season = u32::try_from(month)
            .ok()
            .and_then(Season::from_month)
            .ok_or_else(|| PolarsError::ComputeError(format!("invalid month {month}").into()))?;
        years.push(year);
        months.push(month);
        year_months.push(calendar::year_month_key(year, month));
        seasons.push(season.as_str());
        riders.push(rider);
        rides.push(tally.rides);
        means.push(tally.mean_minutes());
    }

    df![
        "ride_year" => years,
        "ride_month" => months,
        "year_month" => year_months,
        "season" => seasons,
        "member_casual" => riders,
        "total_rides" => rides,
        "avg_ride_minutes" => means,
    ]
}

/// Rides per rider type and start hour (0-23).
pub fn trips_by_hour(trips: &DataFrame) -> PolarsResult<DataFrame> {
    let view = FactView::new(trips)?;

    let mut groups: BTreeMap<(&str, i32), RideTally> = BTreeMap::new();
    for idx in 0..view.len() {
        let rider = view
            .rider
            .get(idx)
            .ok_or_else(|| unexpected_null(MEMBER_CASUAL, idx))?;
        let hour = view
            .hour
            .get(idx)
            .ok_or_else(|| unexpected_null(START_HOUR, idx))?;
        groups
            .entry((rider, hour))
            .or_default()
            .add(view.minutes.get(idx));
    }

    let mut riders = Vec::with_capacity(groups.len());
    let mut hours = Vec::with_capacity(groups.len());
    let mut rides = Vec::with_capacity(groups.len());
    let mut means = Vec::with_capacity(groups.len());
    for ((rider, hour), tally) in groups {
        riders.push(rider);
        hours.push(hour);
        rides.push(tally.rides);
        means.push(tally.mean_minutes());
    }

    df![
        "member_casual" => riders,
        "start_hour" => hours,
        "total_rides" => rides,
        "avg_ride_minutes" => means,
    ]
}

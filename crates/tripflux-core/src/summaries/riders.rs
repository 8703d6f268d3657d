use std::collections::{BTreeMap, HashMap};

use polars::prelude::*;
use tripflux_parser::RiderType;

use super::{nearest_rank, percentage, round_to, unexpected_null, FactView};
use crate::schema::{MEMBER_CASUAL, RIDEABLE_TYPE};

/// One row per rider type: ride count, mean and p10/p50/p90 duration, and share of all rides.
pub fn member_stats(trips: &DataFrame) -> PolarsResult<DataFrame> {
    let view = FactView::new(trips)?;

    let mut durations: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    for idx in 0..view.len() {
        let rider = view
            .rider
            .get(idx)
            .ok_or_else(|| unexpected_null(MEMBER_CASUAL, idx))?;
        let entry = durations.entry(rider).or_default();
        if let Some(minutes) = view.minutes.get(idx) {
            entry.push(minutes);
        }
    }

    let total_rides = view.len() as i64;
    let mut riders = Vec::with_capacity(durations.len());
    let mut rides = Vec::with_capacity(durations.len());
    let mut means = Vec::with_capacity(durations.len());
    let mut p10 = Vec::with_capacity(durations.len());
    let mut p50 = Vec::with_capacity(durations.len());
    let mut p90 = Vec::with_capacity(durations.len());
    let mut shares = Vec::with_capacity(durations.len());

    for (rider, mut values) in durations {
        values.sort_unstable();
        let count = values.len() as i64;
        let sum: i64 = values.iter().sum();

        riders.push(rider);
        rides.push(count);
        means.push(if count == 0 {
            None
        } else {
            Some(round_to(sum as f64 / count as f64, 2))
        });
        p10.push(nearest_rank(&values, 0.1));
        p50.push(nearest_rank(&values, 0.5));
        p90.push(nearest_rank(&values, 0.9));
        shares.push(percentage(count, total_rides));
    }

    df![
        "member_casual" => riders,
        "total_rides" => rides,
        "avg_ride_minutes" => means,
        "p10_ride_minutes" => p10,
        "median_ride_minutes" => p50,
        "p90_ride_minutes" => p90,
        "pct_of_total_rides" => shares,
    ]
}

/// Bike-type mix per rider type; percentages are relative to the rider type's own total.
pub fn rideable_share(trips: &DataFrame) -> PolarsResult<DataFrame> {
    let view = FactView::new(trips)?;

    let mut counts: HashMap<(&str, &str), i64> = HashMap::new();
    let mut rider_totals: HashMap<&str, i64> = HashMap::new();
    for idx in 0..view.len() {
        let rider = view
            .rider
            .get(idx)
            .ok_or_else(|| unexpected_null(MEMBER_CASUAL, idx))?;
        let rideable = view
            .rideable
            .get(idx)
            .ok_or_else(|| unexpected_null(RIDEABLE_TYPE, idx))?;
        *counts.entry((rider, rideable)).or_insert(0) += 1;
        *rider_totals.entry(rider).or_insert(0) += 1;
    }

    let mut rows: Vec<((&str, &str), i64)> = counts.into_iter().collect();
    rows.sort_by(|((rider_a, type_a), count_a), ((rider_b, type_b), count_b)| {
        rider_a
            .cmp(rider_b)
            .then_with(|| count_b.cmp(count_a))
            .then_with(|| type_a.cmp(type_b))
    });

    let mut riders = Vec::with_capacity(rows.len());
    let mut rideables = Vec::with_capacity(rows.len());
    let mut rides = Vec::with_capacity(rows.len());
    let mut shares = Vec::with_capacity(rows.len());
    for ((rider, rideable), count) in rows {
        let total = rider_totals.get(rider).copied().unwrap_or(0);
        riders.push(rider);
        rideables.push(rideable);
        rides.push(count);
        shares.push(percentage(count, total));
    }

    df![
        "member_casual" => riders,
        "rideable_type" => rideables,
        "total_rides" => rides,
        "pct_within_rider_type" => shares,
    ]
}

/// Weekend and weekday ride counts for both rider types. A rider type without rides still gets
/// a row, with null percentages.
pub fn weekend_split(trips: &DataFrame) -> PolarsResult<DataFrame> {
    let view = FactView::new(trips)?;

    let mut tallies: BTreeMap<&str, (i64, i64)> = RiderType::ALL
        .iter()
        .map(|rider| (rider.as_str(), (0, 0)))
        .collect();
    for idx in 0..view.len() {
        let rider = view
            .rider
            .get(idx)
            .ok_or_else(|| unexpected_null(MEMBER_CASUAL, idx))?;
        let entry = tallies.entry(rider).or_insert((0, 0));
        if view.weekend.get(idx).unwrap_or(false) {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    let mut riders = Vec::with_capacity(tallies.len());
    let mut weekend_rides = Vec::with_capacity(tallies.len());
    let mut weekday_rides = Vec::with_capacity(tallies.len());
    let mut weekend_pct = Vec::with_capacity(tallies.len());
    let mut weekday_pct = Vec::with_capacity(tallies.len());
    for (rider, (weekend, weekday)) in tallies {
        let total = weekend + weekday;
        riders.push(rider);
        weekend_rides.push(weekend);
        weekday_rides.push(weekday);
        weekend_pct.push(percentage(weekend, total));
        weekday_pct.push(percentage(weekday, total));
    }

    df![
        "member_casual" => riders,
        "weekend_rides" => weekend_rides,
        "weekday_rides" => weekday_rides,
        "weekend_pct" => weekend_pct,
        "weekday_pct" => weekday_pct,
    ]
}

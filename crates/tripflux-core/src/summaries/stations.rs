use std::collections::{BTreeMap, HashMap};

use polars::prelude::*;

use super::{unexpected_null, FactView};
use crate::schema::MEMBER_CASUAL;

/// Stations kept per rider type.
pub const TOP_STATION_LIMIT: usize = 20;

/// Busiest start stations per rider type. Trips without a start station are not ranked.
pub fn top_start_stations(trips: &DataFrame) -> PolarsResult<DataFrame> {
    let view = FactView::new(trips)?;
    rank_stations(&view, view.start_station)
}

/// Busiest end stations per rider type. Trips without an end station are not ranked.
pub fn top_end_stations(trips: &DataFrame) -> PolarsResult<DataFrame> {
    let view = FactView::new(trips)?;
    rank_stations(&view, view.end_station)
}

fn rank_stations(view: &FactView<'_>, stations: &StringChunked) -> PolarsResult<DataFrame> {
    let mut counts: BTreeMap<&str, HashMap<&str, i64>> = BTreeMap::new();
    for idx in 0..view.len() {
        let Some(station) = stations.get(idx) else {
            continue;
        };
        let rider = view
            .rider
            .get(idx)
            .ok_or_else(|| unexpected_null(MEMBER_CASUAL, idx))?;
        *counts
            .entry(rider)
            .or_default()
            .entry(station)
            .or_insert(0) += 1;
    }

    let mut riders = Vec::new();
    let mut names = Vec::new();
    let mut rides = Vec::new();
    let mut ranks = Vec::new();
    for (rider, per_station) in counts {
        let mut ranked: Vec<(&str, i64)> = per_station.into_iter().collect();
        // ties resolve alphabetically so ranks are stable across runs
        ranked.sort_by(|(name_a, count_a), (name_b, count_b)| {
            count_b.cmp(count_a).then_with(|| name_a.cmp(name_b))
        });

        for (position, (station, count)) in ranked.into_iter().take(TOP_STATION_LIMIT).enumerate() {
            riders.push(rider);
            names.push(station);
            rides.push(count);
            ranks.push(position as u32 + 1);
        }
    }

    df![
        "member_casual" => riders,
        "station_name" => names,
        "total_rides" => rides,
        "station_rank" => ranks,
    ]
}

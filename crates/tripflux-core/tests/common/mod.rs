#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use polars::prelude::*;
use tripflux_core::cleaning::clean_trips;
use tripflux_parser::{trip_dataframe, RiderType, TripColumns};

#[derive(Debug, Clone)]
pub struct Trip {
    pub ride_id: String,
    pub rider: RiderType,
    pub rideable_type: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub start_station: Option<String>,
    pub end_station: Option<String>,
}

impl Trip {
    pub fn new(ride_id: &str, rider: RiderType, started_at: DateTime<Utc>, length: Duration) -> Self {
        Self {
            ride_id: ride_id.to_string(),
            rider,
            rideable_type: "classic_bike".to_string(),
            started_at,
            ended_at: started_at + length,
            start_station: Some("Clark St & Elm St".to_string()),
            end_station: Some("Wells St & Concord Ln".to_string()),
        }
    }

    pub fn rideable(mut self, value: &str) -> Self {
        self.rideable_type = value.to_string();
        self
    }

    pub fn start_station(mut self, name: Option<&str>) -> Self {
        self.start_station = name.map(str::to_string);
        self
    }

    pub fn end_station(mut self, name: Option<&str>) -> Self {
        self.end_station = name.map(str::to_string);
        self
    }
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .expect("valid timestamp")
}

pub fn raw_frame(trips: &[Trip]) -> DataFrame {
    let mut columns = TripColumns::default();
    for trip in trips {
        columns.ride_id.push(trip.ride_id.clone());
        columns.rideable_type.push(trip.rideable_type.clone());
        columns.started_at.push(trip.started_at.timestamp_micros());
        columns.ended_at.push(trip.ended_at.timestamp_micros());
        columns.start_station_name.push(trip.start_station.clone());
        columns.end_station_name.push(trip.end_station.clone());
        columns.start_lat.push(Some(41.9));
        columns.start_lng.push(Some(-87.63));
        columns.end_lat.push(None);
        columns.end_lng.push(None);
        columns.member_casual.push(trip.rider);
    }
    trip_dataframe(columns).expect("build raw trip frame")
}

/// Cleaned fact table in UTC.
pub fn fact_frame(trips: &[Trip]) -> DataFrame {
    clean_trips(&raw_frame(trips), Tz::UTC)
        .expect("clean trips")
        .dataframe
}

pub fn str_values(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    df.column(column)
        .expect("column present")
        .str()
        .expect("string column")
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

pub fn i64_values(df: &DataFrame, column: &str) -> Vec<Option<i64>> {
    df.column(column)
        .expect("column present")
        .cast(&DataType::Int64)
        .expect("integer column")
        .i64()
        .expect("i64 column")
        .into_iter()
        .collect()
}

pub fn f64_values(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
    df.column(column)
        .expect("column present")
        .f64()
        .expect("f64 column")
        .into_iter()
        .collect()
}

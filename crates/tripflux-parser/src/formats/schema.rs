pub const RIDE_ID: &str = "ride_id";
pub const RIDEABLE_TYPE: &str = "rideable_type";
pub const STARTED_AT: &str = "started_at";
pub const ENDED_AT: &str = "ended_at";
pub const START_STATION_NAME: &str = "start_station_name";
pub const END_STATION_NAME: &str = "end_station_name";
pub const START_LAT: &str = "start_lat";
pub const START_LNG: &str = "start_lng";
pub const END_LAT: &str = "end_lat";
pub const END_LNG: &str = "end_lng";
pub const MEMBER_CASUAL: &str = "member_casual";

/// Canonical raw trip columns, in frame order.
pub const RAW_TRIP_COLUMNS: [&str; 11] = [
    RIDE_ID,
    RIDEABLE_TYPE,
    STARTED_AT,
    ENDED_AT,
    START_STATION_NAME,
    END_STATION_NAME,
    START_LAT,
    START_LNG,
    END_LAT,
    END_LNG,
    MEMBER_CASUAL,
];

/// Rideable type recorded for exports that predate the `rideable_type` column.
pub const LEGACY_RIDEABLE_TYPE: &str = "docked_bike";

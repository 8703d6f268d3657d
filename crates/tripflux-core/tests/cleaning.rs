mod common;

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use polars::prelude::*;
use tripflux_core::calendar::epoch_days;
use tripflux_core::cleaning::{clean_trips, ride_length_hours, ride_length_minutes, TripChecks};
use tripflux_core::schema::*;
use tripflux_parser::RiderType;

use common::{i64_values, raw_frame, str_values, utc, Trip};

#[test]
fn durations_truncate_toward_zero() {
    let start = utc(2025, 1, 1, 10, 0, 0).timestamp_micros();
    let minute = 60_000_000;
    assert_eq!(ride_length_minutes(start, start + 30_000_000), 0);
    assert_eq!(ride_length_minutes(start, start + 2 * minute - 1), 1);
    assert_eq!(ride_length_minutes(start, start + 179_000_000), 2);
    assert_eq!(ride_length_minutes(start, start - 90_000_000), -1);
    assert_eq!(ride_length_hours(start, start + 24 * 60 * minute - 1), 23);
    assert_eq!(ride_length_hours(start, start + 24 * 60 * minute), 24);
}

#[test]
fn hour_check_is_independent_of_minute_count() {
    let start = utc(2025, 1, 1, 10, 0, 0).timestamp_micros();
    let almost_a_day = Duration::hours(24) - Duration::seconds(1);
    let just_over_a_day = Duration::hours(24) + Duration::seconds(30);

    let kept = TripChecks::evaluate(start, start + almost_a_day.num_microseconds().unwrap());
    assert!(kept.is_valid());
    assert_eq!(
        ride_length_minutes(start, start + almost_a_day.num_microseconds().unwrap()),
        1439
    );

    let dropped = TripChecks::evaluate(start, start + just_over_a_day.num_microseconds().unwrap());
    assert!(dropped.too_long);
    assert!(!dropped.too_short);
}

#[test]
fn thirty_second_trip_is_excluded() -> PolarsResult<()> {
    let raw = raw_frame(&[Trip::new(
        "short",
        RiderType::Casual,
        utc(2025, 1, 1, 10, 0, 0),
        Duration::seconds(30),
    )]);

    let result = clean_trips(&raw, Tz::UTC)?;

    assert_eq!(result.dataframe.height(), 0);
    assert_eq!(result.summary.dropped_too_short, 1);
    Ok(())
}

#[test]
fn twenty_five_hour_trip_is_excluded() -> PolarsResult<()> {
    let raw = raw_frame(&[Trip::new(
        "lost",
        RiderType::Member,
        utc(2025, 1, 1, 10, 0, 0),
        Duration::hours(25),
    )]);

    let result = clean_trips(&raw, Tz::UTC)?;

    assert_eq!(result.dataframe.height(), 0);
    assert_eq!(result.summary.dropped_too_long, 1);
    Ok(())
}

#[test]
fn validity_predicates_are_applied_together() -> PolarsResult<()> {
    let start = utc(2025, 3, 3, 9, 0, 0);
    let raw = raw_frame(&[
        Trip::new("backwards", RiderType::Member, start, Duration::minutes(-5)),
        Trip::new("zero", RiderType::Member, start, Duration::zero()),
        Trip::new("one_minute", RiderType::Member, start, Duration::seconds(119)),
        Trip::new("two_minutes", RiderType::Member, start, Duration::minutes(2)),
        Trip::new("long_day", RiderType::Casual, start, Duration::hours(24) - Duration::seconds(1)),
        Trip::new("full_day", RiderType::Casual, start, Duration::hours(24)),
    ]);

    let result = clean_trips(&raw, Tz::UTC)?;

    let ids: Vec<String> = str_values(&result.dataframe, RIDE_ID)
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(ids, ["two_minutes", "long_day"]);
    assert_eq!(i64_values(&result.dataframe, RIDE_LENGTH_MINUTES), [Some(2), Some(1439)]);

    let summary = result.summary;
    assert_eq!(summary.input_rows, 6);
    assert_eq!(summary.retained_rows, 2);
    assert_eq!(summary.dropped_rows, 4);
    // backwards and zero-length trips also fail the minute check
    assert_eq!(summary.dropped_non_positive_duration, 2);
    assert_eq!(summary.dropped_too_short, 3);
    assert_eq!(summary.dropped_too_long, 1);
    Ok(())
}

#[test]
fn every_retained_row_satisfies_the_invariants() -> PolarsResult<()> {
    let start = utc(2025, 5, 20, 6, 0, 0);
    let trips: Vec<Trip> = (-3..=30)
        .map(|step| {
            Trip::new(
                &format!("trip-{step}"),
                RiderType::Member,
                start,
                Duration::seconds(step * 3_037),
            )
        })
        .collect();

    let result = clean_trips(&raw_frame(&trips), Tz::UTC)?;
    let fact = &result.dataframe;
    assert!(fact.height() > 0);

    let started = fact.column(STARTED_AT)?.datetime()?;
    let ended = fact.column(ENDED_AT)?.datetime()?;
    let minutes = fact.column(RIDE_LENGTH_MINUTES)?.i64()?;
    for idx in 0..fact.height() {
        let (start, end) = (started.get(idx).unwrap(), ended.get(idx).unwrap());
        assert!(end > start);
        assert!(minutes.get(idx).unwrap() > 1);
        assert!(ride_length_hours(start, end) < 24);
    }
    Ok(())
}

#[test]
fn derived_calendar_columns_in_utc() -> PolarsResult<()> {
    let raw = raw_frame(&[Trip::new(
        "saturday",
        RiderType::Casual,
        utc(2025, 1, 4, 10, 15, 0),
        Duration::minutes(20),
    )]);

    let fact = clean_trips(&raw, Tz::UTC)?.dataframe;

    let names: Vec<String> = fact
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let expected: Vec<&str> = RAW_TRIP_COLUMNS
        .iter()
        .chain(DERIVED_COLUMNS.iter())
        .copied()
        .collect();
    assert_eq!(names, expected);

    let date = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
    assert_eq!(fact.column(RIDE_DATE)?.date()?.get(0), Some(epoch_days(date)));
    assert_eq!(fact.column(RIDE_YEAR)?.i32()?.get(0), Some(2025));
    assert_eq!(fact.column(RIDE_MONTH)?.i32()?.get(0), Some(1));
    assert_eq!(fact.column(DAY_OF_WEEK)?.str()?.get(0), Some("Saturday"));
    assert_eq!(fact.column(START_HOUR)?.i32()?.get(0), Some(10));
    assert_eq!(fact.column(IS_WEEKEND)?.bool()?.get(0), Some(true));
    assert_eq!(fact.column(SEASON)?.str()?.get(0), Some("Winter"));
    Ok(())
}

#[test]
fn derived_calendar_columns_follow_configured_timezone() -> PolarsResult<()> {
    // 03:00 UTC on a Saturday is still Friday evening in Chicago.
    let raw = raw_frame(&[Trip::new(
        "late",
        RiderType::Member,
        utc(2025, 1, 4, 3, 0, 0),
        Duration::minutes(15),
    )]);

    let fact = clean_trips(&raw, chrono_tz::America::Chicago)?.dataframe;

    assert_eq!(fact.column(DAY_OF_WEEK)?.str()?.get(0), Some("Friday"));
    assert_eq!(fact.column(START_HOUR)?.i32()?.get(0), Some(21));
    assert_eq!(fact.column(IS_WEEKEND)?.bool()?.get(0), Some(false));
    let date = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
    assert_eq!(fact.column(RIDE_DATE)?.date()?.get(0), Some(epoch_days(date)));
    Ok(())
}

#[test]
fn dockless_trip_is_retained() -> PolarsResult<()> {
    let raw = raw_frame(&[Trip::new(
        "dockless",
        RiderType::Casual,
        utc(2025, 7, 1, 17, 0, 0),
        Duration::minutes(9),
    )
    .rideable("electric_bike")
    .start_station(None)
    .end_station(None)]);

    let fact = clean_trips(&raw, Tz::UTC)?.dataframe;

    assert_eq!(fact.height(), 1);
    assert_eq!(str_values(&fact, START_STATION_NAME), vec![None::<String>]);
    assert_eq!(str_values(&fact, END_STATION_NAME), vec![None::<String>]);
    assert_eq!(str_values(&fact, SEASON), [Some("Summer".to_string())]);
    Ok(())
}

#[test]
fn duplicate_ride_ids_both_pass_cleaning() -> PolarsResult<()> {
    let raw = raw_frame(&[
        Trip::new("dup", RiderType::Member, utc(2025, 2, 2, 8, 0, 0), Duration::minutes(7)),
        Trip::new("dup", RiderType::Member, utc(2025, 2, 2, 8, 0, 0), Duration::minutes(7)),
    ]);

    let result = clean_trips(&raw, Tz::UTC)?;

    assert_eq!(result.dataframe.height(), 2);
    assert_eq!(result.summary.dropped_rows, 0);
    Ok(())
}

#[test]
fn null_timestamp_is_an_error_not_a_drop() -> PolarsResult<()> {
    let mut raw = raw_frame(&[
        Trip::new("a", RiderType::Member, utc(2025, 3, 3, 8, 0, 0), Duration::minutes(12)),
        Trip::new("b", RiderType::Casual, utc(2025, 3, 3, 9, 0, 0), Duration::minutes(20)),
    ]);
    let ended = Series::new(ENDED_AT.into(), [Some(0i64), None])
        .cast(&utc_datetime())?;
    raw.with_column(ended)?;

    let err = clean_trips(&raw, Tz::UTC).expect_err("null ended_at is not a cleaning drop");
    assert!(err.to_string().contains("ended_at"));
    Ok(())
}

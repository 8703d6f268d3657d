use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

/// Northern-Hemisphere meteorological seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Fall),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn weekday_from_name(name: &str) -> Option<Weekday> {
    WEEKDAYS
        .into_iter()
        .find(|day| weekday_name(*day).eq_ignore_ascii_case(name.trim()))
}

/// 1 = Sunday .. 7 = Saturday.
pub fn dow_sunday_first(day: Weekday) -> i32 {
    day.num_days_from_sunday() as i32 + 1
}

/// 1 = Monday .. 7 = Sunday (ISO numbering).
pub fn dow_monday_first(day: Weekday) -> i32 {
    day.number_from_monday() as i32
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Calendar decomposition of a trip start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarParts {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub weekday: Weekday,
    pub hour: u32,
}

impl CalendarParts {
    pub fn from_micros(micros: i64, tz: Tz) -> Option<Self> {
        let local = DateTime::from_timestamp_micros(micros)?.with_timezone(&tz);
        let date = local.date_naive();
        Some(Self {
            date,
            year: date.year(),
            month: date.month(),
            weekday: date.weekday(),
            hour: local.hour(),
        })
    }

    pub fn season(&self) -> Option<Season> {
        Season::from_month(self.month)
    }
}

/// Zero-padded `YYYY-MM` key.
pub fn year_month_key(year: i32, month: i32) -> String {
    format!("{year:04}-{month:02}")
}

/// Days since the Unix epoch, the physical representation of a polars `Date`.
pub fn epoch_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

use std::collections::{BTreeSet, HashMap};

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::calendar;
use crate::cleaning::{
    ride_length_hours, MAX_RIDE_HOURS_EXCLUSIVE, MIN_RIDE_MINUTES_EXCLUSIVE,
};
use crate::schema::*;

pub const EXPECTED_MONTHS: usize = 12;
const MAX_REPORTED_DUPLICATES: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct MonthCoverage {
    pub distinct_months: usize,
    pub expected_months: usize,
    /// `YYYY-MM` keys present in the fact table, ascending.
    pub months: Vec<String>,
}

impl MonthCoverage {
    pub fn is_complete(&self) -> bool {
        self.distinct_months == self.expected_months
    }
}

/// Rows that should have been removed by cleaning. All counts are expected to be zero.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BoundaryLeakage {
    pub non_positive_duration: usize,
    pub too_short: usize,
    pub too_long: usize,
}

impl BoundaryLeakage {
    pub fn total(&self) -> usize {
        self.non_positive_duration + self.too_short + self.too_long
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRideId {
    pub ride_id: String,
    pub occurrences: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateIds {
    /// Number of distinct ride ids that appear more than once.
    pub duplicated_ids: usize,
    /// Rows beyond the first for every duplicated id.
    pub surplus_rows: usize,
    /// Most frequent offenders first, capped for reporting.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<DuplicateRideId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub row_count: usize,
    pub month_coverage: MonthCoverage,
    pub boundary_leakage: BoundaryLeakage,
    pub duplicate_ids: DuplicateIds,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.month_coverage.is_complete()
            && self.boundary_leakage.total() == 0
            && self.duplicate_ids.duplicated_ids == 0
    }

    /// Human-readable diagnostics; empty when every check passes.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.month_coverage.is_complete() {
            warnings.push(format!(
                "fact table covers {} distinct months, expected {}",
                self.month_coverage.distinct_months, self.month_coverage.expected_months
            ));
        }
        let leakage = &self.boundary_leakage;
        if leakage.total() > 0 {
            warnings.push(format!(
                "cleaning filter leaked rows: {} non-positive duration, {} too short, {} too long",
                leakage.non_positive_duration, leakage.too_short, leakage.too_long
            ));
        }
        if self.duplicate_ids.duplicated_ids > 0 {
            warnings.push(format!(
                "{} ride ids appear more than once ({} surplus rows)",
                self.duplicate_ids.duplicated_ids, self.duplicate_ids.surplus_rows
            ));
        }
        warnings
    }
}

/// Read-only diagnostics over the fact table. Nothing here aborts the run; findings are
/// logged and returned for the caller to surface.
pub fn validate_trips(trips: &DataFrame) -> PolarsResult<ValidationReport> {
    let report = ValidationReport {
        row_count: trips.height(),
        month_coverage: month_coverage(trips)?,
        boundary_leakage: boundary_leakage(trips)?,
        duplicate_ids: duplicate_ids(trips)?,
    };

    if report.boundary_leakage.total() > 0 {
        warn!(
            non_positive_duration = report.boundary_leakage.non_positive_duration,
            too_short = report.boundary_leakage.too_short,
            too_long = report.boundary_leakage.too_long,
            "fact table contains rows the cleaning filter should have removed"
        );
    }
    if !report.month_coverage.is_complete() {
        warn!(
            distinct_months = report.month_coverage.distinct_months,
            expected_months = report.month_coverage.expected_months,
            "unexpected month coverage"
        );
    }
    if report.duplicate_ids.duplicated_ids > 0 {
        warn!(
            duplicated_ids = report.duplicate_ids.duplicated_ids,
            surplus_rows = report.duplicate_ids.surplus_rows,
            "duplicate ride ids present"
        );
    }
    if report.is_clean() {
        info!(rows = report.row_count, "fact table passed validation");
    }

    Ok(report)
}

pub fn month_coverage(trips: &DataFrame) -> PolarsResult<MonthCoverage> {
    let years = trips.column(RIDE_YEAR)?.i32()?;
    let months = trips.column(RIDE_MONTH)?.i32()?;

    let mut seen: BTreeSet<(i32, i32)> = BTreeSet::new();
    for idx in 0..trips.height() {
        if let (Some(year), Some(month)) = (years.get(idx), months.get(idx)) {
            seen.insert((year, month));
        }
    }

    Ok(MonthCoverage {
        distinct_months: seen.len(),
        expected_months: EXPECTED_MONTHS,
        months: seen
            .into_iter()
            .map(|(year, month)| calendar::year_month_key(year, month))
            .collect(),
    })
}

pub fn boundary_leakage(trips: &DataFrame) -> PolarsResult<BoundaryLeakage> {
    let started = utc_micros(trips, STARTED_AT)?;
    let started = started.datetime()?;
    let ended = utc_micros(trips, ENDED_AT)?;
    let ended = ended.datetime()?;
    let minutes = trips.column(RIDE_LENGTH_MINUTES)?.i64()?;

    let mut leakage = BoundaryLeakage::default();
    for idx in 0..trips.height() {
        if let (Some(start), Some(end)) = (started.get(idx), ended.get(idx)) {
            if end <= start {
                leakage.non_positive_duration += 1;
            }
            if ride_length_hours(start, end) >= MAX_RIDE_HOURS_EXCLUSIVE {
                leakage.too_long += 1;
            }
        }
        if let Some(length) = minutes.get(idx) {
            if length <= MIN_RIDE_MINUTES_EXCLUSIVE {
                leakage.too_short += 1;
            }
        }
    }

    Ok(leakage)
}

pub fn duplicate_ids(trips: &DataFrame) -> PolarsResult<DuplicateIds> {
    let ride_ids = trips.column(RIDE_ID)?.str()?;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for ride_id in ride_ids.into_iter().flatten() {
        *counts.entry(ride_id).or_insert(0) += 1;
    }

    let mut duplicates: Vec<DuplicateRideId> = counts
        .into_iter()
        .filter(|(_, occurrences)| *occurrences > 1)
        .map(|(ride_id, occurrences)| DuplicateRideId {
            ride_id: ride_id.to_string(),
            occurrences,
        })
        .collect();
    duplicates.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.ride_id.cmp(&b.ride_id))
    });

    let duplicated_ids = duplicates.len();
    let surplus_rows = duplicates.iter().map(|dup| dup.occurrences - 1).sum();
    duplicates.truncate(MAX_REPORTED_DUPLICATES);

    Ok(DuplicateIds {
        duplicated_ids,
        surplus_rows,
        examples: duplicates,
    })
}

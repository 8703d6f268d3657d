use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderType {
    Casual,
    Member,
}

impl RiderType {
    pub const ALL: [RiderType; 2] = [RiderType::Casual, RiderType::Member];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiderType::Casual => "casual",
            RiderType::Member => "member",
        }
    }
}

impl fmt::Display for RiderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RiderType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(RiderType::Member),
            "casual" => Ok(RiderType::Casual),
            other => Err(format!("unknown rider type '{other}'")),
        }
    }
}

/// Bike category. The stored `rideable_type` value is kept verbatim; anything that is not a
/// classic or electric bike (docked bikes, scooters) classifies as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideableType {
    ClassicBike,
    ElectricBike,
    Other,
}

impl RideableType {
    pub fn classify(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "classic_bike" => RideableType::ClassicBike,
            "electric_bike" => RideableType::ElectricBike,
            _ => RideableType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RideableType::ClassicBike => "classic_bike",
            RideableType::ElectricBike => "electric_bike",
            RideableType::Other => "other",
        }
    }
}

impl fmt::Display for RideableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw export file normalised to the canonical trip columns.
#[derive(Debug, Clone)]
pub struct ParsedTripFile {
    /// Name of the parser that recognised the file.
    pub format: &'static str,
    pub df: DataFrame,
}

impl ParsedTripFile {
    pub fn row_count(&self) -> usize {
        self.df.height()
    }
}

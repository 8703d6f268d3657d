pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{FormatAttempt, ParserError};
pub use formats::schema::RAW_TRIP_COLUMNS;
pub use formats::TripColumns;
pub use model::{ParsedTripFile, RideableType, RiderType};
pub use registry::{parse_trip_file, parse_with_parsers, trip_formats, TripParser};

/// Builds a canonical raw trip frame from already-collected columns.
pub fn trip_dataframe(columns: TripColumns) -> Result<polars::prelude::DataFrame, ParserError> {
    formats::build_trip_dataframe("COLUMNS", columns)
}

mod common;
mod current_export;
mod legacy_export;
pub mod schema;

pub use common::TripColumns;
pub use current_export::CurrentExportParser;
pub use legacy_export::LegacyExportParser;

pub(crate) use common::build_trip_dataframe;

use crate::errors::ParserError;
use crate::model::{ParsedTripFile, RiderType};
use crate::registry::TripParser;

use super::common::{
    build_trip_dataframe, field, normalize_header, optional_text, parse_required_text,
    parse_timestamp, HeaderIndex, TripColumns,
};
use super::schema::LEGACY_RIDEABLE_TYPE;

const TRIP_ID: &str = "trip_id";
const START_TIME: &str = "start_time";
const END_TIME: &str = "end_time";
const FROM_STATION_NAME: &str = "from_station_name";
const TO_STATION_NAME: &str = "to_station_name";
const USERTYPE: &str = "usertype";

/// Older quarterly exports (`trip_id`, `usertype` = Subscriber/Customer, no rideable type or
/// coordinates).
pub struct LegacyExportParser;

impl Default for LegacyExportParser {
    fn default() -> Self {
        Self
    }
}

impl LegacyExportParser {
    const NAME: &'static str = "LEGACY_EXPORT";

    fn reader_builder() -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder.has_headers(true).flexible(false);
        builder
    }

    /// One quarter was published with descriptive headers; fold them onto the short names.
    fn canonical_header(name: &str) -> String {
        let normalized = normalize_header(name);
        let alias = match normalized.as_str() {
            "01 - rental details rental id" => TRIP_ID,
            "01 - rental details local start time" => START_TIME,
            "01 - rental details local end time" => END_TIME,
            "03 - rental start station name" => FROM_STATION_NAME,
            "02 - rental end station name" => TO_STATION_NAME,
            "user type" => USERTYPE,
            _ => return normalized,
        };
        alias.to_string()
    }

    fn rider_type(value: &str, line_index: usize) -> Result<RiderType, ParserError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "subscriber" => Ok(RiderType::Member),
            "customer" => Ok(RiderType::Casual),
            other => Err(ParserError::DataRow {
                parser: Self::NAME,
                line_index,
                message: format!("{USERTYPE}: unknown user type '{other}'"),
            }),
        }
    }

    fn parse_with_builder(
        &self,
        builder: csv::ReaderBuilder,
        content: &str,
    ) -> Result<ParsedTripFile, ParserError> {
        let mut reader = builder.from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?
            .clone();
        let index = HeaderIndex::new(&headers, Self::canonical_header);
        index.require(
            Self::NAME,
            &[
                TRIP_ID,
                START_TIME,
                END_TIME,
                FROM_STATION_NAME,
                TO_STATION_NAME,
                USERTYPE,
            ],
        )?;

        let trip_id = index.get(TRIP_ID);
        let start_time = index.get(START_TIME);
        let end_time = index.get(END_TIME);
        let from_station = index.get(FROM_STATION_NAME);
        let to_station = index.get(TO_STATION_NAME);
        let usertype = index.get(USERTYPE);

        let mut columns = TripColumns::default();

        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            let line_index = row_idx + 2;

            columns.ride_id.push(parse_required_text(
                Self::NAME,
                field(&record, trip_id),
                line_index,
                TRIP_ID,
            )?);
            columns.rideable_type.push(LEGACY_RIDEABLE_TYPE.to_string());
            columns.started_at.push(parse_timestamp(
                Self::NAME,
                field(&record, start_time),
                line_index,
                START_TIME,
            )?);
            columns.ended_at.push(parse_timestamp(
                Self::NAME,
                field(&record, end_time),
                line_index,
                END_TIME,
            )?);
            columns
                .start_station_name
                .push(optional_text(field(&record, from_station)));
            columns
                .end_station_name
                .push(optional_text(field(&record, to_station)));
            columns.start_lat.push(None);
            columns.start_lng.push(None);
            columns.end_lat.push(None);
            columns.end_lng.push(None);
            columns
                .member_casual
                .push(Self::rider_type(field(&record, usertype), line_index)?);
        }

        if columns.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let df = build_trip_dataframe(Self::NAME, columns)?;

        Ok(ParsedTripFile {
            format: Self::NAME,
            df,
        })
    }
}

impl TripParser for LegacyExportParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedTripFile, ParserError> {
        self.parse_with_builder(Self::reader_builder(), content)
    }
}

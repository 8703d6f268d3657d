use crate::errors::ParserError;
use crate::model::ParsedTripFile;
use crate::registry::TripParser;

use super::common::{
    build_trip_dataframe, field, normalize_header, optional_text, parse_optional_f64,
    parse_required_text, parse_rider_type, parse_timestamp, HeaderIndex, TripColumns,
};
use super::schema::*;

/// Trip exports with one row per ride and `member_casual`/`rideable_type` columns.
pub struct CurrentExportParser;

impl Default for CurrentExportParser {
    fn default() -> Self {
        Self
    }
}

impl CurrentExportParser {
    const NAME: &'static str = "CURRENT_EXPORT";

    fn reader_builder() -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder.has_headers(true).flexible(false);
        builder
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
        let index = HeaderIndex::new(&headers, normalize_header);
        index.require(Self::NAME, &RAW_TRIP_COLUMNS)?;

        let ride_id = index.get(RIDE_ID);
        let rideable_type = index.get(RIDEABLE_TYPE);
        let started_at = index.get(STARTED_AT);
        let ended_at = index.get(ENDED_AT);
        let start_station = index.get(START_STATION_NAME);
        let end_station = index.get(END_STATION_NAME);
        let start_lat = index.get(START_LAT);
        let start_lng = index.get(START_LNG);
        let end_lat = index.get(END_LAT);
        let end_lng = index.get(END_LNG);
        let member_casual = index.get(MEMBER_CASUAL);

        let mut columns = TripColumns::default();

        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            // header occupies line 1
            let line_index = row_idx + 2;

            columns.ride_id.push(parse_required_text(
                Self::NAME,
                field(&record, ride_id),
                line_index,
                RIDE_ID,
            )?);
            columns.rideable_type.push(parse_required_text(
                Self::NAME,
                field(&record, rideable_type),
                line_index,
                RIDEABLE_TYPE,
            )?);
            columns.started_at.push(parse_timestamp(
                Self::NAME,
                field(&record, started_at),
                line_index,
                STARTED_AT,
            )?);
            columns.ended_at.push(parse_timestamp(
                Self::NAME,
                field(&record, ended_at),
                line_index,
                ENDED_AT,
            )?);
            columns
                .start_station_name
                .push(optional_text(field(&record, start_station)));
            columns
                .end_station_name
                .push(optional_text(field(&record, end_station)));
            columns.start_lat.push(parse_optional_f64(
                Self::NAME,
                field(&record, start_lat),
                line_index,
                START_LAT,
            )?);
            columns.start_lng.push(parse_optional_f64(
                Self::NAME,
                field(&record, start_lng),
                line_index,
                START_LNG,
            )?);
            columns.end_lat.push(parse_optional_f64(
                Self::NAME,
                field(&record, end_lat),
                line_index,
                END_LAT,
            )?);
            columns.end_lng.push(parse_optional_f64(
                Self::NAME,
                field(&record, end_lng),
                line_index,
                END_LNG,
            )?);
            columns.member_casual.push(parse_rider_type(
                Self::NAME,
                field(&record, member_casual),
                line_index,
            )?);
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

impl TripParser for CurrentExportParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedTripFile, ParserError> {
        self.parse_with_builder(Self::reader_builder(), content)
    }
}

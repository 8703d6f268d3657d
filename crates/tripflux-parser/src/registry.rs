use crate::errors::{FormatAttempt, ParserError};
use crate::formats::{CurrentExportParser, LegacyExportParser};
use crate::model::ParsedTripFile;

/// A raw trip export layout.
pub trait TripParser: Sync {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<ParsedTripFile, ParserError>;
}

static CURRENT_EXPORT: CurrentExportParser = CurrentExportParser;
static LEGACY_EXPORT: LegacyExportParser = LegacyExportParser;

/// Known export layouts, newest first.
pub fn trip_formats() -> [&'static dyn TripParser; 2] {
    [&CURRENT_EXPORT, &LEGACY_EXPORT]
}

pub fn parse_trip_file(content: &str) -> Result<ParsedTripFile, ParserError> {
    parse_with_parsers(content, &trip_formats())
}

/// Tries each parser in turn. Only a header mismatch moves on to the next parser; a file that
/// matches a layout but has a bad row is reported against that layout.
pub fn parse_with_parsers(
    content: &str,
    parsers: &[&dyn TripParser],
) -> Result<ParsedTripFile, ParserError> {
    let mut attempts = Vec::with_capacity(parsers.len());

    for parser in parsers {
        match parser.parse(content) {
            Ok(parsed) => return Ok(parsed),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(FormatAttempt::new(parser.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingParser { attempts })
}

use std::fmt;

use thiserror::Error;

/// One format that was tried against a file and rejected it.
#[derive(Debug, Clone)]
pub struct FormatAttempt {
    pub parser: &'static str,
    pub message: String,
}

impl FormatAttempt {
    pub fn new(parser: &'static str, message: impl Into<String>) -> Self {
        Self {
            parser,
            message: message.into(),
        }
    }
}

impl fmt::Display for FormatAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rejected the header ({})", self.parser, self.message)
    }
}

fn list_attempts(attempts: &[FormatAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ParserError {
    /// The header does not belong to this export format. The registry moves on to the next one.
    #[error("{parser}: not this export format: {reason}")]
    FormatMismatch {
        parser: &'static str,
        reason: String,
    },

    #[error("{parser}: unreadable CSV: {source}")]
    Csv {
        parser: &'static str,
        #[source]
        source: csv::Error,
    },

    /// `line_index` is the 1-based line in the file, header included.
    #[error("{parser}: line {line_index}: {message}")]
    DataRow {
        parser: &'static str,
        line_index: usize,
        message: String,
    },

    #[error("{parser}: could not assemble trip columns: {message}")]
    Frame {
        parser: &'static str,
        message: String,
    },

    #[error("{parser}: export has a header but no trips")]
    EmptyData { parser: &'static str },

    #[error("no known trip export format matched: {}", list_attempts(.attempts))]
    NoMatchingParser { attempts: Vec<FormatAttempt> },
}

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::window::TripWindow;

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub window: TripWindow,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// IANA zone used when deriving dates, hours and weekdays from `started_at`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl CalendarConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| PipelineError::Config(format!("unknown timezone '{}'", self.timezone)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputConfig {
    /// Glob patterns; matches are read in sorted order.
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            format: OutputFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "parquet" => Ok(OutputFormat::Parquet),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unsupported output format '{other}'")),
        }
    }
}

impl PipelineConfig {
    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.window.check()?;
        self.calendar.tz()?;
        Ok(())
    }
}

pub fn parse_config(toml_str: &str) -> Result<PipelineConfig> {
    let config = toml::from_str::<PipelineConfig>(toml_str)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        PipelineError::Config(format!("failed to read {}: {err}", path.display()))
    })?;
    parse_config(&contents)
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("out")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parse_config_defaults() {
        let toml = r#"
[window]
start = "2024-11-01T00:00:00Z"
end = "2025-11-01T00:00:00Z"
"#;

        let config = parse_config(toml).expect("parse config");
        assert_eq!(
            config.window.start,
            Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(config.calendar.timezone, "UTC");
        assert!(config.input.paths.is_empty());
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert_eq!(config.output.format, OutputFormat::Parquet);
    }

    #[test]
    fn parse_config_full() {
        let toml = r#"
[window]
start = "2024-11-01T00:00:00-05:00"
end = "2025-11-01T00:00:00-05:00"

[calendar]
timezone = "America/Chicago"

[input]
paths = ["data/raw/*.csv", "data/extra/*.parquet"]

[output]
directory = "reports"
format = "csv"
"#;

        let config = parse_config(toml).expect("parse config");
        assert_eq!(
            config.window.start,
            Utc.with_ymd_and_hms(2024, 11, 1, 5, 0, 0).unwrap()
        );
        assert_eq!(config.calendar.tz().unwrap(), chrono_tz::America::Chicago);
        assert_eq!(config.input.paths.len(), 2);
        assert_eq!(config.output.format, OutputFormat::Csv);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let toml = r#"
[window]
start = "2025-11-01T00:00:00Z"
end = "2024-11-01T00:00:00Z"
"#;
        let err = parse_config(toml).expect_err("window must be ordered");
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let toml = r#"
[window]
start = "2024-11-01T00:00:00Z"
end = "2025-11-01T00:00:00Z"

[calendar]
timezone = "Mars/Olympus_Mons"
"#;
        let err = parse_config(toml).expect_err("timezone must exist");
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("CSV".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }
}

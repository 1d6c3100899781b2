//! Reader for plain-text detection configuration files.
//!
//! # File Format
//!
//! ```text
//! # Cold pulse detection configuration
//! kind: bot
//! reference_depth: 25
//! threshold: climatology      # or a number
//! longitude: 166.45
//! latitude: -22.3
//! candidate_strategy: threshold
//! min_duration: 3
//! max_duration_minutes: 2880
//! min_drop: 0.01              # or off
//! min_stsi: off
//! bottom_logger_filter: true
//! baseline_window_days: 60
//! right_max_window: 60
//! ```
//!
//! Everything after `#` is a comment. Keys not present keep their defaults.
//! `threshold: climatology` without `longitude`/`latitude` uses the station
//! position read from the data files.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use super::detection_config::{CandidateStrategy, DetectionConfig, DurationLimit, ThresholdSource};
use crate::error::DetectionError;
use crate::types::PulseKind;

/// Error type for configuration file parsing.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed line or value
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Key not recognised
    #[error("Unknown key '{key}' at line {line}")]
    UnknownKey { line: usize, key: String },

    /// Values parse but do not form a valid configuration
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] DetectionError),
}

/// Read a configuration file.
pub fn read_config_file(path: &Path) -> Result<DetectionConfig, ConfigFileError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse configuration from a string.
pub fn parse_config(content: &str) -> Result<DetectionConfig, ConfigFileError> {
    let mut config = DetectionConfig::default();
    let mut use_climatology = false;
    let mut longitude: Option<f64> = None;
    let mut latitude: Option<f64> = None;

    for (line_num, raw) in content.lines().enumerate() {
        let line_no = line_num + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = line.split_once(':').ok_or_else(|| ConfigFileError::ParseError {
            line: line_no,
            message: "Expected 'key: value'".into(),
        })?;
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "kind" => {
                config.kind = PulseKind::from_str(value).map_err(|e| ConfigFileError::ParseError {
                    line: line_no,
                    message: e.to_string(),
                })?;
            }
            "reference_depth" => config.reference_depth = Some(parse_number(value, line_no)?),
            "threshold" => {
                if value.eq_ignore_ascii_case("climatology") {
                    use_climatology = true;
                } else {
                    use_climatology = false;
                    config.threshold = ThresholdSource::Fixed(parse_number(value, line_no)?);
                }
            }
            "longitude" => longitude = Some(parse_number(value, line_no)?),
            "latitude" => latitude = Some(parse_number(value, line_no)?),
            "candidate_strategy" => {
                config.candidate_strategy = match value.to_lowercase().as_str() {
                    "threshold" => CandidateStrategy::Threshold,
                    "baseline_anomaly" | "baseline" => CandidateStrategy::BaselineAnomaly,
                    _ => {
                        return Err(ConfigFileError::ParseError {
                            line: line_no,
                            message: format!(
                                "Unknown candidate strategy '{}', expected 'threshold' or 'baseline_anomaly'",
                                value
                            ),
                        })
                    }
                };
            }
            "min_duration" => {
                config.min_duration =
                    optional(value, line_no, parse_count)?.map(DurationLimit::Samples);
            }
            "min_duration_minutes" => {
                config.min_duration =
                    optional(value, line_no, parse_number)?.map(DurationLimit::Minutes);
            }
            "max_duration" => {
                config.max_duration =
                    optional(value, line_no, parse_count)?.map(DurationLimit::Samples);
            }
            "max_duration_minutes" => {
                config.max_duration =
                    optional(value, line_no, parse_number)?.map(DurationLimit::Minutes);
            }
            "min_drop" => config.min_drop = optional(value, line_no, parse_number)?,
            "min_stsi" => config.min_stsi = optional(value, line_no, parse_number)?,
            "bottom_logger_filter" => config.bottom_logger_filter = parse_bool(value, line_no)?,
            "baseline_window_days" => config.baseline_window_days = parse_count(value, line_no)?,
            "right_max_window" => config.right_max_window = parse_count(value, line_no)?,
            _ => {
                return Err(ConfigFileError::UnknownKey {
                    line: line_no,
                    key,
                })
            }
        }
    }

    if use_climatology {
        let position = match (longitude, latitude) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            (None, None) => None,
            _ => {
                return Err(ConfigFileError::Invalid(DetectionError::InvalidConfiguration(
                    "longitude and latitude must be given together".to_string(),
                )))
            }
        };
        config.threshold = ThresholdSource::Climatology { position };
    }

    config.validate()?;
    Ok(config)
}

fn parse_number(value: &str, line: usize) -> Result<f64, ConfigFileError> {
    value.parse().map_err(|_| ConfigFileError::ParseError {
        line,
        message: format!("Invalid number '{}'", value),
    })
}

fn parse_count(value: &str, line: usize) -> Result<usize, ConfigFileError> {
    value.parse().map_err(|_| ConfigFileError::ParseError {
        line,
        message: format!("Invalid count '{}'", value),
    })
}

fn parse_bool(value: &str, line: usize) -> Result<bool, ConfigFileError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigFileError::ParseError {
            line,
            message: format!("Invalid boolean '{}'", value),
        }),
    }
}

/// `off` / `none` disables the setting.
fn optional<T>(
    value: &str,
    line: usize,
    parse: fn(&str, usize) -> Result<T, ConfigFileError>,
) -> Result<Option<T>, ConfigFileError> {
    if value.eq_ignore_ascii_case("off") || value.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse(value, line).map(Some)
    }
}

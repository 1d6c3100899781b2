//! Detection configuration.
//!
//! [`DetectionConfig`] is built once per run, through
//! [`DetectionConfigBuilder`] or from a `key: value` text file with
//! [`read_config_file`], and validated before any detection stage sees it.

mod config_file;
mod detection_config;

pub use config_file::{parse_config, read_config_file, ConfigFileError};
pub use detection_config::{
    CandidateStrategy, DetectionConfig, DetectionConfigBuilder, DurationLimit, EndCriteria,
    StartCriteria, ThresholdSource,
};

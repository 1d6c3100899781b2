//! # coldpulse-rs
//!
//! Detection of upwelling-induced cold pulses in multi-depth seawater
//! temperature records.
//!
//! This crate provides the building blocks of the detection pipeline:
//! - Temperature grid representation (depth × time, NaN for missing)
//! - Thermal stratification index φ and its rolling baseline
//! - Adaptive threshold from a reference ocean climatology
//! - Candidate extraction, filtering, start/end refinement
//! - Merging and splitting into pulses and subpulses
//! - Pulse metrics (degree cooling hours, drop, minimum temperature)
//! - Station CSV ingestion and CSV/NetCDF result output
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use coldpulse_rs::io::{read_station_directory, write_detection_tables};
//! use coldpulse_rs::{DetectionConfig, LogProgress, PulseDetector, PulseKind};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let grid = read_station_directory(Path::new("data/BOU"))?;
//! let config = DetectionConfig::builder()
//!     .with_kind(PulseKind::Bot)
//!     .with_fixed_threshold(-0.05)
//!     .build()?;
//!
//! let output = PulseDetector::new(config)
//!     .with_observer(LogProgress::new("BOU"))
//!     .run(&grid, None)?;
//! write_detection_tables(Path::new("results"), "BOU_bot", &output)?;
//! # Ok(())
//! # }
//! ```

pub mod climatology;
pub mod config;
pub mod detection;
pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod io;
pub mod metrics;
pub mod stratification;
pub mod types;

// Re-export main types for convenience
pub use climatology::{ClimatologySource, ReferenceClimatology, ThresholdEstimate};
pub use config::{
    CandidateStrategy, DetectionConfig, DetectionConfigBuilder, DurationLimit, EndCriteria,
    StartCriteria, ThresholdSource,
};
pub use detection::{IntervalSet, PulseDetector};
pub use diagnostics::{LogProgress, ProgressObserver, Stage};
pub use error::{DetectionError, DetectionResult};
pub use grid::{StationInfo, TemperatureGrid};
pub use metrics::{DetectionOutput, PulseRecord, PulseSeries, SubpulseRecord};
pub use stratification::{baseline_tsi, compute_tsi};
pub use types::{DepthIndex, PulseKind};

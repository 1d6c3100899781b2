//! Event metrics and the detection result bundle.

mod output;
mod records;

pub use output::DetectionOutput;
pub use records::{compute_metrics, subpulse_metrics, PulseRecord, PulseSeries, SubpulseRecord};

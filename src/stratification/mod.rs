//! Stratification indices.
//!
//! - [`compute_tsi`]: instantaneous depth-weighted stratification index φ
//! - [`baseline_tsi`]: rolling seasonal/diurnal baseline of φ (rTSI), used by
//!   the baseline-anomaly candidate strategy

mod baseline;
mod tsi;

pub use baseline::{baseline_tsi, ENVELOPE_WINDOW};
pub use tsi::{compute_tsi, tsi_from_profile};

//! Reference climatology and the adaptive detection threshold.
//!
//! The threshold on φ is `mean − std` of φ computed on a long-term
//! monthly-mean reference profile taken at the nearest valid cell of a
//! gridded ocean reanalysis and interpolated onto the station depths.
//!
//! The core only needs something implementing [`ClimatologySource`]; the
//! in-memory [`ReferenceClimatology`] implements it directly, and the
//! `netcdf` feature adds a reader producing one from a file.

mod reference;
mod threshold;

pub use reference::{
    haversine_km, ClimatologySource, ReferenceClimatology, ReferenceProfile, EARTH_RADIUS_KM,
    LOW_CONFIDENCE_DISTANCE_KM,
};
pub use threshold::{climatology_threshold, nan_mean_std, ThresholdEstimate};

//! Temperature grid representation.
//!
//! A station record is a depth × time array of temperatures sharing a single
//! time axis. Missing readings are stored as NaN; before detection any
//! column with a missing reading is blanked entirely so that every stage sees
//! either a full water-column profile or nothing.

mod temperature_grid;

pub use temperature_grid::{StationInfo, TemperatureGrid};

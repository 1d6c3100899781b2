//! Multi-depth temperature record on a common time axis.

use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{DetectionError, DetectionResult};
use crate::types::DepthIndex;

/// Station metadata attached to a grid.
#[derive(Clone, Debug, PartialEq)]
pub struct StationInfo {
    /// Location identifier (first field of the station file names)
    pub location_id: String,
    /// Longitude in degrees east
    pub longitude: f64,
    /// Latitude in degrees north
    pub latitude: f64,
}

impl StationInfo {
    /// Create station metadata.
    pub fn new(location_id: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            location_id: location_id.into(),
            longitude,
            latitude,
        }
    }
}

/// Temperatures indexed by depth (rows) and time (columns).
///
/// Depths are positive down and unique; they may be stored in either order.
/// Times are strictly increasing. The grid is never mutated once built:
/// cleaning steps such as [`propagate_missing`](Self::propagate_missing)
/// return a new grid.
#[derive(Clone, Debug)]
pub struct TemperatureGrid {
    depths: Vec<f64>,
    times: Vec<DateTime<Utc>>,
    values: Array2<f64>,
    station: Option<StationInfo>,
}

impl TemperatureGrid {
    /// Build a grid from depth levels, timestamps and a depth × time array.
    ///
    /// # Errors
    /// - `InsufficientData` for fewer than two depths or two timesteps
    /// - `InvalidConfiguration` for a shape mismatch, non-finite or duplicated
    ///   depths, or timestamps that are not strictly increasing
    pub fn new(
        depths: Vec<f64>,
        times: Vec<DateTime<Utc>>,
        values: Array2<f64>,
    ) -> DetectionResult<Self> {
        if depths.len() < 2 {
            return Err(DetectionError::InsufficientData(format!(
                "at least two depth series are required, got {}",
                depths.len()
            )));
        }
        if times.len() < 2 {
            return Err(DetectionError::InsufficientData(format!(
                "at least two timesteps are required, got {}",
                times.len()
            )));
        }
        if values.dim() != (depths.len(), times.len()) {
            return Err(DetectionError::InvalidConfiguration(format!(
                "temperature array has shape {:?}, expected ({}, {})",
                values.dim(),
                depths.len(),
                times.len()
            )));
        }
        if let Some(d) = depths.iter().find(|d| !d.is_finite()) {
            return Err(DetectionError::InvalidConfiguration(format!(
                "depth {} is not finite",
                d
            )));
        }
        for (i, a) in depths.iter().enumerate() {
            if depths[i + 1..].iter().any(|b| b == a) {
                return Err(DetectionError::InvalidConfiguration(format!(
                    "depth {} m appears more than once",
                    a
                )));
            }
        }
        for i in 1..times.len() {
            if times[i] <= times[i - 1] {
                return Err(DetectionError::InvalidConfiguration(format!(
                    "timestamps must be strictly increasing (index {})",
                    i
                )));
            }
        }

        Ok(Self {
            depths,
            times,
            values,
            station: None,
        })
    }

    /// Attach station metadata.
    pub fn with_station(mut self, station: StationInfo) -> Self {
        self.station = Some(station);
        self
    }

    /// Station metadata, if known.
    pub fn station(&self) -> Option<&StationInfo> {
        self.station.as_ref()
    }

    /// Number of depth levels.
    pub fn n_depths(&self) -> usize {
        self.depths.len()
    }

    /// Number of timesteps.
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Depth levels (m, positive down).
    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    /// Timestamps.
    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    /// Full depth × time array.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Temperature series at one depth.
    pub fn row(&self, depth: DepthIndex) -> ArrayView1<'_, f64> {
        self.values.row(depth.get())
    }

    /// Sampling interval in seconds, taken from the first two timestamps.
    pub fn dt_seconds(&self) -> f64 {
        (self.times[1] - self.times[0]).num_milliseconds() as f64 / 1000.0
    }

    /// Timestamps as seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> Vec<f64> {
        self.times
            .iter()
            .map(|t| t.timestamp_millis() as f64 / 1000.0)
            .collect()
    }

    /// Row holding the deepest sensor.
    pub fn deepest(&self) -> DepthIndex {
        let mut best = 0;
        for (i, &d) in self.depths.iter().enumerate() {
            if d > self.depths[best] {
                best = i;
            }
        }
        DepthIndex::new(best)
    }

    /// Row holding the shallowest sensor.
    pub fn shallowest(&self) -> DepthIndex {
        let mut best = 0;
        for (i, &d) in self.depths.iter().enumerate() {
            if d < self.depths[best] {
                best = i;
            }
        }
        DepthIndex::new(best)
    }

    /// Row index of an exact depth value.
    ///
    /// # Errors
    /// `InvalidConfiguration` if the depth is not one of the grid levels.
    pub fn depth_index(&self, depth: f64) -> DetectionResult<DepthIndex> {
        self.depths
            .iter()
            .position(|&d| (d - depth).abs() < 1e-9)
            .map(DepthIndex::new)
            .ok_or_else(|| {
                DetectionError::InvalidConfiguration(format!(
                    "reference depth {} m is not one of the grid depths {:?}",
                    depth, self.depths
                ))
            })
    }

    /// Column minimum per timestep (NaN for fully-missing columns).
    pub fn column_min(&self) -> Vec<f64> {
        self.column_fold(f64::INFINITY, f64::min)
    }

    /// Column maximum per timestep (NaN for fully-missing columns).
    pub fn column_max(&self) -> Vec<f64> {
        self.column_fold(f64::NEG_INFINITY, f64::max)
    }

    fn column_fold(&self, init: f64, f: fn(f64, f64) -> f64) -> Vec<f64> {
        self.values
            .axis_iter(Axis(1))
            .map(|col| {
                let mut acc = init;
                let mut seen = false;
                for &v in col.iter().filter(|v| !v.is_nan()) {
                    acc = f(acc, v);
                    seen = true;
                }
                if seen { acc } else { f64::NAN }
            })
            .collect()
    }

    /// Whether each column has at least one missing reading.
    pub fn missing_columns(&self) -> Vec<bool> {
        self.values
            .axis_iter(Axis(1))
            .map(|col| col.iter().any(|v| v.is_nan()))
            .collect()
    }

    /// Derived grid where every column with a missing reading is entirely NaN.
    pub fn propagate_missing(&self) -> Self {
        let mut values = self.values.clone();
        for (t, missing) in self.missing_columns().into_iter().enumerate() {
            if missing {
                values.column_mut(t).fill(f64::NAN);
            }
        }
        self.with_values(values)
    }

    /// Verify that every column is either complete or entirely missing.
    ///
    /// # Errors
    /// `InvariantViolation` naming the first partially-missing column.
    pub fn check_missing_columns(&self) -> DetectionResult<()> {
        for (t, col) in self.values.axis_iter(Axis(1)).enumerate() {
            let n_nan = col.iter().filter(|v| v.is_nan()).count();
            if n_nan != 0 && n_nan != col.len() {
                return Err(DetectionError::InvariantViolation(format!(
                    "column {} is partially missing after NaN propagation",
                    t
                )));
            }
        }
        Ok(())
    }

    /// Same coordinates, different values.
    fn with_values(&self, values: Array2<f64>) -> Self {
        Self {
            depths: self.depths.clone(),
            times: self.times.clone(),
            values,
            station: self.station.clone(),
        }
    }
}

//! NetCDF I/O for detection runs.
//!
//! - **Writer**: CF-style export of the temperature grid, φ and the annotated
//!   pulse series
//! - **Reader**: monthly reference climatology (e.g. a global reanalysis
//!   subset) used for the climatology threshold
//!
//! # CF-Conventions
//!
//! Output time is encoded as "seconds since 1970-01-01 00:00:00" and missing
//! values use the standard `_FillValue`.
//!
//! # Example
//!
//! ```rust,ignore
//! use coldpulse_rs::io::{write_detection_netcdf, NetCDFClimatology, NetCDFWriterConfig};
//!
//! let climatology = NetCDFClimatology::open("reference_temperature.nc")?;
//! let output = detector.run(&grid, Some(&climatology))?;
//!
//! let config = NetCDFWriterConfig::new("station_pulses.nc").with_title("Station BOU");
//! write_detection_netcdf(&config, &output)?;
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};
use ndarray::Array4;
use thiserror::Error;

use crate::climatology::{ClimatologySource, ReferenceClimatology, ReferenceProfile};
use crate::error::{DetectionError, DetectionResult};
use crate::metrics::DetectionOutput;

/// Error type for NetCDF operations.
#[derive(Debug, Error)]
pub enum NetCDFError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// NetCDF library error
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Missing variable
    #[error("Missing variable: {0}")]
    MissingVariable(String),
}

impl From<NetCDFError> for DetectionError {
    fn from(err: NetCDFError) -> Self {
        DetectionError::ResourceUnavailable(err.to_string())
    }
}

/// Fill value for missing data (CF-conventions standard).
pub const FILL_VALUE_F64: f64 = 9.96920996838687e+36;

/// Check if a value is valid (not a fill value).
#[inline]
pub fn is_valid_f64(v: f64) -> bool {
    v.is_finite() && v.abs() < 1.0e+30
}

/// Temperatures above this are taken to be in kelvin.
const KELVIN_DETECTION_LIMIT: f64 = 100.0;
const KELVIN_OFFSET: f64 = 273.15;

// ============================================================================
// NetCDF Writer
// ============================================================================

/// Configuration for NetCDF output.
#[derive(Debug, Clone)]
pub struct NetCDFWriterConfig {
    /// Output file path
    pub path: PathBuf,
    /// Title attribute (CF-conventions)
    pub title: Option<String>,
    /// Institution attribute
    pub institution: Option<String>,
    /// Source attribute
    pub source: Option<String>,
    /// Comment attribute
    pub comment: Option<String>,
}

impl NetCDFWriterConfig {
    /// Create a new configuration with the given output path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            title: None,
            institution: None,
            source: Some("coldpulse-rs".to_string()),
            comment: None,
        }
    }

    /// Set the title attribute.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the institution attribute.
    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    /// Set the comment attribute.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

fn to_fill(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values
        .into_iter()
        .map(|v| if v.is_finite() { v } else { FILL_VALUE_F64 })
        .collect()
}

/// Write the grid and derived series of a detection run.
///
/// Dimensions are `time` and `depth`; variables are `temperature(depth, time)`,
/// `phi`, `dch`, `pulse_temperature`, `drop` and `min_temperature` over `time`.
pub fn write_detection_netcdf(
    config: &NetCDFWriterConfig,
    output: &DetectionOutput,
) -> Result<(), NetCDFError> {
    let grid = &output.grid;
    let n_times = grid.n_times();
    let mut file = netcdf::create(&config.path)?;

    file.add_dimension("time", n_times)?;
    file.add_dimension("depth", grid.n_depths())?;

    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("standard_name", "time")?;
        time_var.put_attribute("units", "seconds since 1970-01-01 00:00:00")?;
        time_var.put_attribute("calendar", "standard")?;
        time_var.put_values(&grid.epoch_seconds(), ..)?;
    }

    {
        let mut depth_var = file.add_variable::<f64>("depth", &["depth"])?;
        depth_var.put_attribute("standard_name", "depth")?;
        depth_var.put_attribute("units", "m")?;
        depth_var.put_attribute("positive", "down")?;
        depth_var.put_values(grid.depths(), ..)?;
    }

    {
        let flat = to_fill(grid.values().iter().copied());
        let mut temp_var = file.add_variable::<f64>("temperature", &["depth", "time"])?;
        temp_var.put_attribute("standard_name", "sea_water_temperature")?;
        temp_var.put_attribute("units", "degC")?;
        temp_var.put_attribute("_FillValue", FILL_VALUE_F64)?;
        temp_var.put_values(&flat, ..)?;
    }

    let series = &output.series;
    let derived: [(&str, &str, &str, &[f64]); 5] = [
        ("phi", "thermal stratification index", "degC m", &output.phi),
        ("dch", "degree cooling hours", "degC h", &series.dch),
        (
            "pulse_temperature",
            "reference temperature during pulses",
            "degC",
            &series.pulse_temperature,
        ),
        ("drop", "subpulse temperature drop", "degC", &series.drop),
        (
            "min_temperature",
            "subpulse minimum temperature",
            "degC",
            &series.min_temperature,
        ),
    ];
    for (name, long_name, units, values) in derived {
        if values.len() != n_times {
            return Err(NetCDFError::InvalidData(format!(
                "{} has {} values for {} timesteps",
                name,
                values.len(),
                n_times
            )));
        }
        let mut var = file.add_variable::<f64>(name, &["time"])?;
        var.put_attribute("long_name", long_name)?;
        var.put_attribute("units", units)?;
        var.put_attribute("_FillValue", FILL_VALUE_F64)?;
        var.put_values(&to_fill(values.iter().copied()), ..)?;
    }

    file.add_attribute("Conventions", "CF-1.8")?;
    file.add_attribute("featureType", "timeSeriesProfile")?;
    file.add_attribute("pulse_kind", output.kind.as_str())?;
    file.add_attribute("reference_depth", output.reference_depth())?;
    if let Some(threshold) = &output.threshold {
        file.add_attribute("threshold", threshold.value)?;
    }
    if let Some(station) = grid.station() {
        file.add_attribute("location_id", station.location_id.as_str())?;
        file.add_attribute("longitude", station.longitude)?;
        file.add_attribute("latitude", station.latitude)?;
    }

    if let Some(ref title) = config.title {
        file.add_attribute("title", title.as_str())?;
    }
    if let Some(ref institution) = config.institution {
        file.add_attribute("institution", institution.as_str())?;
    }
    if let Some(ref source) = config.source {
        file.add_attribute("source", source.as_str())?;
    }
    if let Some(ref comment) = config.comment {
        file.add_attribute("comment", comment.as_str())?;
    }

    let now = Utc::now();
    file.add_attribute(
        "history",
        format!("{}: Created by coldpulse-rs", now.format("%Y-%m-%d %H:%M:%S UTC")).as_str(),
    )?;

    info!("Wrote {} timesteps to {}", n_times, config.path.display());
    Ok(())
}

// ============================================================================
// NetCDF Reader for Reference Climatology
// ============================================================================

/// Read a coordinate variable trying several common names.
fn read_coord(file: &netcdf::File, names: &[&str]) -> Result<Vec<f64>, NetCDFError> {
    for name in names {
        if let Some(var) = file.variable(name) {
            return Ok(var.get_values::<f64, _>(..)?);
        }
    }
    Err(NetCDFError::MissingVariable(names.join("/")))
}

/// Get f64 attribute value.
fn get_attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Short(s) => Some(s as f64),
            _ => None,
        })
}

/// Get string attribute value.
fn get_attr_str(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}

/// Read and unpack the temperature variable, replacing fill values by NaN.
fn read_temperature(file: &netcdf::File) -> Result<(Vec<f64>, Vec<usize>, Option<String>), NetCDFError> {
    let names = ["temperature", "temp", "thetao", "sea_water_temperature", "t_an"];
    for name in names {
        let Some(var) = file.variable(name) else {
            continue;
        };
        let scale = get_attr_f64(&var, "scale_factor").unwrap_or(1.0);
        let offset = get_attr_f64(&var, "add_offset").unwrap_or(0.0);
        let fill = get_attr_f64(&var, "_FillValue")
            .or_else(|| get_attr_f64(&var, "missing_value"));
        let units = get_attr_str(&var, "units");
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let raw: Vec<f64> = var.get_values::<f64, _>(..)?;
        let data = raw
            .into_iter()
            .map(|v| {
                if !is_valid_f64(v) || fill.is_some_and(|f| v == f) {
                    f64::NAN
                } else {
                    v * scale + offset
                }
            })
            .collect();
        debug!("Read temperature variable '{}' with shape {:?}", name, shape);
        return Ok((data, shape, units));
    }
    Err(NetCDFError::MissingVariable(names.join("/")))
}

/// Whether temperatures need converting from kelvin.
fn is_kelvin(units: Option<&str>, data: &[f64]) -> bool {
    match units {
        Some(u) if u.eq_ignore_ascii_case("k") || u.eq_ignore_ascii_case("kelvin") => true,
        Some(u) if u.to_ascii_lowercase().contains("deg") || u.eq_ignore_ascii_case("c") => false,
        _ => {
            let finite: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
            !finite.is_empty()
                && finite.iter().sum::<f64>() / finite.len() as f64 > KELVIN_DETECTION_LIMIT
        }
    }
}

/// Load a reference climatology from a NetCDF file.
///
/// Expects coordinates `lon`/`longitude`, `lat`/`latitude`,
/// `level`/`depth`/`lev` and temperature laid out as
/// (time, level, lat, lon), or (level, lat, lon) for a single record.
/// Temperatures in kelvin are converted to °C; longitudes below zero are
/// shifted into 0–360.
pub fn read_climatology(path: impl AsRef<Path>) -> Result<ReferenceClimatology, NetCDFError> {
    let file = netcdf::open(path.as_ref())?;

    let mut longitudes = read_coord(&file, &["lon", "longitude", "nav_lon"])?;
    for lon in longitudes.iter_mut() {
        if *lon < 0.0 {
            *lon += 360.0;
        }
    }
    let latitudes = read_coord(&file, &["lat", "latitude", "nav_lat"])?;
    let levels = read_coord(&file, &["level", "depth", "lev", "deptht"])?;

    let (mut data, shape, units) = read_temperature(&file)?;
    let dims = match shape.as_slice() {
        &[nt, nz, ny, nx] => (nt, nz, ny, nx),
        &[nz, ny, nx] => (1, nz, ny, nx),
        other => {
            return Err(NetCDFError::InvalidData(format!(
                "temperature has {} dimensions, expected 3 or 4",
                other.len()
            )))
        }
    };

    if is_kelvin(units.as_deref(), &data) {
        debug!("Converting reference temperature from kelvin");
        for v in data.iter_mut() {
            *v -= KELVIN_OFFSET;
        }
    }

    let temperature = Array4::from_shape_vec(dims, data)
        .map_err(|e| NetCDFError::InvalidData(e.to_string()))?;

    info!(
        "Loaded climatology {}: {} times, {} levels, {}×{} cells",
        path.as_ref().display(),
        dims.0,
        dims.1,
        dims.2,
        dims.3
    );

    ReferenceClimatology::new(longitudes, latitudes, levels, temperature)
        .map_err(|e| NetCDFError::InvalidData(e.to_string()))
}

/// Climatology source backed by a NetCDF file.
#[derive(Clone, Debug)]
pub struct NetCDFClimatology {
    path: PathBuf,
    climatology: ReferenceClimatology,
}

impl NetCDFClimatology {
    /// Open and load a climatology file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, NetCDFError> {
        let path = path.into();
        let climatology = read_climatology(&path)?;
        Ok(Self { path, climatology })
    }

    /// Source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loaded climatology.
    pub fn climatology(&self) -> &ReferenceClimatology {
        &self.climatology
    }
}

impl ClimatologySource for NetCDFClimatology {
    fn nearest_profile(
        &self,
        longitude: f64,
        latitude: f64,
        max_depth: f64,
    ) -> DetectionResult<ReferenceProfile> {
        self.climatology.nearest_profile(longitude, latitude, max_depth)
    }
}

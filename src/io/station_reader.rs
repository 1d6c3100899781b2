//! Reader for multi-depth station temperature records.
//!
//! A station is a directory holding one CSV file per logger depth. The file
//! name carries the station metadata:
//!
//! ```text
//! <locationID>_<longitude>_<latitude>_<depth>_.csv
//! ```
//!
//! Each file has two columns, timestamp and temperature (°C). A header row is
//! optional and lines starting with `#` are skipped:
//!
//! ```text
//! time,temperature
//! 2019-01-01T00:00:00Z,24.31
//! 2019-01-01 00:10:00,24.29
//! 2019-01-01T00:20:00+00:00,
//! ```
//!
//! Empty temperature fields are read as missing (NaN).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use ndarray::Array2;
use thiserror::Error;

use crate::error::DetectionError;
use crate::grid::{StationInfo, TemperatureGrid};

/// Error type for station file operations.
#[derive(Debug, Error)]
pub enum StationFileError {
    /// IO error reading file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Parse error in file content
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// File name does not follow `locationID_lon_lat_depth_.csv`
    #[error("Invalid station file name '{0}'")]
    FileName(String),

    /// Not enough depth files in a station directory
    #[error("Station directory needs at least 2 CSV files, found {0}")]
    TooFewFiles(usize),

    /// No data records, or series without a common time span
    #[error("Empty data: {0}")]
    Empty(String),

    /// The assembled grid was rejected
    #[error("Invalid grid: {0}")]
    Grid(#[from] DetectionError),
}

impl From<StationFileError> for DetectionError {
    fn from(err: StationFileError) -> Self {
        match err {
            StationFileError::Grid(inner) => inner,
            StationFileError::TooFewFiles(_) | StationFileError::Empty(_) => {
                DetectionError::InsufficientData(err.to_string())
            }
            other => DetectionError::ResourceUnavailable(other.to_string()),
        }
    }
}

/// Metadata encoded in a station file name.
#[derive(Clone, Debug, PartialEq)]
pub struct StationFileName {
    /// Station identifier (may itself contain underscores)
    pub location_id: String,
    /// Longitude (degrees east)
    pub longitude: f64,
    /// Latitude (degrees north)
    pub latitude: f64,
    /// Logger depth (m)
    pub depth: f64,
}

/// One depth series read from a station file.
#[derive(Clone, Debug)]
pub struct StationSeries {
    /// Metadata from the file name
    pub meta: StationFileName,
    /// Sorted, unique timestamps
    pub times: Vec<DateTime<Utc>>,
    /// Temperature (°C), NaN where missing
    pub values: Vec<f64>,
}

impl StationSeries {
    /// Median sampling interval in seconds.
    pub fn median_interval(&self) -> Option<f64> {
        let mut steps: Vec<f64> = self
            .times
            .windows(2)
            .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
            .collect();
        if steps.is_empty() {
            return None;
        }
        steps.sort_by(|a, b| a.total_cmp(b));
        Some(steps[steps.len() / 2])
    }
}

/// Parse `locationID_lon_lat_depth_.csv` (the trailing underscore is optional).
pub fn parse_station_file_name(file_name: &str) -> Result<StationFileName, StationFileError> {
    let bad = || StationFileError::FileName(file_name.to_string());
    let stem = file_name
        .strip_suffix(".csv")
        .or_else(|| file_name.strip_suffix(".CSV"))
        .ok_or_else(bad)?;
    let stem = stem.strip_suffix('_').unwrap_or(stem);

    let mut parts = stem.rsplitn(4, '_');
    let depth = parts.next().and_then(|s| s.parse::<f64>().ok()).ok_or_else(bad)?;
    let latitude = parts.next().and_then(|s| s.parse::<f64>().ok()).ok_or_else(bad)?;
    let longitude = parts.next().and_then(|s| s.parse::<f64>().ok()).ok_or_else(bad)?;
    let location_id = parts.next().filter(|s| !s.is_empty()).ok_or_else(bad)?;

    Ok(StationFileName {
        location_id: location_id.to_string(),
        longitude,
        latitude,
        depth: depth.abs(),
    })
}

/// Parse a timestamp in RFC 3339 or `YYYY-MM-DD HH:MM:SS` form (UTC assumed).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(format!("Unable to parse timestamp: {}", s))
}

/// Parse the two-column body of a station file.
///
/// Duplicated timestamps keep their first record; the result is sorted.
pub fn parse_station_csv(
    content: &str,
) -> Result<(Vec<DateTime<Utc>>, Vec<f64>), StationFileError> {
    let mut records: Vec<(DateTime<Utc>, f64)> = Vec::new();
    let mut seen_data = false;

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split([',', ';', '\t']);
        let time_field = fields.next().unwrap_or_default();
        let value_field = fields.next().map(str::trim).unwrap_or_default();

        let time = match parse_timestamp(time_field) {
            Ok(t) => t,
            // First non-comment line may be a header
            Err(_) if !seen_data => {
                seen_data = true;
                continue;
            }
            Err(message) => {
                return Err(StationFileError::ParseError {
                    line: line_num + 1,
                    message,
                })
            }
        };
        seen_data = true;

        let value = if value_field.is_empty() {
            f64::NAN
        } else {
            value_field
                .parse::<f64>()
                .map_err(|e| StationFileError::ParseError {
                    line: line_num + 1,
                    message: format!("temperature '{}': {}", value_field, e),
                })?
        };
        records.push((time, value));
    }

    if records.is_empty() {
        return Err(StationFileError::Empty("no data records".to_string()));
    }

    // Stable sort keeps file order among equal timestamps
    records.sort_by_key(|&(t, _)| t);
    records.dedup_by_key(|&mut (t, _)| t);

    Ok(records.into_iter().unzip())
}

/// Read a single station file.
pub fn read_station_file(path: &Path) -> Result<StationSeries, StationFileError> {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let meta = parse_station_file_name(&file_name)?;
    let content = fs::read_to_string(path)?;
    let (times, values) = parse_station_csv(&content)?;
    debug!(
        "Read {} records at {} m from {}",
        times.len(),
        meta.depth,
        path.display()
    );
    Ok(StationSeries { meta, times, values })
}

/// Linear interpolation of a sorted series at `target` (NaN outside coverage).
fn interpolate_at(times: &[f64], values: &[f64], target: f64) -> f64 {
    let n = times.len();
    if n == 0 || target < times[0] || target > times[n - 1] {
        return f64::NAN;
    }
    let k = times.partition_point(|&t| t < target);
    if k < n && times[k] == target {
        return values[k];
    }
    let (t0, t1) = (times[k - 1], times[k]);
    let w = (target - t0) / (t1 - t0);
    values[k - 1] * (1.0 - w) + values[k] * w
}

/// Interpolate depth series onto a common regular time grid.
///
/// The grid runs from the latest series start to the earliest series end at
/// the largest median sampling interval.
pub fn assemble_grid(mut series: Vec<StationSeries>) -> Result<TemperatureGrid, StationFileError> {
    if series.len() < 2 {
        return Err(StationFileError::TooFewFiles(series.len()));
    }
    series.sort_by(|a, b| a.meta.depth.total_cmp(&b.meta.depth));

    let start = series
        .iter()
        .filter_map(|s| s.times.first().copied())
        .max()
        .ok_or_else(|| StationFileError::Empty("no timestamps".to_string()))?;
    let end = series
        .iter()
        .filter_map(|s| s.times.last().copied())
        .min()
        .ok_or_else(|| StationFileError::Empty("no timestamps".to_string()))?;
    let dt = series
        .iter()
        .filter_map(StationSeries::median_interval)
        .fold(0.0_f64, f64::max);

    if end <= start || dt <= 0.0 {
        return Err(StationFileError::Empty(format!(
            "depth series do not overlap in time ({} to {})",
            start, end
        )));
    }

    let step = chrono::Duration::milliseconds((dt * 1000.0).round() as i64);
    let mut times = Vec::new();
    let mut t = start;
    while t <= end {
        times.push(t);
        t += step;
    }

    let target: Vec<f64> = times
        .iter()
        .map(|t| t.timestamp_millis() as f64 / 1000.0)
        .collect();
    let mut values = Array2::from_elem((series.len(), times.len()), f64::NAN);
    for (d, s) in series.iter().enumerate() {
        let secs: Vec<f64> = s
            .times
            .iter()
            .map(|t| t.timestamp_millis() as f64 / 1000.0)
            .collect();
        for (i, &x) in target.iter().enumerate() {
            values[[d, i]] = interpolate_at(&secs, &s.values, x);
        }
    }

    let first = &series[0].meta;
    let station = StationInfo::new(first.location_id.clone(), first.longitude, first.latitude);
    let depths = series.iter().map(|s| s.meta.depth).collect();

    debug!(
        "Assembled {} depths × {} samples (dt = {} s) for {}",
        series.len(),
        times.len(),
        dt,
        station.location_id
    );

    Ok(TemperatureGrid::new(depths, times, values)?.with_station(station))
}

/// Read every `.csv` file in a station directory into a temperature grid.
///
/// Files that cannot be read are skipped with a warning.
pub fn read_station_directory(dir: &Path) -> Result<TemperatureGrid, StationFileError> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext.to_string_lossy().eq_ignore_ascii_case("csv") {
                    paths.push(path);
                }
            }
        }
    }
    paths.sort();

    if paths.len() < 2 {
        return Err(StationFileError::TooFewFiles(paths.len()));
    }

    let mut series = Vec::with_capacity(paths.len());
    for path in &paths {
        match read_station_file(path) {
            Ok(s) => series.push(s),
            Err(e) => warn!("Failed to read {}: {}", path.display(), e),
        }
    }

    assemble_grid(series)
}

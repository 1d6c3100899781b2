//! Rolling seasonal/diurnal baseline of the stratification index (rTSI).
//!
//! The baseline is built per contiguous run of complete hourly data:
//!
//! 1. hourly medians per depth
//! 2. an hour-of-day composite (day × 24) per depth
//! 3. a centered rolling median over `window_days` rows of the composite
//! 4. φ of the resulting baseline profile
//! 5. envelope smoothing: positive part of a trailing rolling max plus
//!    negative part of a trailing rolling min
//!
//! and finally interpolated back onto the native timestamps.

use log::debug;
use ndarray::{s, Array2};

use super::tsi::tsi_from_profile;
use crate::error::{DetectionError, DetectionResult};
use crate::grid::TemperatureGrid;

/// Width of the trailing window used for envelope smoothing.
pub const ENVELOPE_WINDOW: usize = 3;

const HOURS_PER_DAY: usize = 24;
const SECONDS_PER_HOUR: i64 = 3600;

/// Baseline φ (rTSI) on the native time axis of `grid`.
///
/// Runs of complete hourly data shorter than `window_days` days stay NaN.
///
/// # Errors
/// - `InvalidConfiguration` if `window_days` is zero
/// - `InsufficientData` if no run is long enough to fill a rolling window
pub fn baseline_tsi(grid: &TemperatureGrid, window_days: usize) -> DetectionResult<Vec<f64>> {
    if window_days == 0 {
        return Err(DetectionError::InvalidConfiguration(
            "baseline window must be at least one day".to_string(),
        ));
    }

    let hourly = HourlyMedians::from_grid(grid);
    let missing: Vec<bool> = (0..hourly.n_hours())
        .map(|h| hourly.values.column(h).iter().any(|v| v.is_nan()))
        .collect();

    let mut baseline = vec![f64::NAN; hourly.n_hours()];
    let mut processed = 0usize;

    for (start, end) in complete_runs(&missing) {
        let len = end - start;
        let n_days = len.div_ceil(HOURS_PER_DAY);
        if n_days < window_days {
            debug!(
                "Skipping {}-hour run at hour {}: shorter than the {}-day baseline window",
                len, start, window_days
            );
            continue;
        }

        let mut profile = Array2::from_elem((grid.n_depths(), len), f64::NAN);
        for d in 0..grid.n_depths() {
            let series = hourly.values.slice(s![d, start..end]).to_vec();
            let smoothed = rolling_composite(&series, window_days);
            for (dst, v) in profile.row_mut(d).iter_mut().zip(smoothed) {
                *dst = v;
            }
        }

        let phi = tsi_from_profile(profile.view(), grid.depths());
        let smoothed = envelope(&phi, ENVELOPE_WINDOW);
        baseline[start..end].copy_from_slice(&smoothed);
        processed += 1;
    }

    if processed == 0 {
        return Err(DetectionError::InsufficientData(format!(
            "no run of complete hourly data spans the {}-day baseline window",
            window_days
        )));
    }
    debug!("Baseline computed on {} complete run(s)", processed);

    Ok(hourly.interpolate_to(grid, &baseline))
}

/// Hourly median temperatures on an hour-aligned axis.
struct HourlyMedians {
    /// Epoch hour of the first bucket
    first_hour: i64,
    /// depth × hour
    values: Array2<f64>,
}

impl HourlyMedians {
    fn from_grid(grid: &TemperatureGrid) -> Self {
        let hours: Vec<i64> = grid
            .times()
            .iter()
            .map(|t| t.timestamp().div_euclid(SECONDS_PER_HOUR))
            .collect();
        let first_hour = hours[0];
        let n_hours = (hours[hours.len() - 1] - first_hour) as usize + 1;

        let mut values = Array2::from_elem((grid.n_depths(), n_hours), f64::NAN);
        let data = grid.values();
        for d in 0..grid.n_depths() {
            let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); n_hours];
            for (t, &h) in hours.iter().enumerate() {
                let v = data[[d, t]];
                if !v.is_nan() {
                    buckets[(h - first_hour) as usize].push(v);
                }
            }
            for (h, bucket) in buckets.iter_mut().enumerate() {
                values[[d, h]] = median(bucket);
            }
        }

        Self { first_hour, values }
    }

    fn n_hours(&self) -> usize {
        self.values.ncols()
    }

    /// Linear interpolation of an hourly series onto the grid's timestamps.
    /// NaN past the last hour or wherever a neighbour is NaN.
    fn interpolate_to(&self, grid: &TemperatureGrid, hourly: &[f64]) -> Vec<f64> {
        let origin = (self.first_hour * SECONDS_PER_HOUR) as f64;
        grid.times()
            .iter()
            .map(|t| {
                let pos = (t.timestamp_millis() as f64 / 1000.0 - origin) / SECONDS_PER_HOUR as f64;
                let k = pos.floor() as usize;
                let frac = pos - pos.floor();
                if k >= hourly.len() {
                    f64::NAN
                } else if frac == 0.0 {
                    hourly[k]
                } else if k + 1 >= hourly.len() {
                    f64::NAN
                } else {
                    hourly[k] * (1.0 - frac) + hourly[k + 1] * frac
                }
            })
            .collect()
    }
}

/// Median ignoring order; NaN for an empty slice.
fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Maximal runs `[start, end)` of `false` entries.
fn complete_runs(missing: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &m) in missing.iter().enumerate() {
        match (start, m) {
            (None, false) => start = Some(i),
            (Some(s), true) => {
                runs.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, missing.len()));
    }
    runs
}

/// Rolling hour-of-day median of one complete hourly series.
///
/// Returns a series of the same length. Requires at least `window_days`
/// composite rows; callers check this.
fn rolling_composite(series: &[f64], window_days: usize) -> Vec<f64> {
    let len = series.len();
    let n_days = len.div_ceil(HOURS_PER_DAY);

    // Composite columns start at the run's first hour of day. Cells past the
    // end of the run repeat the last observed value of their column.
    let mut composite = Array2::from_elem((n_days, HOURS_PER_DAY), f64::NAN);
    for j in 0..HOURS_PER_DAY {
        for i in 0..n_days {
            let idx = i * HOURS_PER_DAY + j;
            composite[[i, j]] = if idx < len {
                series[idx]
            } else if i > 0 {
                composite[[i - 1, j]]
            } else {
                series[len - 1]
            };
        }
    }

    let half = window_days / 2;
    let mut rolled = Array2::from_elem((n_days, HOURS_PER_DAY), f64::NAN);
    let mut window = Vec::with_capacity(window_days);
    for j in 0..HOURS_PER_DAY {
        for i in half..n_days {
            let lo = i - half;
            let hi = lo + window_days;
            if hi > n_days {
                break;
            }
            window.clear();
            window.extend(composite.slice(s![lo..hi, j]).iter().copied());
            rolled[[i, j]] = median(&mut window);
        }

        let mut column: Vec<f64> = rolled.column(j).to_vec();
        fill_edges_and_gaps(&mut column);
        for (i, v) in column.into_iter().enumerate() {
            rolled[[i, j]] = v;
        }
    }

    rolled.iter().take(len).copied().collect()
}

/// Copy the first/last finite values onto the ends, then linearly
/// interpolate interior NaN gaps. All-NaN input is left unchanged.
fn fill_edges_and_gaps(values: &mut [f64]) {
    let n = values.len();
    let (Some(first), Some(last)) = (
        values.iter().position(|v| !v.is_nan()),
        values.iter().rposition(|v| !v.is_nan()),
    ) else {
        return;
    };
    values[0] = values[first];
    values[n - 1] = values[last];

    let mut prev = 0;
    for i in 1..n {
        if values[i].is_nan() {
            continue;
        }
        if i > prev + 1 {
            let (a, b) = (values[prev], values[i]);
            let span = (i - prev) as f64;
            for k in prev + 1..i {
                values[k] = a + (b - a) * (k - prev) as f64 / span;
            }
        }
        prev = i;
    }
}

/// `max(rolling_max, 0) + min(rolling_min, 0)` over a trailing window.
/// Windows that are not full contribute 0.
fn envelope(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            if t + 1 < window {
                return 0.0;
            }
            let w = &values[t + 1 - window..=t];
            if w.iter().any(|v| v.is_nan()) {
                return 0.0;
            }
            let hi = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lo = w.iter().copied().fold(f64::INFINITY, f64::min);
            hi.max(0.0) + lo.min(0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn hourly_times(n: usize, step_minutes: i64) -> Vec<DateTime<Utc>> {
        let t0 = Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| t0 + Duration::minutes(step_minutes * i as i64)).collect()
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&mut []).is_nan());
    }

    #[test]
    fn test_complete_runs() {
        let missing = [false, false, true, true, false, true, false];
        assert_eq!(complete_runs(&missing), vec![(0, 2), (4, 5), (6, 7)]);
        assert!(complete_runs(&[true, true]).is_empty());
    }

    #[test]
    fn test_fill_edges_and_gaps() {
        let mut v = [f64::NAN, 1.0, f64::NAN, f64::NAN, 4.0, f64::NAN];
        fill_edges_and_gaps(&mut v);
        assert_eq!(v, [1.0, 1.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_envelope() {
        let phi = [-1.0, 2.0, -3.0, 1.0, 1.0, 1.0];
        let env = envelope(&phi, 3);
        assert_eq!(env[0], 0.0);
        assert_eq!(env[1], 0.0);
        assert_relative_eq!(env[2], 2.0 - 3.0);
        assert_relative_eq!(env[3], 2.0 - 3.0);
        assert_relative_eq!(env[4], 1.0 - 3.0);
        assert_relative_eq!(env[5], 1.0);
    }

    #[test]
    fn test_rolling_composite_constant_per_hour() {
        // Pure diurnal cycle: the rolling hour-of-day median reproduces it
        let series: Vec<f64> = (0..24 * 5).map(|h| (h % 24) as f64).collect();
        let rolled = rolling_composite(&series, 3);
        assert_eq!(rolled.len(), series.len());
        for (a, b) in rolled.iter().zip(&series) {
            assert_relative_eq!(*a, *b);
        }
    }

    #[test]
    fn test_baseline_of_steady_stratification() {
        // Constant two-layer profile: φ constant and negative everywhere
        let n = 24 * 4;
        let times = hourly_times(n, 60);
        let mut values = Array2::zeros((2, n));
        values.row_mut(0).fill(22.0);
        values.row_mut(1).fill(20.0);
        let grid = TemperatureGrid::new(vec![5.0, 25.0], times, values).unwrap();

        let r = baseline_tsi(&grid, 2).unwrap();
        assert_eq!(r.len(), n);
        // φ = ((1)·5 + (−1)·25) / 2 = −10; envelope is 0 on the first two hours
        assert_eq!(r[0], 0.0);
        assert_eq!(r[1], 0.0);
        for v in &r[2..] {
            assert_relative_eq!(*v, -10.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_baseline_interpolates_sub_hourly() {
        let n = 6 * 24 * 3;
        let times = hourly_times(n, 10);
        let mut values = Array2::zeros((2, n));
        values.row_mut(0).fill(22.0);
        values.row_mut(1).fill(20.0);
        let grid = TemperatureGrid::new(vec![5.0, 25.0], times, values).unwrap();

        let r = baseline_tsi(&grid, 1).unwrap();
        assert_eq!(r.len(), n);
        assert_relative_eq!(r[6 * 5 + 3], -10.0, epsilon = 1e-12);
        // Past the last hour stamp there is nothing to interpolate towards
        assert!(r[n - 1].is_nan());
    }

    #[test]
    fn test_short_record_is_insufficient() {
        let n = 24 * 2;
        let times = hourly_times(n, 60);
        let values = Array2::from_elem((2, n), 20.0);
        let grid = TemperatureGrid::new(vec![5.0, 25.0], times, values).unwrap();
        assert!(matches!(
            baseline_tsi(&grid, 60),
            Err(DetectionError::InsufficientData(_))
        ));
    }
}

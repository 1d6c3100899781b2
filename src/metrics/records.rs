//! Pulse and subpulse metrics.
//!
//! Per subpulse `[start, end)` of reference temperature `T`:
//!
//! - DCH = Σ max(0, T(start) − T(t)) · dt / 3600  (°C·h)
//! - drop = min(T(t) − T(start))  (≤ 0)
//! - min_temp = min T(t)
//! - duration = end − start  (samples)
//!
//! Pulses aggregate their subpulses: summed DCH, lowest drop, lowest
//! minimum temperature, subpulse count, duration in seconds.

use chrono::{DateTime, Utc};

use crate::detection::{subpulse_boundaries, IntervalSet};
use crate::grid::TemperatureGrid;
use crate::types::DepthIndex;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// One row of the subpulse table.
#[derive(Clone, Debug, PartialEq)]
pub struct SubpulseRecord {
    /// Parent pulse number (0-based)
    pub pulse_id: usize,
    /// Parent pulse start index
    pub pulse_start: usize,
    /// Parent pulse end index (exclusive)
    pub pulse_end: usize,
    /// Subpulse start index
    pub start: usize,
    /// Subpulse end index (exclusive)
    pub end: usize,
    /// Degree cooling hours (°C·h)
    pub dch: f64,
    /// Largest cooling relative to the subpulse start (°C, ≤ 0)
    pub drop: f64,
    /// Lowest temperature (°C)
    pub min_temp: f64,
    /// Duration in samples
    pub duration: usize,
}

/// One row of the pulse table.
#[derive(Clone, Debug, PartialEq)]
pub struct PulseRecord {
    /// Pulse number (0-based)
    pub pulse_id: usize,
    /// Start index
    pub start: usize,
    /// End index (exclusive)
    pub end: usize,
    /// Timestamp of the start index
    pub start_time: DateTime<Utc>,
    /// Timestamp of the end index (last timestamp when the pulse runs to the
    /// end of the record)
    pub end_time: DateTime<Utc>,
    /// Number of subpulses
    pub n_subpulses: usize,
    /// Summed degree cooling hours (°C·h)
    pub dch: f64,
    /// Lowest subpulse drop (°C)
    pub drop: f64,
    /// Lowest subpulse minimum temperature (°C)
    pub min_temp: f64,
    /// Duration in seconds
    pub duration_seconds: f64,
}

/// Full-length series, NaN outside pulses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PulseSeries {
    /// Instantaneous degree cooling hours
    pub dch: Vec<f64>,
    /// Reference temperature restricted to pulses
    pub pulse_temperature: Vec<f64>,
    /// Subpulse drop, repeated over the subpulse
    pub drop: Vec<f64>,
    /// Subpulse minimum temperature, repeated over the subpulse
    pub min_temperature: Vec<f64>,
}

impl PulseSeries {
    fn nan(n: usize) -> Self {
        Self {
            dch: vec![f64::NAN; n],
            pulse_temperature: vec![f64::NAN; n],
            drop: vec![f64::NAN; n],
            min_temperature: vec![f64::NAN; n],
        }
    }
}

/// NaN-skipping minimum; NaN when nothing is finite.
fn nan_min(values: impl Iterator<Item = f64>) -> f64 {
    values.filter(|v| !v.is_nan()).fold(f64::NAN, f64::min)
}

/// Metrics of a single subpulse `[start, end)`.
///
/// Returns `(dch, drop, min_temp)`.
pub fn subpulse_metrics(temps: &[f64], start: usize, end: usize, dt_seconds: f64) -> (f64, f64, f64) {
    let t0 = temps[start];
    let window = &temps[start..end];
    let dch = window
        .iter()
        .map(|&t| (t0 - t).max(0.0))
        .sum::<f64>()
        * dt_seconds
        / SECONDS_PER_HOUR;
    let drop = nan_min(window.iter().map(|&t| t - t0));
    let min_temp = nan_min(window.iter().copied());
    (dch, drop, min_temp)
}

/// Pulse table, subpulse table and annotated series for a set of pulses.
pub fn compute_metrics(
    grid: &TemperatureGrid,
    reference: DepthIndex,
    pulses: &IntervalSet,
) -> (Vec<PulseRecord>, Vec<SubpulseRecord>, PulseSeries) {
    let n = grid.n_times();
    let dt = grid.dt_seconds();
    let temps: Vec<f64> = grid.row(reference).to_vec();
    let times = grid.times();

    let mut pulse_rows = Vec::with_capacity(pulses.len());
    let mut subpulse_rows = Vec::new();
    let mut series = PulseSeries::nan(n);

    for (pulse_id, (start, end)) in pulses.iter().enumerate() {
        let end = end.min(n);
        let bounds = subpulse_boundaries(&temps, start, end);

        let mut dch_total = 0.0;
        let mut drops = Vec::with_capacity(bounds.len() - 1);
        let mut mins = Vec::with_capacity(bounds.len() - 1);

        for w in bounds.windows(2) {
            let (s, e) = (w[0], w[1]);
            let (dch, drop, min_temp) = subpulse_metrics(&temps, s, e, dt);
            dch_total += dch;
            drops.push(drop);
            mins.push(min_temp);

            let t0 = temps[s];
            for t in s..e {
                series.dch[t] = (t0 - temps[t]).max(0.0) * dt / SECONDS_PER_HOUR;
                series.pulse_temperature[t] = temps[t];
                series.drop[t] = drop;
                series.min_temperature[t] = min_temp;
            }

            subpulse_rows.push(SubpulseRecord {
                pulse_id,
                pulse_start: start,
                pulse_end: end,
                start: s,
                end: e,
                dch,
                drop,
                min_temp,
                duration: e - s,
            });
        }

        pulse_rows.push(PulseRecord {
            pulse_id,
            start,
            end,
            start_time: times[start],
            end_time: times[end.min(n - 1)],
            n_subpulses: bounds.len() - 1,
            dch: dch_total,
            drop: nan_min(drops.into_iter()),
            min_temp: nan_min(mins.into_iter()),
            duration_seconds: (end - start) as f64 * dt,
        });
    }

    (pulse_rows, subpulse_rows, series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};
    use ndarray::Array2;

    fn bottom_grid(bottom: &[f64]) -> TemperatureGrid {
        let n = bottom.len();
        let t0 = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        let times = (0..n).map(|i| t0 + Duration::minutes(30 * i as i64)).collect();
        let mut values = Array2::from_elem((2, n), 23.0);
        for (t, &v) in bottom.iter().enumerate() {
            values[[1, t]] = v;
        }
        TemperatureGrid::new(vec![2.0, 20.0], times, values).unwrap()
    }

    #[test]
    fn test_subpulse_metrics() {
        let temps = [22.0, 21.0, 20.0, 21.0, 22.5];
        // dt = 1800 s: DCH = (0 + 1 + 2 + 1 + 0) · 0.5 = 2 °C·h
        let (dch, drop, min_temp) = subpulse_metrics(&temps, 0, 5, 1800.0);
        assert_relative_eq!(dch, 2.0);
        assert_relative_eq!(drop, -2.0);
        assert_relative_eq!(min_temp, 20.0);
    }

    #[test]
    fn test_dch_zero_without_cooling() {
        let temps = [20.0, 20.0, 20.5, 21.0];
        let (dch, drop, _) = subpulse_metrics(&temps, 0, 4, 600.0);
        assert_eq!(dch, 0.0);
        assert_eq!(drop, 0.0);
    }

    #[test]
    fn test_pulse_aggregates_subpulses() {
        // Local maximum at t = 3 splits the pulse in two
        let bottom = [22.0, 21.0, 20.0, 21.5, 20.5, 19.5, 21.0, 22.0];
        let grid = bottom_grid(&bottom);
        let pulses = IntervalSet::from_pairs(&[(0, 7)]).unwrap();
        let (pulse_rows, subpulse_rows, series) = compute_metrics(&grid, DepthIndex::new(1), &pulses);

        assert_eq!(subpulse_rows.len(), 2);
        assert_eq!((subpulse_rows[0].start, subpulse_rows[0].end), (0, 3));
        assert_eq!((subpulse_rows[1].start, subpulse_rows[1].end), (3, 7));

        // Subpulse 1: (0 + 1 + 2) · 0.5 = 1.5; subpulse 2: (0 + 1 + 2 + 0.5) · 0.5 = 1.75
        assert_relative_eq!(subpulse_rows[0].dch, 1.5);
        assert_relative_eq!(subpulse_rows[1].dch, 1.75);

        let p = &pulse_rows[0];
        assert_eq!(p.n_subpulses, 2);
        assert_relative_eq!(p.dch, 3.25);
        assert_relative_eq!(p.drop, -2.0);
        assert_relative_eq!(p.min_temp, 19.5);
        assert_relative_eq!(p.duration_seconds, 7.0 * 1800.0);
        assert_eq!(p.start_time, grid.times()[0]);
        assert_eq!(p.end_time, grid.times()[7]);

        assert!(series.dch[7].is_nan());
        assert_relative_eq!(series.dch[2], 1.0);
        assert_relative_eq!(series.drop[4], -2.0);
        assert_relative_eq!(series.min_temperature[1], 20.0);
        assert_relative_eq!(series.pulse_temperature[5], 19.5);
    }

    #[test]
    fn test_no_pulses_gives_empty_tables() {
        let grid = bottom_grid(&[22.0, 22.0, 22.0]);
        let (pulse_rows, subpulse_rows, series) =
            compute_metrics(&grid, DepthIndex::new(1), &IntervalSet::new());
        assert!(pulse_rows.is_empty());
        assert!(subpulse_rows.is_empty());
        assert_eq!(series.dch.len(), 3);
        assert!(series.dch.iter().all(|v| v.is_nan()));
    }
}

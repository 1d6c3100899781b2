//! Candidate filters.
//!
//! Each filter takes an [`IntervalSet`] and returns the subset that passes.
//! They are independent but order-dependent in the pipeline, since the
//! boundary refiner moves intervals between them.

use log::debug;
use ndarray::Array2;

use super::intervals::IntervalSet;
use crate::grid::TemperatureGrid;
use crate::stratification::tsi_from_profile;
use crate::types::{DepthIndex, PulseKind};

/// Keep intervals whose length `end − start` (samples) lies within the bounds.
pub fn filter_duration(set: &IntervalSet, min: Option<f64>, max: Option<f64>) -> IntervalSet {
    let kept = set.filtered(|s, e| {
        let duration = (e - s) as f64;
        min.map_or(true, |m| duration >= m) && max.map_or(true, |m| duration <= m)
    });
    debug!("Duration filter kept {}/{} intervals", kept.len(), set.len());
    kept
}

/// Largest cooling of `temps` relative to `temps[start]` over `[start, end)`.
///
/// NaN readings are skipped; an interval without finite readings yields NaN.
pub fn max_drop(temps: &[f64], start: usize, end: usize) -> f64 {
    let t0 = temps[start];
    temps[start..end]
        .iter()
        .map(|&t| t0 - t)
        .filter(|d| !d.is_nan())
        .fold(f64::NAN, f64::max)
}

/// Keep intervals whose reference temperature drops by more than `cutoff`.
pub fn filter_drop(set: &IntervalSet, reference_temps: &[f64], cutoff: f64) -> IntervalSet {
    let kept = set.filtered(|s, e| s < reference_temps.len() && max_drop(reference_temps, s, e) > cutoff);
    debug!(
        "Drop filter (> {} °C) kept {}/{} intervals",
        cutoff,
        kept.len(),
        set.len()
    );
    kept
}

/// Specific stratification index: φ of a synthetic grid where only the
/// reference depth varies.
///
/// Outside the intervals the synthetic grid is NaN. Inside `[start, end)`
/// every other depth follows a linear ramp from `T_ref(start − 1)` to
/// `T_ref(min(end, n − 1))`, capped at `T_ref(start)` and at its own
/// reading, and floored at `T_ref(t)`. The reference depth keeps its
/// readings.
pub fn specific_tsi(grid: &TemperatureGrid, set: &IntervalSet, reference: DepthIndex) -> Vec<f64> {
    let n = grid.n_times();
    let data = grid.values();
    let ref_row = grid.row(reference);
    let mut synthetic = Array2::from_elem((grid.n_depths(), n), f64::NAN);

    for (s, e) in set.iter() {
        let e = e.min(n);
        if s >= e {
            continue;
        }
        let first = ref_row[s.saturating_sub(1)];
        let last = ref_row[e.min(n - 1)];
        let init = ref_row[s];
        let span = (e - s + 1) as f64;

        for d in 0..grid.n_depths() {
            for t in s..e {
                synthetic[[d, t]] = if d == reference.get() {
                    ref_row[t]
                } else {
                    let k = (t - s + 1) as f64;
                    let ramp = first + (last - first) * k / span;
                    let capped = less_of(less_of(ramp, init), data[[d, t]]);
                    greater_of(capped, ref_row[t])
                };
            }
        }
    }

    tsi_from_profile(synthetic.view(), grid.depths())
}

/// `a` if `a < b`, else `b` (NaN in `a` selects `b`).
#[inline]
fn less_of(a: f64, b: f64) -> f64 {
    if a < b {
        a
    } else {
        b
    }
}

/// `a` if `a > b`, else `b` (NaN in `a` selects `b`).
#[inline]
fn greater_of(a: f64, b: f64) -> f64 {
    if a > b {
        a
    } else {
        b
    }
}

/// Keep intervals whose sTSI extremum exceeds `min_stsi` in magnitude on the
/// anomalous side (`min < −min_stsi` for bottom, `max > min_stsi` for top).
pub fn filter_specific_tsi(
    set: &IntervalSet,
    grid: &TemperatureGrid,
    reference: DepthIndex,
    kind: PulseKind,
    min_stsi: f64,
) -> IntervalSet {
    let stsi = specific_tsi(grid, set, reference);
    let sign = kind.sign();
    let kept = set.filtered(|s, e| {
        let e = e.min(stsi.len());
        // Extremum on the anomalous side, in sign-normalised form
        let extreme = stsi[s.min(e)..e]
            .iter()
            .map(|&v| sign * v)
            .filter(|v| !v.is_nan())
            .fold(f64::NAN, f64::max);
        extreme > min_stsi
    });
    debug!(
        "sTSI filter (|sTSI| > {}) kept {}/{} intervals",
        min_stsi,
        kept.len(),
        set.len()
    );
    kept
}

/// Whether the φ excursion over `[start, end]` is driven by the reference
/// depth.
///
/// Locates the φ extremum (min for bottom, max for top), takes the
/// temperature change of every depth from `start` to that sample and
/// requires the reference change to be non-zero and the largest in
/// magnitude. Intervals reaching outside the grid are rejected.
pub fn is_driven_by_reference(
    grid: &TemperatureGrid,
    phi: &[f64],
    reference: DepthIndex,
    kind: PulseKind,
    start: usize,
    end: usize,
) -> bool {
    let n = grid.n_times().min(phi.len());
    if start >= n || end >= n || start > end {
        return false;
    }

    let sign = kind.sign();
    let mut argext = None;
    let mut best = f64::NEG_INFINITY;
    for (t, &p) in phi.iter().enumerate().take(end + 1).skip(start) {
        if !p.is_nan() && sign * p > best {
            best = sign * p;
            argext = Some(t);
        }
    }
    let Some(argext) = argext else {
        return false;
    };

    let data = grid.values();
    let delta: Vec<f64> = (0..grid.n_depths())
        .map(|d| data[[d, start]] - data[[d, argext]])
        .collect();
    let ref_delta = delta[reference.get()];
    if ref_delta == 0.0 || ref_delta.is_nan() {
        return false;
    }

    // First depth holding the largest |ΔT|
    let mut arg_largest = 0;
    for (d, v) in delta.iter().enumerate() {
        if v.abs() > delta[arg_largest].abs() {
            arg_largest = d;
        }
    }
    arg_largest == reference.get()
}

/// Keep intervals whose φ excursion is driven by the reference depth.
pub fn filter_bottom_logger(
    set: &IntervalSet,
    grid: &TemperatureGrid,
    phi: &[f64],
    reference: DepthIndex,
    kind: PulseKind,
) -> IntervalSet {
    let kept = set.filtered(|s, e| is_driven_by_reference(grid, phi, reference, kind, s, e));
    debug!(
        "Bottom-logger filter kept {}/{} intervals",
        kept.len(),
        set.len()
    );
    kept
}

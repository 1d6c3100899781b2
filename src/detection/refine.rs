//! Boundary refinement.
//!
//! Candidate boundaries sit where φ crosses the threshold, which is late for
//! starts and early for ends. Each boundary is moved outward to the nearest
//! sample flagged "not a pulse here" by an indicator built from the enabled
//! criteria. Missing φ always flags a sample, and the series boundary is
//! always flagged so every lookup succeeds.

use log::debug;

use super::intervals::IntervalSet;
use crate::config::{EndCriteria, StartCriteria};
use crate::grid::TemperatureGrid;
use crate::types::{DepthIndex, PulseKind};

/// "Not a pulse here" indicator for moving starts backwards.
pub fn start_indicator(
    grid: &TemperatureGrid,
    phi: &[f64],
    reference: DepthIndex,
    kind: PulseKind,
    criteria: &StartCriteria,
) -> Vec<bool> {
    let n = phi.len();
    let sign = kind.sign();
    let temps = grid.row(reference);
    let col_min = grid.column_min();

    let mut flags: Vec<bool> = (0..n)
        .map(|t| {
            let p = phi[t];
            let (phi_step, temp_step) = if t >= 2 {
                (phi[t - 1] - phi[t - 2], temps[t - 1] - temps[t - 2])
            } else {
                (f64::NAN, f64::NAN)
            };
            p.is_nan()
                || (criteria.phi_sign && sign * p <= 0.0)
                || (criteria.phi_trend && sign * phi_step <= 0.0)
                || (criteria.temperature_trend && temp_step >= 0.0)
                || (criteria.column_extremum && temps[t] != col_min[t])
        })
        .collect();
    if let Some(first) = flags.first_mut() {
        *first = true;
    }
    flags
}

/// "Not a pulse here" indicator for moving ends forwards.
pub fn end_indicator(
    grid: &TemperatureGrid,
    phi: &[f64],
    reference: DepthIndex,
    kind: PulseKind,
    criteria: &EndCriteria,
    right_max_window: usize,
) -> Vec<bool> {
    let n = phi.len();
    let sign = kind.sign();
    let temps: Vec<f64> = grid.row(reference).to_vec();
    let col_max = grid.column_max();
    let right_max = if criteria.right_max {
        right_maxima(&temps, right_max_window)
    } else {
        vec![false; n]
    };

    let mut flags: Vec<bool> = (0..n)
        .map(|t| {
            let p = phi[t];
            let phi_step = if t >= 1 { p - phi[t - 1] } else { f64::NAN };
            let temp_step = if t >= 2 {
                temps[t - 1] - temps[t - 2]
            } else {
                f64::NAN
            };
            p.is_nan()
                || (criteria.phi_sign && sign * p <= 0.0)
                || (criteria.phi_trend && sign * phi_step >= 0.0)
                || (criteria.temperature_trend && temp_step <= 0.0)
                || (criteria.column_extremum && temps[t] == col_max[t])
                || right_max[t]
        })
        .collect();
    if let Some(last) = flags.last_mut() {
        *last = true;
    }
    flags
}

/// Samples not exceeded by any of the next `window` samples.
///
/// Samples with fewer than `window` successors never qualify, nor do
/// samples with a missing value in their window.
pub fn right_maxima(values: &[f64], window: usize) -> Vec<bool> {
    let n = values.len();
    (0..n)
        .map(|t| {
            let last = t.saturating_add(window);
            last < n && !values[t].is_nan() && values[t + 1..=last].iter().all(|&v| values[t] >= v)
        })
        .collect()
}

/// Move each start back to the last flagged sample at or before it.
pub fn shift_starts(set: &IntervalSet, indicator: &[bool]) -> IntervalSet {
    let positions = flagged_positions(indicator);
    let starts = set
        .starts()
        .iter()
        .map(|&s| {
            let idx = positions.partition_point(|&p| p <= s);
            // The first sample is always flagged, so idx >= 1
            positions.get(idx.wrapping_sub(1)).copied().unwrap_or(0)
        })
        .collect();
    debug!("Shifted {} starts", set.len());
    IntervalSet::from_unchecked(starts, set.ends().to_vec())
}

/// Move each end forward to the first flagged sample at or after it,
/// clamped to the last index.
pub fn shift_ends(set: &IntervalSet, indicator: &[bool]) -> IntervalSet {
    let positions = flagged_positions(indicator);
    let last = indicator.len().saturating_sub(1);
    let ends = set
        .ends()
        .iter()
        .map(|&e| {
            let idx = positions.partition_point(|&p| p < e);
            positions.get(idx).copied().unwrap_or(last).min(last)
        })
        .collect();
    debug!("Shifted {} ends", set.len());
    IntervalSet::from_unchecked(set.starts().to_vec(), ends)
}

fn flagged_positions(indicator: &[bool]) -> Vec<usize> {
    indicator
        .iter()
        .enumerate()
        .filter_map(|(i, &f)| f.then_some(i))
        .collect()
}

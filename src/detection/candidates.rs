//! Initial candidate intervals.

use super::intervals::IntervalSet;
use crate::grid::TemperatureGrid;
use crate::types::{DepthIndex, PulseKind};

/// True where the reference depth holds the coldest reading of the column.
pub fn reference_is_coldest(grid: &TemperatureGrid, reference: DepthIndex) -> Vec<bool> {
    grid.row(reference)
        .iter()
        .zip(grid.column_min())
        .map(|(&t, min)| t == min)
        .collect()
}

/// Candidates where the reference depth is coldest and φ crosses the
/// threshold (`φ < threshold` for bottom pulses, `φ > −threshold` for top).
pub fn threshold_candidates(
    grid: &TemperatureGrid,
    phi: &[f64],
    reference: DepthIndex,
    kind: PulseKind,
    threshold: f64,
) -> IntervalSet {
    let sign = kind.sign();
    let present: Vec<bool> = reference_is_coldest(grid, reference)
        .into_iter()
        .zip(phi)
        .map(|(coldest, &p)| coldest && sign * p > -threshold)
        .collect();
    intervals_from_edges(&present)
}

/// Candidates where the reference depth is coldest and φ departs from its
/// rolling baseline on the anomalous side.
///
/// For bottom pulses the anomaly is `min(φ, 0) − min(rφ, 0) < 0`, for top
/// pulses `max(φ, 0) − max(rφ, 0) > 0`. NaN anomalies count as absent.
pub fn baseline_candidates(
    grid: &TemperatureGrid,
    phi: &[f64],
    baseline_phi: &[f64],
    reference: DepthIndex,
    kind: PulseKind,
) -> IntervalSet {
    let sign = kind.sign();
    let anomalous_part = |x: f64| (sign * x).max(0.0);
    let present: Vec<bool> = reference_is_coldest(grid, reference)
        .into_iter()
        .zip(phi.iter().zip(baseline_phi))
        .map(|(coldest, (&p, &r))| {
            // f64::max swallows NaN, so test explicitly
            coldest && !p.is_nan() && !r.is_nan() && anomalous_part(p) > anomalous_part(r)
        })
        .collect();
    intervals_from_edges(&present)
}

/// Rising and falling edges of a presence indicator.
///
/// A start is the last absent sample before a run, so the reference value
/// there is the pre-cooling temperature. A run present at index 0 starts at 0.
/// Ends are first absent samples. A run that reaches the last sample ends at
/// the last index.
pub fn intervals_from_edges(present: &[bool]) -> IntervalSet {
    let n = present.len();
    let mut out = IntervalSet::new();
    let mut start = None;
    for (i, &p) in present.iter().enumerate() {
        match (start, p) {
            (None, true) => start = Some(i.saturating_sub(1)),
            (Some(s), false) => {
                out.push(s, i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(s, n - 1);
    }
    out
}

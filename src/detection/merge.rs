//! Overlap merging and pulse splitting.

use log::debug;

use super::intervals::IntervalSet;

/// Merge overlapping or touching intervals over a series of `n` samples.
pub fn merge_overlaps(set: &IntervalSet, n: usize) -> IntervalSet {
    let merged = set.merge_overlaps(n);
    debug!("Merged {} intervals into {}", set.len(), merged.len());
    merged
}

/// First `i` in `[from, to − 1)` with `temps[i + 1] < temps[i]`.
fn first_decrease(temps: &[f64], from: usize, to: usize) -> Option<usize> {
    (from..to.saturating_sub(1)).find(|&i| temps[i + 1] < temps[i])
}

/// Split merged intervals into pulses.
///
/// Each merged interval is trimmed to the sample where the reference
/// temperature first decreases. From that running start, the first later
/// sample warmer than the running start closes a pulse, and the next pulse
/// starts where the temperature decreases again. An interval that never
/// cools yields no pulse; one that never re-warms yields a single pulse
/// ending with the interval.
pub fn split_pulses(merged: &IntervalSet, temps: &[f64]) -> IntervalSet {
    let mut pulses = IntervalSet::new();
    for (start, end) in merged.iter() {
        let end = end.min(temps.len());
        let Some(mut running) = first_decrease(temps, start, end) else {
            debug!("Interval [{}, {}) never cools, dropped", start, end);
            continue;
        };

        loop {
            let t0 = temps[running];
            match (running..end).find(|&t| temps[t] > t0) {
                Some(warmer) => {
                    pulses.push(running, warmer);
                    match first_decrease(temps, warmer, end) {
                        Some(next) => running = next,
                        None => break,
                    }
                }
                None => {
                    pulses.push(running, end);
                    break;
                }
            }
        }
    }
    debug!("Split {} merged intervals into {} pulses", merged.len(), pulses.len());
    pulses
}

/// Subpulse boundaries of a pulse: `[start, m₁, …, mₖ, end]` where the `mᵢ`
/// are the strict local maxima of `temps` inside `[start, end)`.
pub fn subpulse_boundaries(temps: &[f64], start: usize, end: usize) -> Vec<usize> {
    let mut bounds = vec![start];
    if end >= start + 3 {
        for i in start + 1..end - 1 {
            if temps[i] > temps[i - 1] && temps[i] > temps[i + 1] {
                bounds.push(i);
            }
        }
    }
    bounds.push(end);
    bounds
}

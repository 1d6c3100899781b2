//! Temperature stratification index.
//!
//! φ(t) = mean_d[(T(d,t) − mean_d T(d,t)) · d]
//!
//! With depths positive down, cold water at the bottom pulls φ negative and
//! cold water at the surface pushes it positive.

use ndarray::{ArrayView2, Axis};

use crate::grid::TemperatureGrid;

/// φ for every timestep of a grid. NaN wherever the column holds a NaN.
pub fn compute_tsi(grid: &TemperatureGrid) -> Vec<f64> {
    tsi_from_profile(grid.values(), grid.depths())
}

/// φ for an arbitrary depth × time array.
///
/// `depths.len()` must equal the number of rows.
pub fn tsi_from_profile(values: ArrayView2<'_, f64>, depths: &[f64]) -> Vec<f64> {
    debug_assert_eq!(values.nrows(), depths.len());
    let n_depths = depths.len() as f64;

    values
        .axis_iter(Axis(1))
        .map(|col| {
            let mean = col.sum() / n_depths;
            col.iter()
                .zip(depths)
                .map(|(&t, &d)| (t - mean) * d)
                .sum::<f64>()
                / n_depths
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_closed_form() {
        // Column [20, 18] at depths [10, 30]: mean 19, φ = (1·10 + (−1)·30) / 2 = −10
        let values = array![[20.0, 19.0], [18.0, 19.0]];
        let phi = tsi_from_profile(values.view(), &[10.0, 30.0]);
        assert_relative_eq!(phi[0], -10.0, epsilon = 1e-12);
        assert_relative_eq!(phi[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sign_follows_cold_end() {
        let depths = [5.0, 15.0, 25.0];
        let values = array![[22.0, 20.0], [22.0, 22.0], [20.0, 22.0]];
        let phi = tsi_from_profile(values.view(), &depths);
        let (bottom_cold, top_cold) = (phi[0], phi[1]);
        assert!(bottom_cold < 0.0);
        assert!(top_cold > 0.0);
        assert_relative_eq!(bottom_cold, -top_cold, epsilon = 1e-12);
    }

    #[test]
    fn test_nan_column_gives_nan() {
        let values = array![[20.0, f64::NAN, 21.0], [18.0, f64::NAN, 21.0]];
        let phi = tsi_from_profile(values.view(), &[10.0, 30.0]);
        assert!(phi[0].is_finite());
        assert!(phi[1].is_nan());
        assert_relative_eq!(phi[2], 0.0, epsilon = 1e-12);
    }
}

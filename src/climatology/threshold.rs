//! Adaptive TSI threshold from a reference climatology.

use log::info;

use super::reference::ClimatologySource;
use crate::error::{DetectionError, DetectionResult};
use crate::stratification::tsi_from_profile;

/// Threshold used by a detection run, with its provenance.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdEstimate {
    /// Threshold on φ (negative for a stably stratified column)
    pub value: f64,
    /// Mean of the reference φ (NaN for a fixed threshold)
    pub mean: f64,
    /// Population standard deviation of the reference φ (NaN for a fixed threshold)
    pub std: f64,
    /// Reference cell used, if any
    pub reference_cell: Option<(f64, f64)>,
    /// Distance to the reference cell (km)
    pub distance_km: Option<f64>,
    /// Reference cell farther than the confidence radius
    pub low_confidence: bool,
}

impl ThresholdEstimate {
    /// User-supplied threshold.
    pub fn fixed(value: f64) -> Self {
        Self {
            value,
            mean: f64::NAN,
            std: f64::NAN,
            reference_cell: None,
            distance_km: None,
            low_confidence: false,
        }
    }
}

/// Mean and population standard deviation of the finite values.
pub fn nan_mean_std(values: &[f64]) -> Option<(f64, f64)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

/// threshold = mean(φ_ref) − std(φ_ref), φ_ref computed on the reference
/// profile interpolated onto the station depths.
///
/// # Errors
/// `ResourceUnavailable` if the source fails or the interpolated reference
/// yields no finite φ.
pub fn climatology_threshold(
    source: &dyn ClimatologySource,
    depths: &[f64],
    longitude: f64,
    latitude: f64,
) -> DetectionResult<ThresholdEstimate> {
    let max_depth = depths.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let profile = source.nearest_profile(longitude, latitude, max_depth)?;

    let local = profile.interpolate_to_depths(depths);
    let phi_ref = tsi_from_profile(local.view(), depths);
    let (mean, std) = nan_mean_std(&phi_ref).ok_or_else(|| {
        DetectionError::ResourceUnavailable(format!(
            "reference profile at ({:.2}E, {:.2}N) does not cover depths {:?}",
            profile.longitude, profile.latitude, depths
        ))
    })?;

    let value = mean - std;
    info!(
        "Climatology threshold {:.4} (mean {:.4}, std {:.4}) from cell ({:.2}E, {:.2}N)",
        value, mean, std, profile.longitude, profile.latitude
    );

    Ok(ThresholdEstimate {
        value,
        mean,
        std,
        reference_cell: Some((profile.longitude, profile.latitude)),
        distance_km: Some(profile.distance_km),
        low_confidence: profile.is_low_confidence(),
    })
}

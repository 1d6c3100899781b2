//! Reference climatology field and nearest-cell lookup.

use log::{debug, warn};
use ndarray::{s, Array2, Array4};

use crate::error::{DetectionError, DetectionResult};

/// Mean Earth radius (km) for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Distance beyond which a nearest-cell match is flagged as low confidence.
pub const LOW_CONFIDENCE_DISTANCE_KM: f64 = 100.0;

/// Great-circle distance in kilometres between two (lon, lat) points in degrees.
pub fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = phi2 - phi1;
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Monthly-mean temperature by depth on a regular lon/lat grid.
///
/// Longitudes are expected in the 0–360 convention used by global ocean
/// reanalyses. Levels are depths in metres, increasing downward.
#[derive(Clone, Debug)]
pub struct ReferenceClimatology {
    longitudes: Vec<f64>,
    latitudes: Vec<f64>,
    levels: Vec<f64>,
    /// time × level × lat × lon, °C
    temperature: Array4<f64>,
}

/// Reference profile extracted at one grid cell.
#[derive(Clone, Debug)]
pub struct ReferenceProfile {
    /// Cell longitude (0–360)
    pub longitude: f64,
    /// Cell latitude
    pub latitude: f64,
    /// Great-circle distance from the requested point (km)
    pub distance_km: f64,
    /// Depth levels (m)
    pub levels: Vec<f64>,
    /// time × level, °C
    pub temperature: Array2<f64>,
}

impl ReferenceProfile {
    /// Whether the match is far enough away to distrust.
    pub fn is_low_confidence(&self) -> bool {
        self.distance_km > LOW_CONFIDENCE_DISTANCE_KM
    }

    /// Linear interpolation in depth onto `depths` (depth × time).
    ///
    /// Depths outside the reference levels are NaN.
    pub fn interpolate_to_depths(&self, depths: &[f64]) -> Array2<f64> {
        let n_times = self.temperature.nrows();
        let mut out = Array2::from_elem((depths.len(), n_times), f64::NAN);
        for (i, &z) in depths.iter().enumerate() {
            let Some((k, w)) = bracket(&self.levels, z) else {
                continue;
            };
            for t in 0..n_times {
                let lo = self.temperature[[t, k]];
                out[[i, t]] = if w == 0.0 {
                    lo
                } else {
                    lo * (1.0 - w) + self.temperature[[t, k + 1]] * w
                };
            }
        }
        out
    }
}

/// Index `k` and weight `w` such that `z = levels[k]·(1−w) + levels[k+1]·w`.
fn bracket(levels: &[f64], z: f64) -> Option<(usize, f64)> {
    let n = levels.len();
    if n == 0 || z < levels[0] || z > levels[n - 1] {
        return None;
    }
    if n == 1 {
        return Some((0, 0.0));
    }
    let k = levels
        .windows(2)
        .position(|w| z <= w[1])
        .unwrap_or(n - 2);
    let w = (z - levels[k]) / (levels[k + 1] - levels[k]);
    if w == 0.0 {
        Some((k, 0.0))
    } else if w == 1.0 {
        Some((k + 1, 0.0))
    } else {
        Some((k, w))
    }
}

/// Source of reference profiles for the climatology threshold.
pub trait ClimatologySource {
    /// Profile at the nearest cell holding valid data at the first level at
    /// or below `max_depth`.
    ///
    /// # Errors
    /// `ResourceUnavailable` when the reference cannot be read or holds no
    /// usable cell.
    fn nearest_profile(
        &self,
        longitude: f64,
        latitude: f64,
        max_depth: f64,
    ) -> DetectionResult<ReferenceProfile>;
}

impl ReferenceClimatology {
    /// Build a climatology from coordinates and a time × level × lat × lon array.
    ///
    /// # Errors
    /// `InvalidConfiguration` on empty axes, a shape mismatch, or levels that
    /// are not strictly increasing.
    pub fn new(
        longitudes: Vec<f64>,
        latitudes: Vec<f64>,
        levels: Vec<f64>,
        temperature: Array4<f64>,
    ) -> DetectionResult<Self> {
        if longitudes.is_empty() || latitudes.is_empty() || levels.is_empty() {
            return Err(DetectionError::InvalidConfiguration(
                "climatology needs at least one longitude, latitude and level".to_string(),
            ));
        }
        let (_, nz, ny, nx) = temperature.dim();
        if nz != levels.len() || ny != latitudes.len() || nx != longitudes.len() {
            return Err(DetectionError::InvalidConfiguration(format!(
                "climatology array has shape {:?}, expected (time, {}, {}, {})",
                temperature.dim(),
                levels.len(),
                latitudes.len(),
                longitudes.len()
            )));
        }
        if levels.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DetectionError::InvalidConfiguration(
                "climatology levels must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            longitudes,
            latitudes,
            levels,
            temperature,
        })
    }

    /// Grid longitudes.
    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    /// Grid latitudes.
    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    /// Depth levels.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Number of time records.
    pub fn n_times(&self) -> usize {
        self.temperature.dim().0
    }

    fn cell_is_valid(&self, level: usize, j: usize, i: usize) -> bool {
        self.temperature
            .slice(s![.., level, j, i])
            .iter()
            .any(|v| v.is_finite())
    }
}

impl ClimatologySource for ReferenceClimatology {
    fn nearest_profile(
        &self,
        longitude: f64,
        latitude: f64,
        max_depth: f64,
    ) -> DetectionResult<ReferenceProfile> {
        let lon = if longitude < 0.0 { longitude + 360.0 } else { longitude };

        let level = self
            .levels
            .iter()
            .position(|&z| z >= max_depth)
            .ok_or_else(|| {
                DetectionError::ResourceUnavailable(format!(
                    "no reference level reaches {} m (deepest is {} m)",
                    max_depth,
                    self.levels[self.levels.len() - 1]
                ))
            })?;

        let mut best: Option<(usize, usize, f64)> = None;
        for (j, &cell_lat) in self.latitudes.iter().enumerate() {
            for (i, &cell_lon) in self.longitudes.iter().enumerate() {
                if !self.cell_is_valid(level, j, i) {
                    continue;
                }
                let d2 = (cell_lon - lon).powi(2) + (cell_lat - latitude).powi(2);
                if best.map_or(true, |(_, _, b)| d2 < b) {
                    best = Some((j, i, d2));
                }
            }
        }
        let (j, i, _) = best.ok_or_else(|| {
            DetectionError::ResourceUnavailable(format!(
                "no valid reference cell at level {} m",
                self.levels[level]
            ))
        })?;

        let cell_lon = self.longitudes[i];
        let cell_lat = self.latitudes[j];
        let distance_km = haversine_km(lon, latitude, cell_lon, cell_lat);
        if distance_km > LOW_CONFIDENCE_DISTANCE_KM {
            warn!(
                "Nearest reference cell ({:.2}E, {:.2}N) is {:.1} km away, threshold may be unreliable; check the station coordinates",
                cell_lon, cell_lat, distance_km
            );
        } else {
            debug!("Nearest reference cell is {:.1} km away", distance_km);
        }

        Ok(ReferenceProfile {
            longitude: cell_lon,
            latitude: cell_lat,
            distance_km,
            levels: self.levels.clone(),
            temperature: self.temperature.slice(s![.., .., j, i]).to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_cell_climatology() -> ReferenceClimatology {
        // Cell (0, 0) is land below 10 m; cell (0, 1) is ocean everywhere
        let mut t = Array4::from_elem((2, 3, 1, 2), 20.0);
        for time in 0..2 {
            t[[time, 1, 0, 0]] = f64::NAN;
            t[[time, 2, 0, 0]] = f64::NAN;
            t[[time, 0, 0, 1]] = 24.0;
            t[[time, 1, 0, 1]] = 22.0;
            t[[time, 2, 0, 1]] = 18.0;
        }
        ReferenceClimatology::new(vec![166.0, 167.0], vec![-22.0], vec![0.0, 10.0, 50.0], t)
            .unwrap()
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(d, 111.195, epsilon = 0.01);
        assert_relative_eq!(haversine_km(10.0, 45.0, 10.0, 45.0), 0.0);
    }

    #[test]
    fn test_nearest_skips_invalid_cells() {
        let clim = two_cell_climatology();
        let p = clim.nearest_profile(166.1, -22.0, 25.0).unwrap();
        assert_eq!(p.longitude, 167.0);
        assert!(p.distance_km < LOW_CONFIDENCE_DISTANCE_KM);

        // Shallow enough that the land cell is valid
        let p = clim.nearest_profile(166.1, -22.0, 0.0).unwrap();
        assert_eq!(p.longitude, 166.0);
    }

    #[test]
    fn test_negative_longitude_is_wrapped() {
        let clim = two_cell_climatology();
        let p = clim.nearest_profile(167.0 - 360.0, -22.0, 25.0).unwrap();
        assert_eq!(p.longitude, 167.0);
        assert_relative_eq!(p.distance_km, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_too_deep_is_unavailable() {
        let clim = two_cell_climatology();
        assert!(matches!(
            clim.nearest_profile(167.0, -22.0, 500.0),
            Err(DetectionError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn test_depth_interpolation() {
        let clim = two_cell_climatology();
        let p = clim.nearest_profile(167.0, -22.0, 25.0).unwrap();
        let local = p.interpolate_to_depths(&[5.0, 10.0, 30.0, 60.0]);
        assert_relative_eq!(local[[0, 0]], 23.0);
        assert_relative_eq!(local[[1, 1]], 22.0);
        assert_relative_eq!(local[[2, 0]], 20.0);
        assert!(local[[3, 0]].is_nan());
    }
}

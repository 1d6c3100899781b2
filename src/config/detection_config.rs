//! Detection configuration and its builder.

use crate::error::{DetectionError, DetectionResult};
use crate::types::PulseKind;

/// Where the φ threshold comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThresholdSource {
    /// Explicit threshold on φ
    Fixed(f64),
    /// `mean − std` of φ on the reference climatology near the station
    Climatology {
        /// (longitude, latitude) in degrees; `None` takes the position from
        /// the grid's station metadata
        position: Option<(f64, f64)>,
    },
}

/// How initial candidate intervals are extracted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CandidateStrategy {
    /// φ against the threshold
    #[default]
    Threshold,
    /// φ against its rolling baseline (rTSI)
    BaselineAnomaly,
}

/// A duration bound expressed in samples or in minutes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DurationLimit {
    /// Number of samples
    Samples(usize),
    /// Minutes, converted through the sampling interval
    Minutes(f64),
}

impl DurationLimit {
    /// Bound in (possibly fractional) samples for a sampling interval `dt_seconds`.
    pub fn to_samples(self, dt_seconds: f64) -> f64 {
        match self {
            DurationLimit::Samples(n) => n as f64,
            DurationLimit::Minutes(m) => m * 60.0 / dt_seconds,
        }
    }
}

/// Criteria marking "not a pulse here" when moving starts backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartCriteria {
    /// φ has the wrong sign
    pub phi_sign: bool,
    /// φ was moving away from the anomaly one step earlier
    pub phi_trend: bool,
    /// Reference temperature was rising one step earlier
    pub temperature_trend: bool,
    /// Reference depth is not the coldest of the column
    pub column_extremum: bool,
}

impl Default for StartCriteria {
    fn default() -> Self {
        Self {
            phi_sign: true,
            phi_trend: true,
            temperature_trend: false,
            column_extremum: true,
        }
    }
}

/// Criteria marking "not a pulse here" when moving ends forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndCriteria {
    /// φ has the wrong sign
    pub phi_sign: bool,
    /// φ is relaxing back towards zero
    pub phi_trend: bool,
    /// Reference temperature was falling one step earlier
    pub temperature_trend: bool,
    /// Reference depth is the warmest of the column
    pub column_extremum: bool,
    /// No warmer reference reading within the right-maximum window
    pub right_max: bool,
}

impl Default for EndCriteria {
    fn default() -> Self {
        Self {
            phi_sign: true,
            phi_trend: true,
            temperature_trend: true,
            column_extremum: true,
            right_max: true,
        }
    }
}

/// Immutable configuration of one detection run.
///
/// Build through [`DetectionConfig::builder`]; `Default` gives the standard
/// bottom-pulse setup with a zero threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionConfig {
    /// Pulse kind to detect
    pub kind: PulseKind,
    /// Reference depth (m). `None` uses the deepest sensor for bottom pulses
    /// and the shallowest for top pulses.
    pub reference_depth: Option<f64>,
    /// Threshold source
    pub threshold: ThresholdSource,
    /// Candidate extraction strategy
    pub candidate_strategy: CandidateStrategy,
    /// Shortest interval kept
    pub min_duration: Option<DurationLimit>,
    /// Longest interval kept
    pub max_duration: Option<DurationLimit>,
    /// Minimum reference-temperature drop (°C); `None` disables the filter
    pub min_drop: Option<f64>,
    /// Minimum |sTSI|; `None` disables the filter
    pub min_stsi: Option<f64>,
    /// Require the reference depth to drive the φ excursion
    pub bottom_logger_filter: bool,
    /// Rolling window of the rTSI baseline (days)
    pub baseline_window_days: usize,
    /// Look-ahead of the right-maximum end criterion (samples)
    pub right_max_window: usize,
    /// Start refinement criteria
    pub start_criteria: StartCriteria,
    /// End refinement criteria
    pub end_criteria: EndCriteria,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            kind: PulseKind::Bot,
            reference_depth: None,
            threshold: ThresholdSource::Fixed(0.0),
            candidate_strategy: CandidateStrategy::Threshold,
            min_duration: Some(DurationLimit::Samples(3)),
            max_duration: None,
            min_drop: Some(0.01),
            min_stsi: Some(0.04),
            bottom_logger_filter: true,
            baseline_window_days: 60,
            right_max_window: 60,
            start_criteria: StartCriteria::default(),
            end_criteria: EndCriteria::default(),
        }
    }
}

impl DetectionConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> DetectionConfigBuilder {
        DetectionConfigBuilder::default()
    }

    /// Only the duration filter; useful to inspect raw candidates.
    ///
    /// - min_duration: 3 samples
    /// - min_drop, min_stsi: off
    /// - bottom_logger_filter: off
    pub fn unfiltered(kind: PulseKind, threshold: f64) -> Self {
        Self {
            kind,
            threshold: ThresholdSource::Fixed(threshold),
            min_drop: None,
            min_stsi: None,
            bottom_logger_filter: false,
            ..Self::default()
        }
    }

    /// Duration bounds in samples for a sampling interval `dt_seconds`.
    ///
    /// # Errors
    /// `InvalidConfiguration` if the minimum exceeds the maximum once both
    /// are expressed in samples.
    pub fn duration_bounds(&self, dt_seconds: f64) -> DetectionResult<(Option<f64>, Option<f64>)> {
        let min = self.min_duration.map(|l| l.to_samples(dt_seconds));
        let max = self.max_duration.map(|l| l.to_samples(dt_seconds));
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(DetectionError::InvalidConfiguration(format!(
                    "min_duration ({} samples) exceeds max_duration ({} samples) at dt = {} s",
                    lo, hi, dt_seconds
                )));
            }
        }
        Ok((min, max))
    }

    /// Drop cutoff in effect (0 when the filter is off).
    pub fn drop_cutoff(&self) -> f64 {
        self.min_drop.unwrap_or(0.0)
    }

    /// Check every value for range and consistency.
    ///
    /// # Errors
    /// `InvalidConfiguration` naming the first offending setting.
    pub fn validate(&self) -> DetectionResult<()> {
        let invalid = |msg: String| Err(DetectionError::InvalidConfiguration(msg));

        if let Some(d) = self.reference_depth {
            if !d.is_finite() {
                return invalid(format!("reference_depth must be finite, got {}", d));
            }
        }
        match self.threshold {
            ThresholdSource::Fixed(v) if !v.is_finite() => {
                return invalid(format!("threshold must be finite, got {}", v));
            }
            ThresholdSource::Climatology {
                position: Some((longitude, latitude)),
            } => {
                if !(-180.0..=360.0).contains(&longitude) {
                    return invalid(format!("longitude {} out of range", longitude));
                }
                if !(-90.0..=90.0).contains(&latitude) {
                    return invalid(format!("latitude {} out of range", latitude));
                }
            }
            _ => {}
        }
        for (name, limit) in [
            ("min_duration", self.min_duration),
            ("max_duration", self.max_duration),
        ] {
            if let Some(DurationLimit::Minutes(m)) = limit {
                if !m.is_finite() || m < 0.0 {
                    return invalid(format!("{} must be a non-negative number of minutes", name));
                }
            }
        }
        match (self.min_duration, self.max_duration) {
            (Some(DurationLimit::Samples(lo)), Some(DurationLimit::Samples(hi))) if lo > hi => {
                return invalid(format!("min_duration {} exceeds max_duration {}", lo, hi));
            }
            (Some(DurationLimit::Minutes(lo)), Some(DurationLimit::Minutes(hi))) if lo > hi => {
                return invalid(format!(
                    "min_duration {} min exceeds max_duration {} min",
                    lo, hi
                ));
            }
            _ => {}
        }
        for (name, value) in [("min_drop", self.min_drop), ("min_stsi", self.min_stsi)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return invalid(format!("{} must be non-negative, got {}", name, v));
                }
            }
        }
        if self.baseline_window_days == 0 {
            return invalid("baseline_window_days must be at least 1".to_string());
        }
        if self.right_max_window == 0 {
            return invalid("right_max_window must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Builder for [`DetectionConfig`].
///
/// ```
/// use coldpulse_rs::{DetectionConfig, PulseKind};
///
/// let config = DetectionConfig::builder()
///     .with_kind(PulseKind::Bot)
///     .with_reference_depth(25.0)
///     .with_fixed_threshold(-0.5)
///     .with_min_stsi(None)
///     .build()
///     .unwrap();
/// assert_eq!(config.reference_depth, Some(25.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct DetectionConfigBuilder {
    config: DetectionConfig,
}

impl DetectionConfigBuilder {
    /// Pulse kind.
    pub fn with_kind(mut self, kind: PulseKind) -> Self {
        self.config.kind = kind;
        self
    }

    /// Reference depth (m).
    pub fn with_reference_depth(mut self, depth: f64) -> Self {
        self.config.reference_depth = Some(depth);
        self
    }

    /// Explicit φ threshold.
    pub fn with_fixed_threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = ThresholdSource::Fixed(threshold);
        self
    }

    /// Threshold from the reference climatology at the station position.
    pub fn with_climatology_threshold(mut self, longitude: f64, latitude: f64) -> Self {
        self.config.threshold = ThresholdSource::Climatology {
            position: Some((longitude, latitude)),
        };
        self
    }

    /// Threshold from the reference climatology at the position recorded in
    /// the grid's station metadata.
    pub fn with_station_climatology_threshold(mut self) -> Self {
        self.config.threshold = ThresholdSource::Climatology { position: None };
        self
    }

    /// Candidate extraction strategy.
    pub fn with_candidate_strategy(mut self, strategy: CandidateStrategy) -> Self {
        self.config.candidate_strategy = strategy;
        self
    }

    /// Minimum duration (`None` disables).
    pub fn with_min_duration(mut self, limit: Option<DurationLimit>) -> Self {
        self.config.min_duration = limit;
        self
    }

    /// Maximum duration (`None` disables).
    pub fn with_max_duration(mut self, limit: Option<DurationLimit>) -> Self {
        self.config.max_duration = limit;
        self
    }

    /// Minimum drop (°C, `None` disables).
    pub fn with_min_drop(mut self, cutoff: Option<f64>) -> Self {
        self.config.min_drop = cutoff;
        self
    }

    /// Minimum |sTSI| (`None` disables).
    pub fn with_min_stsi(mut self, cutoff: Option<f64>) -> Self {
        self.config.min_stsi = cutoff;
        self
    }

    /// Toggle the bottom-logger attribution filter.
    pub fn with_bottom_logger_filter(mut self, enabled: bool) -> Self {
        self.config.bottom_logger_filter = enabled;
        self
    }

    /// Baseline rolling window (days).
    pub fn with_baseline_window_days(mut self, days: usize) -> Self {
        self.config.baseline_window_days = days;
        self
    }

    /// Right-maximum look-ahead (samples).
    pub fn with_right_max_window(mut self, samples: usize) -> Self {
        self.config.right_max_window = samples;
        self
    }

    /// Start refinement criteria.
    pub fn with_start_criteria(mut self, criteria: StartCriteria) -> Self {
        self.config.start_criteria = criteria;
        self
    }

    /// End refinement criteria.
    pub fn with_end_criteria(mut self, criteria: EndCriteria) -> Self {
        self.config.end_criteria = criteria;
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    /// `InvalidConfiguration` if any value is out of range.
    pub fn build(self) -> DetectionResult<DetectionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//! Detection driver.
//!
//! [`PulseDetector::run`] chains every stage in a fixed order:
//!
//! ```text
//! NaN-column propagation → φ → threshold → candidates → duration → drop
//!   → shift starts → bottom-logger → shift ends → refinement check → sTSI
//!   → overlap merge → split → metrics
//! ```

use log::{debug, info};

use super::candidates::{baseline_candidates, threshold_candidates};
use super::filters::{filter_bottom_logger, filter_drop, filter_duration, filter_specific_tsi};
use super::intervals::IntervalSet;
use super::merge::{merge_overlaps, split_pulses};
use super::refine::{end_indicator, shift_ends, shift_starts, start_indicator};
use crate::climatology::{climatology_threshold, ClimatologySource, ThresholdEstimate};
use crate::config::{CandidateStrategy, DetectionConfig, ThresholdSource};
use crate::diagnostics::{ProgressObserver, Stage};
use crate::error::{DetectionError, DetectionResult};
use crate::grid::TemperatureGrid;
use crate::metrics::{compute_metrics, DetectionOutput};
use crate::stratification::{baseline_tsi, compute_tsi};
use crate::types::{DepthIndex, PulseKind};

/// Runs cold-pulse detection on one grid.
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use coldpulse_rs::{DetectionConfig, PulseDetector, PulseKind, TemperatureGrid};
/// use ndarray::Array2;
///
/// let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
/// let times = (0..10).map(|i| t0 + Duration::minutes(10 * i)).collect();
/// let grid = TemperatureGrid::new(vec![5.0, 25.0], times, Array2::from_elem((2, 10), 22.0)).unwrap();
///
/// let config = DetectionConfig::unfiltered(PulseKind::Bot, -0.1);
/// let output = PulseDetector::new(config).run(&grid, None).unwrap();
/// assert!(output.is_empty());
/// ```
pub struct PulseDetector<'a> {
    config: DetectionConfig,
    observer: Option<Box<dyn ProgressObserver + 'a>>,
}

impl<'a> PulseDetector<'a> {
    /// Create a detector for a configuration.
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Attach a progress observer.
    pub fn with_observer(mut self, observer: impl ProgressObserver + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    fn report(&mut self, stage: Stage) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_stage(stage, stage.fraction());
        }
    }

    /// Reference depth row: configured depth, else deepest (bottom pulses)
    /// or shallowest (top pulses) sensor.
    ///
    /// # Errors
    /// `InvalidConfiguration` if the configured depth is not in the grid.
    pub fn reference_index(&self, grid: &TemperatureGrid) -> DetectionResult<DepthIndex> {
        match self.config.reference_depth {
            Some(depth) => grid.depth_index(depth),
            None => Ok(match self.config.kind {
                PulseKind::Bot => grid.deepest(),
                PulseKind::Top => grid.shallowest(),
            }),
        }
    }

    /// Resolve the configured threshold.
    ///
    /// # Errors
    /// - `InvalidConfiguration` if a climatology threshold has no position
    ///   and the grid carries no station metadata
    /// - `ResourceUnavailable` if no climatology source is supplied or it
    ///   cannot serve the station
    pub fn resolve_threshold(
        &self,
        grid: &TemperatureGrid,
        climatology: Option<&dyn ClimatologySource>,
    ) -> DetectionResult<ThresholdEstimate> {
        match self.config.threshold {
            ThresholdSource::Fixed(value) => Ok(ThresholdEstimate::fixed(value)),
            ThresholdSource::Climatology { position } => {
                let (lon, lat) = position
                    .or_else(|| grid.station().map(|s| (s.longitude, s.latitude)))
                    .ok_or_else(|| {
                        DetectionError::InvalidConfiguration(
                            "climatology threshold needs a longitude/latitude or station metadata"
                                .to_string(),
                        )
                    })?;
                let source = climatology.ok_or_else(|| {
                    DetectionError::ResourceUnavailable(
                        "no reference climatology supplied".to_string(),
                    )
                })?;
                climatology_threshold(source, grid.depths(), lon, lat)
            }
        }
    }

    /// Run every stage on `grid`.
    ///
    /// `climatology` is only consulted for a climatology threshold.
    ///
    /// # Errors
    /// - `InvalidConfiguration` for an invalid configuration or a reference
    ///   depth absent from the grid
    /// - `ResourceUnavailable` / `InsufficientData` from the threshold and
    ///   baseline stages
    /// - `InvalidConfiguration` if the duration bounds cross at the grid's
    ///   sampling interval
    /// - `InvariantViolation` if the grid or interval arrays are inconsistent
    pub fn run(
        &mut self,
        grid: &TemperatureGrid,
        climatology: Option<&dyn ClimatologySource>,
    ) -> DetectionResult<DetectionOutput> {
        self.config.validate()?;
        let kind = self.config.kind;

        self.report(Stage::Preparing);
        let grid = grid.propagate_missing();
        grid.check_missing_columns()?;
        let reference = self.reference_index(&grid)?;
        let n = grid.n_times();
        let dt = grid.dt_seconds();
        let temps: Vec<f64> = grid.row(reference).to_vec();
        debug!(
            "Detecting {} pulses on {} depths × {} samples (dt = {} s), reference {} m",
            kind,
            grid.n_depths(),
            n,
            dt,
            grid.depths()[reference.get()]
        );

        self.report(Stage::Stratification);
        let phi = compute_tsi(&grid);

        self.report(Stage::Threshold);
        let (candidates, threshold) = match self.config.candidate_strategy {
            CandidateStrategy::Threshold => {
                let estimate = self.resolve_threshold(&grid, climatology)?;
                self.report(Stage::Candidates);
                let set = threshold_candidates(&grid, &phi, reference, kind, estimate.value);
                (set, Some(estimate))
            }
            CandidateStrategy::BaselineAnomaly => {
                let baseline = baseline_tsi(&grid, self.config.baseline_window_days)?;
                self.report(Stage::Candidates);
                let set = baseline_candidates(&grid, &phi, &baseline, reference, kind);
                (set, None)
            }
        };
        debug!("{} candidate intervals", candidates.len());

        self.report(Stage::Filtering);
        let (min, max) = self.config.duration_bounds(dt)?;
        let set = filter_duration(&candidates, min, max);
        let set = filter_drop(&set, &temps, self.config.drop_cutoff());

        self.report(Stage::ShiftStarts);
        let starts = start_indicator(&grid, &phi, reference, kind, &self.config.start_criteria);
        let set = shift_starts(&set, &starts);

        self.report(Stage::BottomLogger);
        let set = if self.config.bottom_logger_filter {
            filter_bottom_logger(&set, &grid, &phi, reference, kind)
        } else {
            set
        };

        self.report(Stage::ShiftEnds);
        let ends = end_indicator(
            &grid,
            &phi,
            reference,
            kind,
            &self.config.end_criteria,
            self.config.right_max_window,
        );
        let set = shift_ends(&set, &ends).drop_inverted();
        set.check()?;

        self.report(Stage::SpecificTsi);
        let set = match self.config.min_stsi {
            Some(min_stsi) => filter_specific_tsi(&set, &grid, reference, kind, min_stsi),
            None => set,
        };

        self.report(Stage::Splitting);
        let merged = merge_overlaps(&set, n);
        let pulses: IntervalSet = split_pulses(&merged, &temps);

        self.report(Stage::Metrics);
        let (pulse_rows, subpulse_rows, series) = compute_metrics(&grid, reference, &pulses);

        let output = DetectionOutput {
            kind,
            reference,
            threshold,
            phi,
            pulses: pulse_rows,
            subpulses: subpulse_rows,
            series,
            grid,
        };
        info!("{}", output.summary_line());
        self.report(Stage::Done);
        Ok(output)
    }
}

//! Progress reporting for detection runs.

use std::fmt;
use std::time::Instant;

use log::info;

/// Coarse checkpoints of a detection run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// NaN-column propagation and input checks
    Preparing,
    /// φ
    Stratification,
    /// Threshold resolution, or the rolling baseline φ for the
    /// baseline-anomaly strategy
    Threshold,
    /// Candidate extraction
    Candidates,
    /// Duration and drop filters
    Filtering,
    /// Start refinement
    ShiftStarts,
    /// Bottom-logger attribution filter
    BottomLogger,
    /// End refinement
    ShiftEnds,
    /// Specific stratification filter
    SpecificTsi,
    /// Overlap merge and splitting
    Splitting,
    /// Pulse and subpulse metrics
    Metrics,
    /// Run complete
    Done,
}

impl Stage {
    const ORDER: [Stage; 12] = [
        Stage::Preparing,
        Stage::Stratification,
        Stage::Threshold,
        Stage::Candidates,
        Stage::Filtering,
        Stage::ShiftStarts,
        Stage::BottomLogger,
        Stage::ShiftEnds,
        Stage::SpecificTsi,
        Stage::Splitting,
        Stage::Metrics,
        Stage::Done,
    ];

    /// Fraction of the run completed when this stage begins (1.0 for `Done`).
    pub fn fraction(self) -> f64 {
        let pos = Self::ORDER.iter().position(|&s| s == self).unwrap_or(0);
        pos as f64 / (Self::ORDER.len() - 1) as f64
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Preparing => "preparing grid",
            Stage::Stratification => "computing TSI",
            Stage::Threshold => "resolving threshold",
            Stage::Candidates => "extracting candidates",
            Stage::Filtering => "filtering candidates",
            Stage::ShiftStarts => "shifting starts",
            Stage::BottomLogger => "bottom-logger filter",
            Stage::ShiftEnds => "shifting ends",
            Stage::SpecificTsi => "specific TSI filter",
            Stage::Splitting => "merging and splitting",
            Stage::Metrics => "computing metrics",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receives progress notifications. Observers never influence results.
pub trait ProgressObserver {
    /// Called when `stage` begins; `fraction` is in `[0, 1]`.
    fn on_stage(&mut self, stage: Stage, fraction: f64);
}

impl<T: ProgressObserver + ?Sized> ProgressObserver for &mut T {
    fn on_stage(&mut self, stage: Stage, fraction: f64) {
        (**self).on_stage(stage, fraction);
    }
}

/// Forwards progress to `log::info!` with elapsed wall time.
#[derive(Clone, Debug)]
pub struct LogProgress {
    label: String,
    start_instant: Instant,
}

impl LogProgress {
    /// Create a reporter; `label` prefixes every message (station name, kind, …).
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start_instant: Instant::now(),
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new("detection")
    }
}

impl ProgressObserver for LogProgress {
    fn on_stage(&mut self, stage: Stage, fraction: f64) {
        info!(
            "{}: [{:>5.1}%] {} | elapsed={}",
            self.label,
            fraction * 100.0,
            stage,
            format_duration(self.start_instant.elapsed().as_secs_f64())
        );
    }
}

/// Format a duration in seconds as a human-readable string.
fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor();
        format!("{:.0}m{:.0}s", mins, secs - mins * 60.0)
    } else {
        let hours = (secs / 3600.0).floor();
        let mins = ((secs - hours * 3600.0) / 60.0).floor();
        format!("{:.0}h{:.0}m", hours, mins)
    }
}
